//! Tagged words and two-word cells — the only objects the heap holds.

use std::fmt;

/// Index of a cell in the current semispace.
///
/// Cells are addressed by arena index rather than by pointer, so the
/// collector's forwarding step is a plain index rewrite and a cell that
/// references itself (built by the recursion combinator) is an ordinary
/// index cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef(pub(crate) u32);

impl CellRef {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A machine word: a reference to a cell, or a primitive operation tag.
///
/// A raw number is deliberately not a `Word` variant. Numbers live only
/// inside [`Cell::Num`], which is what keeps the collector from ever chasing
/// a float bit pattern as if it were a reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Word {
    Ref(CellRef),
    Op(Op),
}

/// A two-word heap cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    /// Operator applied to operand.
    App(Word, Word),
    /// A boxed numeric literal behaving as a graph node.
    Num(f64),
    /// Forwarding marker. Only exists in from-space during a collection;
    /// the mutator never observes it.
    Fwd(CellRef),
}

/// The closed set of primitive operations.
///
/// Booleans are represented by the two selector combinators: `K` selects its
/// first argument (true), `J` its second (false). `SS`, `CC` and `BB` are the
/// doubled-arity variants of `S`, `C` and `B`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Neutral end-of-input marker; never a valid operator.
    Nil,
    // Combinators
    Y,
    I,
    J,
    K,
    S,
    C,
    B,
    Ss,
    Cc,
    Bb,
    // Control and character I/O
    Exit,
    Print,
    Putc,
    Getc,
    // Numeric
    Floor,
    Ceil,
    Abs,
    Neg,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    // Comparison
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    Ne,
}

impl Op {
    /// How many spine arguments the rewrite rule consumes.
    pub fn arity(self) -> u8 {
        use Op::*;
        match self {
            Nil => 0,
            Y | I | Exit | Floor | Ceil | Abs | Neg => 1,
            J | K | Getc => 2,
            S | C | B | Putc | Print => 3,
            Ss | Cc | Bb => 4,
            Add | Sub | Mul | Div | Mod | Pow => 2,
            Lt | Le | Eq | Ge | Gt | Ne => 2,
        }
    }

    /// Display name, as the trace printer spells it.
    pub fn name(self) -> &'static str {
        use Op::*;
        match self {
            Nil => "nil",
            Y => "Y",
            I => "I",
            J => "J",
            K => "K",
            S => "S",
            C => "C",
            B => "B",
            Ss => "SS",
            Cc => "CC",
            Bb => "BB",
            Exit => "exit",
            Print => "print",
            Putc => "putc",
            Getc => "getc",
            Floor => "floor",
            Ceil => "ceil",
            Abs => "abs",
            Neg => "neg",
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Mod => "%",
            Pow => "^",
            Lt => "<",
            Le => "<=",
            Eq => "==",
            Ge => ">=",
            Gt => ">",
            Ne => "!=",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combinator_arities() {
        assert_eq!(Op::I.arity(), 1);
        assert_eq!(Op::K.arity(), 2);
        assert_eq!(Op::S.arity(), 3);
        assert_eq!(Op::Ss.arity(), 4);
        assert_eq!(Op::Getc.arity(), 2);
        assert_eq!(Op::Putc.arity(), 3);
        assert_eq!(Op::Mod.arity(), 2);
    }

    #[test]
    fn op_names() {
        assert_eq!(Op::Y.to_string(), "Y");
        assert_eq!(Op::Ss.to_string(), "SS");
        assert_eq!(Op::Add.to_string(), "+");
        assert_eq!(Op::Nil.to_string(), "nil");
    }

    #[test]
    fn word_equality_distinguishes_refs() {
        assert_eq!(Word::Ref(CellRef(3)), Word::Ref(CellRef(3)));
        assert_ne!(Word::Ref(CellRef(3)), Word::Ref(CellRef(4)));
        assert_ne!(Word::Ref(CellRef(0)), Word::Op(Op::I));
    }
}
