//! Parenthesized textual form of the registers, for the verbose trace.
//!
//! Purely diagnostic: applications print as left-associated chains with the
//! minimum parentheses, boxed numbers print as their value, and recursion
//! into the graph stops at a fixed depth so cyclic nodes terminate.

use super::{Engine, fmt_num};
use crate::cell::{Cell, Word};

const MAX_DEPTH: usize = 64;

#[derive(Clone, Copy, PartialEq)]
enum Side {
    Left,
    Right,
}

impl<D> Engine<D> {
    /// One trace line: both registers, reversed spine links and all.
    pub(super) fn dump_state(&self) -> String {
        let mut out = String::new();
        self.dump(&mut out, self.func, Side::Left, Side::Left, 0);
        out.push_str(" -- ");
        self.dump(&mut out, self.arg, Side::Right, Side::Right, 0);
        out
    }

    fn dump(&self, out: &mut String, w: Word, side: Side, mode: Side, depth: usize) {
        match w {
            Word::Op(op) => out.push_str(op.name()),
            Word::Ref(r) => {
                if depth >= MAX_DEPTH {
                    out.push_str("...");
                    return;
                }
                match self.heap.get(r) {
                    Cell::Num(v) => out.push_str(&fmt_num(v)),
                    Cell::Fwd(_) => out.push_str("<fwd>"),
                    Cell::App(f, a) => {
                        let parens = side != mode;
                        if parens {
                            out.push('(');
                        }
                        self.dump(out, f, Side::Left, Side::Left, depth + 1);
                        out.push(' ');
                        self.dump(out, a, Side::Right, mode, depth + 1);
                        if parens {
                            out.push(')');
                        }
                    }
                }
            }
        }
    }
}
