//! The reduction engine: two registers, pointer-reversal unwind/rewind, and
//! the primitive rewrite rules.
//!
//! All transient state lives in the `func` and `arg` registers. Descending
//! into an application reverses a pointer inside the visited cell instead of
//! pushing onto a stack, so the pending computation is part of the graph and
//! the collector finds it through the same two roots as everything else.
//! Rewinding is the exact inverse: it restores the visited cell, extracts
//! its operand, and leaves the registers one level further up.

mod trace;

use crate::cell::{Cell, CellRef, Op, Word};
use crate::device::Device;
use crate::heap::Heap;

/// Numeric value `getc` yields at end of input.
pub const END_OF_INPUT: f64 = -1.0;

#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("'{op}' expects a boxed number operand")]
    NotANumber { op: Op },
    #[error("'{op}' applied to too few arguments")]
    Underapplied { op: Op },
    #[error("the end-of-input marker reached operator position")]
    NilApplied,
    #[error("device error: {0}")]
    Io(#[from] std::io::Error),
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// The `exit` primitive fired.
    Exit,
    /// The spine was exhausted with a boxed number in focus: the graph's
    /// normal form is that number.
    Value(f64),
}

/// Format a number the way the `print` primitive writes it: integral values
/// without a decimal point.
pub fn fmt_num(v: f64) -> String {
    if v == 0.0 && v.is_sign_negative() {
        // `as i64` would erase the sign of negative zero.
        "-0".to_string()
    } else if v == (v as i64) as f64 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

pub struct Engine<D> {
    heap: Heap,
    func: Word,
    arg: Word,
    device: D,
    trace: bool,
    gc_stress: bool,
    steps: u64,
}

impl<D: Device> Engine<D> {
    pub fn new(heap: Heap, root: Word, device: D) -> Self {
        Engine {
            heap,
            func: root,
            arg: Word::Op(Op::Nil),
            device,
            trace: false,
            gc_stress: false,
            steps: 0,
        }
    }

    /// Emit one line per reduction step and per collection on stderr.
    pub fn with_trace(mut self, on: bool) -> Self {
        self.trace = on;
        self.heap.set_trace(on);
        self
    }

    /// Force a collection at every step boundary. Reduction results must be
    /// identical with and without this; it exists to shake out collector
    /// bugs in tests.
    pub fn with_gc_stress(mut self, on: bool) -> Self {
        self.gc_stress = on;
        self
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Reduce until the graph terminates or a rule fails.
    pub fn run(&mut self) -> Result<Outcome, EvalError> {
        loop {
            if self.gc_stress {
                let [f, a] = self.heap.collect([self.func, self.arg]);
                self.func = f;
                self.arg = a;
            }
            if self.trace {
                eprintln!("{}", self.dump_state());
            }
            self.steps += 1;

            match self.func {
                Word::Ref(r) => match self.heap.get(r) {
                    // Unwind: thread the reversed link through the cell and
                    // descend one level toward the true operator.
                    Cell::App(op, operand) => {
                        self.heap.set(r, Cell::App(self.arg, operand));
                        self.arg = Word::Ref(r);
                        self.func = op;
                    }
                    // A boxed number in operator position selects its
                    // continuation: (n k) rewrites to (k n). With nothing
                    // left on the spine the number is the normal form.
                    Cell::Num(v) => match self.rewind() {
                        Some(k) => {
                            let root = self.root();
                            self.heap.set(root, Cell::App(k, Word::Ref(r)));
                        }
                        None => return Ok(Outcome::Value(v)),
                    },
                    Cell::Fwd(_) => {
                        unreachable!("forwarding marker escaped the collector")
                    }
                },
                Word::Op(op) => {
                    if let Some(outcome) = self.step_prim(op)? {
                        return Ok(outcome);
                    }
                }
            }
        }
    }

    /// One rewind: the inverse of unwind. Restores the visited cell's first
    /// word from `func`, moves both registers one level up, and yields the
    /// cell's operand. `None` means the spine is exhausted.
    fn rewind(&mut self) -> Option<Word> {
        let Word::Ref(r) = self.arg else { return None };
        let Cell::App(below, operand) = self.heap.get(r) else {
            return None;
        };
        self.heap.set(r, Cell::App(self.func, operand));
        self.func = Word::Ref(r);
        self.arg = below;
        Some(operand)
    }

    fn take_arg(&mut self, op: Op) -> Result<Word, EvalError> {
        self.rewind().ok_or(EvalError::Underapplied { op })
    }

    /// Rewind one operand and require it to already be a boxed number; the
    /// numeric primitives never force their operands.
    fn num_arg(&mut self, op: Op) -> Result<f64, EvalError> {
        let operand = self.take_arg(op)?;
        if let Word::Ref(r) = operand {
            if let Cell::Num(v) = self.heap.get(r) {
                return Ok(v);
            }
        }
        Err(EvalError::NotANumber { op })
    }

    /// The redex root after rewinding: `func` always holds it.
    fn root(&self) -> CellRef {
        match self.func {
            Word::Ref(r) => r,
            Word::Op(_) => unreachable!("redex root is a cell after rewinding"),
        }
    }

    /// Guarantee headroom for `n` cells with the registers as roots, and
    /// adopt the relocated registers.
    fn need(&mut self, n: usize) {
        let [f, a] = self.heap.ensure_headroom(n, [self.func, self.arg]);
        self.func = f;
        self.arg = a;
    }

    /// Fire the rewrite rule for one primitive. `Some` terminates the run.
    fn step_prim(&mut self, op: Op) -> Result<Option<Outcome>, EvalError> {
        match op {
            Op::Nil => return Err(EvalError::NilApplied),

            // Y f -> (f, self): the one rule that builds a cycle.
            Op::Y => {
                let f = self.take_arg(op)?;
                let root = self.root();
                self.heap.set(root, Cell::App(f, Word::Ref(root)));
            }

            // I x yields x directly; the root cell is deliberately left
            // without an indirection (see DESIGN.md).
            Op::I => {
                let x = self.take_arg(op)?;
                self.func = x;
            }

            // The selectors: K keeps its first argument, J its second. The
            // root becomes an identity indirection so sharers see the pick.
            Op::K => {
                let t = self.take_arg(op)?;
                let _f = self.take_arg(op)?;
                let root = self.root();
                self.heap.set(root, Cell::App(Word::Op(Op::I), t));
                self.func = t;
            }
            Op::J => {
                let _t = self.take_arg(op)?;
                let f = self.take_arg(op)?;
                let root = self.root();
                self.heap.set(root, Cell::App(Word::Op(Op::I), f));
                self.func = f;
            }

            // S f g x -> (f x) (g x); the two applications of x collapse to
            // one cell when f and g are the same reference.
            Op::S => {
                self.need(2);
                let f = self.take_arg(op)?;
                let g = self.take_arg(op)?;
                let x = self.take_arg(op)?;
                let root = self.root();
                let fx = Word::Ref(self.heap.alloc(Cell::App(f, x)));
                let gx = if f == g {
                    fx
                } else {
                    Word::Ref(self.heap.alloc(Cell::App(g, x)))
                };
                self.heap.set(root, Cell::App(fx, gx));
            }

            // C f g x -> (f x) g
            Op::C => {
                self.need(1);
                let f = self.take_arg(op)?;
                let g = self.take_arg(op)?;
                let x = self.take_arg(op)?;
                let root = self.root();
                let fx = Word::Ref(self.heap.alloc(Cell::App(f, x)));
                self.heap.set(root, Cell::App(fx, g));
            }

            // B f g x -> f (g x)
            Op::B => {
                self.need(1);
                let f = self.take_arg(op)?;
                let g = self.take_arg(op)?;
                let x = self.take_arg(op)?;
                let root = self.root();
                let gx = Word::Ref(self.heap.alloc(Cell::App(g, x)));
                self.heap.set(root, Cell::App(f, gx));
            }

            // SS e f g x -> (e (f x)) (g x), sharing (f x) when f and g
            // coincide, as S does.
            Op::Ss => {
                self.need(3);
                let e = self.take_arg(op)?;
                let f = self.take_arg(op)?;
                let g = self.take_arg(op)?;
                let x = self.take_arg(op)?;
                let root = self.root();
                let fx = Word::Ref(self.heap.alloc(Cell::App(f, x)));
                let gx = if f == g {
                    fx
                } else {
                    Word::Ref(self.heap.alloc(Cell::App(g, x)))
                };
                let efx = Word::Ref(self.heap.alloc(Cell::App(e, fx)));
                self.heap.set(root, Cell::App(efx, gx));
            }

            // CC e f g x -> (e (f x)) g
            Op::Cc => {
                self.need(2);
                let e = self.take_arg(op)?;
                let f = self.take_arg(op)?;
                let g = self.take_arg(op)?;
                let x = self.take_arg(op)?;
                let root = self.root();
                let fx = Word::Ref(self.heap.alloc(Cell::App(f, x)));
                let efx = Word::Ref(self.heap.alloc(Cell::App(e, fx)));
                self.heap.set(root, Cell::App(efx, g));
            }

            // BB e f g x -> e (f (g x))
            Op::Bb => {
                self.need(2);
                let e = self.take_arg(op)?;
                let f = self.take_arg(op)?;
                let g = self.take_arg(op)?;
                let x = self.take_arg(op)?;
                let root = self.root();
                let gx = Word::Ref(self.heap.alloc(Cell::App(g, x)));
                let fgx = Word::Ref(self.heap.alloc(Cell::App(f, gx)));
                self.heap.set(root, Cell::App(e, fgx));
            }

            // exit w: the whole run is done; w is discarded unseen.
            Op::Exit => return Ok(Some(Outcome::Exit)),

            // print n k w -> k w, writing n and a line break to the
            // diagnostic sink.
            Op::Print => {
                let v = self.num_arg(op)?;
                let k = self.take_arg(op)?;
                let w = self.take_arg(op)?;
                let root = self.root();
                self.device.write_line(&fmt_num(v))?;
                self.heap.set(root, Cell::App(k, w));
            }

            // putc n k w -> k w, writing the byte n mod 256.
            Op::Putc => {
                let v = self.num_arg(op)?;
                let k = self.take_arg(op)?;
                let w = self.take_arg(op)?;
                let root = self.root();
                self.device.write_byte((v as i64).rem_euclid(256) as u8)?;
                self.heap.set(root, Cell::App(k, w));
            }

            // getc k w -> ((k n) w) where n boxes the byte read, or the
            // end-of-input value once the stream is exhausted.
            Op::Getc => {
                self.need(2);
                let k = self.take_arg(op)?;
                let w = self.take_arg(op)?;
                let root = self.root();
                let v = match self.device.read_byte()? {
                    Some(byte) => byte as f64,
                    None => END_OF_INPUT,
                };
                let n = Word::Ref(self.heap.alloc(Cell::Num(v)));
                let kn = Word::Ref(self.heap.alloc(Cell::App(k, n)));
                self.heap.set(root, Cell::App(kn, w));
            }

            Op::Floor => self.unary(op, f64::floor)?,
            Op::Ceil => self.unary(op, f64::ceil)?,
            Op::Abs => self.unary(op, f64::abs)?,
            Op::Neg => self.unary(op, |v| -v)?,

            Op::Add => self.binary(op, |u, v| u + v)?,
            Op::Sub => self.binary(op, |u, v| u - v)?,
            Op::Mul => self.binary(op, |u, v| u * v)?,
            Op::Div => self.binary(op, |u, v| u / v)?,
            Op::Mod => self.binary(op, |u, v| u - v * (u / v).floor())?,
            Op::Pow => self.binary(op, f64::powf)?,

            Op::Lt => self.compare(op, |u, v| u < v)?,
            Op::Le => self.compare(op, |u, v| u <= v)?,
            Op::Eq => self.compare(op, |u, v| u == v)?,
            Op::Ge => self.compare(op, |u, v| u >= v)?,
            Op::Gt => self.compare(op, |u, v| u > v)?,
            Op::Ne => self.compare(op, |u, v| u != v)?,
        }
        Ok(None)
    }

    /// Unary numeric rule: the root cell becomes the boxed result in place,
    /// so every sharer of this redex sees the computed number.
    fn unary(&mut self, op: Op, f: impl Fn(f64) -> f64) -> Result<(), EvalError> {
        let v = self.num_arg(op)?;
        let root = self.root();
        self.heap.set(root, Cell::Num(f(v)));
        Ok(())
    }

    fn binary(&mut self, op: Op, f: impl Fn(f64, f64) -> f64) -> Result<(), EvalError> {
        let u = self.num_arg(op)?;
        let v = self.num_arg(op)?;
        let root = self.root();
        self.heap.set(root, Cell::Num(f(u, v)));
        Ok(())
    }

    /// Comparison rule: the boolean result is one of the two selector
    /// combinators. The root keeps an identity indirection for sharers and
    /// the selector becomes the new focus directly.
    fn compare(&mut self, op: Op, f: impl Fn(f64, f64) -> bool) -> Result<(), EvalError> {
        let u = self.num_arg(op)?;
        let v = self.num_arg(op)?;
        let root = self.root();
        let sel = if f(u, v) { Op::K } else { Op::J };
        self.heap.set(root, Cell::App(Word::Op(Op::I), Word::Op(sel)));
        self.func = Word::Op(sel);
        Ok(())
    }
}
