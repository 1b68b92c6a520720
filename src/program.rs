//! Graph construction: a thin builder over the public heap API, plus the
//! built-in demo programs.
//!
//! The core engine only ever receives a finished graph; nothing here is a
//! parser or compiler, just hand-assembled combinator expressions. Builders
//! run before the evaluator registers exist, so they grow the heap by
//! capacity reservation rather than collection.

use crate::cell::{Cell, Op, Word};
use crate::heap::Heap;

pub struct GraphBuilder<'a> {
    heap: &'a mut Heap,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(heap: &'a mut Heap) -> Self {
        GraphBuilder { heap }
    }

    /// A boxed numeric literal.
    pub fn num(&mut self, v: f64) -> Word {
        self.heap.reserve(1);
        Word::Ref(self.heap.alloc(Cell::Num(v)))
    }

    /// One application cell.
    pub fn app(&mut self, f: Word, a: Word) -> Word {
        self.heap.reserve(1);
        Word::Ref(self.heap.alloc(Cell::App(f, a)))
    }

    pub fn app2(&mut self, f: Word, a: Word, b: Word) -> Word {
        let fa = self.app(f, a);
        self.app(fa, b)
    }

    pub fn app3(&mut self, f: Word, a: Word, b: Word, c: Word) -> Word {
        let fab = self.app2(f, a, b);
        self.app(fab, c)
    }
}

/// The smoke-test program: `S K K print 42 exit I`.
///
/// `S K K` reduces to the identity, so this prints 42 on the diagnostic
/// sink and exits — it exercises S, K, the print rule and exit in six cells.
pub fn answer(heap: &mut Heap) -> Word {
    let mut b = GraphBuilder::new(heap);
    let n = b.num(42.0);
    let skk = b.app2(Word::Op(Op::S), Word::Op(Op::K), Word::Op(Op::K));
    let prog = b.app3(skk, Word::Op(Op::Print), n, Word::Op(Op::Exit));
    b.app(prog, Word::Op(Op::I))
}

/// Copy input to output until end of stream:
///
/// ```text
/// main = Y' (BB getc (S (C (gt 0) exit)) (C putc))
/// Y'   = S (C B (S I I)) (C B (S I I))
/// ```
///
/// Each cycle reads a byte `c`; `gt 0 c` selects `exit` once the
/// end-of-input value (negative) comes back, otherwise `putc c` and loop.
/// The recursion is spelled with the S/C/B encoding of the fixed point —
/// note the shared `C B (S I I)` cell — and the whole program is applied to
/// the identity as the initial world token.
pub fn echo(heap: &mut Heap) -> Word {
    let mut b = GraphBuilder::new(heap);

    let sii = b.app2(Word::Op(Op::S), Word::Op(Op::I), Word::Op(Op::I));
    let cb = b.app2(Word::Op(Op::C), Word::Op(Op::B), sii);
    let fix = b.app2(Word::Op(Op::S), cb, cb);

    let zero = b.num(0.0);
    let gt0 = b.app(Word::Op(Op::Gt), zero);
    let test = b.app2(Word::Op(Op::C), gt0, Word::Op(Op::Exit));
    let stop = b.app(Word::Op(Op::S), test);
    let emit = b.app(Word::Op(Op::C), Word::Op(Op::Putc));
    let body = b.app3(Word::Op(Op::Bb), Word::Op(Op::Getc), stop, emit);

    let main = b.app(fix, body);
    b.app(main, Word::Op(Op::I))
}
