//! Semispace heap with a Cheney-style copying collector.
//!
//! The heap is a single growable arena of cells; allocation is a pointer
//! bump. Collection copies everything reachable from the evaluator's two
//! registers into a fresh semispace, compacting live data and leaving
//! forwarding markers behind so shared cells stay shared. Those two
//! registers are the complete root set: the pending-computation spine is
//! threaded through the graph itself, so the same scan that copies data
//! also copies the "stack".

use crate::cell::{Cell, CellRef, Word};

const INITIAL_CAPACITY: usize = 256;

pub struct Heap {
    /// Current semispace; the vector length is the bump pointer.
    cells: Vec<Cell>,
    /// Logical capacity in cells. Doubled (never shrunk) by the growth
    /// policy until live data fits in half of it.
    capacity: usize,
    collections: u64,
    last_copied: usize,
    trace: bool,
}

impl Heap {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Heap {
            cells: Vec::with_capacity(capacity),
            capacity,
            collections: 0,
            last_copied: 0,
            trace: false,
        }
    }

    /// Emit a line on stderr after every collection.
    pub fn set_trace(&mut self, on: bool) {
        self.trace = on;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cells allocated in the current semispace, live or not.
    pub fn used(&self) -> usize {
        self.cells.len()
    }

    pub fn collections(&self) -> u64 {
        self.collections
    }

    /// Cells the last collection copied, including the root seed cell.
    pub fn last_copied(&self) -> usize {
        self.last_copied
    }

    /// Bump-allocate one cell. Callers must have guaranteed headroom first;
    /// this never collects.
    pub fn alloc(&mut self, cell: Cell) -> CellRef {
        debug_assert!(
            self.cells.len() < self.capacity,
            "allocation without headroom"
        );
        let r = CellRef(self.cells.len() as u32);
        self.cells.push(cell);
        r
    }

    pub fn get(&self, r: CellRef) -> Cell {
        self.cells[r.index()]
    }

    pub fn set(&mut self, r: CellRef, cell: Cell) {
        self.cells[r.index()] = cell;
    }

    /// Capacity-only growth, for the graph-construction phase before the
    /// evaluator registers exist to serve as roots. Never moves cells.
    pub fn reserve(&mut self, n: usize) {
        while self.cells.len() + n > self.capacity {
            self.capacity *= 2;
        }
    }

    /// Guarantee room for `n` more cells, collecting with the two registers
    /// as roots if needed. Callers must continue with the returned roots:
    /// after a collection the originals point into the discarded semispace.
    #[must_use]
    pub fn ensure_headroom(&mut self, n: usize, roots: [Word; 2]) -> [Word; 2] {
        if self.cells.len() + n <= self.capacity {
            return roots;
        }
        let roots = self.collect(roots);
        // A near-full survivor set can leave even the doubled capacity
        // short of `n`; grow until it fits.
        self.reserve(n);
        roots
    }

    /// Copy everything reachable from `roots` into a fresh semispace and
    /// return the relocated roots.
    ///
    /// The two root words are written into the first cell of the new space,
    /// which becomes the initial scan frontier; from there this is the
    /// classic two-cursor Cheney scan, expressed over whole cells. A `Num`
    /// cell holds no references, so its payload is copied verbatim and never
    /// examined — the match arm is what the word-level formulation calls the
    /// variable stride.
    pub fn collect(&mut self, roots: [Word; 2]) -> [Word; 2] {
        let mut to: Vec<Cell> = Vec::with_capacity(self.capacity);
        to.push(Cell::App(roots[0], roots[1]));

        let mut scan = 0;
        while scan < to.len() {
            if let Cell::App(f, a) = to[scan] {
                let f = self.forward(&mut to, f);
                let a = self.forward(&mut to, a);
                to[scan] = Cell::App(f, a);
            }
            scan += 1;
        }

        let copied = to.len();
        self.cells = to;
        self.collections += 1;
        self.last_copied = copied;
        while copied > self.capacity / 2 {
            self.capacity *= 2;
        }
        if self.trace {
            eprintln!(
                "gc: copied {copied} cells, capacity {} cells",
                self.capacity
            );
        }

        match self.cells[0] {
            Cell::App(f, a) => [f, a],
            _ => unreachable!("root seed cell is always an application pair"),
        }
    }

    /// Relocate one word. References to cells already copied resolve through
    /// the forwarding marker; anything else is copied to the frontier and a
    /// marker is left in its old location.
    fn forward(&mut self, to: &mut Vec<Cell>, w: Word) -> Word {
        let Word::Ref(r) = w else { return w };
        match self.cells[r.index()] {
            Cell::Fwd(new) => Word::Ref(new),
            old => {
                let new = CellRef(to.len() as u32);
                to.push(old);
                self.cells[r.index()] = Cell::Fwd(new);
                Word::Ref(new)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> Vec<Cell> {
        self.cells.clone()
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Op;

    fn app(heap: &mut Heap, f: Word, a: Word) -> Word {
        heap.reserve(1);
        Word::Ref(heap.alloc(Cell::App(f, a)))
    }

    fn num(heap: &mut Heap, v: f64) -> Word {
        heap.reserve(1);
        Word::Ref(heap.alloc(Cell::Num(v)))
    }

    /// Structural equality between a pre-collection snapshot and the
    /// collected heap, tolerant of relocation and safe on cycles: each old
    /// cell must map to exactly one new cell with matching shape.
    fn same_shape(
        old: &[Cell],
        heap: &Heap,
        before: Word,
        after: Word,
        seen: &mut std::collections::HashMap<u32, u32>,
    ) -> bool {
        match (before, after) {
            (Word::Op(a), Word::Op(b)) => a == b,
            (Word::Ref(a), Word::Ref(b)) => {
                if let Some(&mapped) = seen.get(&a.0) {
                    return mapped == b.0;
                }
                seen.insert(a.0, b.0);
                match (old[a.index()], heap.get(b)) {
                    (Cell::Num(x), Cell::Num(y)) => x.to_bits() == y.to_bits(),
                    (Cell::App(f0, a0), Cell::App(f1, a1)) => {
                        same_shape(old, heap, f0, f1, seen)
                            && same_shape(old, heap, a0, a1, seen)
                    }
                    _ => false,
                }
            }
            _ => false,
        }
    }

    fn assert_preserved(heap: &mut Heap, root: Word) -> Word {
        let old = heap.snapshot();
        let [root2, _] = heap.collect([root, Word::Op(Op::Nil)]);
        let mut seen = std::collections::HashMap::new();
        assert!(same_shape(&old, heap, root, root2, &mut seen));
        root2
    }

    #[test]
    fn alloc_and_read_back() {
        let mut heap = Heap::with_capacity(8);
        let n = heap.alloc(Cell::Num(2.5));
        let a = heap.alloc(Cell::App(Word::Op(Op::Neg), Word::Ref(n)));
        assert_eq!(heap.get(n), Cell::Num(2.5));
        assert_eq!(heap.get(a), Cell::App(Word::Op(Op::Neg), Word::Ref(n)));
        assert_eq!(heap.used(), 2);
    }

    #[test]
    fn collect_preserves_structure() {
        let mut heap = Heap::with_capacity(64);
        let two = num(&mut heap, 2.0);
        let three = num(&mut heap, 3.0);
        let inner = app(&mut heap, Word::Op(Op::Add), two);
        let root = app(&mut heap, inner, three);
        assert_preserved(&mut heap, root);
    }

    #[test]
    fn collect_preserves_sharing() {
        let mut heap = Heap::with_capacity(64);
        let shared = num(&mut heap, 7.0);
        let left = app(&mut heap, Word::Op(Op::I), shared);
        let root = app(&mut heap, left, shared);
        let root2 = assert_preserved(&mut heap, root);

        // Both parents must still reference the one relocated cell.
        let Word::Ref(r) = root2 else { panic!("root relocated to a non-ref") };
        let Cell::App(l, a) = heap.get(r) else { panic!("root shape changed") };
        let Word::Ref(l) = l else { panic!("left child lost") };
        let Cell::App(_, shared2) = heap.get(l) else { panic!("left shape changed") };
        assert_eq!(a, shared2);
    }

    #[test]
    fn collect_preserves_cycles() {
        let mut heap = Heap::with_capacity(64);
        // A self-referencing cell, as the recursion combinator builds them.
        heap.reserve(1);
        let r = heap.alloc(Cell::App(Word::Op(Op::I), Word::Op(Op::Nil)));
        heap.set(r, Cell::App(Word::Op(Op::I), Word::Ref(r)));

        let [root, _] = heap.collect([Word::Ref(r), Word::Op(Op::Nil)]);
        let Word::Ref(r2) = root else { panic!("cycle root lost") };
        assert_eq!(heap.get(r2), Cell::App(Word::Op(Op::I), Word::Ref(r2)));
    }

    #[test]
    fn collect_drops_garbage() {
        let mut heap = Heap::with_capacity(64);
        for _ in 0..20 {
            num(&mut heap, 0.0);
        }
        let keep = num(&mut heap, 1.0);
        let [_, _] = heap.collect([keep, Word::Op(Op::Nil)]);
        // Seed cell plus the single live number.
        assert_eq!(heap.used(), 2);
        assert_eq!(heap.last_copied(), 2);
    }

    #[test]
    fn raw_number_is_never_treated_as_reference() {
        let mut heap = Heap::with_capacity(8);
        // A payload whose bit pattern would be a wildly out-of-range index
        // if anything ever read it as a reference.
        let poison = f64::from_bits(0xFFFF_FFFF_FFFF_F00D);
        let n = heap.alloc(Cell::Num(poison));
        let [root, _] = heap.collect([Word::Ref(n), Word::Op(Op::Nil)]);
        let Word::Ref(n2) = root else { panic!("number cell lost") };
        let Cell::Num(v) = heap.get(n2) else { panic!("number cell reshaped") };
        assert_eq!(v.to_bits(), poison.to_bits());
    }

    #[test]
    fn ensure_headroom_relocates_roots() {
        let mut heap = Heap::with_capacity(4);
        let a = num(&mut heap, 1.0);
        let b = num(&mut heap, 2.0);
        let before = heap.collections();
        let [a2, b2] = heap.ensure_headroom(8, [a, b]);
        assert_eq!(heap.collections(), before + 1);
        let (Word::Ref(a2), Word::Ref(b2)) = (a2, b2) else {
            panic!("roots must stay references")
        };
        assert_eq!(heap.get(a2), Cell::Num(1.0));
        assert_eq!(heap.get(b2), Cell::Num(2.0));
        assert!(heap.capacity() >= heap.used() + 8);
    }

    #[test]
    fn ensure_headroom_is_a_no_op_with_room() {
        let mut heap = Heap::with_capacity(16);
        let a = num(&mut heap, 1.0);
        let roots = heap.ensure_headroom(2, [a, Word::Op(Op::Nil)]);
        assert_eq!(roots, [a, Word::Op(Op::Nil)]);
        assert_eq!(heap.collections(), 0);
    }

    #[test]
    fn growth_policy_doubles_until_half_empty() {
        let mut heap = Heap::with_capacity(8);
        // Build a fully live chain larger than half the capacity.
        let mut root = num(&mut heap, 0.0);
        for _ in 0..6 {
            root = app(&mut heap, Word::Op(Op::I), root);
        }
        let before = heap.capacity();
        let [root, _] = heap.collect([root, Word::Op(Op::Nil)]);
        assert!(heap.capacity() > before, "capacity must grow");
        assert!(heap.last_copied() * 2 <= heap.capacity());

        // Capacity never shrinks, even when almost everything dies.
        let grown = heap.capacity();
        let [_, _] = heap.collect([root, Word::Op(Op::Nil)]);
        let keep = num(&mut heap, 9.0);
        let [_, _] = heap.collect([keep, Word::Op(Op::Nil)]);
        assert!(heap.capacity() >= grown);
    }

    #[test]
    fn random_graphs_survive_collection() {
        let mut rng = fastrand::Rng::with_seed(0x5eed);
        for _ in 0..50 {
            let mut heap = Heap::with_capacity(512);
            let mut words: Vec<Word> = vec![
                Word::Op(Op::S),
                Word::Op(Op::K),
                Word::Op(Op::I),
                num(&mut heap, rng.f64()),
            ];
            for _ in 0..rng.usize(1..120) {
                let f = words[rng.usize(..words.len())];
                let a = words[rng.usize(..words.len())];
                words.push(app(&mut heap, f, a));
            }
            let root = *words.last().unwrap();
            assert_preserved(&mut heap, root);
        }
    }
}
