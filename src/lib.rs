//! turner — a combinator graph-reduction machine.
//!
//! Programs are graphs of two-word cells built from S/K/I-style combinators
//! plus numeric, comparison and character I/O primitives. The engine reduces
//! a graph to normal form by local rewriting, walking application spines
//! with in-place pointer reversal instead of a call stack; the semispace
//! heap is compacted by a Cheney-style copying collector whose entire root
//! set is the engine's two registers.

pub mod cell;
pub mod device;
pub mod engine;
pub mod heap;
pub mod program;

pub use cell::{Cell, CellRef, Op, Word};
pub use device::{Device, MemoryDevice, StdDevice};
pub use engine::{END_OF_INPUT, Engine, EvalError, Outcome, fmt_num};
pub use heap::Heap;
pub use program::GraphBuilder;
