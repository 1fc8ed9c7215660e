//! Concrete circuit parts, grouped by behavior.

pub mod arithmetic;
pub mod clock;
pub mod common;
pub mod io;
pub mod logic;
pub mod memory;
pub mod routing;
pub mod sequential;

pub use arithmetic::{Alu, AluOp, Comparator};
pub use clock::Clock;
pub use common::{Edge, EdgeTrigger};
pub use io::{LogicInput, LogicOutput};
pub use logic::{Gate, GateKind, TriStateBuffer};
pub use memory::{Ram, Rom};
pub use routing::{Decoder, Demux, Mux};
pub use sequential::{Counter, FlipFlop, FlipFlopKind, RandomBit, Register, ShiftRegister, SrLatch};
