pub mod counter;
pub mod flipflop;
pub mod latch;
pub mod random;
pub mod register;

pub use counter::Counter;
pub use flipflop::{FlipFlop, FlipFlopKind};
pub use latch::SrLatch;
pub use random::RandomBit;
pub use register::{Register, ShiftRegister};
