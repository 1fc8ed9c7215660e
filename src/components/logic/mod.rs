pub mod gate;
pub mod tristate;

pub use gate::{Gate, GateKind};
pub use tristate::TriStateBuffer;
