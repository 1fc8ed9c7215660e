pub mod alu;
pub mod comparator;

pub use alu::{Alu, AluOp};
pub use comparator::Comparator;
