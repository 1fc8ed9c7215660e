pub mod probe;
pub mod switch;

pub use probe::LogicOutput;
pub use switch::LogicInput;
