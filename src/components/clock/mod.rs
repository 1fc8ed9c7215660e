pub mod square_clock;
pub mod time_source;

pub use square_clock::Clock;
pub use time_source::{ManualTimeSource, SystemTimeSource, TimeSource};
