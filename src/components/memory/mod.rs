pub mod ram;
pub mod rom;

pub use ram::Ram;
pub use rom::Rom;
