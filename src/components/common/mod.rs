pub mod props;
pub mod sync;

pub use sync::{Edge, EdgeTrigger, SyncState};
