/// Checkpoint file format and atomic store
pub mod store;

pub use store::{CheckpointRecord, CheckpointStore, CHECKPOINT_VERSION};
