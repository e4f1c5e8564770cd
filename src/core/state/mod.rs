//! Resume state
//!
//! The checkpoint store remembers the last outcome of every
//! `(source, item, kind)` attempt and decides which item-kinds can be
//! skipped on a resumed run.

pub mod checkpoint;

pub use checkpoint::{
    backup_path, AttemptReason, CheckpointKey, CheckpointRecord, CheckpointStatus,
    CheckpointStore, Decision,
};
