//! Tessera Services Library
//!
//! This crate drives the upload pipeline: per-file task state machines, batch
//! fan-out, metadata commit and progress projection.

pub mod upload;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use upload::{
    BatchContext, BatchResult, MetadataCommitter, MetadataError, ProgressBoard,
    ProgressProjector, StatusLabel, TaskState, TaskView, TransitionError, UploadBatch,
    UploadEvent, UploadOrchestrator, UploadTask,
};
