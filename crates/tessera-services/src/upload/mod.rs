//! Multi-file upload pipeline
//!
//! A batch of admitted candidates becomes one [`UploadTask`] per file. The
//! [`UploadOrchestrator`] drives every task concurrently through
//! `Pending → Uploading → Committing → Succeeded`, with `Failed` reachable from
//! `Uploading` (transport) or `Committing` (metadata). Each state change is
//! broadcast as an [`UploadEvent`]; [`ProgressBoard`] folds those into view
//! models without touching the tasks.

pub mod batch;
pub mod committer;
pub mod events;
pub mod orchestrator;
pub mod projector;
pub mod task;

pub use batch::{BatchResult, UploadBatch};
pub use committer::{BatchContext, MetadataCommitter, MetadataError};
pub use events::{event_capacity_for, UploadEvent, UploadEventReceiver, UploadEventSender};
pub use orchestrator::UploadOrchestrator;
pub use projector::{format_file_size, ProgressBoard, ProgressProjector, StatusLabel, TaskView};
pub use task::{TaskState, TransitionError, UploadTask};
