//! Admission and progress constants.

/// Upper bound on a single file, in bytes (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;

pub const DEFAULT_IMAGE_BUCKET: &str = "training-photos";
pub const DEFAULT_DOCUMENT_BUCKET: &str = "training-documents";

pub const DEFAULT_IMAGE_CONTENT_TYPES: &[&str] =
    &["image/jpeg", "image/png", "image/gif", "image/webp"];
pub const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

pub const DEFAULT_DOCUMENT_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];
pub const DEFAULT_DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];

/// Progress reported once a task leaves `Pending`.
pub const PROGRESS_UPLOAD_STARTED: u8 = 10;
/// Progress reported once the storage key is allocated and bytes are in flight.
pub const PROGRESS_UPLOAD_IN_FLIGHT: u8 = 30;
/// Progress pinned while the descriptor row is being written.
pub const PROGRESS_COMMIT_CHECKPOINT: u8 = 70;
pub const PROGRESS_COMPLETE: u8 = 100;

/// Default broadcast capacity for upload events.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;
/// Most `TaskChanged` events a single task emits during one run.
pub const EVENTS_PER_TASK: usize = 4;

/// Window used by archive statistics for "recent" uploads.
pub const RECENT_UPLOAD_WINDOW_DAYS: i64 = 7;
