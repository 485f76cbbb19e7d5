//! Error types module
//!
//! Tessera separates failures by how far they reach:
//!
//! - [`RejectionReason`]: intake-time refusal of a single file; no task is created.
//! - [`TaskFailure`]: terminal failure of one upload task; siblings are unaffected.
//! - [`UploadError`]: batch precondition failures; no task starts.
//! - [`AppError`]: collaborator failures raised by the descriptor store.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::fmt;

use serde::{Deserialize, Serialize};

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented to the user.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "upload-error")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, AppError::InvalidInput(_))
    }

    fn suggested_action(&self) -> Option<&'static str> {
        match self {
            AppError::Database(_) | AppError::Internal(_) => Some("Retry after a short delay"),
            AppError::InvalidInput(_) => Some("Check the arguments and try again"),
        }
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::Internal(_) => "Internal error".to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            AppError::InvalidInput(_) => LogLevel::Debug,
            AppError::Database(_) | AppError::Internal(_) => LogLevel::Error,
        }
    }
}

/// Why a file was refused at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionReason {
    UnsupportedType,
    TooLarge,
}

impl RejectionReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectionReason::UnsupportedType => "unsupported-type",
            RejectionReason::TooLarge => "too-large",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Terminal failure of a single upload task.
///
/// `Metadata` means the binary is in storage but no descriptor references it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TaskFailure {
    #[error("upload-error: {reason}")]
    Upload { reason: String },

    #[error("metadata-error: {reason} (orphaned object {bucket}/{storage_key})")]
    Metadata {
        bucket: String,
        storage_key: String,
        reason: String,
    },
}

impl TaskFailure {
    pub fn upload(reason: impl Into<String>) -> Self {
        TaskFailure::Upload {
            reason: reason.into(),
        }
    }

    pub fn metadata(
        bucket: impl Into<String>,
        storage_key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        TaskFailure::Metadata {
            bucket: bucket.into(),
            storage_key: storage_key.into(),
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            TaskFailure::Upload { reason } | TaskFailure::Metadata { reason, .. } => reason,
        }
    }

    /// `(bucket, storage_key)` of the binary left behind by a metadata failure.
    pub fn orphaned_object(&self) -> Option<(&str, &str)> {
        match self {
            TaskFailure::Upload { .. } => None,
            TaskFailure::Metadata {
                bucket,
                storage_key,
                ..
            } => Some((bucket.as_str(), storage_key.as_str())),
        }
    }
}

impl ErrorMetadata for TaskFailure {
    fn error_code(&self) -> &'static str {
        match self {
            TaskFailure::Upload { .. } => "upload-error",
            TaskFailure::Metadata { .. } => "metadata-error",
        }
    }

    fn is_recoverable(&self) -> bool {
        true
    }

    fn suggested_action(&self) -> Option<&'static str> {
        match self {
            TaskFailure::Upload { .. } => Some("Resubmit this file"),
            TaskFailure::Metadata { .. } => {
                Some("Resubmit this file; the previously stored object may need manual cleanup")
            }
        }
    }

    fn client_message(&self) -> String {
        match self {
            TaskFailure::Upload { reason } => format!("Upload failed: {}", reason),
            TaskFailure::Metadata {
                storage_key,
                reason,
                ..
            } => format!(
                "File stored as {} but its record could not be saved: {}",
                storage_key, reason
            ),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            TaskFailure::Upload { .. } => LogLevel::Warn,
            TaskFailure::Metadata { .. } => LogLevel::Error,
        }
    }
}

/// Batch-fatal precondition failures. Raised before any I/O begins.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("missing-session: batch submitted without an owning session id")]
    MissingSession,

    #[error("missing-uploader: {0}")]
    MissingUploader(String),
}

impl ErrorMetadata for UploadError {
    fn error_code(&self) -> &'static str {
        match self {
            UploadError::MissingSession => "missing-session",
            UploadError::MissingUploader(_) => "missing-uploader",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }

    fn suggested_action(&self) -> Option<&'static str> {
        match self {
            UploadError::MissingSession => Some("Select a training session"),
            UploadError::MissingUploader(_) => Some("Sign in again"),
        }
    }

    fn client_message(&self) -> String {
        match self {
            UploadError::MissingSession => "Please select a training session".to_string(),
            UploadError::MissingUploader(_) => "Could not determine who is uploading".to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_database() {
        #[cfg(feature = "sqlx")]
        let err = AppError::from(sqlx::Error::PoolClosed);
        #[cfg(not(feature = "sqlx"))]
        let err = AppError::Database("pool closed".to_string());
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to access database");
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_metadata_invalid_input() {
        let err = AppError::InvalidInput("storage_key must not be empty".to_string());
        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "storage_key must not be empty");
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_rejection_reason_codes() {
        assert_eq!(RejectionReason::UnsupportedType.to_string(), "unsupported-type");
        assert_eq!(RejectionReason::TooLarge.to_string(), "too-large");
        assert_eq!(
            serde_json::to_string(&RejectionReason::TooLarge).unwrap(),
            "\"too-large\""
        );
    }

    #[test]
    fn test_upload_and_metadata_failures_are_distinct() {
        let upload = TaskFailure::upload("connection reset");
        let metadata = TaskFailure::metadata("training-photos", "s1/1-abc.png", "insert failed");

        assert_eq!(upload.error_code(), "upload-error");
        assert_eq!(metadata.error_code(), "metadata-error");
        assert_ne!(upload.log_level(), metadata.log_level());
        assert_eq!(upload.orphaned_object(), None);
        assert_eq!(
            metadata.orphaned_object(),
            Some(("training-photos", "s1/1-abc.png"))
        );
        assert!(metadata.client_message().contains("s1/1-abc.png"));
        assert_eq!(metadata.reason(), "insert failed");
    }

    #[test]
    fn test_upload_error_is_not_recoverable() {
        let err = UploadError::MissingSession;
        assert_eq!(err.error_code(), "missing-session");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "Please select a training session");
    }
}
