//! Shared key generation for storage backends.
//!
//! Key format: `{session_id}/{unix_millis}-{random}.{ext}`.

use chrono::Utc;
use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

const RANDOM_SUFFIX_LEN: usize = 12;

/// Generate a fresh storage key for a file owned by `session_id`.
///
/// Every call yields a distinct key, even for the same session and extension.
pub fn generate_storage_key(session_id: &str, extension: Option<&str>) -> String {
    let session: String = session_id
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let random = Uuid::new_v4().simple().to_string();
    let stamp = format!(
        "{}-{}",
        Utc::now().timestamp_millis(),
        &random[..RANDOM_SUFFIX_LEN]
    );

    match extension.map(|e| e.trim_start_matches('.')).filter(|e| !e.is_empty()) {
        Some(ext) => format!("{}/{}.{}", session, stamp, ext.to_lowercase()),
        None => format!("{}/{}", session, stamp),
    }
}

/// Reject keys or bucket names that could escape their namespace.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.contains("..") || key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}
