use std::fmt;
use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RejectionReason;

/// A file as handed over by a picker or drop zone, before any admission check.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl RawFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// A file that passed admission and may become an upload task.
///
/// Only intake constructs these, so size and MIME type are already within limits.
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    /// Client-side identifier, stable for the candidate's lifetime.
    pub id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
    /// Per-file caption; falls back to the batch caption when unset.
    pub caption: Option<String>,
}

impl UploadCandidate {
    pub fn new(raw: RawFile) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: raw.name,
            content_type: raw.content_type.trim().to_lowercase(),
            data: raw.data,
            caption: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Lowercased extension of the original file name, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// The two storage namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketKind {
    Images,
    Documents,
}

impl fmt::Display for BucketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketKind::Images => write!(f, "images"),
            BucketKind::Documents => write!(f, "documents"),
        }
    }
}

/// A resolved storage namespace: its kind plus the configured bucket name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bucket {
    pub kind: BucketKind,
    pub name: String,
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A file refused at intake, reported back to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionRejection {
    /// Position of the file in the submitted list.
    pub index: usize,
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
    pub reason: RejectionReason,
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_normalizes_content_type() {
        let candidate =
            UploadCandidate::new(RawFile::new("Report.PDF", " Application/PDF ", vec![1, 2, 3]));
        assert_eq!(candidate.content_type, "application/pdf");
        assert_eq!(candidate.extension().as_deref(), Some("pdf"));
        assert_eq!(candidate.size(), 3);
        assert!(!candidate.is_image());
    }

    #[test]
    fn test_candidate_ids_are_unique() {
        let raw = RawFile::new("a.png", "image/png", vec![0u8; 4]);
        let a = UploadCandidate::new(raw.clone());
        let b = UploadCandidate::new(raw);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_candidate_without_extension() {
        let candidate = UploadCandidate::new(RawFile::new("README", "image/png", vec![1]));
        assert_eq!(candidate.extension(), None);
        assert!(candidate.is_image());
    }
}
