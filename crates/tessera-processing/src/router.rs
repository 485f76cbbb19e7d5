use tessera_core::models::{Bucket, BucketKind, UploadCandidate};
use tessera_core::TesseraConfig;

/// Maps a content type to one of the two storage buckets.
#[derive(Debug, Clone)]
pub struct BucketRouter {
    image_bucket: String,
    document_bucket: String,
}

impl BucketRouter {
    pub fn new(image_bucket: impl Into<String>, document_bucket: impl Into<String>) -> Self {
        Self {
            image_bucket: image_bucket.into(),
            document_bucket: document_bucket.into(),
        }
    }

    pub fn from_config(config: &TesseraConfig) -> Self {
        Self::new(config.image_bucket.clone(), config.document_bucket.clone())
    }

    pub fn route(&self, candidate: &UploadCandidate) -> Bucket {
        self.bucket_for_mime(&candidate.content_type)
    }

    /// `image/*` goes to the image bucket, everything else to documents.
    ///
    /// Also used to locate the bucket of an existing descriptor from its MIME type.
    pub fn bucket_for_mime(&self, mime_type: &str) -> Bucket {
        if mime_type.trim().to_ascii_lowercase().starts_with("image/") {
            Bucket {
                kind: BucketKind::Images,
                name: self.image_bucket.clone(),
            }
        } else {
            Bucket {
                kind: BucketKind::Documents,
                name: self.document_bucket.clone(),
            }
        }
    }
}
