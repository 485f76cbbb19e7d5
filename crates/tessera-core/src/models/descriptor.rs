use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Descriptor row to be written once the binary upload has been acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDescriptor {
    pub owning_session_id: String,
    pub uploaded_by: String,
    pub file_name: String,
    pub storage_key: String,
    pub file_size: i64,
    pub mime_type: String,
    pub caption: Option<String>,
}

impl NewDescriptor {
    /// Names the first empty required field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.owning_session_id.trim().is_empty() {
            Some("owning_session_id")
        } else if self.uploaded_by.trim().is_empty() {
            Some("uploaded_by")
        } else if self.storage_key.trim().is_empty() {
            Some("storage_key")
        } else {
            None
        }
    }
}

/// Durable record proving a committed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StoredObjectDescriptor {
    pub id: Uuid,
    pub owning_session_id: String,
    pub uploaded_by: String,
    pub file_name: String,
    pub storage_key: String,
    pub file_size: i64,
    pub mime_type: String,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StoredObjectDescriptor {
    pub fn from_new(new: NewDescriptor, id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            owning_session_id: new.owning_session_id,
            uploaded_by: new.uploaded_by,
            file_name: new.file_name,
            storage_key: new.storage_key,
            file_size: new.file_size,
            mime_type: new.mime_type,
            caption: new.caption,
            created_at,
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Gallery listing filter. Blank values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorFilter {
    pub session_id: Option<String>,
    /// Case-insensitive substring matched against caption and file name.
    pub search: Option<String>,
}

impl DescriptorFilter {
    pub fn new(session_id: Option<String>, search: Option<String>) -> Self {
        let non_blank = |s: String| {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };
        Self {
            session_id: session_id.and_then(non_blank),
            search: search.and_then(non_blank),
        }
    }

    pub fn matches(&self, descriptor: &StoredObjectDescriptor) -> bool {
        if let Some(session_id) = &self.session_id {
            if descriptor.owning_session_id != *session_id {
                return false;
            }
        }
        match &self.search {
            None => true,
            Some(search) => {
                let needle = search.to_lowercase();
                descriptor.file_name.to_lowercase().contains(&needle)
                    || descriptor
                        .caption
                        .as_deref()
                        .is_some_and(|c| c.to_lowercase().contains(&needle))
            }
        }
    }
}

/// Archive-wide counters shown on the photo management dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveStats {
    pub total_objects: i64,
    pub sessions_with_uploads: i64,
    pub recent_uploads: i64,
}
