use std::sync::Arc;

use tessera_core::models::{NewDescriptor, StoredObjectDescriptor};
use tessera_core::AppError;
use tessera_db::DescriptorStore;
use uuid::Uuid;

use super::task::{TaskState, UploadTask};

/// Batch-level facts every commit needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchContext {
    pub batch_id: Uuid,
    pub session_id: String,
    pub uploader_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("task is {0}, not committing")]
    NotCommitting(&'static str),

    #[error("task has no storage key")]
    MissingStorageKey,

    #[error("{0} must not be empty")]
    MissingField(&'static str),

    #[error(transparent)]
    Store(#[from] AppError),
}

/// Writes the descriptor row for an uploaded object.
#[derive(Clone)]
pub struct MetadataCommitter {
    store: Arc<dyn DescriptorStore>,
}

impl MetadataCommitter {
    pub fn new(store: Arc<dyn DescriptorStore>) -> Self {
        Self { store }
    }

    /// One insert per call. The task must already be `Committing`, which
    /// guarantees its bytes were acknowledged by storage.
    pub async fn commit(
        &self,
        task: &UploadTask,
        ctx: &BatchContext,
    ) -> Result<StoredObjectDescriptor, MetadataError> {
        if *task.state() != TaskState::Committing {
            return Err(MetadataError::NotCommitting(task.state().name()));
        }
        let storage_key = task.storage_key().ok_or(MetadataError::MissingStorageKey)?;

        let candidate = task.candidate();
        let descriptor = NewDescriptor {
            owning_session_id: ctx.session_id.clone(),
            uploaded_by: ctx.uploader_id.clone(),
            file_name: candidate.file_name.clone(),
            storage_key: storage_key.to_string(),
            file_size: candidate.size() as i64,
            mime_type: candidate.content_type.clone(),
            caption: task.caption().map(str::to_string),
        };
        if let Some(field) = descriptor.missing_field() {
            return Err(MetadataError::MissingField(field));
        }

        let stored = self.store.insert(descriptor).await?;

        tracing::debug!(
            task_id = %task.id(),
            descriptor_id = %stored.id,
            storage_key = %stored.storage_key,
            "Descriptor committed"
        );

        Ok(stored)
    }
}
