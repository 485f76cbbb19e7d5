use std::fmt;

use tessera_core::constants::{
    PROGRESS_COMMIT_CHECKPOINT, PROGRESS_COMPLETE, PROGRESS_UPLOAD_STARTED,
};
use tessera_core::error::TaskFailure;
use tessera_core::models::{Bucket, StoredObjectDescriptor, UploadCandidate};
use uuid::Uuid;

/// Lifecycle of one upload task.
///
/// `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Uploading,
    Committing,
    Succeeded,
    Failed(TaskFailure),
}

impl TaskState {
    pub fn name(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Uploading => "uploading",
            TaskState::Committing => "committing",
            TaskState::Succeeded => "succeeded",
            TaskState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed(_))
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid task transition from {from} to {to}")]
pub struct TransitionError {
    pub from: &'static str,
    pub to: &'static str,
}

/// One file's unit of work.
///
/// The target bucket and caption are fixed at creation. Only the orchestrator
/// running the task mutates it; everyone else sees snapshots.
#[derive(Debug, Clone)]
pub struct UploadTask {
    id: Uuid,
    candidate: UploadCandidate,
    bucket: Bucket,
    caption: Option<String>,
    state: TaskState,
    progress: u8,
    storage_key: Option<String>,
    descriptor: Option<StoredObjectDescriptor>,
}

impl UploadTask {
    /// The candidate's own caption wins over the batch default. Blank captions
    /// count as absent.
    pub fn new(candidate: UploadCandidate, bucket: Bucket, default_caption: Option<&str>) -> Self {
        let caption = candidate
            .caption
            .clone()
            .filter(|c| !c.trim().is_empty())
            .or_else(|| default_caption.map(str::to_string))
            .filter(|c| !c.trim().is_empty());
        Self {
            id: Uuid::new_v4(),
            candidate,
            bucket,
            caption,
            state: TaskState::Pending,
            progress: 0,
            storage_key: None,
            descriptor: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn candidate(&self) -> &UploadCandidate {
        &self.candidate
    }

    pub fn bucket(&self) -> &Bucket {
        &self.bucket
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn storage_key(&self) -> Option<&str> {
        self.storage_key.as_deref()
    }

    pub fn descriptor(&self) -> Option<&StoredObjectDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn failure(&self) -> Option<&TaskFailure> {
        match &self.state {
            TaskState::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_succeeded(&self) -> bool {
        self.state == TaskState::Succeeded
    }

    fn invalid(&self, to: &'static str) -> TransitionError {
        TransitionError {
            from: self.state.name(),
            to,
        }
    }

    /// Replace the caption. Only allowed before the task starts.
    pub fn set_caption(&mut self, caption: Option<String>) -> Result<(), TransitionError> {
        if self.state != TaskState::Pending {
            return Err(self.invalid("pending"));
        }
        self.caption = caption.filter(|c| !c.trim().is_empty());
        Ok(())
    }

    /// `Pending → Uploading` under a freshly generated key.
    pub fn start_upload(&mut self, storage_key: String) -> Result<(), TransitionError> {
        if self.state != TaskState::Pending {
            return Err(self.invalid("uploading"));
        }
        self.state = TaskState::Uploading;
        self.storage_key = Some(storage_key);
        self.progress = PROGRESS_UPLOAD_STARTED;
        Ok(())
    }

    /// Advance transfer progress.
    ///
    /// Never decreases, and stays below the commit checkpoint until the
    /// upload is acknowledged.
    pub fn record_progress(&mut self, percent: u8) -> Result<(), TransitionError> {
        if self.state != TaskState::Uploading {
            return Err(self.invalid("uploading"));
        }
        let capped = percent.min(PROGRESS_COMMIT_CHECKPOINT - 1);
        self.progress = self.progress.max(capped);
        Ok(())
    }

    /// `Uploading → Committing`; progress is pinned at the commit checkpoint.
    pub fn upload_complete(&mut self) -> Result<(), TransitionError> {
        if self.state != TaskState::Uploading {
            return Err(self.invalid("committing"));
        }
        self.state = TaskState::Committing;
        self.progress = PROGRESS_COMMIT_CHECKPOINT;
        Ok(())
    }

    /// `Committing → Succeeded`.
    pub fn commit_succeeded(
        &mut self,
        descriptor: StoredObjectDescriptor,
    ) -> Result<(), TransitionError> {
        if self.state != TaskState::Committing {
            return Err(self.invalid("succeeded"));
        }
        self.state = TaskState::Succeeded;
        self.progress = PROGRESS_COMPLETE;
        self.descriptor = Some(descriptor);
        Ok(())
    }

    /// Move to `Failed`.
    ///
    /// Upload failures are only valid while uploading, metadata failures only
    /// while committing. Progress keeps its last value.
    pub fn fail(&mut self, failure: TaskFailure) -> Result<(), TransitionError> {
        let allowed = matches!(
            (&self.state, &failure),
            (TaskState::Uploading, TaskFailure::Upload { .. })
                | (TaskState::Committing, TaskFailure::Metadata { .. })
        );
        if !allowed {
            return Err(self.invalid("failed"));
        }
        self.state = TaskState::Failed(failure);
        Ok(())
    }

    /// A fresh `Pending` task for the same candidate, bucket and caption.
    ///
    /// Only failed tasks can be retried. The new task gets its own id and,
    /// once started, its own storage key.
    pub fn retry(&self) -> Result<UploadTask, TransitionError> {
        if !matches!(self.state, TaskState::Failed(_)) {
            return Err(self.invalid("pending"));
        }
        Ok(UploadTask {
            id: Uuid::new_v4(),
            candidate: self.candidate.clone(),
            bucket: self.bucket.clone(),
            caption: self.caption.clone(),
            state: TaskState::Pending,
            progress: 0,
            storage_key: None,
            descriptor: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tessera_core::models::{BucketKind, NewDescriptor, RawFile};

    fn task(caption: Option<&str>) -> UploadTask {
        let candidate = UploadCandidate::new(RawFile::new("a.png", "image/png", vec![1u8; 8]));
        let bucket = Bucket {
            kind: BucketKind::Images,
            name: "training-photos".to_string(),
        };
        UploadTask::new(candidate, bucket, caption)
    }

    fn descriptor(key: &str) -> StoredObjectDescriptor {
        StoredObjectDescriptor::from_new(
            NewDescriptor {
                owning_session_id: "s1".to_string(),
                uploaded_by: "u1".to_string(),
                file_name: "a.png".to_string(),
                storage_key: key.to_string(),
                file_size: 8,
                mime_type: "image/png".to_string(),
                caption: None,
            },
            Uuid::new_v4(),
            Utc::now(),
        )
    }

    #[test]
    fn test_happy_path() {
        let mut t = task(None);
        assert_eq!(t.state(), &TaskState::Pending);
        assert_eq!(t.progress(), 0);

        t.start_upload("s1/1-abc.png".to_string()).unwrap();
        assert_eq!(t.progress(), PROGRESS_UPLOAD_STARTED);
        assert_eq!(t.storage_key(), Some("s1/1-abc.png"));

        t.upload_complete().unwrap();
        assert_eq!(t.state(), &TaskState::Committing);
        assert_eq!(t.progress(), PROGRESS_COMMIT_CHECKPOINT);

        t.commit_succeeded(descriptor("s1/1-abc.png")).unwrap();
        assert!(t.is_succeeded());
        assert_eq!(t.progress(), PROGRESS_COMPLETE);
        assert!(t.descriptor().is_some());
    }

    #[test]
    fn test_blank_candidate_caption_falls_back_to_default() {
        let bucket = Bucket {
            kind: BucketKind::Images,
            name: "training-photos".to_string(),
        };
        let candidate = UploadCandidate::new(RawFile::new("a.png", "image/png", vec![1u8; 8]))
            .with_caption("  ");
        let t = UploadTask::new(candidate.clone(), bucket.clone(), Some("Week 1"));
        assert_eq!(t.caption(), Some("Week 1"));

        let t = UploadTask::new(candidate, bucket, Some(" "));
        assert_eq!(t.caption(), None);
    }

    #[test]
    fn test_committing_requires_upload() {
        let mut t = task(None);
        assert_eq!(
            t.upload_complete(),
            Err(TransitionError {
                from: "pending",
                to: "committing"
            })
        );
        assert!(t.commit_succeeded(descriptor("k")).is_err());
    }

    #[test]
    fn test_progress_is_monotonic_and_capped() {
        let mut t = task(None);
        assert!(t.record_progress(20).is_err());

        t.start_upload("k".to_string()).unwrap();
        t.record_progress(40).unwrap();
        t.record_progress(25).unwrap();
        assert_eq!(t.progress(), 40);

        t.record_progress(100).unwrap();
        assert_eq!(t.progress(), PROGRESS_COMMIT_CHECKPOINT - 1);
    }

    #[test]
    fn test_failure_kind_must_match_phase() {
        let mut t = task(None);
        t.start_upload("k".to_string()).unwrap();
        assert!(t.fail(TaskFailure::metadata("b", "k", "db down")).is_err());
        t.fail(TaskFailure::upload("connection reset")).unwrap();
        assert_eq!(t.failure().map(|f| f.reason()), Some("connection reset"));
        assert_eq!(t.progress(), PROGRESS_UPLOAD_STARTED);

        let mut t = task(None);
        t.start_upload("k".to_string()).unwrap();
        t.upload_complete().unwrap();
        assert!(t.fail(TaskFailure::upload("late")).is_err());
        t.fail(TaskFailure::metadata("training-photos", "k", "db down"))
            .unwrap();
        assert_eq!(
            t.failure().and_then(|f| f.orphaned_object()),
            Some(("training-photos", "k"))
        );
    }

    #[test]
    fn test_terminal_states_are_absorbing() {
        let mut t = task(None);
        t.start_upload("k".to_string()).unwrap();
        t.fail(TaskFailure::upload("boom")).unwrap();

        assert!(t.start_upload("k2".to_string()).is_err());
        assert!(t.upload_complete().is_err());
        assert!(t.record_progress(50).is_err());
        assert!(t.fail(TaskFailure::upload("again")).is_err());
        assert!(t.is_terminal());
    }

    #[test]
    fn test_retry_creates_fresh_task() {
        let mut t = task(Some("Day one"));
        assert!(t.retry().is_err());

        t.start_upload("k".to_string()).unwrap();
        t.fail(TaskFailure::upload("boom")).unwrap();

        let retry = t.retry().unwrap();
        assert_ne!(retry.id(), t.id());
        assert_eq!(retry.candidate().id, t.candidate().id);
        assert_eq!(retry.state(), &TaskState::Pending);
        assert_eq!(retry.progress(), 0);
        assert_eq!(retry.storage_key(), None);
        assert_eq!(retry.caption(), Some("Day one"));
    }

    #[test]
    fn test_caption_fallback_and_edit() {
        let candidate = UploadCandidate::new(RawFile::new("a.pdf", "application/pdf", vec![1]))
            .with_caption("Own caption");
        let bucket = Bucket {
            kind: BucketKind::Documents,
            name: "training-documents".to_string(),
        };
        let mut t = UploadTask::new(candidate, bucket, Some("Batch caption"));
        assert_eq!(t.caption(), Some("Own caption"));

        t.set_caption(Some("Edited".to_string())).unwrap();
        assert_eq!(t.caption(), Some("Edited"));
        t.set_caption(Some("  ".to_string())).unwrap();
        assert_eq!(t.caption(), None);

        assert_eq!(task(Some("Batch caption")).caption(), Some("Batch caption"));

        t.start_upload("k".to_string()).unwrap();
        assert!(t.set_caption(None).is_err());
    }
}
