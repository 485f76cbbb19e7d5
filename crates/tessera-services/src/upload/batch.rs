use tessera_core::models::UploadCandidate;
use tessera_processing::BucketRouter;
use uuid::Uuid;

use super::task::{TransitionError, UploadTask};

/// Tasks submitted together against one owning session.
///
/// Until submission the batch is editable: tasks can be removed and their
/// captions replaced. The default caption is copied into each task as it is
/// added.
#[derive(Debug, Clone)]
pub struct UploadBatch {
    id: Uuid,
    session_id: String,
    default_caption: Option<String>,
    tasks: Vec<UploadTask>,
}

impl UploadBatch {
    pub fn new(session_id: impl Into<String>, default_caption: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.into(),
            default_caption: default_caption.filter(|c| !c.trim().is_empty()),
            tasks: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn default_caption(&self) -> Option<&str> {
        self.default_caption.as_deref()
    }

    pub fn tasks(&self) -> &[UploadTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Queue a candidate; its bucket is decided here, once.
    pub fn add(&mut self, candidate: UploadCandidate, router: &BucketRouter) -> Uuid {
        let bucket = router.route(&candidate);
        let task = UploadTask::new(candidate, bucket, self.default_caption.as_deref());
        let id = task.id();
        self.tasks.push(task);
        id
    }

    /// Drop a queued task. It will never be submitted.
    pub fn remove(&mut self, task_id: Uuid) -> Option<UploadTask> {
        let index = self.tasks.iter().position(|t| t.id() == task_id)?;
        Some(self.tasks.remove(index))
    }

    /// Replace a queued task's caption. Returns `false` if no such task is queued.
    pub fn set_caption(&mut self, task_id: Uuid, caption: Option<String>) -> bool {
        match self.tasks.iter_mut().find(|t| t.id() == task_id) {
            Some(task) => task.set_caption(caption).is_ok(),
            None => false,
        }
    }

    /// Queue a fresh attempt for a failed task from an earlier batch.
    pub fn push_retry(&mut self, failed: &UploadTask) -> Result<Uuid, TransitionError> {
        let task = failed.retry()?;
        let id = task.id();
        self.tasks.push(task);
        Ok(id)
    }

    pub(crate) fn into_tasks(self) -> Vec<UploadTask> {
        self.tasks
    }
}

/// Terminal outcome of every task in a submitted batch.
///
/// A batch with failures is a partial success, not an error.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub batch_id: Uuid,
    pub session_id: String,
    pub succeeded: Vec<UploadTask>,
    pub failed: Vec<UploadTask>,
}

impl BatchResult {
    pub(crate) fn empty(batch_id: Uuid, session_id: String) -> Self {
        Self {
            batch_id,
            session_id,
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    /// `(bucket, storage_key)` of every object stored without a descriptor.
    pub fn orphaned(&self) -> Vec<(String, String)> {
        self.failed
            .iter()
            .filter_map(|t| t.failure()?.orphaned_object())
            .map(|(bucket, key)| (bucket.to_string(), key.to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::error::TaskFailure;
    use tessera_core::models::RawFile;

    fn router() -> BucketRouter {
        BucketRouter::new("training-photos", "training-documents")
    }

    fn candidate(name: &str, mime: &str) -> UploadCandidate {
        UploadCandidate::new(RawFile::new(name, mime, vec![1u8; 4]))
    }

    #[test]
    fn test_add_routes_and_captures_default_caption() {
        let mut batch = UploadBatch::new("s1", Some("Week 1".to_string()));
        batch.add(candidate("a.png", "image/png"), &router());
        batch.add(candidate("b.pdf", "application/pdf"), &router());

        let buckets: Vec<&str> = batch
            .tasks()
            .iter()
            .map(|t| t.bucket().name.as_str())
            .collect();
        assert_eq!(buckets, vec!["training-photos", "training-documents"]);
        assert!(batch.tasks().iter().all(|t| t.caption() == Some("Week 1")));
    }

    #[test]
    fn test_remove_and_set_caption() {
        let mut batch = UploadBatch::new("s1", None);
        let a = batch.add(candidate("a.png", "image/png"), &router());
        let b = batch.add(candidate("b.png", "image/png"), &router());

        assert!(batch.set_caption(b, Some("Trainer".to_string())));
        assert!(batch.remove(a).is_some());
        assert!(batch.remove(a).is_none());
        assert!(!batch.set_caption(a, None));

        assert_eq!(batch.len(), 1);
        assert_eq!(batch.tasks()[0].caption(), Some("Trainer"));
    }

    #[test]
    fn test_push_retry_requires_failed_task() {
        let mut source = UploadBatch::new("s1", None);
        source.add(candidate("a.png", "image/png"), &router());
        let mut task = source.into_tasks().remove(0);

        let mut batch = UploadBatch::new("s1", None);
        assert!(batch.push_retry(&task).is_err());

        task.start_upload("s1/1-a.png".to_string()).unwrap();
        task.fail(TaskFailure::upload("reset")).unwrap();
        let id = batch.push_retry(&task).unwrap();
        assert_ne!(id, task.id());
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_orphaned_lists_metadata_failures_only() {
        let mut batch = UploadBatch::new("s1", None);
        batch.add(candidate("a.png", "image/png"), &router());
        batch.add(candidate("b.pdf", "application/pdf"), &router());
        let mut tasks = batch.into_tasks();

        tasks[0].start_upload("s1/1-a.png".to_string()).unwrap();
        tasks[0].fail(TaskFailure::upload("reset")).unwrap();

        tasks[1].start_upload("s1/2-b.pdf".to_string()).unwrap();
        tasks[1].upload_complete().unwrap();
        tasks[1]
            .fail(TaskFailure::metadata("training-documents", "s1/2-b.pdf", "db down"))
            .unwrap();

        let result = BatchResult {
            batch_id: Uuid::new_v4(),
            session_id: "s1".to_string(),
            succeeded: Vec::new(),
            failed: tasks,
        };
        assert_eq!(
            result.orphaned(),
            vec![("training-documents".to_string(), "s1/2-b.pdf".to_string())]
        );
        assert!(!result.all_succeeded());
        assert_eq!(result.total(), 2);
    }
}
