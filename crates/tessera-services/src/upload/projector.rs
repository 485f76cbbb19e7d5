use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use tessera_core::ErrorMetadata;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use super::events::{UploadEvent, UploadEventReceiver};
use super::task::{TaskState, UploadTask};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLabel {
    Uploading,
    Completed,
    Failed,
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLabel::Uploading => write!(f, "Uploading…"),
            StatusLabel::Completed => write!(f, "Completed"),
            StatusLabel::Failed => write!(f, "Failed"),
        }
    }
}

/// What an upload panel row shows for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskView {
    pub task_id: Uuid,
    pub file_name: String,
    pub bucket: String,
    pub size: String,
    pub caption: Option<String>,
    pub status: StatusLabel,
    pub label: String,
    pub percent: u8,
    pub error_code: Option<&'static str>,
    pub error: Option<String>,
    pub retryable: bool,
    pub suggested_action: Option<&'static str>,
}

/// Read-only view derivation for upload tasks.
pub struct ProgressProjector;

impl ProgressProjector {
    pub fn project(tasks: &[UploadTask]) -> Vec<TaskView> {
        tasks.iter().map(Self::view).collect()
    }

    pub fn view(task: &UploadTask) -> TaskView {
        let status = match task.state() {
            TaskState::Pending | TaskState::Uploading | TaskState::Committing => {
                StatusLabel::Uploading
            }
            TaskState::Succeeded => StatusLabel::Completed,
            TaskState::Failed(_) => StatusLabel::Failed,
        };
        let candidate = task.candidate();
        TaskView {
            task_id: task.id(),
            file_name: candidate.file_name.clone(),
            bucket: task.bucket().name.clone(),
            size: format_file_size(candidate.size() as u64),
            caption: task.caption().map(str::to_string),
            status,
            label: status.to_string(),
            percent: task.progress(),
            error_code: task.failure().map(|f| f.error_code()),
            error: task.failure().map(|f| f.client_message()),
            retryable: task.failure().is_some_and(|f| f.is_recoverable()),
            suggested_action: task.failure().and_then(|f| f.suggested_action()),
        }
    }
}

/// `0 Bytes`, `512 Bytes`, `1.5 KB`, `2 MB`, ... with at most two decimals.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

/// Upload panel state rebuilt from orchestrator events.
///
/// Rows keep the order in which tasks were first seen.
#[derive(Debug, Default)]
pub struct ProgressBoard {
    order: Vec<Uuid>,
    views: HashMap<Uuid, TaskView>,
    completed_batches: Vec<Uuid>,
}

impl ProgressBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event in. Returns `true` when any row changed.
    pub fn apply(&mut self, event: &UploadEvent) -> bool {
        match event {
            UploadEvent::TaskChanged { task, .. } => {
                let view = ProgressProjector::view(task);
                match self.views.get(&view.task_id) {
                    Some(existing) if *existing == view => false,
                    Some(_) => {
                        self.views.insert(view.task_id, view);
                        true
                    }
                    None => {
                        self.order.push(view.task_id);
                        self.views.insert(view.task_id, view);
                        true
                    }
                }
            }
            UploadEvent::BatchCompleted {
                batch_id, tasks, ..
            } => {
                self.completed_batches.push(*batch_id);
                self.reconcile(tasks)
            }
            UploadEvent::Invalidated { .. } => false,
        }
    }

    /// Replace the rows of one batch with its final snapshots.
    ///
    /// Rows missed while lagging are added and the batch's rows are put back
    /// in batch order, at the position of its first known row.
    fn reconcile(&mut self, tasks: &[UploadTask]) -> bool {
        let views = ProgressProjector::project(tasks);
        let ids: HashSet<Uuid> = views.iter().map(|v| v.task_id).collect();
        let batch_order: Vec<Uuid> = views.iter().map(|v| v.task_id).collect();

        let known: Vec<Uuid> = self
            .order
            .iter()
            .filter(|id| ids.contains(id))
            .copied()
            .collect();
        let mut changed = known != batch_order;
        if changed {
            let at = self
                .order
                .iter()
                .position(|id| ids.contains(id))
                .unwrap_or(self.order.len());
            self.order.retain(|id| !ids.contains(id));
            self.order.splice(at..at, batch_order);
        }

        for view in views {
            if self.views.get(&view.task_id) != Some(&view) {
                self.views.insert(view.task_id, view);
                changed = true;
            }
        }
        changed
    }

    pub fn views(&self) -> Vec<TaskView> {
        self.order
            .iter()
            .filter_map(|id| self.views.get(id).cloned())
            .collect()
    }

    pub fn is_batch_complete(&self, batch_id: Uuid) -> bool {
        self.completed_batches.contains(&batch_id)
    }

    /// Consume events until every sender is gone, calling `on_change` with
    /// the current rows after each change.
    pub async fn run<F>(mut self, mut events: UploadEventReceiver, mut on_change: F) -> Self
    where
        F: FnMut(&[TaskView]),
    {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if self.apply(&event) {
                        on_change(&self.views());
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Rows catch up on the batch's BatchCompleted snapshot.
                    tracing::warn!(skipped, "Progress board lagged behind upload events");
                }
                Err(RecvError::Closed) => break,
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::error::TaskFailure;
    use tessera_core::models::{Bucket, BucketKind, RawFile, UploadCandidate};

    fn task(name: &str, size: usize) -> UploadTask {
        let candidate = UploadCandidate::new(RawFile::new(name, "image/png", vec![0u8; size]));
        let bucket = Bucket {
            kind: BucketKind::Images,
            name: "training-photos".to_string(),
        };
        UploadTask::new(candidate, bucket, None)
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2 * 1024 * 1024), "2 MB");
        assert_eq!(format_file_size(1024 * 1024 * 1024 + 1), "1 GB");
        assert_eq!(format_file_size(1234567), "1.18 MB");
    }

    #[test]
    fn test_labels_follow_state() {
        let mut t = task("a.png", 1536);
        let view = ProgressProjector::view(&t);
        assert_eq!(view.label, "Uploading…");
        assert_eq!(view.percent, 0);
        assert_eq!(view.size, "1.5 KB");

        t.start_upload("s/1-a.png".to_string()).unwrap();
        t.fail(TaskFailure::upload("timeout")).unwrap();
        let view = ProgressProjector::view(&t);
        assert_eq!(view.status, StatusLabel::Failed);
        assert_eq!(view.label, "Failed");
        assert_eq!(view.error_code, Some("upload-error"));
        assert_eq!(view.error.as_deref(), Some("Upload failed: timeout"));
    }

    #[test]
    fn test_project_does_not_reorder() {
        let tasks = vec![task("a.png", 1), task("b.png", 1), task("c.png", 1)];
        let names: Vec<String> = ProgressProjector::project(&tasks)
            .into_iter()
            .map(|v| v.file_name)
            .collect();
        assert_eq!(names, vec!["a.png", "b.png", "c.png"]);
    }

    #[test]
    fn test_board_applies_latest_snapshot() {
        let batch_id = Uuid::new_v4();
        let mut board = ProgressBoard::new();
        let mut t = task("a.png", 1);

        assert!(board.apply(&UploadEvent::TaskChanged {
            batch_id,
            task: t.clone(),
        }));
        assert!(!board.apply(&UploadEvent::TaskChanged {
            batch_id,
            task: t.clone(),
        }));

        t.start_upload("s/1-a.png".to_string()).unwrap();
        assert!(board.apply(&UploadEvent::TaskChanged {
            batch_id,
            task: t.clone(),
        }));
        assert_eq!(board.views().len(), 1);
        assert_eq!(board.views()[0].percent, 10);

        assert!(!board.apply(&UploadEvent::BatchCompleted {
            batch_id,
            session_id: "s".to_string(),
            succeeded: 0,
            failed: 0,
            tasks: vec![t.clone()],
        }));
        assert!(board.is_batch_complete(batch_id));
    }

    #[test]
    fn test_batch_completed_restores_missed_rows_in_batch_order() {
        let batch_id = Uuid::new_v4();
        let mut board = ProgressBoard::new();
        let earlier = task("earlier.png", 1);
        board.apply(&UploadEvent::TaskChanged {
            batch_id: Uuid::new_v4(),
            task: earlier.clone(),
        });

        let mut tasks: Vec<UploadTask> = ["a.png", "b.png", "c.png"]
            .iter()
            .map(|name| task(name, 1))
            .collect();
        // Only the last task's event made it through.
        board.apply(&UploadEvent::TaskChanged {
            batch_id,
            task: tasks[2].clone(),
        });

        for t in tasks.iter_mut() {
            t.start_upload(format!("s/1-{}", t.candidate().file_name))
                .unwrap();
            t.fail(TaskFailure::upload("timeout")).unwrap();
        }
        assert!(board.apply(&UploadEvent::BatchCompleted {
            batch_id,
            session_id: "s".to_string(),
            succeeded: 0,
            failed: 3,
            tasks: tasks.clone(),
        }));

        let names: Vec<String> = board.views().into_iter().map(|v| v.file_name).collect();
        assert_eq!(names, vec!["earlier.png", "a.png", "b.png", "c.png"]);
        assert!(board.views()[1..]
            .iter()
            .all(|v| v.status == StatusLabel::Failed && v.retryable));
        assert_eq!(
            board.views()[1].suggested_action,
            Some("Resubmit this file")
        );
    }
}
