use tessera_core::constants::EVENTS_PER_TASK;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::task::UploadTask;

pub type UploadEventSender = broadcast::Sender<UploadEvent>;
pub type UploadEventReceiver = broadcast::Receiver<UploadEvent>;

/// Notifications emitted by the orchestrator while a batch runs.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    /// A task changed state or progress. Carries a snapshot of the task.
    TaskChanged { batch_id: Uuid, task: UploadTask },
    /// Every task of the batch reached a terminal state.
    ///
    /// `tasks` holds the final snapshot of every task in batch order, so a
    /// subscriber that lagged behind can rebuild its rows from this event alone.
    BatchCompleted {
        batch_id: Uuid,
        session_id: String,
        succeeded: usize,
        failed: usize,
        tasks: Vec<UploadTask>,
    },
    /// Cached listings for this session are stale.
    Invalidated { session_id: String },
}

impl UploadEvent {
    pub fn batch_id(&self) -> Option<Uuid> {
        match self {
            UploadEvent::TaskChanged { batch_id, .. }
            | UploadEvent::BatchCompleted { batch_id, .. } => Some(*batch_id),
            UploadEvent::Invalidated { .. } => None,
        }
    }
}

/// Channel capacity that holds every event of a `tasks`-sized batch.
///
/// A task emits at most [`EVENTS_PER_TASK`] events and a batch adds two more.
pub fn event_capacity_for(base: usize, tasks: usize) -> usize {
    base.max(tasks.saturating_mul(EVENTS_PER_TASK).saturating_add(2))
}

/// Send without caring whether anyone is listening.
pub(crate) fn publish(sender: &UploadEventSender, event: UploadEvent) {
    if sender.send(event).is_err() {
        tracing::trace!("No upload event subscribers");
    }
}
