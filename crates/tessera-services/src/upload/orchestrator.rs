use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tessera_core::constants::PROGRESS_UPLOAD_IN_FLIGHT;
use tessera_core::error::TaskFailure;
use tessera_core::{ErrorMetadata, IdentityProvider, LogLevel, UploadError};
use tessera_db::DescriptorStore;
use tessera_storage::{generate_storage_key, Storage};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::batch::{BatchResult, UploadBatch};
use super::committer::{BatchContext, MetadataCommitter};
use super::events::{publish, UploadEvent, UploadEventReceiver, UploadEventSender};
use super::task::{TransitionError, UploadTask};

/// Runs upload batches.
///
/// Every task of a batch runs concurrently on the calling task and is awaited
/// to a terminal state; one task's failure never cancels its siblings.
/// Cloning is cheap and clones share the event channel.
#[derive(Clone)]
pub struct UploadOrchestrator {
    storage: Arc<dyn Storage>,
    committer: MetadataCommitter,
    identity: Arc<dyn IdentityProvider>,
    events: UploadEventSender,
}

impl UploadOrchestrator {
    pub fn new(
        storage: Arc<dyn Storage>,
        store: Arc<dyn DescriptorStore>,
        identity: Arc<dyn IdentityProvider>,
        event_capacity: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            storage,
            committer: MetadataCommitter::new(store),
            identity,
            events,
        }
    }

    pub fn subscribe(&self) -> UploadEventReceiver {
        self.events.subscribe()
    }

    /// Run a batch to completion.
    ///
    /// Fails only on batch preconditions, before any task starts. Task-level
    /// failures are reported in the returned [`BatchResult`].
    pub async fn submit(&self, batch: UploadBatch) -> Result<BatchResult, UploadError> {
        let batch_id = batch.id();
        let session_id = batch.session_id().trim().to_string();

        if session_id.is_empty() {
            tracing::warn!(
                batch_id = %batch_id,
                tasks = batch.len(),
                "Batch rejected: missing session"
            );
            return Err(UploadError::MissingSession);
        }

        if batch.is_empty() {
            tracing::debug!(batch_id = %batch_id, "Empty batch, nothing to upload");
            return Ok(BatchResult::empty(batch_id, session_id));
        }

        let uploader = self
            .identity
            .current_uploader()
            .await
            .map_err(UploadError::MissingUploader)?;
        if uploader.user_id.trim().is_empty() {
            return Err(UploadError::MissingUploader("empty user id".to_string()));
        }

        let ctx = BatchContext {
            batch_id,
            session_id,
            uploader_id: uploader.user_id,
        };

        tracing::info!(
            batch_id = %batch_id,
            session_id = %ctx.session_id,
            tasks = batch.len(),
            "Upload batch started"
        );
        let start = Instant::now();

        let finished = join_all(
            batch
                .into_tasks()
                .into_iter()
                .map(|task| self.run_task(task, &ctx)),
        )
        .await;

        let snapshot = finished.clone();
        let (succeeded, failed): (Vec<_>, Vec<_>) =
            finished.into_iter().partition(|t| t.is_succeeded());

        let result = BatchResult {
            batch_id,
            session_id: ctx.session_id.clone(),
            succeeded,
            failed,
        };

        tracing::info!(
            batch_id = %batch_id,
            session_id = %result.session_id,
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            orphaned = result.orphaned().len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Upload batch finished"
        );

        if !result.succeeded.is_empty() {
            publish(
                &self.events,
                UploadEvent::Invalidated {
                    session_id: result.session_id.clone(),
                },
            );
        }
        publish(
            &self.events,
            UploadEvent::BatchCompleted {
                batch_id,
                session_id: result.session_id.clone(),
                succeeded: result.succeeded.len(),
                failed: result.failed.len(),
                tasks: snapshot,
            },
        );

        Ok(result)
    }

    /// Run a batch on the runtime, detached from the caller.
    ///
    /// Dropping the returned handle does not cancel in-flight uploads.
    pub fn spawn_batch(
        &self,
        batch: UploadBatch,
    ) -> JoinHandle<Result<BatchResult, UploadError>> {
        let orchestrator = self.clone();
        tokio::spawn(async move { orchestrator.submit(batch).await })
    }

    async fn run_task(&self, mut task: UploadTask, ctx: &BatchContext) -> UploadTask {
        if let Err(e) = self.drive(&mut task, ctx).await {
            tracing::error!(
                task_id = %task.id(),
                state = %task.state(),
                error = %e,
                "Upload task stopped on an invalid transition"
            );
        }
        task
    }

    async fn drive(
        &self,
        task: &mut UploadTask,
        ctx: &BatchContext,
    ) -> Result<(), TransitionError> {
        let extension = task.candidate().extension();
        let key = generate_storage_key(&ctx.session_id, extension.as_deref());
        let bucket = task.bucket().name.clone();

        task.start_upload(key.clone())?;
        self.emit(ctx, task);

        task.record_progress(PROGRESS_UPLOAD_IN_FLIGHT)?;
        self.emit(ctx, task);

        let content_type = task.candidate().content_type.clone();
        let data = task.candidate().data.clone();
        let size = data.len();
        let start = Instant::now();
        let put = self.storage.put(&bucket, &key, &content_type, data).await;

        if let Err(e) = put {
            let failure = TaskFailure::upload(e.to_string());
            log_task_failure(task, &failure);
            task.fail(failure)?;
            self.emit(ctx, task);
            return Ok(());
        }

        tracing::debug!(
            task_id = %task.id(),
            bucket = %bucket,
            storage_key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object stored"
        );

        task.upload_complete()?;
        self.emit(ctx, task);

        match self.committer.commit(task, ctx).await {
            Ok(descriptor) => {
                task.commit_succeeded(descriptor)?;
                tracing::info!(
                    task_id = %task.id(),
                    file_name = %task.candidate().file_name,
                    bucket = %bucket,
                    storage_key = %key,
                    "Upload committed"
                );
            }
            Err(e) => {
                let failure = TaskFailure::metadata(bucket, key, e.to_string());
                log_task_failure(task, &failure);
                task.fail(failure)?;
            }
        }
        self.emit(ctx, task);

        Ok(())
    }

    fn emit(&self, ctx: &BatchContext, task: &UploadTask) {
        publish(
            &self.events,
            UploadEvent::TaskChanged {
                batch_id: ctx.batch_id,
                task: task.clone(),
            },
        );
    }
}

fn log_task_failure(task: &UploadTask, failure: &TaskFailure) {
    let task_id = task.id();
    let bucket = task.bucket().name.as_str();
    let storage_key = task.storage_key().unwrap_or_default();
    let error_code = failure.error_code();
    let recoverable = failure.is_recoverable();
    match failure.log_level() {
        LogLevel::Debug => {
            tracing::debug!(
                %task_id,
                bucket,
                storage_key,
                error_code,
                recoverable,
                error = %failure,
                "Upload task failed"
            );
        }
        LogLevel::Warn => {
            tracing::warn!(
                %task_id,
                bucket,
                storage_key,
                error_code,
                recoverable,
                error = %failure,
                "Upload task failed"
            );
        }
        LogLevel::Error => {
            tracing::error!(
                %task_id,
                bucket,
                storage_key,
                error_code,
                recoverable,
                error = %failure,
                "Upload task failed"
            );
        }
    }
}
