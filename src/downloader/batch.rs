//! Batch admission and the sequential download loop.

use std::collections::HashSet;
use std::sync::atomic::Ordering;

use crate::error::{BatchError, Error, Result};
use crate::retry::download_with_retry;
use crate::types::{
    AudioFormat, BatchId, BatchProgress, BatchState, BatchSummary, DownloadOutcome, DownloadTask,
    Event,
};
use crate::utils::safe_file_name;

use super::{BatchDownloader, BatchSlot};

/// Exclusive right to run the loop, released on drop
pub(crate) struct BatchReservation {
    slot: BatchSlot,
}

impl Drop for BatchReservation {
    fn drop(&mut self) {
        self.slot.active_batch.store(0, Ordering::SeqCst);
        self.slot.active.store(false, Ordering::SeqCst);
    }
}

impl BatchDownloader {
    /// Run a batch to completion
    ///
    /// Tasks are attempted strictly in input order, one at a time, with
    /// `config.batch.pacing_delay` between consecutive tasks. A failing task
    /// never stops the batch: its outcome is recorded and the loop moves on.
    /// The batch ends `Completed` when every task succeeded, `Failed` otherwise.
    ///
    /// # Errors
    ///
    /// - [`BatchError::EmptyBatch`] for an empty task list
    /// - [`BatchError::AlreadyRunning`] while another batch is in flight
    /// - [`Error::ShuttingDown`] after [`shutdown`](Self::shutdown)
    /// - a database error when the batch cannot be registered
    ///
    /// Errors of individual tasks are reported through the summary, not here.
    pub async fn run_batch(
        &self,
        tasks: Vec<DownloadTask>,
        format: AudioFormat,
    ) -> Result<BatchSummary> {
        let reservation = self.reserve(&tasks)?;
        let batch_id = self.register(&reservation, tasks.len(), format).await?;
        Ok(self.process_batch(reservation, batch_id, tasks, format).await)
    }

    /// Start a batch in the background and return its id immediately
    ///
    /// Admission is checked before returning, so the errors are the same as
    /// for [`run_batch`](Self::run_batch). Follow the batch through
    /// [`progress`](Self::progress) or [`subscribe`](Self::subscribe).
    pub async fn start_batch(
        &self,
        tasks: Vec<DownloadTask>,
        format: AudioFormat,
    ) -> Result<BatchId> {
        let reservation = self.reserve(&tasks)?;
        let batch_id = self.register(&reservation, tasks.len(), format).await?;

        let downloader = self.clone();
        tokio::spawn(async move {
            downloader
                .process_batch(reservation, batch_id, tasks, format)
                .await;
        });

        Ok(batch_id)
    }

    /// Claim the loop for a new batch
    fn reserve(&self, tasks: &[DownloadTask]) -> Result<BatchReservation> {
        if !self.slot.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        if tasks.is_empty() {
            return Err(BatchError::EmptyBatch.into());
        }

        if self
            .slot
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BatchError::AlreadyRunning {
                active: self.slot.active_batch.load(Ordering::SeqCst),
            }
            .into());
        }

        Ok(BatchReservation {
            slot: self.slot.clone(),
        })
    }

    /// Give the reserved batch an id from the history store and reset progress
    ///
    /// Progress reads `Running` with nothing completed before the id is
    /// handed back to the caller.
    async fn register(
        &self,
        reservation: &BatchReservation,
        total: usize,
        format: AudioFormat,
    ) -> Result<BatchId> {
        let batch_id = self.history.begin_batch(total, format).await?;
        reservation
            .slot
            .active_batch
            .store(batch_id.get(), Ordering::SeqCst);
        *self.progress.write().await = BatchProgress::running(total);
        Ok(batch_id)
    }

    /// The sequential loop
    ///
    /// Holds the reservation until the terminal state has been published.
    async fn process_batch(
        &self,
        _reservation: BatchReservation,
        batch_id: BatchId,
        tasks: Vec<DownloadTask>,
        format: AudioFormat,
    ) -> BatchSummary {
        let started_at = chrono::Utc::now();
        let total = tasks.len();

        warn_on_duplicate_ids(batch_id, &tasks);

        self.emit_event(Event::BatchStarted { batch_id, total });
        tracing::info!(batch_id = %batch_id, total, %format, "Batch started");

        let mut outcomes = Vec::with_capacity(total);

        for (index, task) in tasks.into_iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.batch.pacing_delay).await;
            }

            {
                let mut progress = self.progress.write().await;
                progress.current_task_label = task.display_name.clone();
                progress.completed_count = index;
            }

            self.emit_event(Event::TaskStarted {
                batch_id,
                index,
                task_id: task.id.clone(),
                label: task.display_name.clone(),
                completed: index,
                total,
            });

            let outcome = self.attempt(task, format).await;
            self.report_outcome(batch_id, index, &outcome);

            if let Err(e) = self.history.record_outcome(batch_id, index, &outcome).await {
                tracing::error!(batch_id = %batch_id, index, error = %e, "Failed to persist task outcome");
            }

            outcomes.push(outcome);
        }

        let succeeded = outcomes.iter().filter(|o| o.succeeded).count();
        let failed = total - succeeded;
        let state = if failed == 0 {
            BatchState::Completed
        } else {
            BatchState::Failed
        };

        {
            let mut progress = self.progress.write().await;
            progress.completed_count = total;
            progress.current_task_label.clear();
            progress.state = state;
        }

        let summary = BatchSummary {
            batch_id,
            state,
            outcomes,
            succeeded,
            failed,
            started_at,
            finished_at: chrono::Utc::now(),
        };

        self.emit_event(Event::BatchFinished {
            batch_id,
            state,
            succeeded,
            failed,
        });

        if let Err(e) = self.history.finish_batch(&summary).await {
            tracing::error!(batch_id = %batch_id, error = %e, "Failed to persist batch summary");
        }

        tracing::info!(batch_id = %batch_id, ?state, succeeded, failed, "Batch finished");
        summary
    }

    /// Fetch one task's payload and save it
    ///
    /// Every error ends up in the returned outcome.
    async fn attempt(&self, task: DownloadTask, format: AudioFormat) -> DownloadOutcome {
        let fetcher = &self.collaborators.fetcher;
        let source = task.source_reference.as_str();

        let payload =
            match download_with_retry(&self.config.retry, || fetcher.fetch_payload(source, format))
                .await
            {
                Ok(payload) => payload,
                Err(e) => return DownloadOutcome::failure(task, e.to_string()),
            };

        let file_name = safe_file_name(&task.display_name, format);
        match self.collaborators.sink.save_as_file(&payload, &file_name).await {
            Ok(path) => DownloadOutcome::success(task, payload.len() as u64, path),
            Err(e) => DownloadOutcome::failure(task, e.to_string()),
        }
    }

    /// Broadcast and log a task's outcome
    fn report_outcome(&self, batch_id: BatchId, index: usize, outcome: &DownloadOutcome) {
        let task_id = outcome.task.id.clone();

        if outcome.succeeded {
            let byte_size = outcome.byte_size.unwrap_or_default();
            let path = outcome.file_path.clone().unwrap_or_default();
            tracing::debug!(
                batch_id = %batch_id,
                index,
                task_id = %task_id,
                byte_size,
                path = %path.display(),
                "Task succeeded"
            );
            self.emit_event(Event::TaskSucceeded {
                batch_id,
                index,
                task_id,
                byte_size,
                path,
            });
        } else {
            let error = outcome.error_detail.clone().unwrap_or_default();
            tracing::warn!(
                batch_id = %batch_id,
                index,
                task_id = %task_id,
                label = %outcome.task.display_name,
                error = %error,
                "Task failed"
            );
            self.emit_event(Event::TaskFailed {
                batch_id,
                index,
                task_id,
                error,
            });
        }
    }
}

/// Duplicate ids are accepted; outcomes stay keyed by position
fn warn_on_duplicate_ids(batch_id: BatchId, tasks: &[DownloadTask]) {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen.insert(&task.id) {
            tracing::warn!(batch_id = %batch_id, task_id = %task.id, "Duplicate task id in batch");
        }
    }
}
