//! Deletion worker for the s3nuke-rs pipeline.
//!
//! Every ObjectDeleter reads identifiers from the shared work channel into
//! its own [`DeleteBatch`], flushes full batches to the backend, and
//! reconciles what it requested against what the backend confirmed.

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, warn};

use crate::stage::Stage;
use crate::types::DeletionStatistics;

pub mod batch;

pub use batch::{DeleteBatch, MAX_BATCH_SIZE};


/// Pipeline worker that batches identifiers and deletes them.
///
/// Counts are local to the worker; the pipeline sums them after every
/// worker has terminated.
pub struct ObjectDeleter {
    worker_index: u16,
    base: Stage,
    batch: DeleteBatch,
    deleted_count: u64,
    failed_count: u64,
}

impl ObjectDeleter {
    pub fn new(base: Stage, worker_index: u16) -> Self {
        Self {
            worker_index,
            base,
            batch: DeleteBatch::new(),
            deleted_count: 0,
            failed_count: 0,
        }
    }

    /// Identifiers the backend confirmed as deleted by this worker.
    pub fn deleted_count(&self) -> u64 {
        self.deleted_count
    }

    /// Identifiers this worker submitted that were not confirmed.
    pub fn failed_count(&self) -> u64 {
        self.failed_count
    }

    /// Main entry point: read identifiers until the channel is closed and
    /// drained, or until cancellation.
    ///
    /// A failed delete request cancels the whole pipeline and is returned;
    /// it is never retried.
    pub async fn delete(&mut self) -> Result<()> {
        debug!(worker_index = self.worker_index, "delete worker started.");

        let result = self.receive_and_delete().await;
        if result.is_err() {
            self.base.cancellation_token.cancel();
        }

        result
    }

    async fn receive_and_delete(&mut self) -> Result<()> {
        let receiver = self
            .base
            .receiver
            .clone()
            .ok_or_else(|| anyhow!("delete worker has no receiver."))?;
        let cancellation_token = self.base.cancellation_token.clone();

        loop {
            tokio::select! {
                biased;
                _ = cancellation_token.cancelled() => {
                    info!(
                        worker_index = self.worker_index,
                        pending = self.batch.len(),
                        "delete worker has been cancelled."
                    );
                    // Identifiers already consumed must still be accounted for.
                    return self.flush().await;
                }
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(identifier) => {
                            self.batch.push(identifier);
                            if self.batch.is_full() {
                                self.flush().await?;
                            }
                        }
                        Err(_) => {
                            // Closed and drained.
                            self.flush().await?;
                            debug!(
                                worker_index = self.worker_index,
                                deleted = self.deleted_count,
                                failed = self.failed_count,
                                "delete worker has been completed."
                            );
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Send the current batch to the backend and reconcile the response.
    /// An empty batch is never sent.
    async fn flush(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }

        let requested = self.batch.len();

        let confirmed = if self.base.config.dry_run {
            for identifier in self.batch.as_slice() {
                info!(
                    worker_index = self.worker_index,
                    key = identifier.key(),
                    version_id = identifier.version_id(),
                    "[dry-run] delete object."
                );
            }
            self.batch.as_slice().to_vec()
        } else {
            debug!(
                worker_index = self.worker_index,
                batch_size = requested,
                "sending DeleteObjects batch request."
            );
            self.base
                .target
                .delete_objects(self.batch.as_slice())
                .await
                .with_context(|| format!("failed to delete a batch of {requested} objects."))?
        };

        let missing = self.batch.find_missing_from(&confirmed);
        let deleted = (requested - missing.len()) as u64;

        if confirmed.len() as u64 > deleted {
            debug!(
                worker_index = self.worker_index,
                confirmed = confirmed.len(),
                deleted = deleted,
                "ignored confirmations for objects that were not requested."
            );
        }

        self.deleted_count += deleted;
        info!(
            worker_index = self.worker_index,
            requested = requested,
            deleted = deleted,
            "batch deleted."
        );
        if deleted > 0 {
            self.base
                .send_stats(DeletionStatistics::DeleteComplete(deleted))
                .await;
        }

        if !missing.is_empty() {
            let failed = missing.len() as u64;
            self.failed_count += failed;

            for identifier in &missing {
                warn!(
                    worker_index = self.worker_index,
                    key = identifier.key(),
                    version_id = identifier.version_id(),
                    "object was not confirmed as deleted."
                );
            }
            warn!(
                worker_index = self.worker_index,
                requested = requested,
                failed = failed,
                "{failed} of {requested} objects were not confirmed as deleted."
            );

            self.base.set_warning();
            self.base
                .send_stats(DeletionStatistics::DeleteFailed(failed))
                .await;
            self.base.send_failures(missing).await;
        }

        self.batch.reset();
        Ok(())
    }
}
