//! Deletion pipeline orchestrator.
//!
//! Creates and connects all pipeline participants around one bounded MPMC
//! work channel:
//!
//! ```text
//! ObjectLister → work channel → ObjectDeleter ×N
//!                                   ├→ stats channel (progress)
//!                                   └→ failure channel (unconfirmed identifiers)
//! ```
//!
//! Every participant runs in its own task behind a second, supervising task
//! so that a panic is caught and recorded instead of tearing down the run.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_channel::{Receiver, Sender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::deleter::ObjectDeleter;
use crate::lister::ObjectLister;
use crate::safety::SafetyChecker;
use crate::stage::Stage;
use crate::storage::{self, Storage};
use crate::types::error::{S3nukeError, is_cancelled_error};
use crate::types::token::PipelineCancellationToken;
use crate::types::{DeletionStatistics, DeletionStats, FailedBatch, ObjectIdentifier};

/// Lifecycle of a [`DeletionPipeline`].
///
/// `Idle → Running → Draining → Done`, or `Failed` once any error has been
/// recorded. `Done` and `Failed` are terminal.
///
/// `Running` and `Draining` only exist while [`DeletionPipeline::run`] holds
/// the pipeline, so callers observe `Idle` before it and a terminal state
/// after it. They are reported in debug logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    /// Enumeration has ended; workers are emptying the work channel.
    /// Internal only.
    Draining,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

type ErrorList = Arc<Mutex<VecDeque<anyhow::Error>>>;

/// The core deletion pipeline orchestrator.
///
/// ## Usage
///
/// ```no_run
/// # async fn example() {
/// use s3nuke_rs::{Config, DeletionPipeline, create_pipeline_cancellation_token};
///
/// let config = Config::for_target("my-bucket");
/// let cancellation_token = create_pipeline_cancellation_token();
/// let mut pipeline = DeletionPipeline::new(config, cancellation_token).await;
/// pipeline.run().await;
///
/// if pipeline.has_error() {
///     eprintln!("{:?}", pipeline.get_errors_and_consume().unwrap()[0]);
/// }
/// println!("{:?}", pipeline.get_deletion_stats());
/// # }
/// ```
pub struct DeletionPipeline {
    config: Config,
    target: Storage,
    cancellation_token: PipelineCancellationToken,
    stats_sender: Sender<DeletionStatistics>,
    stats_receiver: Receiver<DeletionStatistics>,
    has_error: Arc<AtomicBool>,
    has_panic: Arc<AtomicBool>,
    has_warning: Arc<AtomicBool>,
    errors: ErrorList,
    ready: bool,
    prerequisites_checked: bool,
    state: PipelineState,
    deletion_stats: DeletionStats,
    failed_objects: Vec<ObjectIdentifier>,
}

impl DeletionPipeline {
    /// Create a pipeline against the S3 bucket named in `config`.
    pub async fn new(config: Config, cancellation_token: PipelineCancellationToken) -> Self {
        let target = storage::create_storage(&config).await;
        Self::with_storage(config, target, cancellation_token)
    }

    /// Create a pipeline against any storage backend.
    pub fn with_storage(
        config: Config,
        target: Storage,
        cancellation_token: PipelineCancellationToken,
    ) -> Self {
        let (stats_sender, stats_receiver) = async_channel::unbounded();

        Self {
            config,
            target,
            cancellation_token,
            stats_sender,
            stats_receiver,
            has_error: Arc::new(AtomicBool::new(false)),
            has_panic: Arc::new(AtomicBool::new(false)),
            has_warning: Arc::new(AtomicBool::new(false)),
            errors: Arc::new(Mutex::new(VecDeque::new())),
            ready: true,
            prerequisites_checked: false,
            state: PipelineState::Idle,
            deletion_stats: DeletionStats::default(),
            failed_objects: Vec::new(),
        }
    }

    /// Run the deletion pipeline to completion.
    ///
    /// Errors are not returned; inspect [`has_error`](Self::has_error) and
    /// [`get_errors_and_consume`](Self::get_errors_and_consume) afterwards.
    /// The stats channel is closed when this returns.
    pub async fn run(&mut self) {
        assert!(self.ready, "DeletionPipeline::run() called more than once");
        self.ready = false;

        if let Err(e) = self.validate_config() {
            error!(error = format!("{e:#}"), "invalid configuration.");
            self.record_error(e);
            self.shutdown();
            self.state = PipelineState::Failed;
            return;
        }

        if !self.prerequisites_checked {
            if let Err(e) = self.check_prerequisites() {
                if is_cancelled_error(&e) {
                    info!("deletion cancelled at the confirmation prompt.");
                } else {
                    error!(error = format!("{e:#}"), "prerequisite check failed.");
                }
                self.record_error(e);
                self.shutdown();
                self.state = PipelineState::Failed;
                return;
            }
        }

        self.state = PipelineState::Running;
        debug!(
            bucket = self.target.bucket(),
            worker_size = self.config.worker_size,
            dry_run = self.config.dry_run,
            "deletion pipeline has started."
        );

        self.execute_pipeline().await;

        self.shutdown();

        self.state = if self.has_error() {
            PipelineState::Failed
        } else {
            PipelineState::Done
        };
        debug!(
            state = format!("{:?}", self.state),
            listed = self.deletion_stats.listed_objects,
            deleted = self.deletion_stats.deleted_objects,
            failed = self.deletion_stats.failed_objects,
            "deletion pipeline has been completed."
        );
    }

    /// Run the safety checks (confirmation prompt) ahead of [`run`](Self::run).
    ///
    /// Callers that want to prompt before setting up progress display call
    /// this first; `run` then skips the check.
    pub fn check_prerequisites(&mut self) -> Result<()> {
        SafetyChecker::new(&self.config).check_before_deletion()?;

        self.prerequisites_checked = true;
        Ok(())
    }

    /// `Config` fields are public, so library callers bypass the CLI checks.
    fn validate_config(&self) -> Result<()> {
        let message = if self.config.worker_size == 0 {
            "worker_size must be at least 1."
        } else if self.config.object_listing_queue_size == 0 {
            "object_listing_queue_size must be at least 1."
        } else if !(1..=1000).contains(&self.config.max_keys) {
            "max_keys must be between 1 and 1000."
        } else {
            return Ok(());
        };

        Err(anyhow!(S3nukeError::InvalidConfig(message.to_string())))
    }

    pub fn has_error(&self) -> bool {
        self.has_error.load(Ordering::SeqCst)
    }

    pub fn has_panic(&self) -> bool {
        self.has_panic.load(Ordering::SeqCst)
    }

    /// `true` when some identifiers were not confirmed as deleted.
    pub fn has_warning(&self) -> bool {
        self.has_warning.load(Ordering::SeqCst)
    }

    /// Consume and return all accumulated errors in the order they occurred.
    /// The first element is the run-level error.
    ///
    /// Returns `None` if no errors occurred.
    pub fn get_errors_and_consume(&self) -> Option<Vec<anyhow::Error>> {
        if !self.has_error() {
            return None;
        }
        let mut error_list = self.errors.lock().unwrap();
        Some(error_list.drain(..).collect())
    }

    /// Get error messages without consuming them.
    ///
    /// Returns `None` if no errors occurred.
    pub fn get_error_messages(&self) -> Option<Vec<String>> {
        if !self.has_error() {
            return None;
        }
        let error_list = self.errors.lock().unwrap();
        Some(error_list.iter().map(|e| e.to_string()).collect())
    }

    /// Progress events. The channel is closed once `run` returns, so a
    /// reader loop terminates on its own.
    pub fn get_stats_receiver(&self) -> Receiver<DeletionStatistics> {
        self.stats_receiver.clone()
    }

    /// Final counts. Zero until `run` has returned.
    pub fn get_deletion_stats(&self) -> DeletionStats {
        self.deletion_stats
    }

    /// Every identifier that was submitted but not confirmed as deleted.
    pub fn get_failed_objects(&self) -> &[ObjectIdentifier] {
        &self.failed_objects
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn close_stats_sender(&self) {
        self.stats_sender.close();
    }

    async fn execute_pipeline(&mut self) {
        let (sender, receiver) =
            async_channel::bounded::<ObjectIdentifier>(self.config.object_listing_queue_size as usize);
        let (failure_sender, failure_receiver) = async_channel::unbounded::<FailedBatch>();

        let lister = ObjectLister::new(self.create_stage(None, Some(sender)));
        let listing_progress = lister.progress();
        let lister_handle = self.list_target(lister);
        let worker_handles = self.delete_objects(receiver, failure_sender);
        let collector_handle = collect_failures(failure_receiver);

        let _ = lister_handle.await;
        if self.state == PipelineState::Running {
            self.state = PipelineState::Draining;
            debug!("object listing has ended, draining the work channel.");
        }

        let mut deleted_objects = 0;
        let mut failed_objects = 0;
        for handle in worker_handles {
            if let Ok((deleted, failed)) = handle.await {
                deleted_objects += deleted;
                failed_objects += failed;
            }
        }

        // Every failure sender was owned by a worker and is gone by now.
        match collector_handle.await {
            Ok(failed) => self.failed_objects = failed,
            Err(e) => {
                self.has_panic.store(true, Ordering::SeqCst);
                error!("failure collector task panicked: {}", e);
                self.record_error(anyhow!("failure collector task panicked: {}", e));
            }
        }

        // Counts what was sent even when the lister failed or panicked.
        let summary = listing_progress.snapshot();
        self.deletion_stats = DeletionStats {
            listed_objects: summary.total(),
            listed_delete_markers: summary.delete_markers,
            deleted_objects,
            failed_objects,
        };

        if self.config.warn_as_error && self.has_warning() {
            warn!(
                failed = failed_objects,
                "warnings promoted to errors (--warn-as-error)."
            );
            self.record_error(anyhow!(S3nukeError::PartialFailure {
                deleted: deleted_objects,
                failed: failed_objects,
            }));
        }
    }

    fn record_error(&self, error: anyhow::Error) {
        self.has_error.store(true, Ordering::SeqCst);
        self.errors.lock().unwrap().push_back(error);
    }

    fn shutdown(&self) {
        self.close_stats_sender();
    }

    fn create_stage(
        &self,
        receiver: Option<Receiver<ObjectIdentifier>>,
        sender: Option<Sender<ObjectIdentifier>>,
    ) -> Stage {
        Stage::new(
            self.config.clone(),
            dyn_clone::clone_box(&*self.target),
            receiver,
            sender,
            self.cancellation_token.clone(),
            self.has_warning.clone(),
        )
        .with_stats_sender(self.stats_sender.clone())
    }

    /// Spawn the single producer. Listed counts are read from the lister's
    /// progress handle, not from this task.
    fn list_target(&self, lister: ObjectLister) -> JoinHandle<()> {
        let max_keys = self.config.max_keys;
        let has_error = self.has_error.clone();
        let has_panic = self.has_panic.clone();
        let error_list = self.errors.clone();
        let cancellation_token = self.cancellation_token.clone();

        tokio::spawn(async move {
            let join_result = tokio::spawn(async move { lister.list_target(max_keys).await }).await;

            match join_result {
                Ok(Ok(_)) => {
                    debug!("object lister completed successfully.");
                }
                Ok(Err(e)) => {
                    cancellation_token.cancel();
                    has_error.store(true, Ordering::SeqCst);
                    error!("object lister failed: {:#}", e);
                    error_list.lock().unwrap().push_back(e);
                }
                Err(e) => {
                    // The lister never got to close the channel.
                    cancellation_token.cancel();
                    has_error.store(true, Ordering::SeqCst);
                    has_panic.store(true, Ordering::SeqCst);
                    error!("object lister task panicked: {}", e);
                    error_list
                        .lock()
                        .unwrap()
                        .push_back(anyhow!("object lister task panicked: {}", e));
                }
            }
        })
    }

    /// Spawn `worker_size` workers on the shared receiver. Each handle yields
    /// that worker's `(deleted, failed)` counts.
    fn delete_objects(
        &self,
        receiver: Receiver<ObjectIdentifier>,
        failure_sender: Sender<FailedBatch>,
    ) -> Vec<JoinHandle<(u64, u64)>> {
        let mut handles = Vec::with_capacity(self.config.worker_size as usize);

        for worker_index in 0..self.config.worker_size {
            let stage = self
                .create_stage(Some(receiver.clone()), None)
                .with_failure_sender(failure_sender.clone());
            let mut object_deleter = ObjectDeleter::new(stage, worker_index);

            let has_error = self.has_error.clone();
            let has_panic = self.has_panic.clone();
            let error_list = self.errors.clone();
            let cancellation_token = self.cancellation_token.clone();

            handles.push(tokio::spawn(async move {
                let join_result = tokio::spawn(async move {
                    let result = object_deleter.delete().await;
                    (
                        object_deleter.deleted_count(),
                        object_deleter.failed_count(),
                        result,
                    )
                })
                .await;

                match join_result {
                    Ok((deleted, failed, Ok(()))) => {
                        debug!(worker_index, "delete worker completed successfully.");
                        (deleted, failed)
                    }
                    Ok((deleted, failed, Err(e))) => {
                        cancellation_token.cancel();
                        has_error.store(true, Ordering::SeqCst);
                        error!(worker_index, "delete worker failed: {:#}", e);
                        error_list.lock().unwrap().push_back(e);
                        (deleted, failed)
                    }
                    Err(e) => {
                        // Counts of a panicked worker are lost with it.
                        cancellation_token.cancel();
                        has_error.store(true, Ordering::SeqCst);
                        has_panic.store(true, Ordering::SeqCst);
                        error!(worker_index, "delete worker task panicked: {}", e);
                        error_list
                            .lock()
                            .unwrap()
                            .push_back(anyhow!("delete worker panicked: {}", e));
                        (0, 0)
                    }
                }
            }));
        }

        handles
    }
}

/// Drain the failure channel until every worker has dropped its sender.
fn collect_failures(failure_receiver: Receiver<FailedBatch>) -> JoinHandle<Vec<ObjectIdentifier>> {
    tokio::spawn(async move {
        let mut failed = Vec::new();
        while let Ok(batch) = failure_receiver.recv().await {
            failed.extend(batch);
        }
        failed
    })
}
