use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, info, warn};

use crate::stage::{SendResult, Stage};
use crate::types::error::S3nukeError;
use crate::types::{DeletionStatistics, EnumeratedEntry};

/// Counts of what the lister put on the work channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingSummary {
    pub objects: u64,
    pub delete_markers: u64,
}

impl ListingSummary {
    pub fn total(&self) -> u64 {
        self.objects + self.delete_markers
    }
}

/// Running counts of the entries the lister has sent so far.
///
/// Shared with the pipeline so the listed totals survive a listing error or
/// a panicking lister task.
#[derive(Debug, Default)]
pub struct ListingProgress {
    objects: AtomicU64,
    delete_markers: AtomicU64,
}

impl ListingProgress {
    fn record(&self, is_delete_marker: bool) {
        if is_delete_marker {
            self.delete_markers.fetch_add(1, Ordering::SeqCst);
        } else {
            self.objects.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn snapshot(&self) -> ListingSummary {
        ListingSummary {
            objects: self.objects.load(Ordering::SeqCst),
            delete_markers: self.delete_markers.load(Ordering::SeqCst),
        }
    }
}

/// Enumerates every object version and delete marker of the target bucket.
///
/// ## Pipeline role
///
/// The ObjectLister is the single producer of the deletion pipeline:
///
/// ```text
/// ObjectLister → work channel → ObjectDeleter ×N
/// ```
///
/// It has no `receiver` (it's the entry point), writes identifiers to
/// `stage.sender` in backend order, and is the only participant that closes
/// the work channel.
pub struct ObjectLister {
    stage: Stage,
    progress: Arc<ListingProgress>,
}

impl ObjectLister {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            progress: Arc::new(ListingProgress::default()),
        }
    }

    /// Handle to the running counts. Stays valid after the lister is dropped.
    pub fn progress(&self) -> Arc<ListingProgress> {
        self.progress.clone()
    }

    /// Page through the version listing of the target bucket and send every
    /// identifier through the pipeline.
    ///
    /// `max_keys` is the page size of each listing request, not a limit on
    /// the total. The work channel is closed on every exit path, so the
    /// workers always observe the end of input. On error, whatever was
    /// already sent remains readable through [`ObjectLister::progress`].
    pub async fn list_target(&self, max_keys: i32) -> Result<ListingSummary> {
        debug!(
            bucket = self.stage.target.bucket(),
            "list target object versions has started."
        );

        let result = self.paginate(max_keys).await;
        self.stage.close_sender();

        match &result {
            Ok(summary) => debug!(
                objects = summary.objects,
                delete_markers = summary.delete_markers,
                "list target object versions has been completed."
            ),
            Err(e) => error!(error = format!("{e:#}"), "list target object versions failed."),
        }

        result
    }

    async fn paginate(&self, max_keys: i32) -> Result<ListingSummary> {
        let mut key_marker: Option<String> = None;
        let mut version_id_marker: Option<String> = None;

        loop {
            if self.stage.cancellation_token.is_cancelled() {
                info!("version listing cancelled.");
                return Ok(self.progress.snapshot());
            }

            let page = self
                .stage
                .target
                .list_object_versions(key_marker.clone(), version_id_marker.clone(), max_keys)
                .await
                .context("failed to list object versions.")?;

            let is_last_page = page.is_last_page();
            let next_key_marker = page.next_key_marker;
            let next_version_id_marker = page.next_version_id_marker;

            if !self.send_page(page.entries).await? {
                return Ok(self.progress.snapshot());
            }

            if is_last_page {
                break;
            }

            if next_key_marker.is_none() || next_version_id_marker.is_none() {
                warn!(
                    next_key_marker = ?next_key_marker,
                    next_version_id_marker = ?next_version_id_marker,
                    "version listing returned only one continuation marker."
                );
            }

            let next_key_marker = next_key_marker.or_else(|| key_marker.clone());
            let next_version_id_marker =
                next_version_id_marker.or_else(|| version_id_marker.clone());

            if next_key_marker == key_marker && next_version_id_marker == version_id_marker {
                return Err(anyhow!(S3nukeError::ListingStalled {
                    key_marker,
                    version_id_marker,
                }));
            }

            key_marker = next_key_marker;
            version_id_marker = next_version_id_marker;
        }

        Ok(self.progress.snapshot())
    }

    /// Send one page of entries. Returns `false` when the lister must stop
    /// quietly (cancelled, or every receiver is gone).
    async fn send_page(&self, entries: Vec<EnumeratedEntry>) -> Result<bool> {
        let mut sent: u64 = 0;
        let mut keep_going = true;

        for entry in entries {
            let is_delete_marker = entry.is_delete_marker;

            let result = tokio::select! {
                biased;
                _ = self.stage.cancellation_token.cancelled() => {
                    info!("version listing cancelled.");
                    keep_going = false;
                    break;
                }
                result = self.stage.send(entry.identifier) => result,
            };

            match result {
                Ok(SendResult::Success) => {
                    sent += 1;
                    self.progress.record(is_delete_marker);
                }
                Ok(SendResult::Closed) => {
                    debug!("work channel closed by every receiver.");
                    keep_going = false;
                    break;
                }
                Err(e) => {
                    self.report_listed(sent).await;
                    return Err(e);
                }
            }
        }

        self.report_listed(sent).await;
        Ok(keep_going)
    }

    async fn report_listed(&self, count: u64) {
        if count > 0 {
            self.stage
                .send_stats(DeletionStatistics::ObjectsListed(count))
                .await;
        }
    }
}
