use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, anyhow};
use async_channel::{Receiver, Sender};

use crate::config::Config;
use crate::storage::Storage;
use crate::types::token::PipelineCancellationToken;
use crate::types::{DeletionStatistics, FailedBatch, ObjectIdentifier};

/// Result of sending an identifier to the next stage.
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    Success,
    Closed,
}

/// Shared context passed to each pipeline participant.
///
/// - The ObjectLister owns the `sender` side of the work channel and no `receiver`
/// - Every ObjectDeleter holds a clone of the `receiver` and no `sender`
/// - `stats_sender` and `failure_sender` are optional sinks; when absent the
///   events are dropped
///
/// Each participant takes ownership of its `Stage`.
pub struct Stage {
    pub config: Config,
    pub target: Storage,
    pub receiver: Option<Receiver<ObjectIdentifier>>,
    pub sender: Option<Sender<ObjectIdentifier>>,
    pub stats_sender: Option<Sender<DeletionStatistics>>,
    pub failure_sender: Option<Sender<FailedBatch>>,
    pub cancellation_token: PipelineCancellationToken,
    pub has_warning: Arc<AtomicBool>,
}

impl Stage {
    pub fn new(
        config: Config,
        target: Storage,
        receiver: Option<Receiver<ObjectIdentifier>>,
        sender: Option<Sender<ObjectIdentifier>>,
        cancellation_token: PipelineCancellationToken,
        has_warning: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            target,
            receiver,
            sender,
            stats_sender: None,
            failure_sender: None,
            cancellation_token,
            has_warning,
        }
    }

    pub fn with_stats_sender(mut self, stats_sender: Sender<DeletionStatistics>) -> Self {
        self.stats_sender = Some(stats_sender);
        self
    }

    pub fn with_failure_sender(mut self, failure_sender: Sender<FailedBatch>) -> Self {
        self.failure_sender = Some(failure_sender);
        self
    }

    /// Send an identifier to the next stage via the sender channel.
    ///
    /// Returns `SendResult::Closed` if the downstream channel has been closed
    /// (every receiver dropped), allowing the caller to exit gracefully.
    pub async fn send(&self, object: ObjectIdentifier) -> Result<SendResult> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| anyhow!("stage has no sender."))?;

        let result = sender
            .send(object)
            .await
            .context("async_channel::Sender::send() failed.");

        if let Err(e) = result {
            return if !sender.is_closed() {
                Err(e)
            } else {
                Ok(SendResult::Closed)
            };
        }

        Ok(SendResult::Success)
    }

    /// Close the work channel. Receivers drain what is queued, then observe
    /// the closure.
    pub fn close_sender(&self) {
        if let Some(sender) = self.sender.as_ref() {
            sender.close();
        }
    }

    /// Send a statistics event. Dropped when no stats sink is attached.
    pub async fn send_stats(&self, stats: DeletionStatistics) {
        if let Some(stats_sender) = self.stats_sender.as_ref() {
            let _ = stats_sender.send(stats).await;
        }
    }

    /// Report one batch of unconfirmed identifiers. Dropped when no failure
    /// sink is attached.
    pub async fn send_failures(&self, failed: FailedBatch) {
        if let Some(failure_sender) = self.failure_sender.as_ref() {
            let _ = failure_sender.send(failed).await;
        }
    }

    /// Set the warning flag to indicate a non-fatal issue occurred.
    pub fn set_warning(&self) {
        self.has_warning.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockStorage;
    use crate::types::token::create_pipeline_cancellation_token;

    fn make_stage(
        receiver: Option<Receiver<ObjectIdentifier>>,
        sender: Option<Sender<ObjectIdentifier>>,
    ) -> Stage {
        Stage::new(
            Config::for_target("test-bucket"),
            Box::new(MockStorage::new(vec![])),
            receiver,
            sender,
            create_pipeline_cancellation_token(),
            Arc::new(AtomicBool::new(false)),
        )
    }

    #[tokio::test]
    async fn send_reports_closed_channel() {
        let (sender, receiver) = async_channel::bounded(1);
        let stage = make_stage(None, Some(sender));

        assert_eq!(
            stage.send(ObjectIdentifier::new("a", None)).await.unwrap(),
            SendResult::Success
        );
        drop(receiver);
        assert_eq!(
            stage.send(ObjectIdentifier::new("b", None)).await.unwrap(),
            SendResult::Closed
        );
    }

    #[tokio::test]
    async fn send_without_sender_is_an_error() {
        let stage = make_stage(None, None);
        assert!(stage.send(ObjectIdentifier::new("a", None)).await.is_err());
    }

    #[tokio::test]
    async fn close_sender_lets_receivers_drain() {
        let (sender, receiver) = async_channel::bounded(4);
        let stage = make_stage(None, Some(sender));

        stage.send(ObjectIdentifier::new("a", None)).await.unwrap();
        stage.close_sender();

        assert_eq!(receiver.recv().await.unwrap().key(), "a");
        assert!(receiver.recv().await.is_err());
    }

    #[tokio::test]
    async fn optional_sinks() {
        let (stats_sender, stats_receiver) = async_channel::unbounded();
        let (failure_sender, failure_receiver) = async_channel::unbounded();

        let bare = make_stage(None, None);
        bare.send_stats(DeletionStatistics::DeleteComplete(1)).await;
        bare.send_failures(vec![ObjectIdentifier::new("x", None)])
            .await;

        let stage = make_stage(None, None)
            .with_stats_sender(stats_sender)
            .with_failure_sender(failure_sender);
        stage.send_stats(DeletionStatistics::DeleteFailed(1)).await;
        stage
            .send_failures(vec![ObjectIdentifier::new("y", None)])
            .await;

        assert_eq!(
            stats_receiver.try_recv().unwrap(),
            DeletionStatistics::DeleteFailed(1)
        );
        assert_eq!(failure_receiver.try_recv().unwrap()[0].key(), "y");
        assert!(failure_receiver.try_recv().is_err());
    }

    #[test]
    fn set_warning_flag() {
        let stage = make_stage(None, None);
        assert!(!stage.has_warning.load(Ordering::SeqCst));
        stage.set_warning();
        assert!(stage.has_warning.load(Ordering::SeqCst));
    }
}
