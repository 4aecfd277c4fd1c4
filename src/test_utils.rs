//! Shared test utilities for the s3nuke library crate.
//!
//! Provides an in-memory [`MockStorage`] that pages through a fixed set of
//! entries, records every call it receives, and can be told to withhold
//! confirmations or fail specific calls.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::config::Config;
use crate::storage::{StorageTrait, VersionListing};
use crate::types::{EnumeratedEntry, ObjectIdentifier};

/// Initialise a dummy tracing subscriber for tests.
///
/// Uses `try_init` so that only the first call in a process actually
/// installs the subscriber; subsequent calls are silently ignored.
pub(crate) fn init_dummy_tracing_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("dummy=trace")
        .try_init();
}

/// A [`Config`] for unit tests: `worker_size=4`, small queue, no prompt.
pub(crate) fn make_test_config() -> Config {
    Config {
        worker_size: 4,
        object_listing_queue_size: 1000,
        ..Config::for_target("test-bucket")
    }
}

/// `count` versioned entries `key-{i}` / `v{i}`.
pub(crate) fn make_entries(count: usize) -> Vec<EnumeratedEntry> {
    (0..count)
        .map(|i| EnumeratedEntry::version(format!("key-{i}"), Some(format!("v{i}"))))
        .collect()
}

/// In-memory storage for pipeline tests.
///
/// Listing pages through `entries` in order, `min(page_size, max_keys)` at a
/// time. The version-id marker carries the offset of the next page. When
/// `scripted_pages` is set, pages are popped from it instead and the markers
/// passed in are only recorded.
#[derive(Clone)]
pub(crate) struct MockStorage {
    entries: Arc<Vec<EnumeratedEntry>>,
    page_size: usize,
    scripted_pages: Option<Arc<Mutex<VecDeque<Result<VersionListing, String>>>>>,
    unconfirmed: Arc<HashSet<ObjectIdentifier>>,
    extra_confirmations: Arc<Vec<ObjectIdentifier>>,
    fail_list_on_call: Option<usize>,
    fail_delete_on_call: Option<usize>,
    delete_delay: Option<Duration>,
    pub list_calls: Arc<Mutex<Vec<(Option<String>, Option<String>)>>>,
    pub delete_calls: Arc<Mutex<Vec<Vec<ObjectIdentifier>>>>,
}

impl MockStorage {
    pub fn new(entries: Vec<EnumeratedEntry>) -> Self {
        Self {
            entries: Arc::new(entries),
            page_size: 1000,
            scripted_pages: None,
            unconfirmed: Arc::new(HashSet::new()),
            extra_confirmations: Arc::new(Vec::new()),
            fail_list_on_call: None,
            fail_delete_on_call: None,
            delete_delay: None,
            list_calls: Arc::new(Mutex::new(Vec::new())),
            delete_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Return exactly these pages (or errors) in order, ignoring markers.
    pub fn with_scripted_pages(pages: Vec<Result<VersionListing, String>>) -> Self {
        Self {
            scripted_pages: Some(Arc::new(Mutex::new(pages.into()))),
            ..Self::new(vec![])
        }
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// These identifiers are accepted by `delete_objects` but never confirmed.
    pub fn unconfirmed(mut self, identifiers: impl IntoIterator<Item = ObjectIdentifier>) -> Self {
        self.unconfirmed = Arc::new(identifiers.into_iter().collect());
        self
    }

    /// Confirmed on every delete call even though nobody asked for them.
    pub fn extra_confirmations(mut self, identifiers: Vec<ObjectIdentifier>) -> Self {
        self.extra_confirmations = Arc::new(identifiers);
        self
    }

    /// The n-th (1-based) listing call fails.
    pub fn fail_list_on_call(mut self, call: usize) -> Self {
        self.fail_list_on_call = Some(call);
        self
    }

    /// The n-th (1-based) delete call fails.
    pub fn fail_delete_on_call(mut self, call: usize) -> Self {
        self.fail_delete_on_call = Some(call);
        self
    }

    pub fn delete_delay(mut self, delay: Duration) -> Self {
        self.delete_delay = Some(delay);
        self
    }

    pub fn list_call_count(&self) -> usize {
        self.list_calls.lock().unwrap().len()
    }

    pub fn delete_call_count(&self) -> usize {
        self.delete_calls.lock().unwrap().len()
    }

    /// Sizes of every batch submitted, in call order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.delete_calls
            .lock()
            .unwrap()
            .iter()
            .map(|batch| batch.len())
            .collect()
    }

    /// Every identifier submitted for deletion, across all calls.
    pub fn submitted(&self) -> Vec<ObjectIdentifier> {
        self.delete_calls
            .lock()
            .unwrap()
            .iter()
            .flatten()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl StorageTrait for MockStorage {
    fn bucket(&self) -> &str {
        "test-bucket"
    }

    async fn list_object_versions(
        &self,
        key_marker: Option<String>,
        version_id_marker: Option<String>,
        max_keys: i32,
    ) -> Result<VersionListing> {
        let call = {
            let mut list_calls = self.list_calls.lock().unwrap();
            list_calls.push((key_marker, version_id_marker.clone()));
            list_calls.len()
        };

        if self.fail_list_on_call == Some(call) {
            return Err(anyhow!("list_object_versions() failed on call {call}."));
        }

        if let Some(pages) = self.scripted_pages.as_ref() {
            return match pages.lock().unwrap().pop_front() {
                Some(Ok(page)) => Ok(page),
                Some(Err(message)) => Err(anyhow!(message)),
                None => Err(anyhow!("no scripted page left.")),
            };
        }

        let offset = version_id_marker
            .as_deref()
            .map(|marker| marker.parse::<usize>())
            .transpose()?
            .unwrap_or(0);
        let page_size = self.page_size.min(max_keys as usize).max(1);
        let end = (offset + page_size).min(self.entries.len());
        let entries = self.entries[offset.min(end)..end].to_vec();

        if end < self.entries.len() {
            Ok(VersionListing {
                next_key_marker: entries.last().map(|e| e.identifier.key().to_string()),
                next_version_id_marker: Some(end.to_string()),
                entries,
            })
        } else {
            Ok(VersionListing {
                entries,
                next_key_marker: None,
                next_version_id_marker: None,
            })
        }
    }

    async fn delete_objects(&self, objects: &[ObjectIdentifier]) -> Result<Vec<ObjectIdentifier>> {
        let call = {
            let mut delete_calls = self.delete_calls.lock().unwrap();
            delete_calls.push(objects.to_vec());
            delete_calls.len()
        };

        if let Some(delay) = self.delete_delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_delete_on_call == Some(call) {
            return Err(anyhow!("delete_objects() failed on call {call}."));
        }

        Ok(objects
            .iter()
            .filter(|object| !self.unconfirmed.contains(object))
            .cloned()
            .chain(self.extra_confirmations.iter().cloned())
            .collect())
    }
}
