use std::fmt;
use std::fmt::{Debug, Display, Formatter};

use zeroize_derive::{Zeroize, ZeroizeOnDrop};

pub mod error;
pub mod token;

/// One deletable unit in a bucket: a key plus an optional version.
///
/// Equality and hashing use the `(key, version_id)` pair, so two identifiers
/// naming the same key but different versions are distinct units of work.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectIdentifier {
    key: String,
    version_id: Option<String>,
}

impl ObjectIdentifier {
    pub fn new(key: impl Into<String>, version_id: Option<String>) -> Self {
        Self {
            key: key.into(),
            version_id,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn version_id(&self) -> Option<&str> {
        self.version_id.as_deref()
    }
}

impl Display for ObjectIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.version_id {
            Some(version_id) => write!(f, "{} (version: {})", self.key, version_id),
            None => write!(f, "{}", self.key),
        }
    }
}

/// An identifier as returned by the version listing.
///
/// `is_delete_marker` is informational only: delete markers are removed
/// exactly like concrete versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumeratedEntry {
    pub identifier: ObjectIdentifier,
    pub is_delete_marker: bool,
}

impl EnumeratedEntry {
    pub fn version(key: impl Into<String>, version_id: Option<String>) -> Self {
        Self {
            identifier: ObjectIdentifier::new(key, version_id),
            is_delete_marker: false,
        }
    }

    pub fn delete_marker(key: impl Into<String>, version_id: Option<String>) -> Self {
        Self {
            identifier: ObjectIdentifier::new(key, version_id),
            is_delete_marker: true,
        }
    }
}

/// A batch of identifiers the backend did not confirm as deleted.
pub type FailedBatch = Vec<ObjectIdentifier>;

/// Progress events sent through the stats channel during pipeline execution.
///
/// All variants carry increments, never running totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionStatistics {
    ObjectsListed(u64),
    DeleteComplete(u64),
    DeleteFailed(u64),
}

/// Final counts of a pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionStats {
    /// Entries enumerated, delete markers included.
    pub listed_objects: u64,
    pub listed_delete_markers: u64,
    /// Entries the backend confirmed as deleted.
    pub deleted_objects: u64,
    /// Entries submitted for deletion but not confirmed.
    pub failed_objects: u64,
}

/// AWS credential types supported by s3nuke-rs.
#[derive(Debug, Clone)]
pub enum S3Credentials {
    Profile(String),
    Credentials { access_keys: AccessKeys },
    FromEnvironment,
}

/// AWS access key pair with secure zeroization.
///
/// The secret_access_key and session_token are cleared from memory
/// when this struct is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AccessKeys {
    pub access_key: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Debug for AccessKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut keys = f.debug_struct("AccessKeys");
        let session_token = self
            .session_token
            .as_ref()
            .map_or("None", |_| "** redacted **");
        keys.field("access_key", &self.access_key)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &session_token);
        keys.finish()
    }
}
