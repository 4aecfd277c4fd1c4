use anyhow::Error;
use thiserror::Error;

/// Application-level error types for s3nuke-rs.
///
/// ## Exit Codes
///
/// Each variant maps to an exit code (via `exit_code()`):
/// - 0: Non-error conditions (Cancelled)
/// - 1: General errors (ListingStalled, and any error that is not an
///   `S3nukeError`, such as a failed AWS SDK call)
/// - 2: Configuration errors (InvalidConfig)
/// - 3: Partial failure (some objects were not confirmed as deleted)
#[derive(Error, Debug, PartialEq)]
pub enum S3nukeError {
    /// Configuration error.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation cancelled by user.
    #[error("Operation cancelled by user")]
    Cancelled,

    /// The backend accepted the deletions but did not confirm all of them.
    #[error("Partial failure: {deleted} deleted, {failed} not confirmed")]
    PartialFailure { deleted: u64, failed: u64 },

    /// The version listing returned the markers it was called with.
    #[error("Version listing made no progress at key marker {key_marker:?}, version id marker {version_id_marker:?}")]
    ListingStalled {
        key_marker: Option<String>,
        version_id_marker: Option<String>,
    },
}

impl S3nukeError {
    pub fn exit_code(&self) -> i32 {
        match self {
            S3nukeError::Cancelled => 0,
            S3nukeError::InvalidConfig(_) => 2,
            S3nukeError::PartialFailure { .. } => 3,
            S3nukeError::ListingStalled { .. } => 1,
        }
    }
}

/// Check if an anyhow::Error wraps a cancellation error.
pub fn is_cancelled_error(e: &Error) -> bool {
    if let Some(err) = e.downcast_ref::<S3nukeError>() {
        return *err == S3nukeError::Cancelled;
    }
    false
}

/// Extract the exit code from an anyhow::Error, defaulting to 1.
pub fn exit_code_from_error(e: &Error) -> i32 {
    if let Some(err) = e.downcast_ref::<S3nukeError>() {
        return err.exit_code();
    }
    1
}
