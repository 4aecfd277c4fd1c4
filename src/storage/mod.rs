use anyhow::Result;
use async_trait::async_trait;
use dyn_clone::DynClone;
use leaky_bucket::RateLimiter;
use std::sync::Arc;

use crate::config::Config;
use crate::types::{EnumeratedEntry, ObjectIdentifier};

pub mod s3;

/// Type alias for a boxed Storage trait object.
pub type Storage = Box<dyn StorageTrait + Send + Sync>;

/// One page of a version listing.
///
/// Both markers `None` means the listing is complete. The markers are passed
/// back verbatim to request the next page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionListing {
    pub entries: Vec<EnumeratedEntry>,
    pub next_key_marker: Option<String>,
    pub next_version_id_marker: Option<String>,
}

impl VersionListing {
    pub fn is_last_page(&self) -> bool {
        self.next_key_marker.is_none() && self.next_version_id_marker.is_none()
    }
}

/// Storage backend operations needed by the deletion pipeline.
///
/// A `StorageTrait` is bound to exactly one bucket. Implementations must be
/// cheap to clone: every pipeline participant receives its own clone.
#[async_trait]
pub trait StorageTrait: DynClone {
    /// The bucket this storage operates on.
    fn bucket(&self) -> &str;

    /// List one page of object versions and delete markers, starting after
    /// the given markers (`None`, `None` for the first page).
    ///
    /// Listing failures are treated as unrecoverable errors.
    async fn list_object_versions(
        &self,
        key_marker: Option<String>,
        version_id_marker: Option<String>,
        max_keys: i32,
    ) -> Result<VersionListing>;

    /// Delete up to 1000 identifiers in one request.
    ///
    /// Returns the identifiers the backend confirmed as deleted. Identifiers
    /// the backend reported as errors are simply absent from the result; the
    /// caller reconciles against what it requested. An `Err` means the request
    /// itself failed and nothing can be assumed about the batch.
    async fn delete_objects(&self, objects: &[ObjectIdentifier]) -> Result<Vec<ObjectIdentifier>>;
}

dyn_clone::clone_trait_object!(StorageTrait);

// Default refill interval 100ms
const REFILL_PER_INTERVAL_DIVIDER: usize = 10;

/// Build the objects-per-second rate limiter, if configured.
pub fn create_rate_limiter(rate_limit_objects: Option<u32>) -> Option<Arc<RateLimiter>> {
    rate_limit_objects.map(|rate_limit_value| {
        let refill = if (rate_limit_value as usize) <= REFILL_PER_INTERVAL_DIVIDER {
            1
        } else {
            rate_limit_value as usize / REFILL_PER_INTERVAL_DIVIDER
        };
        Arc::new(
            RateLimiter::builder()
                .max(rate_limit_value as usize)
                .initial(rate_limit_value as usize)
                .refill(refill)
                .fair(true)
                .build(),
        )
    })
}

/// Create the S3 storage for the bucket named in `config`.
pub async fn create_storage(config: &Config) -> Storage {
    let rate_limit_objects_per_sec = create_rate_limiter(config.rate_limit_objects);

    s3::S3Storage::boxed(
        config.bucket.clone(),
        config.target_client_config.clone(),
        rate_limit_objects_per_sec,
    )
    .await
}
