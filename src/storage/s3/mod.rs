pub mod client_builder;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::list_object_versions::ListObjectVersionsOutput;
use aws_sdk_s3::types::{Delete, ObjectIdentifier as S3ObjectIdentifier};
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use leaky_bucket::RateLimiter;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::storage::{Storage, StorageTrait, VersionListing};
use crate::types::{EnumeratedEntry, ObjectIdentifier};

/// Extracts the S3 error code and message from an AWS SDK error.
///
/// For service errors (S3 API responses), returns the S3 error code
/// (e.g. "AccessDenied", "InternalError") and the human-readable error
/// message from the response. For other error types (network, timeout,
/// construction failure), returns "N/A" as the code and the full error
/// description as the message.
fn extract_sdk_error_details<E: std::fmt::Display + ProvideErrorMetadata>(
    e: &SdkError<E>,
) -> (String, String) {
    if let Some(service_err) = e.as_service_error() {
        (
            service_err.code().unwrap_or("unknown").to_string(),
            service_err.message().unwrap_or("no message").to_string(),
        )
    } else {
        ("N/A".to_string(), e.to_string())
    }
}

/// Amazon S3 storage bound to one bucket.
#[derive(Clone)]
pub struct S3Storage {
    bucket: String,
    client: Arc<Client>,
    rate_limit_objects_per_sec: Option<Arc<RateLimiter>>,
}

impl S3Storage {
    /// Build the client from `client_config` (or the default credential
    /// chain when absent) and return the storage as a trait object.
    pub async fn boxed(
        bucket: String,
        client_config: Option<ClientConfig>,
        rate_limit_objects_per_sec: Option<Arc<RateLimiter>>,
    ) -> Storage {
        let client = client_config.unwrap_or_default().create_client().await;

        Box::new(S3Storage {
            bucket,
            client: Arc::new(client),
            rate_limit_objects_per_sec,
        })
    }

    /// Acquire `count` tokens from the objects-per-second limiter, if any.
    async fn exec_rate_limit_objects_per_sec_n(&self, count: usize) {
        if count == 0 {
            return;
        }
        if let Some(ref rate_limiter) = self.rate_limit_objects_per_sec {
            rate_limiter.acquire(count).await;
        }
    }
}

#[async_trait]
impl StorageTrait for S3Storage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_object_versions(
        &self,
        key_marker: Option<String>,
        version_id_marker: Option<String>,
        max_keys: i32,
    ) -> Result<VersionListing> {
        let output = self
            .client
            .list_object_versions()
            .bucket(&self.bucket)
            .set_key_marker(key_marker.clone())
            .set_version_id_marker(version_id_marker.clone())
            .max_keys(max_keys)
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = self.bucket,
                    key_marker = key_marker,
                    version_id_marker = version_id_marker,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 ListObjectVersions API call failed for s3://{}: {} ({}).",
                    self.bucket,
                    s3_error_code,
                    s3_error_message,
                );
                anyhow::anyhow!(e).context("aws_sdk_s3::client::list_object_versions() failed.")
            })?;

        Ok(version_listing_from_output(&output))
    }

    async fn delete_objects(&self, objects: &[ObjectIdentifier]) -> Result<Vec<ObjectIdentifier>> {
        self.exec_rate_limit_objects_per_sec_n(objects.len()).await;

        let object_count = objects.len();

        let identifiers = objects
            .iter()
            .map(|object| {
                S3ObjectIdentifier::builder()
                    .key(object.key())
                    .set_version_id(object.version_id().map(String::from))
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to build ObjectIdentifier")?;

        let delete = Delete::builder()
            .set_objects(Some(identifiers))
            .quiet(false)
            .build()
            .context("Failed to build Delete request")?;

        let output = self
            .client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = self.bucket,
                    object_count = object_count,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 DeleteObjects API call failed for {} objects in s3://{}: {} ({}).",
                    object_count,
                    self.bucket,
                    s3_error_code,
                    s3_error_message,
                );
                anyhow::anyhow!(e).context("aws_sdk_s3::client::delete_objects() failed.")
            })?;

        for error in output.errors() {
            tracing::warn!(
                bucket = self.bucket,
                key = error.key(),
                version_id = error.version_id(),
                s3_error_code = error.code(),
                s3_error_message = error.message(),
                "S3 refused to delete an object version.",
            );
        }

        Ok(output
            .deleted()
            .iter()
            .filter_map(|deleted| {
                deleted
                    .key()
                    .map(|key| ObjectIdentifier::new(key, deleted.version_id().map(String::from)))
            })
            .collect())
    }
}

/// Convert one ListObjectVersions response into a [`VersionListing`].
///
/// Versions come first, then delete markers. The SDK returns the two as
/// separate lists, so their interleaved key order within a page is not
/// recoverable; order across pages is kept. Entries without a key cannot be
/// addressed and are dropped. The next markers are only carried forward when
/// the response is truncated.
fn version_listing_from_output(output: &ListObjectVersionsOutput) -> VersionListing {
    let versions = output.versions().iter().filter_map(|version| {
        version
            .key()
            .map(|key| EnumeratedEntry::version(key, version.version_id().map(String::from)))
    });
    let delete_markers = output.delete_markers().iter().filter_map(|marker| {
        marker
            .key()
            .map(|key| EnumeratedEntry::delete_marker(key, marker.version_id().map(String::from)))
    });

    let entries = versions.chain(delete_markers).collect();

    if output.is_truncated() == Some(true) {
        VersionListing {
            entries,
            next_key_marker: output.next_key_marker().map(String::from),
            next_version_id_marker: output.next_version_id_marker().map(String::from),
        }
    } else {
        VersionListing {
            entries,
            next_key_marker: None,
            next_version_id_marker: None,
        }
    }
}
