//! Shared E2E test infrastructure for s3nuke-rs.
//!
//! Provides `TestHelper` for bucket setup and inspection against real AWS S3.
//! All helpers use the `s3nuke-e2e-test` AWS profile.

#![allow(dead_code)]

use std::sync::Arc;

use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::types::{
    BucketLocationConstraint, BucketVersioningStatus, CreateBucketConfiguration,
    VersioningConfiguration,
};
use s3nuke_rs::config::args::build_config_from_args;
use s3nuke_rs::{
    Config, DeletionPipeline, DeletionStats, ObjectIdentifier, PipelineState,
    create_pipeline_cancellation_token,
};
use uuid::Uuid;

const AWS_PROFILE: &str = "s3nuke-e2e-test";

/// Used when the profile does not name a region.
const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug)]
pub struct PipelineResult {
    pub stats: DeletionStats,
    pub state: PipelineState,
    pub has_error: bool,
    pub has_panic: bool,
    pub has_warning: bool,
    pub errors: Vec<String>,
    pub failed_objects: Vec<ObjectIdentifier>,
}

/// Removes the bucket and everything in it when dropped, even if the test
/// panicked. Requires a multi-thread runtime.
pub struct BucketGuard {
    helper: Arc<TestHelper>,
    bucket: String,
}

impl Drop for BucketGuard {
    fn drop(&mut self) {
        let helper = self.helper.clone();
        let bucket = self.bucket.clone();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            tokio::task::block_in_place(|| {
                tokio::runtime::Handle::current().block_on(async move {
                    helper.delete_bucket_cascade(&bucket).await;
                });
            });
        }));
    }
}

pub struct TestHelper {
    client: Client,
    region: String,
}

impl TestHelper {
    pub async fn new() -> Arc<Self> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(AWS_PROFILE)
            .load()
            .await;

        let region = sdk_config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let client = Client::new(&sdk_config);

        Arc::new(Self { client, region })
    }

    pub fn bucket_guard(self: &Arc<Self>, bucket: &str) -> BucketGuard {
        BucketGuard {
            helper: Arc::clone(self),
            bucket: bucket.to_string(),
        }
    }

    /// `s3nuke-e2e-<uuid>`, unique across parallel runs.
    pub fn generate_bucket_name(&self) -> String {
        format!("s3nuke-e2e-{}", Uuid::new_v4())
    }

    pub async fn create_bucket(&self, bucket: &str) {
        let mut builder = self.client.create_bucket().bucket(bucket);

        // us-east-1 must not specify a location constraint
        if self.region != "us-east-1" {
            let constraint = BucketLocationConstraint::from(self.region.as_str());
            let config = CreateBucketConfiguration::builder()
                .location_constraint(constraint)
                .build();
            builder = builder.create_bucket_configuration(config);
        }

        builder
            .send()
            .await
            .unwrap_or_else(|e| panic!("Failed to create bucket {bucket}: {e}"));
    }

    pub async fn create_versioned_bucket(&self, bucket: &str) {
        self.create_bucket(bucket).await;

        let versioning_config = VersioningConfiguration::builder()
            .status(BucketVersioningStatus::Enabled)
            .build();

        self.client
            .put_bucket_versioning()
            .bucket(bucket)
            .versioning_configuration(versioning_config)
            .send()
            .await
            .unwrap_or_else(|e| panic!("Failed to enable versioning on {bucket}: {e}"));
    }

    /// Empty the bucket with the pipeline itself, then delete it.
    pub async fn delete_bucket_cascade(&self, bucket: &str) {
        let config = Self::build_config(vec![bucket, "--force", "-qq"]);
        let _ = Self::run_pipeline(config).await;

        let _ = self.client.delete_bucket().bucket(bucket).send().await;
    }

    pub async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body.into())
            .send()
            .await
            .unwrap_or_else(|e| panic!("Failed to put object {key} in {bucket}: {e}"));
    }

    /// Upload `(key, body)` pairs concurrently.
    pub async fn put_objects_parallel(&self, bucket: &str, objects: Vec<(String, Vec<u8>)>) {
        let mut set = tokio::task::JoinSet::new();

        for (key, body) in objects {
            let client = self.client.clone();
            let bucket = bucket.to_string();
            set.spawn(async move {
                client
                    .put_object()
                    .bucket(&bucket)
                    .key(&key)
                    .body(body.into())
                    .send()
                    .await
                    .unwrap_or_else(|e| panic!("Failed to put object {key} in {bucket}: {e}"));
            });
        }

        while let Some(result) = set.join_next().await {
            result.expect("Upload task panicked");
        }
    }

    /// Plain delete without a version id. On a versioned bucket this adds a
    /// delete marker.
    pub async fn delete_object(&self, bucket: &str, key: &str) {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .unwrap_or_else(|e| panic!("Failed to delete object {key} in {bucket}: {e}"));
    }

    /// Every version and delete marker left in the bucket, as
    /// `(key, version_id)` pairs. Delete markers carry a `[delete-marker]`
    /// key prefix.
    pub async fn list_object_versions(&self, bucket: &str) -> Vec<(String, String)> {
        let mut result: Vec<(String, String)> = Vec::new();
        let mut key_marker: Option<String> = None;
        let mut version_id_marker: Option<String> = None;

        loop {
            let resp = self
                .client
                .list_object_versions()
                .bucket(bucket)
                .set_key_marker(key_marker.clone())
                .set_version_id_marker(version_id_marker.clone())
                .send()
                .await
                .unwrap_or_else(|e| panic!("Failed to list object versions in {bucket}: {e}"));

            for v in resp.versions() {
                if let (Some(key), Some(vid)) = (v.key(), v.version_id()) {
                    result.push((key.to_string(), vid.to_string()));
                }
            }

            for m in resp.delete_markers() {
                if let (Some(key), Some(vid)) = (m.key(), m.version_id()) {
                    result.push((format!("[delete-marker]{key}"), vid.to_string()));
                }
            }

            if resp.is_truncated() == Some(true) {
                key_marker = resp.next_key_marker().map(|s| s.to_string());
                version_id_marker = resp.next_version_id_marker().map(|s| s.to_string());
            } else {
                break;
            }
        }

        result
    }

    pub async fn count_versions(&self, bucket: &str) -> usize {
        self.list_object_versions(bucket).await.len()
    }

    /// Build a `Config` from CLI-style arguments.
    ///
    /// Prepends the binary name and appends `--target-profile` unless the
    /// args already carry credentials.
    pub fn build_config(args: Vec<&str>) -> Config {
        let mut full_args: Vec<String> = vec!["s3nuke".to_string()];
        full_args.extend(args.iter().map(|s| s.to_string()));

        let has_profile = full_args.iter().any(|a| a.starts_with("--target-profile"));
        let has_access_key = full_args
            .iter()
            .any(|a| a.starts_with("--target-access-key"));
        if !has_profile && !has_access_key {
            full_args.push("--target-profile".to_string());
            full_args.push(AWS_PROFILE.to_string());
        }

        build_config_from_args(full_args)
            .unwrap_or_else(|e| panic!("Failed to build config from args: {e}"))
    }

    /// Run the pipeline with no progress reader attached and collect results.
    pub async fn run_pipeline(config: Config) -> PipelineResult {
        let token = create_pipeline_cancellation_token();
        let mut pipeline = DeletionPipeline::new(config, token).await;

        // No progress reporter in tests.
        pipeline.close_stats_sender();

        pipeline.run().await;

        let errors = pipeline
            .get_errors_and_consume()
            .unwrap_or_default()
            .into_iter()
            .map(|e| format!("{e:?}"))
            .collect();

        PipelineResult {
            stats: pipeline.get_deletion_stats(),
            state: pipeline.state(),
            has_error: pipeline.has_error(),
            has_panic: pipeline.has_panic(),
            has_warning: pipeline.has_warning(),
            errors,
            failed_objects: pipeline.get_failed_objects().to_vec(),
        }
    }
}

/// Each E2E test creates a bucket, uploads, runs the pipeline and cleans up.
pub const E2E_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(300);

#[macro_export]
macro_rules! e2e_timeout {
    ($body:expr) => {
        tokio::time::timeout(common::E2E_TIMEOUT, $body)
            .await
            .expect("E2E test timed out")
    };
}
