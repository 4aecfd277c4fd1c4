pub mod args;

use crate::types::S3Credentials;

/// Main configuration for the s3nuke-rs deletion pipeline.
///
/// Holds everything needed to configure and run a
/// [`DeletionPipeline`](crate::DeletionPipeline): the bucket to empty, AWS
/// client settings, the worker pool size, listing parameters and the
/// safety flags (dry-run, force). It is passed by value; the pipeline keeps
/// no global state.
///
/// # Quick Start
///
/// Use [`Config::for_target`] for a minimal configuration with sensible defaults:
///
/// ```
/// use s3nuke_rs::Config;
///
/// let config = Config::for_target("my-bucket");
/// assert_eq!(config.worker_size, 16);
/// assert_eq!(config.max_keys, 1000);
/// ```
///
/// Then customize fields as needed:
///
/// ```
/// use s3nuke_rs::Config;
///
/// let mut config = Config::for_target("my-bucket");
/// config.dry_run = true;
/// config.worker_size = 100;
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub bucket: String,
    pub show_no_progress: bool,
    pub target_client_config: Option<ClientConfig>,
    pub tracing_config: Option<TracingConfig>,
    pub worker_size: u16,
    pub warn_as_error: bool,
    pub dry_run: bool,
    pub force: bool,
    pub rate_limit_objects: Option<u32>,
    pub object_listing_queue_size: u32,
    pub max_keys: i32,
    pub auto_complete_shell: Option<clap_complete::shells::Shell>,
}

impl Config {
    /// Create a `Config` with sensible defaults for the given bucket.
    ///
    /// All fields match the CLI defaults. The `force` flag is set to `true`
    /// so no interactive confirmation is attempted, which is what library
    /// callers want.
    ///
    /// # Examples
    ///
    /// ```
    /// use s3nuke_rs::Config;
    ///
    /// let config = Config::for_target("my-bucket");
    /// assert_eq!(config.bucket, "my-bucket");
    /// assert!(config.force); // no interactive prompts
    /// ```
    pub fn for_target(bucket: &str) -> Self {
        Config {
            bucket: bucket.to_string(),
            force: true,
            ..Config::default()
        }
    }
}

impl Default for Config {
    /// The `bucket` defaults to an empty string; set it before running a
    /// pipeline.
    fn default() -> Self {
        Config {
            bucket: String::new(),
            show_no_progress: false,
            target_client_config: None,
            tracing_config: None,
            worker_size: 16,
            warn_as_error: false,
            dry_run: false,
            force: false,
            rate_limit_objects: None,
            object_listing_queue_size: 200_000,
            max_keys: 1000,
            auto_complete_shell: None,
        }
    }
}

/// AWS S3 client configuration: credential source, region, endpoint, retry
/// and timeouts.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credential: S3Credentials,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub retry_config: RetryConfig,
    pub cli_timeout_config: CLITimeoutConfig,
    pub disable_stalled_stream_protection: bool,
}

impl Default for ClientConfig {
    /// Default credential chain, region from the environment, SDK defaults
    /// for everything else.
    fn default() -> Self {
        ClientConfig {
            credential: S3Credentials::FromEnvironment,
            region: None,
            endpoint_url: None,
            force_path_style: false,
            retry_config: RetryConfig::default(),
            cli_timeout_config: CLITimeoutConfig::default(),
            disable_stalled_stream_protection: false,
        }
    }
}

/// Retry configuration handed to the AWS SDK (standard retry mode with
/// exponential backoff). The pipeline itself never retries a failed batch.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub aws_max_attempts: u32,
    pub initial_backoff_milliseconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            aws_max_attempts: 10,
            initial_backoff_milliseconds: 100,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CLITimeoutConfig {
    pub operation_timeout_milliseconds: Option<u64>,
    pub operation_attempt_timeout_milliseconds: Option<u64>,
    pub connect_timeout_milliseconds: Option<u64>,
    pub read_timeout_milliseconds: Option<u64>,
}

/// Tracing (logging) configuration.
///
/// Supports verbosity levels, JSON format, color control, and AWS SDK tracing.
#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    pub tracing_level: log::Level,
    pub json_tracing: bool,
    pub aws_sdk_tracing: bool,
    pub span_events_tracing: bool,
    pub disable_color_tracing: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            tracing_level: log::Level::Warn,
            json_tracing: false,
            aws_sdk_tracing: false,
            span_events_tracing: false,
            disable_color_tracing: false,
        }
    }
}
