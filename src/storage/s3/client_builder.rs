use std::time::Duration;

use aws_config::retry::RetryConfig as SdkRetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, ConfigLoader, SdkConfig};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Builder, Credentials, Region, StalledStreamProtectionConfig};

use crate::config::ClientConfig;
use crate::types::S3Credentials;

const CREDENTIAL_PROVIDER_NAME: &str = "s3nuke-static-credentials";

impl ClientConfig {
    /// Build an S3 client from this configuration.
    ///
    /// Retries configured here are transport-level retries of the SDK; the
    /// pipeline never resubmits a failed batch itself.
    pub async fn create_client(&self) -> Client {
        let sdk_config = self.load_sdk_config().await;

        let mut config_builder = Builder::from(&sdk_config).force_path_style(self.force_path_style);
        if self.disable_stalled_stream_protection {
            config_builder = config_builder
                .stalled_stream_protection(StalledStreamProtectionConfig::disabled());
        }

        Client::from_conf(config_builder.build())
    }

    async fn load_sdk_config(&self) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .retry_config(self.build_retry_config())
            .timeout_config(self.build_timeout_config());

        loader = self.apply_credential(loader);

        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint_url) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }

        loader.load().await
    }

    fn apply_credential(&self, loader: ConfigLoader) -> ConfigLoader {
        match &self.credential {
            S3Credentials::Profile(profile_name) => loader.profile_name(profile_name),
            S3Credentials::Credentials { access_keys } => {
                loader.credentials_provider(Credentials::new(
                    access_keys.access_key.clone(),
                    access_keys.secret_access_key.clone(),
                    access_keys.session_token.clone(),
                    None,
                    CREDENTIAL_PROVIDER_NAME,
                ))
            }
            S3Credentials::FromEnvironment => loader,
        }
    }

    fn build_retry_config(&self) -> SdkRetryConfig {
        SdkRetryConfig::standard()
            .with_max_attempts(self.retry_config.aws_max_attempts)
            .with_initial_backoff(Duration::from_millis(
                self.retry_config.initial_backoff_milliseconds,
            ))
    }

    fn build_timeout_config(&self) -> TimeoutConfig {
        let timeouts = &self.cli_timeout_config;
        let mut builder = TimeoutConfig::builder();

        if let Some(ms) = timeouts.operation_timeout_milliseconds {
            builder = builder.operation_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = timeouts.operation_attempt_timeout_milliseconds {
            builder = builder.operation_attempt_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = timeouts.connect_timeout_milliseconds {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = timeouts.read_timeout_milliseconds {
            builder = builder.read_timeout(Duration::from_millis(ms));
        }

        builder.build()
    }
}
