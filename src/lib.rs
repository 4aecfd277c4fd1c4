/*!
# Overview
s3nuke-rs empties an Amazon S3 bucket as fast as the API allows.
Every object version and every delete marker is enumerated and removed with
batched `DeleteObjects` calls, spread across a pool of concurrent workers.

## Features
- **High Performance**: One paginating lister feeding N deletion workers
  through a bounded MPMC channel; each request deletes up to 1000 entries
- **Exact accounting**: Each batch is reconciled against the identifiers the
  backend confirmed; anything unconfirmed is reported, never counted
- **Safety First**: Dry-run mode, bucket-name confirmation prompt, force flag
- **Cancellation**: Ctrl+C stops enumeration and lets in-flight batches finish
- **Library-First**: The s3nuke CLI is a thin wrapper over this library, and
  any [`StorageTrait`] implementation can stand in for S3

## As a Library

```toml
[dependencies]
s3nuke-rs = "0.1"
tokio = { version = "1", features = ["full"] }
```

```no_run
use s3nuke_rs::config::Config;
use s3nuke_rs::config::args::parse_from_args;
use s3nuke_rs::pipeline::DeletionPipeline;
use s3nuke_rs::types::token::create_pipeline_cancellation_token;

#[tokio::main]
async fn main() {
    let args = vec!["s3nuke", "s3://my-bucket", "--dry-run"];

    let parsed_args = parse_from_args(args).unwrap();
    let config = Config::try_from(parsed_args).unwrap();
    let cancellation_token = create_pipeline_cancellation_token();
    let mut pipeline = DeletionPipeline::new(config, cancellation_token).await;
    pipeline.run().await;

    if pipeline.has_error() {
        eprintln!("{:?}", pipeline.get_errors_and_consume().unwrap()[0]);
    }
    println!("{:?}", pipeline.get_deletion_stats());
}
```
*/

#![allow(clippy::collapsible_if)]

pub mod config;
pub mod deleter;
pub mod lister;
pub mod pipeline;
pub mod safety;
pub mod stage;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::Config;
pub use config::args::{CLIArgs, build_config_from_args, parse_from_args};
pub use pipeline::{DeletionPipeline, PipelineState};
pub use storage::{Storage, StorageTrait, VersionListing};
pub use types::error::{S3nukeError, exit_code_from_error, is_cancelled_error};
pub use types::token::{PipelineCancellationToken, create_pipeline_cancellation_token};
pub use types::{
    DeletionStatistics, DeletionStats, EnumeratedEntry, FailedBatch, ObjectIdentifier,
};
