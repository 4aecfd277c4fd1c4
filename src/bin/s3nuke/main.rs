use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use tracing::{debug, error, info, trace, warn};

use s3nuke_rs::config::Config;
use s3nuke_rs::{
    CLIArgs, DeletionPipeline, create_pipeline_cancellation_token, exit_code_from_error,
    is_cancelled_error,
};

mod ctrl_c_handler;
pub mod indicator;
mod tracing_init;
pub mod ui_config;

const EXIT_CODE_SUCCESS: i32 = 0;
const EXIT_CODE_WARNING: i32 = 3;

/// s3nuke - empty an Amazon S3 bucket: every object version and delete marker.
///
/// This binary is a thin wrapper over the s3nuke-rs library.
#[cfg_attr(coverage_nightly, coverage(off))]
#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config_exit_if_err();

    if let Some(shell) = config.auto_complete_shell {
        generate(
            shell,
            &mut CLIArgs::command(),
            "s3nuke",
            &mut std::io::stdout(),
        );

        return Ok(());
    }

    start_tracing_if_necessary(&config);

    trace!("config = {:?}", config);

    let exit_code = run(config).await;
    if exit_code != EXIT_CODE_SUCCESS {
        std::process::exit(exit_code);
    }

    Ok(())
}

#[cfg_attr(coverage_nightly, coverage(off))]
fn load_config_exit_if_err() -> Config {
    match Config::try_from(CLIArgs::parse()) {
        Ok(config) => config,
        Err(error_message) => {
            clap::Error::raw(clap::error::ErrorKind::ValueValidation, error_message).exit()
        }
    }
}

fn start_tracing_if_necessary(config: &Config) -> bool {
    match config.tracing_config.as_ref() {
        Some(tracing_config) => {
            tracing_init::init_tracing(tracing_config);
            true
        }
        None => false,
    }
}

/// Run the pipeline and map its outcome to a process exit code.
async fn run(config: Config) -> i32 {
    let cancellation_token = create_pipeline_cancellation_token();
    ctrl_c_handler::spawn_ctrl_c_handler(cancellation_token.clone());

    let mut pipeline = DeletionPipeline::new(config.clone(), cancellation_token).await;

    // Prompt before the progress line takes over the terminal.
    if let Err(e) = pipeline.check_prerequisites() {
        return report_prerequisite_failure(&e);
    }

    let start_time = tokio::time::Instant::now();
    debug!(bucket = config.bucket, "deletion pipeline start.");

    let indicator_join_handle = indicator::show_indicator(
        pipeline.get_stats_receiver(),
        ui_config::is_progress_indicator_needed(&config),
        ui_config::is_show_result_needed(&config),
        config.dry_run,
    );

    pipeline.run().await;
    if let Err(e) = indicator_join_handle.await {
        warn!("progress indicator task failed: {}", e);
    }

    let duration_sec = format!("{:.3}", start_time.elapsed().as_secs_f32());

    if let Some(errors) = pipeline.get_errors_and_consume() {
        for err in &errors {
            error!("{:#}", err);
        }
        error!(duration_sec = duration_sec, "s3nuke failed.");
        return errors.first().map(exit_code_from_error).unwrap_or(1);
    }

    let failed = pipeline.get_failed_objects();
    if pipeline.has_warning() {
        for identifier in failed {
            warn!(
                key = identifier.key(),
                version_id = identifier.version_id(),
                "not confirmed as deleted."
            );
        }
        warn!(
            failed = failed.len(),
            duration_sec = duration_sec,
            "s3nuke completed with unconfirmed deletions."
        );
        return EXIT_CODE_WARNING;
    }

    debug!(duration_sec = duration_sec, "s3nuke has been completed.");
    EXIT_CODE_SUCCESS
}

fn report_prerequisite_failure(e: &anyhow::Error) -> i32 {
    if is_cancelled_error(e) {
        info!("deletion cancelled by user.");
        println!("Cancelled. Nothing was deleted.");
    } else {
        error!("{:#}", e);
        eprintln!("{e:#}");
    }
    exit_code_from_error(e)
}
