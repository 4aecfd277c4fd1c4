// Decides whether the progress indicator and the result summary are shown.

use s3nuke_rs::config::Config;

/// Whether to show the live-updating progress line.
///
/// Returns `false` when:
/// - `show_no_progress` is set
/// - Verbosity is above Warn (tracing output takes over the terminal)
/// - JSON logging is enabled
pub fn is_progress_indicator_needed(config: &Config) -> bool {
    if config.show_no_progress {
        return false;
    }

    match config.tracing_config.as_ref() {
        None => true,
        Some(tracing_config) => {
            tracing_config.tracing_level <= log::Level::Warn && !tracing_config.json_tracing
        }
    }
}

/// Whether to show the final result summary line.
pub fn is_show_result_needed(config: &Config) -> bool {
    if config.show_no_progress {
        return false;
    }

    config
        .tracing_config
        .as_ref()
        .is_none_or(|tracing_config| !tracing_config.json_tracing)
}
