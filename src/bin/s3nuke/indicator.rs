// Live progress display fed by the pipeline's stats channel.
//
// Counts arrive as increments; throughput is a moving average over the last
// few refresh periods.

use std::io;
use std::io::Write;

use async_channel::Receiver;
use indicatif::{HumanCount, HumanDuration, ProgressBar, ProgressStyle};
use s3nuke_rs::DeletionStatistics;
use simple_moving_average::{SMA, SumTreeSMA};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::info;

/// Totals seen on the stats channel, returned once it closes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndicatorSummary {
    pub total_listed_count: u64,
    pub total_delete_count: u64,
    pub total_failed_count: u64,
}

impl IndicatorSummary {
    fn apply(&mut self, stats: DeletionStatistics) {
        match stats {
            DeletionStatistics::ObjectsListed(n) => self.total_listed_count += n,
            DeletionStatistics::DeleteComplete(n) => self.total_delete_count += n,
            DeletionStatistics::DeleteFailed(n) => self.total_failed_count += n,
        }
    }
}

const MOVING_AVERAGE_PERIOD_SECS: usize = 10;

const REFRESH_INTERVAL: f32 = 1.0;

/// Spawn a task that drains `stats_receiver` until it is closed, updating a
/// progress line once per refresh interval.
pub fn show_indicator(
    stats_receiver: Receiver<DeletionStatistics>,
    show_progress: bool,
    show_result: bool,
    dry_run: bool,
) -> JoinHandle<IndicatorSummary> {
    let progress_text = ProgressBar::new(0);
    if let Ok(progress_style) = ProgressStyle::with_template("{wide_msg}") {
        progress_text.set_style(progress_style);
    }

    tokio::spawn(async move {
        let start_time = Instant::now();

        let mut ma_deleted_count = SumTreeSMA::<_, u64, MOVING_AVERAGE_PERIOD_SECS>::new();
        let mut summary = IndicatorSummary::default();

        loop {
            let deleted_before = summary.total_delete_count;

            let period = Instant::now();
            loop {
                while let Ok(stats) = stats_receiver.try_recv() {
                    summary.apply(stats);
                }

                if REFRESH_INTERVAL < period.elapsed().as_secs_f32() {
                    break;
                }

                if stats_receiver.is_closed() && stats_receiver.is_empty() {
                    let elapsed = start_time.elapsed();
                    let elapsed_secs_f64 = elapsed.as_secs_f64();

                    let objects_per_sec = if dry_run {
                        0
                    } else if elapsed_secs_f64 < REFRESH_INTERVAL as f64 {
                        summary.total_delete_count
                    } else {
                        (summary.total_delete_count as f64 / elapsed_secs_f64) as u64
                    };

                    info!(
                        message = "deletion summary",
                        listed_objects = summary.total_listed_count,
                        deleted_objects = summary.total_delete_count,
                        deleted_objects_per_sec = objects_per_sec,
                        failed = summary.total_failed_count,
                        duration_sec = elapsed_secs_f64,
                    );

                    if show_result {
                        if let Ok(style) = ProgressStyle::with_template("{msg}") {
                            progress_text.set_style(style);
                        }

                        let prefix = if dry_run { "[dry-run] " } else { "" };
                        progress_text.finish_with_message(format!(
                            "{prefix}listed {:>3} | deleted {:>3} objects | {:>3} objects/sec,  failed {} objects,  duration {}",
                            HumanCount(summary.total_listed_count),
                            HumanCount(summary.total_delete_count),
                            HumanCount(objects_per_sec),
                            summary.total_failed_count,
                            HumanDuration(elapsed),
                        ));

                        println!();
                        let _ = io::stdout().flush();
                    }

                    return summary;
                }

                tokio::time::sleep(std::time::Duration::from_secs_f32(0.05)).await;
            }

            if !dry_run {
                ma_deleted_count.add_sample(summary.total_delete_count - deleted_before);
            }

            if show_progress {
                progress_text.set_message(format!(
                    "listed {:>3} | deleted {:>3} objects | {:>3} objects/sec,  failed {} objects",
                    HumanCount(summary.total_listed_count),
                    HumanCount(summary.total_delete_count),
                    HumanCount(ma_deleted_count.get_average()),
                    summary.total_failed_count,
                ));
            }
        }
    })
}
