use clap::Parser;
use grid_core::queue_health::{ALERT_THRESHOLD, CLEANUP_THRESHOLD_MINUTES, STUCK_THRESHOLD_MINUTES};

use crate::sweep::SweepOptions;

/// Monitor generation job queues for stuck work.
#[derive(Parser, Debug, Clone)]
#[command(name = "grid-monitor", version, about = "Monitor generation job queues")]
pub struct MonitorArgs {
    /// Delete stuck jobs and orphaned requests after the check.
    #[arg(long)]
    pub cleanup: bool,

    /// Age in minutes past which cleanup deletes jobs.
    #[arg(long, env = "MONITOR_CLEANUP_AGE", default_value_t = CLEANUP_THRESHOLD_MINUTES)]
    pub cleanup_age: i64,

    /// Age in minutes past which an open job counts as stuck.
    #[arg(long, env = "MONITOR_STUCK_MINUTES", default_value_t = STUCK_THRESHOLD_MINUTES)]
    pub stuck_minutes: i64,

    /// Minimum stuck jobs before alerting and exiting non-zero.
    #[arg(long, env = "MONITOR_ALERT_THRESHOLD", default_value_t = ALERT_THRESHOLD)]
    pub alert_threshold: usize,

    /// Only print the summary when something is stuck.
    #[arg(long)]
    pub quiet: bool,

    /// Do not send notifications.
    #[arg(long)]
    pub no_alert: bool,

    /// Abort jobs whose time-to-live has expired.
    #[arg(long)]
    pub abort_stale: bool,

    /// Also send a queue health summary.
    #[arg(long)]
    pub report_health: bool,
}

impl MonitorArgs {
    pub fn options(&self) -> SweepOptions {
        SweepOptions {
            stuck_minutes: self.stuck_minutes.max(0),
            alert_threshold: self.alert_threshold,
            cleanup: self.cleanup,
            cleanup_age_minutes: self.cleanup_age.max(0),
            alerts: !self.no_alert,
            abort_stale: self.abort_stale,
            report_health: self.report_health,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_thresholds() {
        let args = MonitorArgs::parse_from(["grid-monitor"]);
        let options = args.options();
        assert_eq!(options.stuck_minutes, 10);
        assert_eq!(options.alert_threshold, 5);
        assert_eq!(options.cleanup_age_minutes, 30);
        assert!(options.alerts);
        assert!(!options.cleanup);
    }

    #[test]
    fn flags_parse() {
        let args = MonitorArgs::parse_from([
            "grid-monitor",
            "--cleanup",
            "--cleanup-age",
            "45",
            "--no-alert",
            "--abort-stale",
            "--quiet",
        ]);
        assert!(args.quiet);
        let options = args.options();
        assert!(options.cleanup);
        assert_eq!(options.cleanup_age_minutes, 45);
        assert!(!options.alerts);
        assert!(options.abort_stale);
    }
}
