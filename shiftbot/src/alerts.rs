use tracing::{info, warn};

/// Outbound notifications about the automation's progress.
///
/// Implementations must return quickly; anything slow (network delivery) belongs on the
/// implementation's own task.
pub trait AlertSink: Send + Sync {
    fn notify_freeze(&self, frozen_secs: u64, restart_count: u32);

    fn notify_restart_complete(&self);

    fn notify_booking(&self, process: &str, date: &str, time_slot: &str);

    fn notify_started(&self, profile: &str);

    fn notify_stopped(&self, restart_count: u32, uptime_secs: u64);

    /// Target dates newly seen with free places, as `DD.MM`
    fn notify_available_shifts(&self, process: &str, dates: &[String]);
}

/// Alert sink that only writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn notify_freeze(&self, frozen_secs: u64, restart_count: u32) {
        warn!(frozen_secs, restart_count, "UI frozen, restarting target app");
    }

    fn notify_restart_complete(&self) {
        info!("target app restarted");
    }

    fn notify_booking(&self, process: &str, date: &str, time_slot: &str) {
        info!(process, date, time_slot, "booking submitted");
    }

    fn notify_started(&self, profile: &str) {
        info!(profile, "automation started");
    }

    fn notify_stopped(&self, restart_count: u32, uptime_secs: u64) {
        info!(restart_count, uptime_secs, "automation stopped");
    }

    fn notify_available_shifts(&self, process: &str, dates: &[String]) {
        info!(process, dates = %dates.join(", "), "free places on target dates");
    }
}
