//! Forced restart of the target app, used when the UI froze or vanished.

use crate::config::RestartPolicy;
use crate::errors::BotError;
use crate::source::UiSource;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Which steps of the restart chain went through
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestartReport {
    pub backs: u8,
    pub home: bool,
    pub force_stopped: bool,
}

impl RestartReport {
    /// Every step before the relaunch failed
    pub fn degraded(&self) -> bool {
        self.backs == 0 && !self.home && !self.force_stopped
    }
}

/// Back out twice, go home, force-stop, then relaunch.
///
/// Intermediate failures are logged and skipped; only a failed relaunch is an error.
#[instrument(level = "info", skip_all)]
pub async fn force_restart(source: &dyn UiSource, policy: &RestartPolicy) -> Result<RestartReport, BotError> {
    let mut report = RestartReport::default();
    for _ in 0..2 {
        if source.dispatch_back() {
            report.backs += 1;
        }
    }
    report.home = source.dispatch_home();
    tokio::time::sleep(Duration::from_millis(policy.after_home_ms)).await;

    match source.force_stop_app() {
        Ok(()) => report.force_stopped = true,
        Err(e) => warn!(error = %e, "force-stop failed, relaunching anyway"),
    }
    tokio::time::sleep(Duration::from_millis(policy.after_force_stop_ms)).await;

    if report.degraded() {
        warn!("restart chain failed, falling back to a plain relaunch");
    }
    source.launch_app()?;
    info!(?report, "target app relaunched");
    Ok(report)
}
