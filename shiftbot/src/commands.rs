//! Command surface for whatever front end controls the automation (chat bot, CLI).
//!
//! Every command only flips flags or swaps data that the next tick observes; none of
//! them touches the UI.

use crate::calendar::{self, parse_target_date};
use crate::config::BotConfig;
use crate::control::{BookingLoop, Services};
use crate::errors::BotError;
use crate::scheduler::LoopHandle;
use crate::session::SharedState;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, instrument, warn};

struct Inner {
    config: Arc<BotConfig>,
    services: Services,
    shared: Arc<SharedState>,
    running_loop: Mutex<Option<LoopHandle>>,
    started_at_ms: AtomicU64,
}

impl Inner {
    fn running_loop(&self) -> MutexGuard<'_, Option<LoopHandle>> {
        self.running_loop.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Cloneable handle owning the automation loop
#[derive(Clone)]
pub struct AutomationHandle {
    inner: Arc<Inner>,
}

impl AutomationHandle {
    pub fn new(config: BotConfig, services: Services) -> Self {
        let shared = Arc::new(SharedState::new(config.target_dates()));
        Self {
            inner: Arc::new(Inner {
                config: Arc::new(config),
                services,
                shared,
                running_loop: Mutex::new(None),
                started_at_ms: AtomicU64::new(0),
            }),
        }
    }

    pub fn shared(&self) -> &Arc<SharedState> {
        &self.inner.shared
    }

    pub fn is_running(&self) -> bool {
        self.inner.shared.is_running()
    }

    /// Start a fresh session. Must be called from inside a tokio runtime.
    #[instrument(skip(self))]
    pub fn start(&self) -> String {
        let inner = &self.inner;
        if inner.shared.set_running(true) {
            return "Automation is already running".to_string();
        }
        if let Err(e) = tokio::runtime::Handle::try_current() {
            inner.shared.set_running(false);
            warn!(error = %e, "start requested outside an async runtime");
            return format!("Cannot start automation: {e}");
        }

        let booking_loop = BookingLoop::new(inner.config.clone(), &inner.services, inner.shared.clone());
        let handle = LoopHandle::spawn(booking_loop, &inner.services);
        if let Some(previous) = inner.running_loop().replace(handle) {
            previous.cancel();
        }
        inner
            .started_at_ms
            .store(inner.services.clock.now_ms(), Ordering::SeqCst);
        inner.shared.publish_restart_count(0);
        let profile = inner.config.speed_profile.to_string();
        inner.services.alerts.notify_started(&profile);
        info!(%profile, "automation started");
        "Automation started".to_string()
    }

    /// Stop the loop; the next start begins from a fresh session
    #[instrument(skip(self))]
    pub fn stop(&self) -> String {
        let inner = &self.inner;
        if !inner.shared.set_running(false) {
            return "Automation is already stopped".to_string();
        }
        if let Some(handle) = inner.running_loop().take() {
            handle.cancel();
        }
        let uptime_secs = inner
            .services
            .clock
            .now_ms()
            .saturating_sub(inner.started_at_ms.load(Ordering::SeqCst))
            / 1000;
        inner
            .services
            .alerts
            .notify_stopped(inner.shared.restart_count(), uptime_secs);
        info!(uptime_secs, "automation stopped");
        "Automation stopped".to_string()
    }

    /// Stop and wait until the loop tasks have ended
    pub async fn shutdown(&self) {
        let handle = self.inner.running_loop().take();
        self.stop();
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
    }

    /// Add a `DD.MM` date; adding a date already listed is not an error
    pub fn add_target_date(&self, date: &str) -> Result<String, BotError> {
        let date = normalize_date(date)?;
        let added = self.inner.shared.update_target_dates(|dates| {
            if dates.contains(&date) {
                false
            } else {
                dates.push(date.clone());
                true
            }
        });
        Ok(if added {
            info!(date = %date, "target date added");
            format!("Date {date} added")
        } else {
            format!("Date {date} is already in the list")
        })
    }

    pub fn remove_target_date(&self, date: &str) -> Result<String, BotError> {
        let date = normalize_date(date)?;
        let removed = self.inner.shared.update_target_dates(|dates| {
            let before = dates.len();
            dates.retain(|d| d != &date);
            dates.len() != before
        });
        Ok(if removed {
            info!(date = %date, "target date removed");
            format!("Date {date} removed")
        } else {
            format!("Date {date} is not in the list")
        })
    }

    /// Target dates in calendar order
    pub fn list_target_dates(&self) -> Vec<String> {
        let mut dates = Vec::clone(&self.inner.shared.target_dates());
        dates.sort_by_key(|d| match parse_target_date(d) {
            Some((day, month)) => month * 100 + day,
            None => u32::MAX,
        });
        dates
    }

    pub fn status(&self) -> String {
        let inner = &self.inner;
        let target = &inner.config.target;
        let dates = self.list_target_dates();
        let or_dash = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };
        format!(
            "Status: {}\nWarehouse: {}\nProcess: {}\nDates: {}\nRestarts: {}\nLast selected: {}",
            if inner.shared.is_running() { "running" } else { "stopped" },
            or_dash(&target.warehouse),
            or_dash(&target.process),
            if dates.is_empty() { "-".to_string() } else { dates.join(", ") },
            inner.shared.restart_count(),
            inner.shared.last_selected_date().unwrap_or_else(|| "-".to_string()),
        )
    }
}

/// Validate a `DD.MM` date and bring it to its zero-padded form
fn normalize_date(date: &str) -> Result<String, BotError> {
    calendar::normalize_date(date).ok_or_else(|| BotError::InvalidArgument(format!("'{}' is not a DD.MM date", date.trim())))
}
