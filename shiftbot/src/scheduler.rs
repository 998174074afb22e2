//! Drives [`BookingLoop`] ticks on a tokio task.

use crate::booking::spawn_cache_refresher;
use crate::control::{BookingLoop, Services, TickOutcome};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

/// Run ticks until cancelled or the running flag goes off.
///
/// Each tick is bounded by the configured tick timeout; a tick that panics or times out
/// counts as idle. The next tick is armed only after the previous one finished.
pub async fn run_loop(mut booking_loop: BookingLoop, cancel: CancellationToken) {
    tokio::select! {
        _ = cancel.cancelled() => return,
        _ = booking_loop.launch() => {}
    }

    let profile = booking_loop.config().speed_profile;
    let tick_timeout = Duration::from_millis(booking_loop.config().effective_tick_timeout_ms());

    loop {
        let tick = AssertUnwindSafe(booking_loop.tick()).catch_unwind();
        let outcome = tokio::select! {
            _ = cancel.cancelled() => break,
            result = tokio::time::timeout(tick_timeout, tick) => match result {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(panic)) => {
                    error!(panic = panic_message(panic.as_ref()), "tick panicked, treating as idle");
                    TickOutcome::Idle
                }
                Err(_) => {
                    error!(timeout_ms = tick_timeout.as_millis() as u64, "tick timed out, treating as idle");
                    TickOutcome::Idle
                }
            },
        };
        if outcome == TickOutcome::Stopped {
            break;
        }

        let interval = Duration::from_millis(profile.next_interval_ms(outcome.is_active()));
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    info!("booking loop finished");
}

/// The running loop task and its cache refresher, cancelled together
#[derive(Debug)]
pub struct LoopHandle {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl LoopHandle {
    /// Spawn the loop and the booked-date refresher. Must be called inside a tokio runtime.
    pub fn spawn(booking_loop: BookingLoop, services: &Services) -> Self {
        let cancel = CancellationToken::new();
        let refresher = spawn_cache_refresher(
            services.store.clone(),
            services.cache.clone(),
            services.clock.clone(),
            booking_loop.config().booking_cache.clone(),
            cancel.child_token(),
        );
        let ticker = tokio::spawn(run_loop(booking_loop, cancel.child_token()));
        debug!("booking loop spawned");
        Self {
            cancel,
            tasks: vec![ticker, refresher],
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(|t| t.is_finished())
    }

    /// Cancel and wait for both tasks to end
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                error!(error = %e, "loop task ended abnormally");
            }
        }
    }
}
