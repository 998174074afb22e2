//! Mutable state of one automation run.
//!
//! [`SessionState`] is owned by the tick executor and never shared. Data that other
//! threads must read or change (the running flag, target dates, counters shown by
//! `status`) lives in [`SharedState`], behind atomics and copy-on-write swaps.

use crate::filter::FilterPhase;
use arc_swap::{ArcSwap, ArcSwapOption};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Baselines of the two stall mechanisms
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StallBaselines {
    pub stable_hash: Option<u64>,
    pub stable_count: u32,
    pub freeze_hash: Option<u64>,
    pub freeze_since_ms: u64,
    pub last_freeze_check_ms: Option<u64>,
    pub freeze_warned: bool,
}

/// Progress of the one-time favorites filter setup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterProgress {
    pub configured: bool,
    pub phase: FilterPhase,
    pub last_action_ms: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub started_at_ms: u64,
    pub last_action_ms: u64,
    pub last_click_ms: u64,
    /// No action may be dispatched before this instant
    pub next_click_at_ms: u64,
    /// Ticks before this instant are idle
    pub settle_until_ms: u64,
    pub stall: StallBaselines,
    pub filter: FilterProgress,
    pub restart_count: u32,
    pub last_selected_date: Option<String>,
    pub current_step: u32,
    pub last_step_ms: u64,
    pub process_scrolls: u32,
    pub last_warehouse_click_ms: Option<u64>,
    /// After a warehouse or process tap the next screen gets this long to appear
    pub awaiting_load_until_ms: u64,
    pub last_popup_dismiss_ms: Option<u64>,
    pub last_relaunch_ms: Option<u64>,
    /// Dates booked during this run; excluded from later calendar decisions
    pub booked_locally: BTreeSet<String>,
    /// Until the first warehouse screen is seen, any unproductive screen sends us home
    pub force_home: bool,
}

impl SessionState {
    pub fn new(now_ms: u64) -> Self {
        Self {
            started_at_ms: now_ms,
            last_action_ms: now_ms,
            last_step_ms: now_ms,
            force_home: true,
            stall: StallBaselines {
                freeze_since_ms: now_ms,
                ..StallBaselines::default()
            },
            ..Self::default()
        }
    }

    pub fn in_settle_window(&self, now_ms: u64) -> bool {
        now_ms < self.settle_until_ms
    }

    /// Open a settle window after a navigation action
    pub fn mark_navigation(&mut self, now_ms: u64, settle_ms: u64) {
        self.settle_until_ms = self.settle_until_ms.max(now_ms + settle_ms);
    }

    pub fn mark_step(&mut self, now_ms: u64) {
        self.current_step = self.current_step.saturating_add(1);
        self.last_step_ms = now_ms;
    }

    /// Reset the step counter when nothing progressed for `timeout_ms`
    pub fn check_step_timeout(&mut self, now_ms: u64, timeout_ms: u64) -> bool {
        if now_ms.saturating_sub(self.last_step_ms) > timeout_ms {
            self.current_step = 0;
            self.last_step_ms = now_ms;
            return true;
        }
        false
    }

    /// Forget everything learned about the current UI, e.g. after a relaunch
    pub fn reset_baselines(&mut self, now_ms: u64) {
        self.stall = StallBaselines {
            freeze_since_ms: now_ms,
            ..StallBaselines::default()
        };
        self.filter = FilterProgress::default();
        self.process_scrolls = 0;
        self.awaiting_load_until_ms = 0;
    }
}

/// State readable and writable from outside the tick
#[derive(Debug)]
pub struct SharedState {
    running: AtomicBool,
    target_dates: ArcSwap<Vec<String>>,
    restart_count: AtomicU32,
    last_selected_date: ArcSwapOption<String>,
}

impl SharedState {
    pub fn new(target_dates: Vec<String>) -> Self {
        Self {
            running: AtomicBool::new(false),
            target_dates: ArcSwap::from_pointee(target_dates),
            restart_count: AtomicU32::new(0),
            last_selected_date: ArcSwapOption::empty(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Flip the running flag; returns the previous value
    pub fn set_running(&self, running: bool) -> bool {
        self.running.swap(running, Ordering::SeqCst)
    }

    pub fn target_dates(&self) -> Arc<Vec<String>> {
        self.target_dates.load_full()
    }

    /// Copy-on-write update of the target dates; returns what `update` returned
    pub fn update_target_dates<R: Default>(
        &self,
        mut update: impl FnMut(&mut Vec<String>) -> R,
    ) -> R {
        let mut result = None;
        self.target_dates.rcu(|current| {
            let mut next = Vec::clone(current);
            result = Some(update(&mut next));
            next
        });
        result.unwrap_or_default()
    }

    pub fn restart_count(&self) -> u32 {
        self.restart_count.load(Ordering::SeqCst)
    }

    pub fn publish_restart_count(&self, count: u32) {
        self.restart_count.store(count, Ordering::SeqCst);
    }

    pub fn last_selected_date(&self) -> Option<String> {
        self.last_selected_date.load_full().map(|d| d.as_ref().clone())
    }

    pub fn publish_last_selected_date(&self, date: Option<String>) {
        self.last_selected_date.store(date.map(Arc::new));
    }
}
