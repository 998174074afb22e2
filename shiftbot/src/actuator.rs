//! Paced access to the UI source.
//!
//! Every action goes through [`Actuator`], which refuses to dispatch before the previous
//! action's cooldown (click delay plus up to 15% jitter) has elapsed.

use crate::config::BotConfig;
use crate::profile::SpeedProfile;
use crate::session::SessionState;
use crate::snapshot::{NodeId, UiSnapshot};
use crate::source::UiSource;
use crate::types::Rect;
use rand::Rng;
use std::sync::Arc;
use tracing::debug;

pub struct Actuator {
    source: Arc<dyn UiSource>,
    profile: SpeedProfile,
}

impl Actuator {
    pub fn new(source: Arc<dyn UiSource>, profile: SpeedProfile) -> Self {
        Self { source, profile }
    }

    pub fn source(&self) -> &Arc<dyn UiSource> {
        &self.source
    }

    pub fn profile(&self) -> SpeedProfile {
        self.profile
    }

    /// Whether the click cooldown has elapsed
    pub fn ready(&self, state: &SessionState, now_ms: u64) -> bool {
        now_ms >= state.next_click_at_ms
    }

    fn cooldown_ms(&self) -> u64 {
        let jitter = self.profile.click_jitter_ms();
        let extra = if jitter > 0 {
            rand::thread_rng().gen_range(0..=jitter)
        } else {
            0
        };
        self.profile.click_delay_ms() + extra
    }

    /// Start the cooldown after a dispatched action; `extra_ms` lengthens it
    pub fn record_click(&self, state: &mut SessionState, now_ms: u64, extra_ms: u64) {
        state.last_click_ms = now_ms;
        state.next_click_at_ms = now_ms + self.cooldown_ms() + extra_ms;
    }

    fn dispatch(
        &self,
        state: &mut SessionState,
        now_ms: u64,
        extra_ms: u64,
        what: &str,
        action: impl FnOnce(&dyn UiSource) -> bool,
    ) -> bool {
        if !self.ready(state, now_ms) {
            debug!(what, wait_ms = state.next_click_at_ms - now_ms, "click cooldown, not dispatching");
            return false;
        }
        if !action(self.source.as_ref()) {
            debug!(what, "dispatch reported failure");
            return false;
        }
        self.record_click(state, now_ms, extra_ms);
        true
    }

    pub fn tap(&self, state: &mut SessionState, now_ms: u64, bounds: Rect, extra_ms: u64) -> bool {
        if bounds.is_empty() {
            return false;
        }
        let gesture_ms = self.profile.gesture_ms();
        self.dispatch(state, now_ms, extra_ms, "tap", |s| {
            s.dispatch_tap(bounds, gesture_ms)
        })
    }

    pub fn back(&self, state: &mut SessionState, now_ms: u64) -> bool {
        self.dispatch(state, now_ms, 0, "back", |s| s.dispatch_back())
    }

    pub fn home(&self, state: &mut SessionState, now_ms: u64) -> bool {
        self.dispatch(state, now_ms, 0, "home", |s| s.dispatch_home())
    }
}

/// Everything a screen handler may touch during one tick
pub struct TickContext<'a> {
    pub snapshot: &'a UiSnapshot,
    pub state: &'a mut SessionState,
    pub actuator: &'a Actuator,
    pub config: &'a BotConfig,
    pub now: u64,
}

impl TickContext<'_> {
    pub fn profile(&self) -> SpeedProfile {
        self.actuator.profile()
    }

    pub fn tap(&mut self, bounds: Rect, extra_ms: u64) -> bool {
        self.actuator.tap(self.state, self.now, bounds, extra_ms)
    }

    /// Tap a node by its bounds, falling back to its nearest clickable ancestor when the
    /// node itself is too small to hit
    pub fn tap_node(&mut self, id: NodeId, extra_ms: u64) -> bool {
        let bounds = self.snapshot.bounds(id);
        if bounds.is_tappable() {
            return self.tap(bounds, extra_ms);
        }
        match self.snapshot.clickable_ancestor(id) {
            Some(ancestor) if ancestor != id => {
                let bounds = self.snapshot.bounds(ancestor);
                bounds.is_tappable() && self.tap(bounds, extra_ms)
            }
            _ => false,
        }
    }

    pub fn back(&mut self) -> bool {
        self.actuator.back(self.state, self.now)
    }

    pub fn scroll(&mut self, id: NodeId) -> bool {
        let snapshot = self.snapshot;
        let attrs = snapshot.attrs(id);
        let scroll_delay = self.profile().scroll_delay_ms();
        self.actuator
            .dispatch(self.state, self.now, scroll_delay, "scroll", |s| {
                s.dispatch_scroll(attrs)
            })
    }

    pub fn mark_navigation(&mut self) {
        let settle = self.profile().settle_window_ms();
        self.state.mark_navigation(self.now, settle);
    }
}
