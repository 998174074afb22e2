//! Stability gating and freeze detection over a cheap structural fingerprint.

use crate::alerts::AlertSink;
use crate::config::StallConfig;
use crate::session::StallBaselines;
use crate::snapshot::UiSnapshot;
use std::sync::Arc;
use tracing::{debug, warn};

fn str_hash(s: &str) -> u64 {
    s.chars()
        .fold(0u64, |h, c| h.wrapping_mul(31).wrapping_add(c as u64))
}

/// Order-sensitive fingerprint of the first `max_nodes` nodes of the app window
/// (breadth-first, down to `max_depth`). Approximate by construction: only class, text
/// and clickability feed it.
pub fn structural_hash(snapshot: &UiSnapshot, max_nodes: usize, max_depth: usize) -> u64 {
    let mut hash: u64 = 0;
    let mut count: u64 = 0;
    for id in snapshot.bfs(max_depth).take(max_nodes) {
        let attrs = snapshot.attrs(id);
        count += 1;
        hash = hash.wrapping_mul(31).wrapping_add(str_hash(&attrs.class_name));
        hash = hash.wrapping_mul(31).wrapping_add(str_hash(attrs.text_or_empty()));
        hash = hash.wrapping_mul(31).wrapping_add(u64::from(attrs.clickable));
    }
    hash.wrapping_add(count.wrapping_mul(7))
}

pub struct StallDetector {
    config: StallConfig,
    alerts: Arc<dyn AlertSink>,
}

impl StallDetector {
    pub fn new(config: StallConfig, alerts: Arc<dyn AlertSink>) -> Self {
        Self { config, alerts }
    }

    pub fn hash(&self, snapshot: &UiSnapshot) -> u64 {
        structural_hash(snapshot, self.config.hash_max_nodes, self.config.hash_max_depth)
    }

    /// True once the same fingerprint has been seen on `stable_ticks` consecutive ticks
    /// after the first sighting
    pub fn is_stable(&self, baselines: &mut StallBaselines, hash: u64) -> bool {
        if baselines.stable_hash == Some(hash) {
            baselines.stable_count = baselines.stable_count.saturating_add(1);
        } else {
            baselines.stable_hash = Some(hash);
            baselines.stable_count = 0;
        }
        baselines.stable_count >= self.config.stable_ticks
    }

    /// Rate-limited freeze check. Returns true, after bumping `restart_count` and
    /// alerting, when the fingerprint has not changed for the freeze threshold.
    pub fn check_for_freeze(
        &self,
        baselines: &mut StallBaselines,
        restart_count: &mut u32,
        hash: u64,
        now_ms: u64,
    ) -> bool {
        if let Some(last) = baselines.last_freeze_check_ms {
            if now_ms.saturating_sub(last) < self.config.freeze_check_interval_ms {
                return false;
            }
        }
        baselines.last_freeze_check_ms = Some(now_ms);

        if baselines.freeze_hash != Some(hash) {
            baselines.freeze_hash = Some(hash);
            baselines.freeze_since_ms = now_ms;
            baselines.freeze_warned = false;
            return false;
        }

        let frozen_ms = now_ms.saturating_sub(baselines.freeze_since_ms);
        if frozen_ms >= self.config.freeze_threshold_ms {
            *restart_count = restart_count.saturating_add(1);
            warn!(frozen_secs = frozen_ms / 1000, restart = *restart_count, "UI frozen");
            self.alerts.notify_freeze(frozen_ms / 1000, *restart_count);
            // Start a fresh baseline so one freeze yields one signal
            baselines.freeze_hash = None;
            baselines.freeze_since_ms = now_ms;
            baselines.freeze_warned = false;
            return true;
        }

        if frozen_ms >= self.config.freeze_warning_ms && !baselines.freeze_warned {
            baselines.freeze_warned = true;
            warn!(frozen_secs = frozen_ms / 1000, "possible freeze");
        } else {
            debug!(frozen_ms, "UI unchanged");
        }
        false
    }
}
