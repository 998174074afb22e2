//! Deduplicates free-place sightings so each one is announced once.

use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Sightings not refreshed for this long are forgotten and may be announced again
pub const STALE_AFTER_MS: u64 = 5 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sighting {
    pub first_seen_ms: u64,
    pub last_seen_ms: u64,
}

#[derive(Debug, Default)]
pub struct ShiftWatch {
    seen: HashMap<String, Sighting>,
    notified: HashSet<String>,
}

fn key(date: &str, process: &str, warehouse: &str) -> String {
    format!("{date}|{process}|{warehouse}")
}

impl ShiftWatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record dates seen with free places; returns those not announced yet
    pub fn observe(&mut self, process: &str, warehouse: &str, dates: &[String], now_ms: u64) -> Vec<String> {
        self.forget_stale(now_ms);
        let mut fresh = Vec::new();
        for date in dates {
            let k = key(date, process, warehouse);
            self.seen
                .entry(k.clone())
                .and_modify(|s| s.last_seen_ms = now_ms)
                .or_insert(Sighting {
                    first_seen_ms: now_ms,
                    last_seen_ms: now_ms,
                });
            if self.notified.insert(k) {
                fresh.push(date.clone());
            }
        }
        fresh
    }

    pub fn sighting(&self, date: &str, process: &str, warehouse: &str) -> Option<Sighting> {
        self.seen.get(&key(date, process, warehouse)).copied()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    fn forget_stale(&mut self, now_ms: u64) {
        let before = self.seen.len();
        self.seen
            .retain(|_, s| now_ms.saturating_sub(s.last_seen_ms) <= STALE_AFTER_MS);
        let seen = &self.seen;
        self.notified.retain(|k| seen.contains_key(k));
        if self.seen.len() != before {
            debug!(dropped = before - self.seen.len(), "stale sightings forgotten");
        }
    }

    pub fn clear(&mut self) {
        self.seen.clear();
        self.notified.clear();
    }
}
