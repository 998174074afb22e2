//! Booking history and the locally cached set of already-booked dates.

use crate::clock::Clock;
use crate::config::CacheConfig;
use crate::errors::BotError;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Success,
    Pending,
    Failed,
}

impl BookingStatus {
    /// Only successful and pending bookings block a date
    pub fn counts_as_booked(self) -> bool {
        matches!(self, BookingStatus::Success | BookingStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub warehouse: String,
    pub process: String,
    /// `DD.MM`
    pub date: String,
    pub time_slot: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BookingRecord {
    pub fn new(
        warehouse: impl Into<String>,
        process: impl Into<String>,
        date: impl Into<String>,
        time_slot: impl Into<String>,
        status: BookingStatus,
    ) -> Self {
        Self {
            warehouse: warehouse.into(),
            process: process.into(),
            date: date.into(),
            time_slot: time_slot.into(),
            status,
            created_at: Utc::now(),
            error: None,
        }
    }
}

/// Persistent booking history
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Dates (`DD.MM`) with a successful or pending booking
    async fn booked_dates(&self) -> Result<Vec<String>, BotError>;

    async fn record_booking(&self, record: BookingRecord) -> Result<(), BotError>;
}

/// In-process store, for dry runs and tests
#[derive(Debug, Default)]
pub struct MemoryBookingStore {
    records: Mutex<Vec<BookingRecord>>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<BookingRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    pub async fn records(&self) -> Vec<BookingRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn booked_dates(&self) -> Result<Vec<String>, BotError> {
        let records = self.records.lock().await;
        let dates: BTreeSet<String> = records
            .iter()
            .filter(|r| r.status.counts_as_booked())
            .map(|r| r.date.clone())
            .collect();
        Ok(dates.into_iter().collect())
    }

    async fn record_booking(&self, record: BookingRecord) -> Result<(), BotError> {
        self.records.lock().await.push(record);
        Ok(())
    }
}

/// Last known set of booked dates, replaced wholesale by the refresher.
///
/// Readers never block: a read returns whichever set was published last.
#[derive(Debug)]
pub struct BookedDateCache {
    dates: ArcSwap<BTreeSet<String>>,
    refreshed_at_ms: AtomicU64,
}

impl Default for BookedDateCache {
    fn default() -> Self {
        Self {
            dates: ArcSwap::from_pointee(BTreeSet::new()),
            refreshed_at_ms: AtomicU64::new(0),
        }
    }
}

impl BookedDateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<BTreeSet<String>> {
        self.dates.load_full()
    }

    pub fn contains(&self, date: &str) -> bool {
        self.dates.load().contains(date)
    }

    pub fn publish(&self, dates: impl IntoIterator<Item = String>, now_ms: u64) {
        self.dates.store(Arc::new(dates.into_iter().collect()));
        self.refreshed_at_ms.store(now_ms, Ordering::SeqCst);
    }

    /// `None` until the first successful refresh
    pub fn last_refresh_ms(&self) -> Option<u64> {
        match self.refreshed_at_ms.load(Ordering::SeqCst) {
            0 => None,
            ms => Some(ms),
        }
    }
}

/// Fetch booked dates once, bounded by `timeout`, and publish them
pub async fn refresh_booked_dates(
    store: &dyn BookingStore,
    cache: &BookedDateCache,
    clock: &dyn Clock,
    timeout: Duration,
) -> Result<usize, BotError> {
    let dates = tokio::time::timeout(timeout, store.booked_dates())
        .await
        .map_err(|_| BotError::Timeout(format!("booked dates not returned within {timeout:?}")))??;
    let count = dates.len();
    cache.publish(dates, clock.now_ms().max(1));
    Ok(count)
}

/// Refresh the cache immediately, then every `refresh_interval_ms`, until cancelled.
/// Failures keep the previous set.
pub fn spawn_cache_refresher(
    store: Arc<dyn BookingStore>,
    cache: Arc<BookedDateCache>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let interval = Duration::from_millis(config.refresh_interval_ms);
        let timeout = Duration::from_millis(config.store_timeout_ms);
        loop {
            match refresh_booked_dates(store.as_ref(), &cache, clock.as_ref(), timeout).await {
                Ok(count) => debug!(count, "booked dates refreshed"),
                Err(e) => warn!(error = %e, "booked dates refresh failed, keeping previous set"),
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        debug!("booked dates refresher stopped");
    })
}
