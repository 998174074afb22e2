mod calendar_property_tests;
mod handler_tests;
mod loop_tests;

use crate::alerts::AlertSink;
use crate::booking::{BookedDateCache, MemoryBookingStore};
use crate::clock::ManualClock;
use crate::config::{BotConfig, RestartPolicy};
use crate::control::{BookingLoop, Services};
use crate::session::SharedState;
use crate::snapshot::UiNode;
use crate::source::ReplaySource;
use std::sync::{Arc, Mutex};

// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .with_target(true)
        .with_test_writer()
        .try_init();
}

pub const SCREEN_W: i32 = 1080;
pub const SCREEN_H: i32 = 2280;
pub const CELL: i32 = 135;

/// Alert sink that remembers what it was told
#[derive(Debug, Default)]
pub struct RecordingAlerts {
    events: Mutex<Vec<String>>,
}

impl RecordingAlerts {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }

    fn push(&self, event: String) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl AlertSink for RecordingAlerts {
    fn notify_freeze(&self, frozen_secs: u64, restart_count: u32) {
        self.push(format!("freeze {frozen_secs} {restart_count}"));
    }

    fn notify_restart_complete(&self) {
        self.push("restarted".to_string());
    }

    fn notify_booking(&self, process: &str, date: &str, time_slot: &str) {
        self.push(format!("booking {process} {date} {time_slot}"));
    }

    fn notify_started(&self, profile: &str) {
        self.push(format!("started {profile}"));
    }

    fn notify_stopped(&self, restart_count: u32, uptime_secs: u64) {
        self.push(format!("stopped {restart_count} {uptime_secs}"));
    }

    fn notify_available_shifts(&self, process: &str, dates: &[String]) {
        self.push(format!("shifts {process} {}", dates.join(",")));
    }
}

/// A loop wired to replay doubles, already marked running
pub struct Harness {
    pub booking_loop: BookingLoop,
    pub source: Arc<ReplaySource>,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryBookingStore>,
    pub cache: Arc<BookedDateCache>,
    pub alerts: Arc<RecordingAlerts>,
    pub shared: Arc<SharedState>,
}

impl Harness {
    pub fn new(mut config: BotConfig) -> Self {
        config.restart = RestartPolicy {
            after_home_ms: 0,
            after_force_stop_ms: 0,
            ..config.restart
        };
        let clock = Arc::new(ManualClock::new(1_000_000));
        let source = Arc::new(ReplaySource::new(clock.clone()));
        let store = Arc::new(MemoryBookingStore::new());
        let cache = Arc::new(BookedDateCache::new());
        let alerts = Arc::new(RecordingAlerts::default());
        let services = Services {
            source: source.clone(),
            alerts: alerts.clone(),
            store: store.clone(),
            cache: cache.clone(),
            clock: clock.clone(),
        };
        let shared = Arc::new(SharedState::new(config.target_dates()));
        shared.set_running(true);
        let booking_loop = BookingLoop::new(Arc::new(config), &services, shared.clone());
        Self {
            booking_loop,
            source,
            clock,
            store,
            cache,
            alerts,
            shared,
        }
    }

    /// Tick every `step_ms` until something is dispatched or `max_ticks` ran out
    pub async fn tick_until_dispatch(&mut self, step_ms: u64, max_ticks: usize) -> bool {
        let before = self.source.dispatched().len();
        for _ in 0..max_ticks {
            self.booking_loop.tick().await;
            if self.source.dispatched().len() > before {
                return true;
            }
            self.clock.advance(step_ms);
        }
        false
    }
}

pub fn config_with_dates(dates: &[&str]) -> BotConfig {
    let mut config = BotConfig::default();
    config.target.process = "Приёмка".to_string();
    config.target.warehouse = "Хоругвино".to_string();
    config.target.target_dates = dates.iter().map(|d| d.to_string()).collect();
    config
}

pub fn tab_bar() -> UiNode {
    UiNode::new("LinearLayout")
        .bounds(0, 2130, SCREEN_W, SCREEN_H)
        .child(
            UiNode::new("FrameLayout")
                .resource_id("ru.ozon.hire:id/warehouseTab")
                .clickable()
                .bounds(0, 2130, 270, SCREEN_H)
                .child(UiNode::new("TextView").text("Склады").bounds(60, 2200, 210, 2250)),
        )
        .child(
            UiNode::new("FrameLayout")
                .resource_id("ru.ozon.hire:id/calendarTab")
                .clickable()
                .bounds(270, 2130, 540, SCREEN_H)
                .child(UiNode::new("TextView").text("Записи").bounds(330, 2200, 480, 2250)),
        )
}

pub fn screen(children: Vec<UiNode>) -> UiNode {
    UiNode::new("FrameLayout")
        .bounds(0, 0, SCREEN_W, SCREEN_H)
        .children(children)
        .child(tab_bar())
}

pub fn cell_bounds(index: i32) -> (i32, i32, i32, i32) {
    let col = index % 7;
    let row = index / 7;
    let left = 40 + col * (CELL + 10);
    let top = 600 + row * (CELL + 10);
    (left, top, left + CELL, top + CELL)
}

fn day_cell(resource_id: &str, day: u32, clickable: bool) -> UiNode {
    let (l, t, r, b) = cell_bounds(day as i32 - 1);
    let cell = UiNode::new("android.view.View")
        .resource_id(resource_id)
        .bounds(l, t, r, b)
        .child(UiNode::new("TextView").text(day.to_string()).bounds(l + 40, t + 40, r - 40, b - 40));
    if clickable {
        cell.clickable()
    } else {
        cell
    }
}

pub const NEXT_MONTH: (i32, i32, i32, i32) = (800, 300, 900, 380);

/// Calendar page for `month_label` with the given free and taken days
pub fn calendar_screen(month_label: &str, available: &[u32], taken: &[u32]) -> UiNode {
    let (nl, nt, nr, nb) = NEXT_MONTH;
    let header = UiNode::new("LinearLayout")
        .bounds(200, 300, 900, 380)
        .child(UiNode::new("TextView").text(month_label).bounds(300, 300, 700, 380))
        .child(
            UiNode::new("ImageButton")
                .description("Следующий месяц")
                .clickable()
                .bounds(nl, nt, nr, nb),
        );
    let calendar = CalendarIds::default();
    let mut cells: Vec<UiNode> = available
        .iter()
        .map(|d| day_cell(&calendar.available, *d, true))
        .collect();
    cells.extend(taken.iter().map(|d| day_cell(&calendar.taken, *d, false)));
    screen(vec![
        UiNode::new("TextView").text("Выберите дату").bounds(40, 150, 600, 220),
        header,
        UiNode::new("GridLayout").bounds(0, 600, SCREEN_W, 1500).children(cells),
    ])
}

struct CalendarIds {
    available: String,
    taken: String,
}

impl Default for CalendarIds {
    fn default() -> Self {
        let c = crate::config::CalendarConfig::default();
        Self {
            available: c.available_id,
            taken: c.taken_id,
        }
    }
}

pub const BOOKING_BUTTON: (i32, i32, i32, i32) = (40, 900, 1040, 1020);
pub const FILTER_BUTTON: (i32, i32, i32, i32) = (780, 2020, 900, 2110);

/// Warehouse list with the filter bar above the tab bar
pub fn warehouse_screen(loaded: bool) -> UiNode {
    let (bl, bt, br, bb) = BOOKING_BUTTON;
    let (fl, ft, fr, fb) = FILTER_BUTTON;
    let mut children = vec![
        UiNode::new("TextView").text("Выберите склад").bounds(40, 150, 600, 220),
        UiNode::new("TextView").text("Карта").bounds(600, 2030, 760, 2100),
        UiNode::new("ImageButton").clickable().bounds(fl, ft, fr, fb),
    ];
    if loaded {
        children.push(
            UiNode::new("LinearLayout")
                .clickable()
                .bounds(bl, bt, br, bb)
                .child(UiNode::new("TextView").text("Записаться").bounds(400, 930, 680, 990)),
        );
    } else {
        children.push(UiNode::new("TextView").text("Загрузка").bounds(400, 930, 680, 990));
    }
    screen(children)
}

pub const FAVORITES_TOGGLE: (i32, i32, i32, i32) = (900, 500, 1040, 580);

pub fn filter_modal(favorites_on: bool) -> UiNode {
    let (tl, tt, tr, tb) = FAVORITES_TOGGLE;
    screen(vec![
        UiNode::new("TextView").text("Выберите склад").bounds(40, 150, 600, 220),
        UiNode::new("TextView").text("Фильтры").bounds(40, 300, 400, 380),
        UiNode::new("TextView").text("Избранные склады").bounds(40, 500, 600, 580),
        UiNode::new("android.widget.Switch")
            .checkable(favorites_on)
            .clickable()
            .bounds(tl, tt, tr, tb),
        UiNode::new("Button").text("Принять").clickable().bounds(40, 1900, 1040, 2000),
    ])
}

pub fn process_list(processes: &[&str]) -> UiNode {
    let rows: Vec<UiNode> = processes
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let top = 400 + i as i32 * 160;
            UiNode::new("LinearLayout")
                .clickable()
                .bounds(40, top, 1040, top + 140)
                .child(UiNode::new("TextView").text(*p).bounds(80, top + 40, 800, top + 100))
        })
        .collect();
    screen(vec![
        UiNode::new("TextView").text("ДОСТУПНЫЕ").bounds(40, 300, 600, 360),
        UiNode::new("RecyclerView")
            .scrollable()
            .bounds(0, 380, SCREEN_W, 2000)
            .children(rows),
    ])
}

/// Time picker with one checkbox row per `(label, checked)`
pub fn time_picker(slots: &[(&str, bool)]) -> UiNode {
    let mut children = vec![UiNode::new("TextView").text("Выберите время").bounds(40, 150, 600, 220)];
    for (i, (label, checked)) in slots.iter().enumerate() {
        let top = 400 + i as i32 * 200;
        children.push(UiNode::new("TextView").text(*label).bounds(80, top, 700, top + 80));
        children.push(
            UiNode::new("android.widget.CheckBox")
                .checkable(*checked)
                .clickable()
                .bounds(900, top, 1000, top + 80),
        );
    }
    children.push(
        UiNode::new("Button")
            .clickable()
            .bounds(40, 1900, 1040, 2000)
            .child(UiNode::new("TextView").text("Записаться").bounds(400, 1920, 680, 1980)),
    );
    screen(children)
}

pub fn plain_screen(text: &str) -> UiNode {
    screen(vec![UiNode::new("TextView").text(text).bounds(40, 150, 600, 220)])
}
