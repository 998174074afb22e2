//! Configuration for one automation run.
//!
//! Every section has a `Default` that reproduces the target app's current UI, so a config
//! file only needs to carry the booking intent (`target`) and whatever it overrides.

use crate::calendar::normalize_date;
use crate::errors::BotError;
use crate::profile::SpeedProfile;
use crate::selector::Selector;
use crate::timepicker::TimeSlot;
use crate::types::Point;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn selectors(raw: &[&str]) -> Vec<Selector> {
    raw.iter().map(|s| Selector::from(*s)).collect()
}

fn strings(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

/// External booking intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSpec {
    /// Operation name as listed on the process screen
    pub process: String,
    /// Warehouse name, used for records and alerts only
    pub warehouse: String,
    /// `DD.MM` strings
    pub target_dates: Vec<String>,
    /// `HH:MM–HH:MM` strings, in preference order
    pub time_slots: Vec<String>,
    /// Also book days that only offer a queue position
    pub allow_queue: bool,
}

impl Default for TargetSpec {
    fn default() -> Self {
        Self {
            process: String::new(),
            warehouse: String::new(),
            target_dates: Vec::new(),
            time_slots: Vec::new(),
            allow_queue: true,
        }
    }
}

/// Marker predicates per screen, checked by the classifier in a fixed priority order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenMarkers {
    pub filter_title: Vec<Selector>,
    pub favorites_toggle: Vec<Selector>,
    pub booking_button: Vec<Selector>,
    pub time_picker: Vec<Selector>,
    pub calendar: Vec<Selector>,
    pub no_slots: Vec<Selector>,
    pub process_list: Vec<Selector>,
    pub warehouse: Vec<Selector>,
    /// Present while the warehouse list is still loading
    pub loading: Vec<Selector>,
    pub bookings_tab: Vec<Selector>,
    pub other_tabs: Vec<Selector>,
    /// Any of these proves the app finished its splash screen
    pub app_loaded: Vec<Selector>,
    pub max_depth: usize,
}

impl Default for ScreenMarkers {
    fn default() -> Self {
        Self {
            filter_title: selectors(&["Фильтры"]),
            favorites_toggle: selectors(&["Избранные склады"]),
            booking_button: selectors(&["Записаться"]),
            time_picker: selectors(&["Выберите время"]),
            calendar: selectors(&["Записывайтесь заранее", "Выберите дату"]),
            no_slots: selectors(&["Нет мест", "Выберите другую операцию"]),
            process_list: selectors(&["ДОСТУПНЫЕ"]),
            warehouse: selectors(&["Выберите склад"]),
            loading: selectors(&["Загрузка", "Подождите"]),
            bookings_tab: selectors(&["selected:id:ru.ozon.hire:id/calendarTab"]),
            other_tabs: selectors(&[
                "selected:id:ru.ozon.hire:id/walletTab",
                "selected:id:ru.ozon.hire:id/tripsTab",
                "selected:id:ru.ozon.hire:id/coursesTab",
            ]),
            app_loaded: selectors(&[
                "id:ru.ozon.hire:id/warehouseTab",
                "id:ru.ozon.hire:id/calendarTab",
            ]),
            max_depth: 20,
        }
    }
}

/// Interstitial detection and dismissal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupConfig {
    pub keywords: Vec<Selector>,
    /// Tried in order; the first visible label with a clickable ancestor wins
    pub dismiss_labels: Vec<Selector>,
    /// Class-tag fragments that identify a dialog container
    pub dialog_classes: Vec<String>,
    pub dialog_max_depth: usize,
    pub close_icon_classes: Vec<String>,
    /// Lowercase description fragments of a close icon
    pub close_icon_descriptions: Vec<String>,
    /// Close icons must sit above this y coordinate...
    pub close_icon_max_top: i32,
    /// ...and extend right of this x coordinate, unless their description matches
    pub close_icon_min_right: i32,
    /// Largest width or height a close icon may have
    pub close_icon_max_px: i32,
    pub close_icon_max_depth: usize,
    pub cooldown_ms: u64,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            keywords: selectors(&[
                "Как прошла смена",
                "Оцените",
                "Обновление",
                "Обновить",
                "Позже",
                "Пропустить",
                "Не сейчас",
                "Закрыть",
                "Отмена",
                "Понятно",
                "Хорошо",
                "exact:OK",
                "exact:Ок",
                "Готово",
                "Продолжить",
                "Спасибо",
                "Новая версия",
                "Оценить",
                "Напомнить позже",
            ]),
            dismiss_labels: selectors(&[
                "Закрыть",
                "Позже",
                "Пропустить",
                "Не сейчас",
                "Отмена",
                "Понятно",
                "exact:OK",
                "exact:Ок",
                "Готово",
                "exact:Нет",
                "exact:✕",
                "exact:×",
                "Напомнить позже",
            ]),
            dialog_classes: strings(&["Dialog", "Modal", "Popup", "BottomSheet"]),
            dialog_max_depth: 5,
            close_icon_classes: strings(&["ImageButton", "ImageView"]),
            close_icon_descriptions: strings(&["close", "закрыть", "dismiss", "cancel"]),
            close_icon_max_top: 400,
            close_icon_min_right: 800,
            close_icon_max_px: 200,
            close_icon_max_depth: 10,
            cooldown_ms: 500,
        }
    }
}

/// Last-resort fixed coordinates, measured on a 1080x2280 display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryFallback {
    pub enabled: bool,
    pub home_tab: Point,
    pub filter_open: Point,
    pub filter_apply: Point,
}

impl Default for GeometryFallback {
    fn default() -> Self {
        Self {
            enabled: true,
            home_tab: Point::new(540, 2205),
            filter_open: Point::new(796, 2083),
            filter_apply: Point::new(540, 2066),
        }
    }
}

/// How to get back to the warehouse tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub home_tab_id: String,
    pub home_tab_description: String,
    pub home_tab_label: String,
    pub geometry: GeometryFallback,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            home_tab_id: "ru.ozon.hire:id/warehouseTab".to_string(),
            home_tab_description: "warehouseTab".to_string(),
            home_tab_label: "Склады".to_string(),
            geometry: GeometryFallback::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Label next to the filter button in the bottom bar
    pub open_anchor: String,
    pub favorites_label: String,
    /// Tried in order once the toggle is on
    pub apply_labels: Vec<String>,
    pub step_cooldown_ms: u64,
    /// The filter button lives in the bottom part of the screen (percent of height)
    pub bottom_region_percent: u32,
    pub row_tolerance_px: i32,
    pub max_button_width_px: i32,
    pub toggle_row_tolerance_px: i32,
    pub max_depth: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            open_anchor: "Карта".to_string(),
            favorites_label: "Избранные склады".to_string(),
            apply_labels: strings(&["Принять", "Закрыть"]),
            step_cooldown_ms: 2000,
            bottom_region_percent: 20,
            row_tolerance_px: 100,
            max_button_width_px: 300,
            toggle_row_tolerance_px: 150,
            max_depth: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub available_id: String,
    pub queue_id: String,
    /// Day the user already holds a shift on
    pub taken_id: String,
    /// Lowercase month stems, January first
    pub month_names: Vec<String>,
    pub cell_min_px: i32,
    pub cell_max_px: i32,
    pub max_depth: usize,
    pub header_max_depth: usize,
    /// Extra pause after switching months
    pub month_switch_delay_ms: u64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            available_id: "HireContainer[name=availableShift]".to_string(),
            queue_id: "HireContainer[name=queueShift]".to_string(),
            taken_id: "HireContainer[name=dayShift]".to_string(),
            month_names: strings(&[
                "январ", "феврал", "март", "апрел", "май", "июн", "июл", "август", "сентябр",
                "октябр", "ноябр", "декабр",
            ]),
            cell_min_px: 100,
            cell_max_px: 200,
            max_depth: 20,
            header_max_depth: 10,
            month_switch_delay_ms: 800,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimePickerConfig {
    pub booking_label: String,
    pub checkbox_class: String,
    pub max_checkboxes: usize,
    pub checkbox_max_distance_px: i32,
    /// A close button sits right of this x...
    pub close_min_right: i32,
    /// ...and above this y
    pub close_max_top: i32,
}

impl Default for TimePickerConfig {
    fn default() -> Self {
        Self {
            booking_label: "Записаться".to_string(),
            checkbox_class: "CheckBox".to_string(),
            max_checkboxes: 10,
            checkbox_max_distance_px: 200,
            close_min_right: 900,
            close_max_top: 1100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Header of the section listing operations without places
    pub no_places_header: String,
    pub max_scrolls: u32,
    pub warehouse_cooldown_ms: u64,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            no_places_header: "НЕТ МЕСТ".to_string(),
            max_scrolls: 2,
            warehouse_cooldown_ms: 3000,
        }
    }
}

/// Stall detection thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StallConfig {
    pub hash_max_nodes: usize,
    pub hash_max_depth: usize,
    pub stable_ticks: u32,
    pub freeze_check_interval_ms: u64,
    pub freeze_warning_ms: u64,
    pub freeze_threshold_ms: u64,
}

impl Default for StallConfig {
    fn default() -> Self {
        Self {
            hash_max_nodes: 40,
            hash_max_depth: 8,
            stable_ticks: 2,
            freeze_check_interval_ms: 5_000,
            freeze_warning_ms: 30_000,
            freeze_threshold_ms: 60_000,
        }
    }
}

/// Delays of the forced-restart chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartPolicy {
    pub after_home_ms: u64,
    pub after_force_stop_ms: u64,
    /// Settle window opened after the relaunch
    pub grace_ms: u64,
    /// Minimum gap between two restarts caused by a missing app window
    pub relaunch_cooldown_ms: u64,
    /// Minimum time since the last click before a missing window counts as lost
    pub lost_window_click_gap_ms: u64,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            after_home_ms: 1000,
            after_force_stop_ms: 1500,
            grace_ms: 2000,
            relaunch_cooldown_ms: 10_000,
            lost_window_click_gap_ms: 2000,
        }
    }
}

/// Booked-date cache and booking store access
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub refresh_interval_ms: u64,
    pub store_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 30_000,
            store_timeout_ms: 5_000,
        }
    }
}

/// Main configuration for a booking run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub target: TargetSpec,
    pub speed_profile: SpeedProfile,
    pub markers: ScreenMarkers,
    pub popups: PopupConfig,
    pub navigation: NavigationConfig,
    pub filter: FilterConfig,
    pub calendar: CalendarConfig,
    pub time_picker: TimePickerConfig,
    pub process: ProcessConfig,
    pub stall: StallConfig,
    pub restart: RestartPolicy,
    pub booking_cache: CacheConfig,
    /// Upper bound for one tick, after which it counts as idle
    pub tick_timeout_ms: u64,
}

impl BotConfig {
    pub fn from_json_str(json: &str) -> Result<Self, BotError> {
        let config: BotConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BotError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    /// Reject configurations the loop cannot act on
    pub fn validate(&self) -> Result<(), BotError> {
        let marker_groups: [(&str, &[Selector]); 14] = [
            ("markers.filter_title", &self.markers.filter_title),
            ("markers.favorites_toggle", &self.markers.favorites_toggle),
            ("markers.booking_button", &self.markers.booking_button),
            ("markers.time_picker", &self.markers.time_picker),
            ("markers.calendar", &self.markers.calendar),
            ("markers.no_slots", &self.markers.no_slots),
            ("markers.process_list", &self.markers.process_list),
            ("markers.warehouse", &self.markers.warehouse),
            ("markers.loading", &self.markers.loading),
            ("markers.bookings_tab", &self.markers.bookings_tab),
            ("popups.keywords", &self.popups.keywords),
            ("popups.dismiss_labels", &self.popups.dismiss_labels),
            ("markers.other_tabs", &self.markers.other_tabs),
            ("markers.app_loaded", &self.markers.app_loaded),
        ];
        for (name, group) in marker_groups {
            if let Some(bad) = group.iter().find(|s| !s.is_valid()) {
                return Err(BotError::InvalidConfig(format!(
                    "{name} contains an invalid selector: {bad}"
                )));
            }
        }

        if self.navigation.home_tab_id.trim().is_empty()
            && self.navigation.home_tab_description.trim().is_empty()
            && self.navigation.home_tab_label.trim().is_empty()
        {
            return Err(BotError::InvalidConfig(
                "navigation needs a home tab id, description or label".to_string(),
            ));
        }

        if self.calendar.month_names.len() != 12 {
            return Err(BotError::InvalidConfig(format!(
                "calendar.month_names must list 12 months, got {}",
                self.calendar.month_names.len()
            )));
        }

        if let Some(bad) = self
            .target
            .target_dates
            .iter()
            .find(|d| normalize_date(d).is_none())
        {
            return Err(BotError::InvalidConfig(format!(
                "target.target_dates: '{bad}' is not a DD.MM date"
            )));
        }

        for slot in &self.target.time_slots {
            if TimeSlot::parse(slot).is_none() {
                return Err(BotError::InvalidConfig(format!(
                    "target.time_slots: cannot parse '{slot}'"
                )));
            }
        }

        if self.stall.stable_ticks == 0 || self.stall.hash_max_nodes == 0 {
            return Err(BotError::InvalidConfig(
                "stall.stable_ticks and stall.hash_max_nodes must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Target dates in `DD.MM` form without duplicates, skipping anything `validate` would reject
    pub fn target_dates(&self) -> Vec<String> {
        let mut dates: Vec<String> = Vec::new();
        for date in self.target.target_dates.iter().filter_map(|d| normalize_date(d)) {
            if !dates.contains(&date) {
                dates.push(date);
            }
        }
        dates
    }

    /// Parsed time slots, skipping anything `validate` would reject
    pub fn time_slots(&self) -> Vec<TimeSlot> {
        self.target
            .time_slots
            .iter()
            .filter_map(|s| TimeSlot::parse(s))
            .collect()
    }

    pub fn effective_tick_timeout_ms(&self) -> u64 {
        if self.tick_timeout_ms == 0 {
            self.speed_profile.step_timeout_ms()
        } else {
            self.tick_timeout_ms
        }
    }
}
