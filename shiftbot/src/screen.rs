use crate::config::ScreenMarkers;
use crate::selector::any_present;
use crate::snapshot::UiSnapshot;
use std::fmt;

/// The classified mode of the target app's foreground UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    FilterModal,
    TimePicker,
    Calendar,
    NoSlots,
    ProcessList,
    Warehouse,
    BookingsTab,
    OtherTab,
    Unknown,
}

impl Screen {
    /// Screens the dispatcher has a dedicated handler for; popups are never hunted on them
    pub fn is_productive(self) -> bool {
        matches!(
            self,
            Screen::Warehouse
                | Screen::Calendar
                | Screen::TimePicker
                | Screen::ProcessList
                | Screen::FilterModal
                | Screen::NoSlots
        )
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Screen::FilterModal => "filter",
            Screen::TimePicker => "time-picker",
            Screen::Calendar => "calendar",
            Screen::NoSlots => "no-slots",
            Screen::ProcessList => "process-list",
            Screen::Warehouse => "warehouse",
            Screen::BookingsTab => "bookings-tab",
            Screen::OtherTab => "other-tab",
            Screen::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Marker hits of one snapshot, evaluated once per classification
#[derive(Debug, Clone, Copy, Default)]
struct MarkerHits {
    filter_title: bool,
    favorites: bool,
    booking_button: bool,
    time_picker: bool,
    calendar: bool,
    no_slots: bool,
    process_list: bool,
    warehouse: bool,
    bookings_tab: bool,
    other_tab: bool,
}

/// Maps a snapshot to exactly one [`Screen`].
///
/// Predicates are evaluated in priority order; overlays come first because they share
/// visible text with the screen underneath them.
#[derive(Debug, Clone)]
pub struct ScreenClassifier {
    markers: ScreenMarkers,
}

impl ScreenClassifier {
    pub fn new(markers: ScreenMarkers) -> Self {
        Self { markers }
    }

    pub fn markers(&self) -> &ScreenMarkers {
        &self.markers
    }

    fn hits(&self, snapshot: &UiSnapshot) -> MarkerHits {
        let m = &self.markers;
        let depth = m.max_depth;
        MarkerHits {
            filter_title: any_present(&m.filter_title, snapshot, depth),
            favorites: any_present(&m.favorites_toggle, snapshot, depth),
            booking_button: any_present(&m.booking_button, snapshot, depth),
            time_picker: any_present(&m.time_picker, snapshot, depth),
            calendar: any_present(&m.calendar, snapshot, depth),
            no_slots: any_present(&m.no_slots, snapshot, depth),
            process_list: any_present(&m.process_list, snapshot, depth),
            warehouse: any_present(&m.warehouse, snapshot, depth),
            bookings_tab: any_present(&m.bookings_tab, snapshot, depth),
            other_tab: any_present(&m.other_tabs, snapshot, depth),
        }
    }

    pub fn classify(&self, snapshot: &UiSnapshot) -> Screen {
        let h = self.hits(snapshot);

        if h.filter_title && h.favorites && !h.booking_button {
            Screen::FilterModal
        } else if h.time_picker {
            Screen::TimePicker
        } else if h.calendar {
            Screen::Calendar
        } else if h.no_slots {
            Screen::NoSlots
        } else if h.process_list && !h.warehouse {
            Screen::ProcessList
        } else if h.warehouse {
            Screen::Warehouse
        } else if h.bookings_tab {
            Screen::BookingsTab
        } else if h.other_tab {
            Screen::OtherTab
        } else {
            Screen::Unknown
        }
    }

    /// Whether the warehouse list finished loading: booking buttons shown, no spinner text
    pub fn is_warehouse_loaded(&self, snapshot: &UiSnapshot) -> bool {
        let m = &self.markers;
        any_present(&m.warehouse, snapshot, m.max_depth)
            && any_present(&m.booking_button, snapshot, m.max_depth)
            && !any_present(&m.loading, snapshot, m.max_depth)
    }

    pub fn is_filter_modal_open(&self, snapshot: &UiSnapshot) -> bool {
        let h = self.hits(snapshot);
        h.filter_title && h.favorites && !h.booking_button
    }

    /// The app has rendered its tab bar
    pub fn is_app_loaded(&self, snapshot: &UiSnapshot) -> bool {
        self.markers
            .app_loaded
            .iter()
            .any(|s| snapshot.bfs_all_windows(usize::MAX).any(|id| s.matches(snapshot, id)))
    }
}

impl Default for ScreenClassifier {
    fn default() -> Self {
        Self::new(ScreenMarkers::default())
    }
}
