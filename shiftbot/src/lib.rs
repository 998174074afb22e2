//! Shift booking automation driven through a mobile app's accessibility tree
//!
//! A single perception-action loop captures the target app's widget tree, classifies the
//! visible screen and performs at most one paced action per tick: navigating to the
//! warehouse list, configuring the favorites filter, picking a target date on the
//! calendar and ticking a time slot. Device access, booking history and alert delivery
//! are collaborators behind the [`UiSource`], [`BookingStore`] and [`AlertSink`] traits.

pub mod actuator;
pub mod alerts;
pub mod booking;
pub mod calendar;
pub mod clock;
pub mod commands;
pub mod config;
pub mod control;
pub mod errors;
pub mod filter;
pub mod logging;
pub mod navigation;
pub mod popup;
pub mod process;
pub mod profile;
pub mod restart;
pub mod scheduler;
pub mod screen;
pub mod selector;
pub mod session;
pub mod snapshot;
pub mod source;
pub mod stall;
#[cfg(test)]
mod tests;
pub mod timepicker;
pub mod types;
pub mod watch;

pub use alerts::{AlertSink, TracingAlertSink};
pub use booking::{BookedDateCache, BookingRecord, BookingStatus, BookingStore, MemoryBookingStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use commands::AutomationHandle;
pub use config::{BotConfig, TargetSpec};
pub use control::{BookingLoop, Services, TickOutcome};
pub use errors::BotError;
pub use profile::SpeedProfile;
pub use screen::{Screen, ScreenClassifier};
pub use selector::Selector;
pub use snapshot::{NodeId, UiNode, UiSnapshot};
pub use source::{ReplaySource, UiSource};
pub use timepicker::TimeSlot;
pub use types::{Point, Rect};
