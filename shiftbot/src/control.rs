//! The perception-action loop: one tick classifies the current screen and performs at
//! most one action on it.

use crate::actuator::{Actuator, TickContext};
use crate::alerts::AlertSink;
use crate::booking::{BookedDateCache, BookingRecord, BookingStatus, BookingStore};
use crate::calendar::{handle_calendar, CalendarAction};
use crate::clock::Clock;
use crate::config::BotConfig;
use crate::filter::{run_filter_step, FilterPhase, FilterStep};
use crate::navigation::go_to_home_tab;
use crate::popup::dismiss_popups;
use crate::process::{handle_no_slots, handle_process_list, handle_warehouse};
use crate::restart::force_restart;
use crate::screen::{Screen, ScreenClassifier};
use crate::session::{SessionState, SharedState};
use crate::snapshot::UiSnapshot;
use crate::source::UiSource;
use crate::stall::StallDetector;
use crate::timepicker::{handle_time_picker, TimePickerAction, TimeSlot};
use crate::watch::ShiftWatch;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Everything the loop talks to outside itself
#[derive(Clone)]
pub struct Services {
    pub source: Arc<dyn UiSource>,
    pub alerts: Arc<dyn AlertSink>,
    pub store: Arc<dyn BookingStore>,
    pub cache: Arc<BookedDateCache>,
    pub clock: Arc<dyn Clock>,
}

/// Result of one tick, which picks the next poll interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Active,
    Idle,
    /// The running flag is off; the loop should end
    Stopped,
}

impl TickOutcome {
    pub fn is_active(self) -> bool {
        self == TickOutcome::Active
    }
}

/// What the synchronous part of a tick asks the async part to finish
#[derive(Debug)]
enum Step {
    Idle,
    Active,
    Restart,
    Booked { date: String, time_slot: String },
}

impl From<bool> for Step {
    fn from(acted: bool) -> Self {
        if acted {
            Step::Active
        } else {
            Step::Idle
        }
    }
}

pub struct BookingLoop {
    config: Arc<BotConfig>,
    actuator: Actuator,
    classifier: ScreenClassifier,
    stall: StallDetector,
    alerts: Arc<dyn AlertSink>,
    store: Arc<dyn BookingStore>,
    cache: Arc<BookedDateCache>,
    clock: Arc<dyn Clock>,
    shared: Arc<SharedState>,
    slots: Vec<TimeSlot>,
    state: SessionState,
    watch: ShiftWatch,
    last_screen: Option<Screen>,
}

impl BookingLoop {
    /// A loop with a fresh session
    pub fn new(config: Arc<BotConfig>, services: &Services, shared: Arc<SharedState>) -> Self {
        let now = services.clock.now_ms();
        Self {
            actuator: Actuator::new(services.source.clone(), config.speed_profile),
            classifier: ScreenClassifier::new(config.markers.clone()),
            stall: StallDetector::new(config.stall.clone(), services.alerts.clone()),
            alerts: services.alerts.clone(),
            store: services.store.clone(),
            cache: services.cache.clone(),
            clock: services.clock.clone(),
            shared,
            slots: config.time_slots(),
            state: SessionState::new(now),
            watch: ShiftWatch::new(),
            last_screen: None,
            config,
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn last_screen(&self) -> Option<Screen> {
        self.last_screen
    }

    /// Launch the target app and wait, bounded by the step timeout, until it has loaded
    pub async fn launch(&mut self) -> bool {
        let source = self.actuator.source().clone();
        if let Err(e) = source.launch_app() {
            warn!(error = %e, "launching target app failed");
        }
        let profile = self.config.speed_profile;
        let poll = Duration::from_millis(profile.active_poll_ms());
        let classifier = &self.classifier;
        let loaded = tokio::time::timeout(Duration::from_millis(profile.step_timeout_ms()), async {
            loop {
                if let Some(snapshot) = source.capture_snapshot() {
                    if classifier.is_app_loaded(&snapshot) {
                        break;
                    }
                }
                tokio::time::sleep(poll).await;
            }
        })
        .await
        .is_ok();

        let now = self.clock.now_ms();
        self.state = SessionState::new(now);
        if loaded {
            info!("target app loaded");
        } else {
            warn!("target app did not finish loading, starting anyway");
        }
        loaded
    }

    /// One pass of perception and action. Never overlaps itself: it takes `&mut self`.
    #[instrument(level = "debug", skip(self))]
    pub async fn tick(&mut self) -> TickOutcome {
        if !self.shared.is_running() {
            return TickOutcome::Stopped;
        }
        let now = self.clock.now_ms();
        if self.state.in_settle_window(now) {
            return TickOutcome::Idle;
        }
        if self
            .state
            .check_step_timeout(now, self.config.speed_profile.step_timeout_ms())
        {
            debug!("no progress within step timeout, step counter reset");
        }

        let Some(snapshot) = self.actuator.source().capture_snapshot() else {
            return self.on_window_lost(now).await;
        };

        let step = self.step(&snapshot, now);
        drop(snapshot);

        let outcome = match step {
            Step::Idle => TickOutcome::Idle,
            Step::Active => TickOutcome::Active,
            Step::Restart => {
                self.restart().await;
                TickOutcome::Active
            }
            Step::Booked { date, time_slot } => {
                self.record_booking(date, time_slot).await;
                TickOutcome::Active
            }
        };
        if outcome.is_active() {
            self.state.last_action_ms = now;
            self.state.mark_step(now);
        }
        outcome
    }

    fn step(&mut self, snapshot: &UiSnapshot, now: u64) -> Step {
        let screen = self.classifier.classify(snapshot);
        if self.last_screen != Some(screen) {
            debug!(%screen, "screen changed");
            self.last_screen = Some(screen);
        }

        let target_dates = self.shared.target_dates();
        let booked = self.cache.snapshot();
        let mut ctx = TickContext {
            snapshot,
            state: &mut self.state,
            actuator: &self.actuator,
            config: self.config.as_ref(),
            now,
        };

        if let Some(method) = dismiss_popups(&mut ctx, screen) {
            debug!(?method, "popup handled");
            return Step::Active;
        }

        let hash = self.stall.hash(snapshot);
        if self
            .stall
            .check_for_freeze(&mut ctx.state.stall, &mut ctx.state.restart_count, hash, now)
        {
            return Step::Restart;
        }
        if !self.stall.is_stable(&mut ctx.state.stall, hash) {
            return Step::Idle;
        }

        if !ctx.actuator.ready(ctx.state, now) {
            return Step::Idle;
        }

        if screen == Screen::BookingsTab || (ctx.state.force_home && !screen.is_productive()) {
            return go_to_home_tab(&mut ctx).is_some().into();
        }

        match screen {
            Screen::TimePicker => match handle_time_picker(&mut ctx, &self.slots, &target_dates) {
                TimePickerAction::BookingClicked { date, time_slot } => Step::Booked { date, time_slot },
                TimePickerAction::Ticked | TimePickerAction::Closed => Step::Active,
                TimePickerAction::Idle => Step::Idle,
            },
            Screen::Calendar => {
                let outcome = handle_calendar(&mut ctx, &target_dates, &booked);
                let target = &self.config.target;
                let fresh = self
                    .watch
                    .observe(&target.process, &target.warehouse, &outcome.available_targets, now);
                if !fresh.is_empty() {
                    self.alerts.notify_available_shifts(&target.process, &fresh);
                }
                if let CalendarAction::Selected(date) = &outcome.action {
                    self.shared.publish_last_selected_date(Some(date.clone()));
                }
                (outcome.action != CalendarAction::Idle).into()
            }
            Screen::NoSlots => handle_no_slots(&mut ctx).into(),
            Screen::ProcessList => handle_process_list(&mut ctx).into(),
            Screen::Warehouse => handle_warehouse(&mut ctx, &self.classifier).into(),
            Screen::FilterModal => {
                if ctx.state.filter.configured && ctx.state.filter.phase == FilterPhase::Idle {
                    debug!("filter modal open after setup, closing it");
                    let closed = ctx.back();
                    if closed {
                        ctx.mark_navigation();
                    }
                    closed.into()
                } else {
                    (run_filter_step(&mut ctx, true) == FilterStep::Acted).into()
                }
            }
            Screen::BookingsTab | Screen::OtherTab | Screen::Unknown => {
                go_to_home_tab(&mut ctx).is_some().into()
            }
        }
    }

    /// No window to look at: restart the app once both the click gap and the relaunch
    /// cooldown have passed
    async fn on_window_lost(&mut self, now: u64) -> TickOutcome {
        let policy = &self.config.restart;
        let click_gap_ok = self.actuator.ready(&self.state, now)
            && now.saturating_sub(self.state.last_click_ms) >= policy.lost_window_click_gap_ms;
        let cooldown_ok = self
            .state
            .last_relaunch_ms
            .map_or(true, |last| now.saturating_sub(last) >= policy.relaunch_cooldown_ms);
        if !(click_gap_ok && cooldown_ok) {
            return TickOutcome::Idle;
        }
        warn!("target app window not available, restarting it");
        self.restart().await;
        TickOutcome::Active
    }

    async fn restart(&mut self) {
        let result = force_restart(self.actuator.source().as_ref(), &self.config.restart).await;
        let now = self.clock.now_ms();
        self.state.reset_baselines(now);
        self.state.last_relaunch_ms = Some(now);
        self.state.force_home = true;
        self.state.mark_navigation(now, self.config.restart.grace_ms);
        self.actuator.record_click(&mut self.state, now, 0);
        self.shared.publish_restart_count(self.state.restart_count);
        match result {
            Ok(report) => {
                debug!(?report, "restart finished");
                self.alerts.notify_restart_complete();
            }
            Err(e) => error!(error = %e, "relaunching target app failed"),
        }
    }

    async fn record_booking(&mut self, date: String, time_slot: String) {
        let target = &self.config.target;
        self.alerts.notify_booking(&target.process, &date, &time_slot);
        let record = BookingRecord::new(
            target.warehouse.clone(),
            target.process.clone(),
            date,
            time_slot,
            BookingStatus::Success,
        );
        let timeout = Duration::from_millis(self.config.booking_cache.store_timeout_ms);
        match tokio::time::timeout(timeout, self.store.record_booking(record)).await {
            Ok(Ok(())) => debug!("booking recorded"),
            Ok(Err(e)) => warn!(error = %e, "recording booking failed"),
            Err(_) => warn!(timeout_ms = timeout.as_millis() as u64, "recording booking timed out"),
        }
    }
}
