use super::*;
use crate::actuator::{Actuator, TickContext};
use crate::calendar::{handle_calendar, CalendarAction};
use crate::filter::{run_filter_step, FilterPhase, FilterStep};
use crate::navigation::{go_to_home_tab, NavigationStrategy};
use crate::process::{handle_process_list, handle_warehouse};
use crate::profile::SpeedProfile;
use crate::screen::ScreenClassifier;
use crate::session::SessionState;
use crate::snapshot::UiSnapshot;
use crate::source::Dispatched;
use crate::timepicker::{handle_time_picker, TimePickerAction, TimeSlot};
use crate::types::Rect;
use std::collections::BTreeSet;

struct Bench {
    source: Arc<ReplaySource>,
    actuator: Actuator,
    state: SessionState,
    config: BotConfig,
    now: u64,
}

impl Bench {
    fn new(config: BotConfig) -> Self {
        let clock = Arc::new(ManualClock::new(10_000));
        let source = Arc::new(ReplaySource::new(clock));
        Self {
            actuator: Actuator::new(source.clone(), SpeedProfile::Normal),
            source,
            state: SessionState::new(10_000),
            config,
            now: 10_000,
        }
    }

    fn ctx<'a>(&'a mut self, snapshot: &'a UiSnapshot) -> TickContext<'a> {
        TickContext {
            snapshot,
            state: &mut self.state,
            actuator: &self.actuator,
            config: &self.config,
            now: self.now,
        }
    }

    /// Move past every cooldown and settle window
    fn wait(&mut self, ms: u64) {
        self.now += ms;
    }

    fn log(&self) -> Vec<Dispatched> {
        self.source.dispatched().into_iter().map(|(_, d)| d).collect()
    }
}

fn rect((l, t, r, b): (i32, i32, i32, i32)) -> Rect {
    Rect::new(l, t, r, b)
}

#[test]
fn test_scenario_a_selects_target_day() {
    init_tracing();
    let mut bench = Bench::new(config_with_dates(&["18.03"]));
    let snapshot = UiSnapshot::new(calendar_screen("Март 2026", &[15, 18, 22], &[]), 0);
    let dates = vec!["18.03".to_string()];
    let outcome = handle_calendar(&mut bench.ctx(&snapshot), &dates, &BTreeSet::new());

    assert_eq!(outcome.action, CalendarAction::Selected("18.03".to_string()));
    assert_eq!(outcome.available_targets, vec!["18.03".to_string()]);
    assert_eq!(bench.state.last_selected_date.as_deref(), Some("18.03"));
    assert_eq!(bench.source.taps(), vec![rect(cell_bounds(17))]);
}

#[test]
fn test_scenario_b_advances_month_instead_of_exiting() {
    let mut bench = Bench::new(config_with_dates(&["18.03", "02.04"]));
    let snapshot = UiSnapshot::new(calendar_screen("Март", &[5, 9], &[]), 0);
    let dates = vec!["18.03".to_string(), "02.04".to_string()];
    let outcome = handle_calendar(&mut bench.ctx(&snapshot), &dates, &BTreeSet::new());

    assert_eq!(outcome.action, CalendarAction::AdvancedMonth);
    assert_eq!(bench.log(), vec![Dispatched::Tap(rect(NEXT_MONTH))]);
    assert!(bench.state.last_selected_date.is_none());
}

#[test]
fn test_calendar_skips_taken_booked_and_locally_booked_days() {
    let mut bench = Bench::new(config_with_dates(&["15.03", "18.03", "22.03", "25.03"]));
    bench.state.booked_locally.insert("22.03".to_string());
    let snapshot = UiSnapshot::new(calendar_screen("Март", &[15, 22, 25], &[18]), 0);
    let dates: Vec<String> = ["15.03", "18.03", "22.03", "25.03"].iter().map(|d| d.to_string()).collect();
    let booked: BTreeSet<String> = ["15.03".to_string()].into();
    let outcome = handle_calendar(&mut bench.ctx(&snapshot), &dates, &booked);

    assert_eq!(outcome.action, CalendarAction::Selected("25.03".to_string()));
    assert_eq!(bench.source.taps(), vec![rect(cell_bounds(24))]);
}

#[test]
fn test_calendar_exits_when_no_target_month_ahead() {
    let mut bench = Bench::new(config_with_dates(&["18.02"]));
    let snapshot = UiSnapshot::new(calendar_screen("Март", &[5, 18], &[]), 0);
    let dates = vec!["18.02".to_string()];
    let outcome = handle_calendar(&mut bench.ctx(&snapshot), &dates, &BTreeSet::new());

    assert_eq!(outcome.action, CalendarAction::Exited);
    // Home tab found by id in the tab bar
    assert_eq!(bench.source.taps(), vec![Rect::new(0, 2130, 270, 2280)]);
    assert!(bench.state.in_settle_window(bench.now));
}

#[test]
fn test_navigation_falls_back_to_geometry_then_back() {
    let mut bench = Bench::new(BotConfig::default());
    let bare = UiSnapshot::new(
        UiNode::new("FrameLayout")
            .bounds(0, 0, SCREEN_W, SCREEN_H)
            .child(UiNode::new("TextView").text("Профиль")),
        0,
    );
    assert_eq!(
        go_to_home_tab(&mut bench.ctx(&bare)),
        Some(NavigationStrategy::GeometryFallback)
    );
    assert_eq!(bench.source.taps(), vec![Rect::around(540, 2205)]);

    bench.wait(5_000);
    bench.config.navigation.geometry.enabled = false;
    assert_eq!(go_to_home_tab(&mut bench.ctx(&bare)), Some(NavigationStrategy::Back));
}

#[test]
fn test_filter_workflow_spans_ticks() {
    let mut bench = Bench::new(BotConfig::default());

    let closed = UiSnapshot::new(warehouse_screen(true), 0);
    assert_eq!(run_filter_step(&mut bench.ctx(&closed), false), FilterStep::Acted);
    assert_eq!(bench.source.taps(), vec![rect(FILTER_BUTTON)]);

    let open_off = UiSnapshot::new(filter_modal(false), 0);
    // Step cooldown still running
    bench.wait(500);
    assert_eq!(run_filter_step(&mut bench.ctx(&open_off), true), FilterStep::Waiting);

    bench.wait(3_000);
    assert_eq!(run_filter_step(&mut bench.ctx(&open_off), true), FilterStep::Acted);
    assert!(matches!(bench.state.filter.phase, FilterPhase::ToggleClicked { .. }));
    assert_eq!(bench.source.taps().last(), Some(&rect(FAVORITES_TOGGLE)));

    let open_on = UiSnapshot::new(filter_modal(true), 0);
    bench.wait(1_000);
    assert_eq!(run_filter_step(&mut bench.ctx(&open_on), true), FilterStep::Acted);
    assert!(matches!(bench.state.filter.phase, FilterPhase::Closing { .. }));
    assert_eq!(bench.source.taps().last(), Some(&Rect::new(40, 1900, 1040, 2000)));

    bench.wait(2_000);
    assert_eq!(run_filter_step(&mut bench.ctx(&closed), false), FilterStep::Waiting);
    assert!(bench.state.filter.configured);
    assert_eq!(bench.state.filter.phase, FilterPhase::Idle);
}

#[test]
fn test_configured_filter_only_ever_closes() {
    let mut bench = Bench::new(BotConfig::default());
    bench.state.filter.configured = true;

    let closed = UiSnapshot::new(warehouse_screen(true), 0);
    assert_eq!(run_filter_step(&mut bench.ctx(&closed), false), FilterStep::Skipped);
    assert!(bench.log().is_empty());

    let open = UiSnapshot::new(filter_modal(false), 0);
    assert_eq!(run_filter_step(&mut bench.ctx(&open), true), FilterStep::Acted);
    bench.wait(5_000);
    run_filter_step(&mut bench.ctx(&open), true);
    assert_eq!(bench.log(), vec![Dispatched::Back, Dispatched::Back]);
}

#[test]
fn test_missing_filter_control_marks_configured() {
    let mut bench = Bench::new(BotConfig::default());
    bench.config.navigation.geometry.enabled = false;
    let no_filter = UiSnapshot::new(plain_screen("Выберите склад"), 0);
    assert_eq!(run_filter_step(&mut bench.ctx(&no_filter), false), FilterStep::Skipped);
    assert!(bench.state.filter.configured);
    assert!(bench.log().is_empty());
}

#[test]
fn test_warehouse_waits_for_load_then_books() {
    let mut bench = Bench::new(BotConfig::default());
    bench.state.filter.configured = true;
    let classifier = ScreenClassifier::default();

    let loading = UiSnapshot::new(warehouse_screen(false), 0);
    assert!(!handle_warehouse(&mut bench.ctx(&loading), &classifier));
    assert!(bench.log().is_empty());
    assert!(!bench.state.force_home);

    let loaded = UiSnapshot::new(warehouse_screen(true), 0);
    assert!(handle_warehouse(&mut bench.ctx(&loaded), &classifier));
    assert_eq!(bench.source.taps(), vec![rect(BOOKING_BUTTON)]);

    // Warehouse cooldown keeps a second press away
    bench.wait(1_500);
    assert!(!handle_warehouse(&mut bench.ctx(&loaded), &classifier));
    assert_eq!(bench.source.taps().len(), 1);
}

#[test]
fn test_process_list_opens_process_or_scrolls() {
    let mut bench = Bench::new(config_with_dates(&[]));
    let listed = UiSnapshot::new(process_list(&["Отгрузка", "Приёмка"]), 0);
    assert!(handle_process_list(&mut bench.ctx(&listed)));
    assert_eq!(bench.source.taps(), vec![Rect::new(40, 560, 1040, 700)]);

    bench.source.clear_log();
    let missing = UiSnapshot::new(process_list(&["Отгрузка"]), 0);
    for _ in 0..2 {
        bench.wait(1_000);
        assert!(handle_process_list(&mut bench.ctx(&missing)));
    }
    bench.wait(1_000);
    assert!(handle_process_list(&mut bench.ctx(&missing)));
    let log = bench.log();
    assert!(matches!(log[0], Dispatched::Scroll(_)));
    assert!(matches!(log[1], Dispatched::Scroll(_)));
    // Gave up scrolling, went home
    assert_eq!(log[2], Dispatched::Tap(Rect::new(0, 2130, 270, 2280)));
}

#[test]
fn test_time_picker_ticks_then_books() {
    let mut bench = Bench::new(config_with_dates(&["18.03"]));
    bench.state.last_selected_date = Some("18.03".to_string());
    let slots = vec![TimeSlot::parse("08:00–20:00").expect("slot")];
    let dates = vec!["18.03".to_string()];

    let unticked = UiSnapshot::new(time_picker(&[("09:00 - 21:00", false), ("8:00 - 20:00", false)]), 0);
    assert_eq!(
        handle_time_picker(&mut bench.ctx(&unticked), &slots, &dates),
        TimePickerAction::Ticked
    );
    assert_eq!(bench.source.taps(), vec![Rect::new(900, 600, 1000, 680)]);

    bench.wait(1_000);
    let ticked = UiSnapshot::new(time_picker(&[("09:00 - 21:00", false), ("8:00 - 20:00", true)]), 0);
    assert_eq!(
        handle_time_picker(&mut bench.ctx(&ticked), &slots, &dates),
        TimePickerAction::BookingClicked {
            date: "18.03".to_string(),
            time_slot: "08:00–20:00".to_string()
        }
    );
    assert_eq!(bench.source.taps().last(), Some(&Rect::new(40, 1900, 1040, 2000)));
    assert!(bench.state.booked_locally.contains("18.03"));
}

#[test]
fn test_time_picker_without_slots_closes() {
    let mut bench = Bench::new(BotConfig::default());
    let picker = UiSnapshot::new(time_picker(&[("08:00 - 20:00", false)]), 0);
    assert_eq!(
        handle_time_picker(&mut bench.ctx(&picker), &[], &[]),
        TimePickerAction::Closed
    );
    assert_eq!(bench.log(), vec![Dispatched::Back]);
}
