use super::*;
use crate::booking::BookingStatus;
use crate::clock::Clock;
use crate::control::TickOutcome;
use crate::screen::Screen;
use crate::source::Dispatched;
use crate::types::Rect;

#[tokio::test]
async fn test_loop_books_target_day_after_ui_settles() {
    init_tracing();
    let mut h = Harness::new(config_with_dates(&["18.03"]));
    h.source.set_screen(Some(calendar_screen("Март", &[15, 18, 22], &[])));

    // Two ticks to establish a stable fingerprint, the third acts
    assert_eq!(h.booking_loop.tick().await, TickOutcome::Idle);
    h.clock.advance(300);
    assert_eq!(h.booking_loop.tick().await, TickOutcome::Idle);
    h.clock.advance(300);
    assert_eq!(h.booking_loop.tick().await, TickOutcome::Active);

    assert_eq!(h.booking_loop.last_screen(), Some(Screen::Calendar));
    assert_eq!(h.source.taps(), vec![{
        let (l, t, r, b) = cell_bounds(17);
        Rect::new(l, t, r, b)
    }]);
    assert_eq!(h.booking_loop.state().last_selected_date.as_deref(), Some("18.03"));
    assert_eq!(h.shared.last_selected_date().as_deref(), Some("18.03"));
    assert_eq!(h.alerts.count("shifts"), 1);
}

#[tokio::test]
async fn test_loop_skips_dates_in_booked_cache() {
    let mut h = Harness::new(config_with_dates(&["18.03", "22.03"]));
    h.cache.publish(["18.03".to_string()], 1);
    h.source.set_screen(Some(calendar_screen("Март", &[18, 22], &[])));
    assert!(h.tick_until_dispatch(300, 5).await);
    let (l, t, r, b) = cell_bounds(21);
    assert_eq!(h.source.taps(), vec![Rect::new(l, t, r, b)]);
}

#[tokio::test]
async fn test_scenario_c_frozen_ui_restarts_once() {
    let mut h = Harness::new(config_with_dates(&["18.03"]));
    h.source.set_screen(Some(plain_screen("Профиль")));

    let start = h.clock.now_ms();
    while h.clock.now_ms() - start <= 65_000 {
        h.booking_loop.tick().await;
        h.clock.advance(500);
    }

    assert_eq!(h.shared.restart_count(), 1);
    assert_eq!(h.booking_loop.state().restart_count, 1);
    assert_eq!(h.alerts.count("freeze"), 1);
    assert_eq!(h.alerts.count("restarted"), 1);
    let force_stops = h
        .source
        .dispatched()
        .iter()
        .filter(|(_, d)| *d == Dispatched::ForceStop)
        .count();
    assert_eq!(force_stops, 1);
}

#[tokio::test]
async fn test_alternating_ui_never_restarts() {
    let mut h = Harness::new(config_with_dates(&["18.03"]));
    let mut flip = false;
    let start = h.clock.now_ms();
    // One freeze check per tick, each seeing the other screen
    while h.clock.now_ms() - start <= 120_000 {
        let text = if flip { "Профиль" } else { "Настройки" };
        h.source.set_screen(Some(plain_screen(text)));
        flip = !flip;
        h.booking_loop.tick().await;
        h.clock.advance(5_000);
    }
    assert_eq!(h.shared.restart_count(), 0);
    assert_eq!(h.alerts.count("freeze"), 0);
}

#[tokio::test]
async fn test_nothing_dispatched_inside_settle_window() {
    let mut h = Harness::new(config_with_dates(&["18.03"]));
    h.source.set_screen(Some(plain_screen("Профиль")));

    assert!(h.tick_until_dispatch(300, 5).await);
    let (first_at, first) = h.source.dispatched()[0];
    assert_eq!(first, Dispatched::Tap(Rect::new(0, 2130, 270, 2280)));

    let settle = h.booking_loop.config().speed_profile.settle_window_ms();
    for _ in 0..7 {
        h.clock.advance(100);
        if h.clock.now_ms() < first_at + settle {
            assert_eq!(h.booking_loop.tick().await, TickOutcome::Idle);
        }
    }
    assert_eq!(h.source.dispatched().len(), 1);

    h.clock.set(first_at + settle);
    assert!(h.tick_until_dispatch(300, 5).await);
    let (second_at, _) = h.source.dispatched()[1];
    assert!(second_at >= first_at + settle);
}

#[tokio::test]
async fn test_dispatches_are_paced_by_click_delay() {
    let mut h = Harness::new(config_with_dates(&[]));
    h.source.set_screen(Some(process_list(&["Отгрузка"])));
    for _ in 0..400 {
        h.booking_loop.tick().await;
        h.clock.advance(10);
    }

    let delay = h.booking_loop.config().speed_profile.click_delay_ms();
    let log = h.source.dispatched();
    assert!(log.len() >= 2, "expected several actions, got {log:?}");
    for pair in log.windows(2) {
        assert!(pair[1].0 - pair[0].0 >= delay, "actions too close: {pair:?}");
    }
}

#[tokio::test]
async fn test_popup_dismissed_before_dispatch() {
    let mut h = Harness::new(config_with_dates(&["18.03"]));
    h.source.set_screen(Some(screen(vec![
        UiNode::new("TextView").text("Как прошла смена?").bounds(40, 300, 1040, 400),
        UiNode::new("Button").text("Позже").clickable().bounds(40, 1500, 500, 1600),
    ])));
    assert_eq!(h.booking_loop.tick().await, TickOutcome::Active);
    assert_eq!(h.source.taps(), vec![Rect::new(40, 1500, 500, 1600)]);
}

#[tokio::test]
async fn test_home_recovery_waits_for_click_cooldown() {
    let mut h = Harness::new(config_with_dates(&["18.03"]));
    h.source.set_screen(Some(screen(vec![
        UiNode::new("TextView").text("Как прошла смена?").bounds(40, 300, 1040, 400),
        UiNode::new("Button").text("Позже").clickable().bounds(40, 1500, 500, 1600),
    ])));
    assert_eq!(h.booking_loop.tick().await, TickOutcome::Active);
    let (popup_at, _) = h.source.dispatched()[0];

    // Stable on the third tick, still inside the click cooldown
    h.source.set_screen(Some(plain_screen("Профиль")));
    for _ in 0..3 {
        h.clock.advance(50);
        assert_eq!(h.booking_loop.tick().await, TickOutcome::Idle);
    }
    assert_eq!(h.source.dispatched().len(), 1);

    let profile = h.booking_loop.config().speed_profile;
    h.clock.set(popup_at + profile.click_delay_ms() + profile.click_jitter_ms());
    assert_eq!(h.booking_loop.tick().await, TickOutcome::Active);
    assert_eq!(h.source.taps().last(), Some(&Rect::new(0, 2130, 270, 2280)));
    assert_eq!(h.source.dispatched().len(), 2);
}

#[tokio::test]
async fn test_lost_window_relaunches_with_cooldown() {
    let mut h = Harness::new(config_with_dates(&["18.03"]));
    h.source.set_screen(None);

    assert_eq!(h.booking_loop.tick().await, TickOutcome::Active);
    let launches = |h: &Harness| {
        h.source
            .dispatched()
            .iter()
            .filter(|(_, d)| *d == Dispatched::Launch)
            .count()
    };
    assert_eq!(launches(&h), 1);
    assert_eq!(h.alerts.count("restarted"), 1);
    // Lost-window restarts are not freezes
    assert_eq!(h.shared.restart_count(), 0);

    // Within the relaunch cooldown nothing happens
    h.clock.advance(5_000);
    assert_eq!(h.booking_loop.tick().await, TickOutcome::Idle);
    assert_eq!(launches(&h), 1);

    h.clock.advance(6_000);
    assert_eq!(h.booking_loop.tick().await, TickOutcome::Active);
    assert_eq!(launches(&h), 2);
}

#[tokio::test]
async fn test_booking_is_recorded_and_excluded_afterwards() {
    let mut config = config_with_dates(&["18.03"]);
    config.target.time_slots = vec!["08:00–20:00".to_string()];
    let mut h = Harness::new(config);

    h.source.set_screen(Some(calendar_screen("Март", &[18], &[])));
    assert!(h.tick_until_dispatch(300, 5).await);

    h.clock.advance(1_000);
    h.source.set_screen(Some(time_picker(&[("08:00 - 20:00", true)])));
    assert!(h.tick_until_dispatch(300, 5).await);

    let records = h.store.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].date, "18.03");
    assert_eq!(records[0].time_slot, "08:00–20:00");
    assert_eq!(records[0].status, BookingStatus::Success);
    assert_eq!(h.alerts.count("booking"), 1);

    // Back on the calendar the booked day is no longer a candidate
    h.clock.advance(2_000);
    h.source.clear_log();
    h.source.set_screen(Some(calendar_screen("Март", &[18], &[])));
    assert!(h.tick_until_dispatch(300, 5).await);
    assert_eq!(h.source.taps(), vec![Rect::new(0, 2130, 270, 2280)]);
}

#[tokio::test]
async fn test_stopped_loop_reports_stopped() {
    let mut h = Harness::new(config_with_dates(&["18.03"]));
    h.shared.set_running(false);
    h.source.set_screen(Some(plain_screen("Профиль")));
    assert_eq!(h.booking_loop.tick().await, TickOutcome::Stopped);
    assert!(h.source.dispatched().is_empty());
}
