//! Calendar date matching: which day, if any, to tap on the displayed month.
//!
//! The decision itself ([`plan`]) is a pure function of the target dates, the displayed
//! month, the available and taken days and the booked-date cache. [`handle_calendar`]
//! extracts those inputs from a snapshot and carries out the decision.

use crate::actuator::TickContext;
use crate::config::CalendarConfig;
use crate::filter::screen_height;
use crate::navigation::go_to_home_tab;
use crate::snapshot::{contains_ci, NodeId, UiSnapshot};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, info, instrument, warn};

/// Month (1-12) to the set of target days in it
pub type TargetDaysByMonth = BTreeMap<u32, BTreeSet<u32>>;

/// Parse a `DD.MM` date into `(day, month)`
pub fn parse_target_date(date: &str) -> Option<(u32, u32)> {
    let (day, month) = date.trim().split_once('.')?;
    let day: u32 = day.trim().parse().ok()?;
    let month: u32 = month.trim().parse().ok()?;
    if (1..=31).contains(&day) && (1..=12).contains(&month) {
        Some((day, month))
    } else {
        None
    }
}

pub fn format_date(day: u32, month: u32) -> String {
    format!("{day:02}.{month:02}")
}

/// Zero-padded `DD.MM` form of a date, so "2.4" and "02.04" compare equal
pub fn normalize_date(date: &str) -> Option<String> {
    parse_target_date(date).map(|(day, month)| format_date(day, month))
}

/// Group target dates by month, dropping (and logging) anything that does not parse
pub fn build_target_days_by_month<I, S>(dates: I) -> TargetDaysByMonth
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut by_month = TargetDaysByMonth::new();
    for date in dates {
        let date = date.as_ref();
        match parse_target_date(date) {
            Some((day, month)) => {
                by_month.entry(month).or_default().insert(day);
            }
            None => warn!(date, "ignoring invalid target date"),
        }
    }
    by_month
}

/// `target` comes after `current` in calendar order; there is no wrap at December
pub fn is_ahead(current: u32, target: u32) -> bool {
    target > current
}

/// What to do on the displayed month
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarPlan {
    /// Tap the first of these days that accepts the tap (ascending)
    Select(Vec<u32>),
    /// Switch to the next month; a target month lies ahead
    AdvanceMonth,
    /// Nothing to do on this calendar
    Exit,
}

fn advance_or_exit(targets: &TargetDaysByMonth, displayed_month: u32) -> CalendarPlan {
    if targets.keys().any(|m| is_ahead(displayed_month, *m)) {
        CalendarPlan::AdvanceMonth
    } else {
        CalendarPlan::Exit
    }
}

/// Decide which day to book: `targets ∩ available`, minus taken days and booked dates
pub fn plan(
    targets: &TargetDaysByMonth,
    displayed_month: u32,
    available: &BTreeSet<u32>,
    taken: &BTreeSet<u32>,
    booked: &BTreeSet<String>,
) -> CalendarPlan {
    let Some(target_days) = targets.get(&displayed_month) else {
        return advance_or_exit(targets, displayed_month);
    };
    let candidates: Vec<u32> = target_days
        .intersection(available)
        .filter(|day| !taken.contains(day))
        .filter(|day| !booked.contains(&format_date(**day, displayed_month)))
        .copied()
        .collect();
    if candidates.is_empty() {
        advance_or_exit(targets, displayed_month)
    } else {
        CalendarPlan::Select(candidates)
    }
}

fn day_from_text(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() || text.len() > 2 || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok().filter(|d| (1..=31).contains(d))
}

/// Day number of a calendar cell: first purely numeric descendant text, else its own text
pub fn extract_day(snapshot: &UiSnapshot, cell: NodeId) -> Option<u32> {
    let mut queue: VecDeque<NodeId> = snapshot.children(cell).iter().copied().collect();
    while let Some(id) = queue.pop_front() {
        if let Some(day) = day_from_text(snapshot.attrs(id).text_or_empty()) {
            return Some(day);
        }
        queue.extend(snapshot.children(id).iter().copied());
    }
    day_from_text(snapshot.attrs(cell).text_or_empty())
}

/// The month label on screen and the month (1-12) it names.
///
/// Labels are visited in tree order, so the first month name on screen wins.
pub fn find_displayed_month(snapshot: &UiSnapshot, config: &CalendarConfig) -> Option<(NodeId, u32)> {
    snapshot.bfs(config.max_depth).find_map(|id| {
        let text = snapshot.attrs(id).text_or_empty();
        config
            .month_names
            .iter()
            .position(|stem| contains_ci(text, stem))
            .map(|i| (id, i as u32 + 1))
    })
}

/// Cells on the displayed month, as extracted from the snapshot
#[derive(Debug, Default)]
pub struct CalendarCells {
    /// Bookable day to its cell; the first cell wins for duplicated days
    pub available: BTreeMap<u32, NodeId>,
    /// Days already holding one of the user's shifts
    pub taken: BTreeSet<u32>,
}

pub fn collect_cells(snapshot: &UiSnapshot, config: &CalendarConfig, allow_queue: bool) -> CalendarCells {
    let mut cells = CalendarCells::default();
    let is_bookable_id = |rid: &str| rid == config.available_id || (allow_queue && rid == config.queue_id);

    for id in snapshot.bfs(config.max_depth) {
        let attrs = snapshot.attrs(id);
        let rid = attrs.resource_id_or_empty();
        if rid == config.taken_id {
            if let Some(day) = extract_day(snapshot, id) {
                cells.taken.insert(day);
            }
        } else if attrs.clickable && is_bookable_id(rid) {
            if let Some(day) = extract_day(snapshot, id) {
                cells.available.entry(day).or_insert(id);
            }
        }
    }

    if cells.available.is_empty() {
        // Cells without ids: square, clickable and carrying a day number
        let size = config.cell_min_px..=config.cell_max_px;
        for id in snapshot.bfs(config.max_depth) {
            let attrs = snapshot.attrs(id);
            let b = attrs.bounds;
            if attrs.clickable
                && attrs.enabled
                && attrs.resource_id_or_empty() != config.taken_id
                && size.contains(&b.width())
                && size.contains(&b.height())
            {
                if let Some(day) = extract_day(snapshot, id) {
                    if !cells.taken.contains(&day) {
                        cells.available.entry(day).or_insert(id);
                    }
                }
            }
        }
        if !cells.available.is_empty() {
            debug!(count = cells.available.len(), "calendar cells found by geometry");
        }
    }
    cells
}

/// Control that switches to the next month: a clickable sibling right of the month label,
/// else any clickable node in the upper right of the screen
fn find_next_month_control(snapshot: &UiSnapshot, config: &CalendarConfig, label: NodeId) -> Option<NodeId> {
    let label_bounds = snapshot.bounds(label);
    if let Some(parent) = snapshot.parent(label) {
        let sibling = snapshot.children(parent).iter().copied().find(|id| {
            *id != label
                && snapshot.attrs(*id).clickable
                && snapshot.bounds(*id).left >= label_bounds.right - 8
        });
        if sibling.is_some() {
            return sibling;
        }
    }

    let root = snapshot.bounds(snapshot.root());
    let height = screen_height(snapshot);
    let center_x = if root.width() > 0 {
        root.center_x()
    } else {
        snapshot
            .bfs(usize::MAX)
            .map(|id| snapshot.bounds(id).right)
            .max()
            .unwrap_or(0)
            / 2
    };
    let cell_ids = [&config.available_id, &config.queue_id, &config.taken_id];
    snapshot.find_first(config.header_max_depth, |a| {
        a.clickable
            && a.bounds.top < height / 2
            && a.bounds.center_x() > center_x
            && !cell_ids.iter().any(|cid| a.resource_id_or_empty() == cid.as_str())
    })
}

/// What the calendar handler did this tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarAction {
    /// Tapped the cell for this `DD.MM` date
    Selected(String),
    AdvancedMonth,
    /// Left the calendar through navigation recovery
    Exited,
    /// Nothing could be dispatched
    Idle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarOutcome {
    pub action: CalendarAction,
    /// Target dates seen with free places on the displayed month
    pub available_targets: Vec<String>,
}

fn exit(ctx: &mut TickContext<'_>, available_targets: Vec<String>) -> CalendarOutcome {
    let action = if go_to_home_tab(ctx).is_some() {
        CalendarAction::Exited
    } else {
        CalendarAction::Idle
    };
    CalendarOutcome {
        action,
        available_targets,
    }
}

/// Run one calendar decision on the current snapshot. At most one day is tapped.
#[instrument(level = "debug", skip_all)]
pub fn handle_calendar(
    ctx: &mut TickContext<'_>,
    target_dates: &[String],
    booked: &BTreeSet<String>,
) -> CalendarOutcome {
    let config = ctx.config;
    let cal = &config.calendar;
    let snapshot = ctx.snapshot;

    let targets = build_target_days_by_month(target_dates);
    if targets.is_empty() {
        debug!("no target dates, leaving calendar");
        return exit(ctx, Vec::new());
    }

    let Some((label, month)) = find_displayed_month(snapshot, cal) else {
        warn!("cannot tell which month the calendar shows");
        return exit(ctx, Vec::new());
    };

    let cells = collect_cells(snapshot, cal, config.target.allow_queue);
    let mut excluded = cells.taken.clone();
    excluded.extend(
        ctx.state
            .booked_locally
            .iter()
            .filter_map(|d| parse_target_date(d))
            .filter(|(_, m)| *m == month)
            .map(|(d, _)| d),
    );

    let available: BTreeSet<u32> = cells.available.keys().copied().collect();
    let available_targets: Vec<String> = targets
        .get(&month)
        .map(|days| {
            days.intersection(&available)
                .filter(|d| !excluded.contains(d))
                .map(|d| format_date(*d, month))
                .collect()
        })
        .unwrap_or_default();

    let decision = plan(&targets, month, &available, &excluded, booked);
    debug!(month, ?available, ?decision, "calendar decision");

    match decision {
        CalendarPlan::Select(days) => {
            for day in days {
                let Some(cell) = cells.available.get(&day).copied() else {
                    continue;
                };
                if ctx.tap_node(cell, 0) {
                    let date = format_date(day, month);
                    info!(date = %date, "day selected");
                    ctx.state.last_selected_date = Some(date.clone());
                    return CalendarOutcome {
                        action: CalendarAction::Selected(date),
                        available_targets,
                    };
                }
            }
            warn!("no candidate day accepted the tap");
            exit(ctx, available_targets)
        }
        CalendarPlan::AdvanceMonth => {
            if let Some(control) = find_next_month_control(snapshot, cal, label) {
                if ctx.tap_node(control, cal.month_switch_delay_ms) {
                    debug!(from = month, "switched to next month");
                    return CalendarOutcome {
                        action: CalendarAction::AdvancedMonth,
                        available_targets,
                    };
                }
            }
            warn!("next month control not found");
            exit(ctx, available_targets)
        }
        CalendarPlan::Exit => exit(ctx, available_targets),
    }
}
