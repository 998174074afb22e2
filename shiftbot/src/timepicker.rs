//! Time-slot selection and the final booking click.
//!
//! A booking takes two ticks: the first ticks the checkbox next to a configured slot,
//! a later one sees it checked and presses the booking button.

use crate::actuator::TickContext;
use crate::snapshot::{contains_ci, NodeId, UiSnapshot};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, instrument, warn};

const DASHES: [&str; 3] = ["-", "–", "—"];
const MAX_VARIANTS: usize = 20;

/// A shift time range such as `08:00–20:00`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: String,
    pub end: String,
    pub start_hour: u32,
    pub end_hour: u32,
}

fn parse_clock(part: &str) -> Option<(String, u32)> {
    let part = part.trim();
    let (h, m) = part.split_once(':')?;
    let hour: u32 = h.parse().ok()?;
    let minute: u32 = m.parse().ok()?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 || hour > 24 || minute > 59 {
        return None;
    }
    Some((format!("{hour:02}:{minute:02}"), hour))
}

/// `08:00` → `8:00`; anything else unchanged
fn strip_leading_zero(time: &str) -> &str {
    match time.strip_prefix('0') {
        Some(rest) if rest.len() == 4 => rest,
        _ => time,
    }
}

impl TimeSlot {
    /// Parse `HH:MM–HH:MM`, also accepting a plain hyphen or an em dash
    pub fn parse(raw: &str) -> Option<Self> {
        let parts: Vec<&str> = raw.split(['-', '–', '—']).collect();
        let [start, end] = parts.as_slice() else {
            return None;
        };
        let (start, start_hour) = parse_clock(start)?;
        let (end, end_hour) = parse_clock(end)?;
        Some(Self {
            start,
            end,
            start_hour,
            end_hour,
        })
    }

    /// Length in hours, wrapping past midnight
    pub fn duration_hours(&self) -> u32 {
        if self.end_hour >= self.start_hour {
            self.end_hour - self.start_hour
        } else {
            self.end_hour + 24 - self.start_hour
        }
    }

    /// Spellings the app may use for this slot
    pub fn variants(&self) -> Vec<String> {
        let starts = [self.start.as_str(), strip_leading_zero(&self.start)];
        let ends = [self.end.as_str(), strip_leading_zero(&self.end)];
        let mut out: Vec<String> = Vec::new();
        for s in starts {
            for e in ends {
                for dash in DASHES {
                    for candidate in [format!("{s}{dash}{e}"), format!("{s} {dash} {e}")] {
                        if out.len() < MAX_VARIANTS && !out.contains(&candidate) {
                            out.push(candidate);
                        }
                    }
                }
            }
        }
        out
    }

    /// Whether `text` names this slot, exactly or with both ends present
    pub fn matches_text(&self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        if self.variants().iter().any(|v| text.contains(v.as_str())) {
            return true;
        }
        let has_start = text.contains(self.start.as_str())
            || text.contains(strip_leading_zero(&self.start));
        let has_end =
            text.contains(self.end.as_str()) || text.contains(strip_leading_zero(&self.end));
        has_start && has_end
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}–{}", self.start, self.end)
    }
}

/// What the time-picker handler did this tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimePickerAction {
    /// Ticked the checkbox of a slot
    Ticked,
    /// Pressed the booking button; the booking still has to be recorded
    BookingClicked { date: String, time_slot: String },
    /// Closed the picker because no slots are configured
    Closed,
    Idle,
}

fn find_checkboxes(ctx: &TickContext<'_>) -> Vec<NodeId> {
    let cfg = &ctx.config.time_picker;
    let snapshot = ctx.snapshot;
    snapshot
        .bfs(usize::MAX)
        .filter(|id| {
            let a = snapshot.attrs(*id);
            a.clickable && a.class_name.contains(cfg.checkbox_class.as_str())
        })
        .take(cfg.max_checkboxes)
        .collect()
}

fn nearest_checkbox(
    snapshot: &UiSnapshot,
    checkboxes: &[NodeId],
    label: NodeId,
    max_distance: i32,
) -> Option<NodeId> {
    let row = snapshot.bounds(label).center_y();
    checkboxes
        .iter()
        .copied()
        .map(|id| (id, (snapshot.bounds(id).center_y() - row).abs()))
        .filter(|(_, distance)| *distance <= max_distance)
        .min_by_key(|(_, distance)| *distance)
        .map(|(id, _)| id)
}

fn find_close_button(ctx: &TickContext<'_>) -> Option<NodeId> {
    let cfg = &ctx.config.time_picker;
    ctx.snapshot.find_first(usize::MAX, |a| {
        a.clickable
            && a.class_name.contains("Button")
            && a.bounds.right > cfg.close_min_right
            && a.bounds.top < cfg.close_max_top
    })
}

fn click_booking_button(ctx: &mut TickContext<'_>) -> bool {
    let label = ctx.config.time_picker.booking_label.as_str();
    let snapshot = ctx.snapshot;
    let found = snapshot
        .bfs(usize::MAX)
        .find(|id| contains_ci(snapshot.attrs(*id).text_or_empty(), label));
    match found {
        Some(node) => {
            let target = snapshot.clickable_ancestor(node).unwrap_or(node);
            ctx.tap_node(target, 0)
        }
        None => false,
    }
}

fn book(ctx: &mut TickContext<'_>, target_dates: &[String], slot: Option<&TimeSlot>, slots: &[TimeSlot]) -> TimePickerAction {
    if !click_booking_button(ctx) {
        warn!("booking button not found");
        return TimePickerAction::Idle;
    }
    let date = ctx
        .state
        .last_selected_date
        .clone()
        .or_else(|| target_dates.first().cloned())
        .unwrap_or_else(|| "Unknown".to_string());
    let time_slot = slot
        .or_else(|| slots.first())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    info!(date = %date, time_slot = %time_slot, "booking button pressed");
    ctx.state.booked_locally.insert(date.clone());
    ctx.mark_navigation();
    TimePickerAction::BookingClicked { date, time_slot }
}

/// Tick the first configured slot that is visible, or book it if already ticked
#[instrument(level = "debug", skip_all)]
pub fn handle_time_picker(
    ctx: &mut TickContext<'_>,
    slots: &[TimeSlot],
    target_dates: &[String],
) -> TimePickerAction {
    if slots.is_empty() {
        debug!("no time slots configured, closing picker");
        if let Some(close) = find_close_button(ctx) {
            if ctx.tap_node(close, 0) {
                return TimePickerAction::Closed;
            }
        }
        return if ctx.back() {
            TimePickerAction::Closed
        } else {
            TimePickerAction::Idle
        };
    }

    let checkboxes = find_checkboxes(ctx);
    if checkboxes.is_empty() {
        debug!("time picker shows no checkboxes yet");
        return TimePickerAction::Idle;
    }
    let snapshot = ctx.snapshot;
    let max_distance = ctx.config.time_picker.checkbox_max_distance_px;

    for slot in slots {
        let label = snapshot
            .bfs(usize::MAX)
            .find(|id| slot.matches_text(snapshot.attrs(*id).text_or_empty()));
        let Some(label) = label else {
            continue;
        };
        let Some(checkbox) = nearest_checkbox(snapshot, &checkboxes, label, max_distance) else {
            debug!(slot = %slot, "no checkbox next to slot");
            continue;
        };
        if snapshot.attrs(checkbox).checked {
            return book(ctx, target_dates, Some(slot), slots);
        }
        if ctx.tap_node(checkbox, 0) {
            debug!(slot = %slot, "slot ticked");
            return TimePickerAction::Ticked;
        }
    }

    // None of the configured slots is on screen
    if let Some(unchecked) = checkboxes.iter().copied().find(|id| !snapshot.attrs(*id).checked) {
        if ctx.tap_node(unchecked, 0) {
            debug!("no configured slot visible, ticked first free checkbox");
            return TimePickerAction::Ticked;
        }
        return TimePickerAction::Idle;
    }
    book(ctx, target_dates, None, slots)
}
