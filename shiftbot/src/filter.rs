//! One-time "favorite warehouses only" filter setup.
//!
//! The workflow spans several ticks: open the modal, switch the toggle on, press apply,
//! then wait for the modal to close. Waits between steps are tracked in
//! [`FilterPhase`] instead of timers, so a tick never blocks.

use crate::actuator::TickContext;
use crate::snapshot::{contains_ci, NodeId, UiSnapshot};
use tracing::{debug, info, instrument, warn};

/// Where the multi-tick workflow currently is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterPhase {
    #[default]
    Idle,
    /// The toggle was clicked; apply once the modal re-renders
    ToggleClicked { at_ms: u64 },
    /// Apply/close was clicked; the filter counts as configured once the modal is gone
    Closing { at_ms: u64 },
}

/// Result of one filter step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStep {
    /// An action was dispatched
    Acted,
    /// A previous step is still settling
    Waiting,
    /// Nothing to do
    Skipped,
}

pub(crate) fn screen_height(snapshot: &UiSnapshot) -> i32 {
    let root = snapshot.bounds(snapshot.root());
    if root.height() > 0 {
        return root.height();
    }
    snapshot
        .bfs(usize::MAX)
        .map(|id| snapshot.bounds(id).bottom)
        .max()
        .unwrap_or(0)
}

fn find_open_button(ctx: &TickContext<'_>) -> Option<NodeId> {
    let cfg = &ctx.config.filter;
    let snapshot = ctx.snapshot;
    let threshold = screen_height(snapshot) * (100 - cfg.bottom_region_percent as i32) / 100;

    for anchor in snapshot.find_all_by_text(&cfg.open_anchor, cfg.max_depth) {
        let anchor_bounds = snapshot.bounds(anchor);
        if anchor_bounds.top < threshold {
            continue;
        }
        let button = snapshot.find_first(cfg.max_depth, |a| {
            let b = a.bounds;
            a.clickable
                && (b.center_y() - anchor_bounds.center_y()).abs() < cfg.row_tolerance_px
                && b.left >= anchor_bounds.right - 10
                && b.top > threshold
                && b.width() < cfg.max_button_width_px
        });
        if button.is_some() {
            return button;
        }
    }
    None
}

/// The checkable control on the favorites row, with its checked state
fn find_favorites_toggle(ctx: &TickContext<'_>) -> Option<(NodeId, bool)> {
    let cfg = &ctx.config.filter;
    let snapshot = ctx.snapshot;
    let label = snapshot.find_by_text(&cfg.favorites_label, cfg.max_depth)?;
    let row = snapshot.bounds(label).center_y();
    let toggle = snapshot.find_first(cfg.max_depth, |a| {
        a.checkable && (a.bounds.center_y() - row).abs() < cfg.toggle_row_tolerance_px
    })?;
    Some((toggle, snapshot.attrs(toggle).checked))
}

fn click_open(ctx: &mut TickContext<'_>) -> bool {
    let wait = ctx.profile().filter_open_wait_ms();
    if let Some(button) = find_open_button(ctx) {
        if ctx.tap_node(button, wait) {
            debug!("filter opened");
            return true;
        }
    }
    let config = ctx.config;
    let geometry = &config.navigation.geometry;
    if geometry.enabled && ctx.tap(geometry.filter_open.as_rect(), wait) {
        debug!("filter opened by fixed coordinate");
        return true;
    }
    false
}

fn click_apply(ctx: &mut TickContext<'_>) -> bool {
    let config = ctx.config;
    let wait = ctx.profile().filter_close_wait_ms();
    for label in &config.filter.apply_labels {
        let snapshot = ctx.snapshot;
        let found = snapshot
            .bfs(config.filter.max_depth)
            .find(|id| contains_ci(snapshot.attrs(*id).text_or_empty(), label));
        if let Some(node) = found {
            let target = snapshot.clickable_ancestor(node).unwrap_or(node);
            if ctx.tap_node(target, wait) {
                debug!(label = %label, "filter apply clicked");
                return true;
            }
        }
    }
    let geometry = &config.navigation.geometry;
    if geometry.enabled && ctx.tap(geometry.filter_apply.as_rect(), wait) {
        debug!("filter apply clicked by fixed coordinate");
        return true;
    }
    false
}

/// Give up on the filter: close whatever is open and never try again this session
fn abandon(ctx: &mut TickContext<'_>) -> FilterStep {
    ctx.state.filter.configured = true;
    ctx.state.filter.phase = FilterPhase::Idle;
    if ctx.back() {
        ctx.mark_navigation();
        FilterStep::Acted
    } else {
        FilterStep::Skipped
    }
}

/// Advance the filter workflow by at most one action.
///
/// `modal_open` is whether the current snapshot shows the filter modal. Once the filter
/// is configured this only ever closes a lingering modal.
#[instrument(level = "debug", skip(ctx), fields(phase = ?ctx.state.filter.phase))]
pub fn run_filter_step(ctx: &mut TickContext<'_>, modal_open: bool) -> FilterStep {
    let now = ctx.now;
    let profile = ctx.profile();

    match ctx.state.filter.phase {
        FilterPhase::Closing { at_ms } => {
            if now.saturating_sub(at_ms) < profile.filter_close_wait_ms() {
                return FilterStep::Waiting;
            }
            ctx.state.filter.phase = FilterPhase::Idle;
            ctx.state.filter.configured = true;
            ctx.mark_navigation();
            info!("favorites filter configured");
            return FilterStep::Waiting;
        }
        FilterPhase::ToggleClicked { at_ms } => {
            if now.saturating_sub(at_ms) < profile.filter_toggle_wait_ms() {
                return FilterStep::Waiting;
            }
            ctx.state.filter.phase = FilterPhase::Idle;
            if !modal_open {
                warn!("filter modal closed before apply");
                ctx.state.filter.configured = true;
                return FilterStep::Skipped;
            }
            if click_apply(ctx) {
                ctx.state.filter.phase = FilterPhase::Closing { at_ms: now };
                ctx.state.filter.last_action_ms = Some(now);
                return FilterStep::Acted;
            }
            warn!("filter apply button not found");
            return abandon(ctx);
        }
        FilterPhase::Idle => {}
    }

    if let Some(last) = ctx.state.filter.last_action_ms {
        if now.saturating_sub(last) < ctx.config.filter.step_cooldown_ms {
            return FilterStep::Waiting;
        }
    }

    if ctx.state.filter.configured {
        if modal_open && ctx.back() {
            debug!("filter already configured, closing modal");
            ctx.mark_navigation();
            return FilterStep::Acted;
        }
        return FilterStep::Skipped;
    }

    if !modal_open {
        if click_open(ctx) {
            ctx.state.filter.last_action_ms = Some(now);
            return FilterStep::Acted;
        }
        warn!("filter button not found, skipping filter setup");
        ctx.state.filter.configured = true;
        return FilterStep::Skipped;
    }

    match find_favorites_toggle(ctx) {
        Some((toggle, false)) => {
            if ctx.tap_node(toggle, 0) {
                debug!("favorites toggle switched on");
                ctx.state.filter.phase = FilterPhase::ToggleClicked { at_ms: now };
                ctx.state.filter.last_action_ms = Some(now);
                FilterStep::Acted
            } else {
                warn!("favorites toggle did not accept the tap");
                abandon(ctx)
            }
        }
        Some((_, true)) => {
            if click_apply(ctx) {
                debug!("favorites already on, closing filter");
                ctx.state.filter.phase = FilterPhase::Closing { at_ms: now };
                ctx.state.filter.last_action_ms = Some(now);
                FilterStep::Acted
            } else {
                abandon(ctx)
            }
        }
        None => {
            warn!("favorites toggle not found");
            abandon(ctx)
        }
    }
}
