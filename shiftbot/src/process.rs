//! Handlers for the screens leading up to the calendar: warehouse, process list, no slots.

use crate::actuator::TickContext;
use crate::filter::{run_filter_step, FilterPhase, FilterStep};
use crate::navigation::go_to_home_tab;
use crate::screen::ScreenClassifier;
use crate::selector::find_any;
use crate::snapshot::{NodeId, UiSnapshot};
use tracing::{debug, info, instrument};

/// Warehouse screen: set up the filter once, wait for the list to load, then press the
/// booking button. Returns whether an action was dispatched.
#[instrument(level = "debug", skip_all)]
pub fn handle_warehouse(ctx: &mut TickContext<'_>, classifier: &ScreenClassifier) -> bool {
    ctx.state.force_home = false;
    let now = ctx.now;

    if !ctx.state.filter.configured || ctx.state.filter.phase != FilterPhase::Idle {
        let modal_open = classifier.is_filter_modal_open(ctx.snapshot);
        match run_filter_step(ctx, modal_open) {
            FilterStep::Acted => return true,
            FilterStep::Waiting => return false,
            FilterStep::Skipped => {}
        }
    }

    if !classifier.is_warehouse_loaded(ctx.snapshot) {
        if now < ctx.state.awaiting_load_until_ms {
            debug!("warehouse list still loading");
            return false;
        }
        if now.saturating_sub(ctx.state.last_step_ms) < ctx.profile().load_wait_ms() {
            return false;
        }
        debug!("warehouse list did not load, recovering");
        return go_to_home_tab(ctx).is_some();
    }

    if let Some(last) = ctx.state.last_warehouse_click_ms {
        if now.saturating_sub(last) < ctx.config.process.warehouse_cooldown_ms {
            return false;
        }
    }

    let config = ctx.config;
    let snapshot = ctx.snapshot;
    let Some(button) = find_any(&config.markers.booking_button, snapshot, config.markers.max_depth) else {
        return false;
    };
    let target = snapshot.clickable_ancestor(button).unwrap_or(button);
    let delay = ctx.profile().warehouse_delay_ms();
    if !ctx.tap_node(target, delay) {
        return false;
    }
    info!(warehouse = %config.target.warehouse, "booking button pressed on warehouse");
    ctx.state.last_warehouse_click_ms = Some(now);
    ctx.state.awaiting_load_until_ms = now + ctx.profile().warehouse_wait_ms();
    ctx.state.process_scrolls = 0;
    ctx.state.mark_step(now);
    ctx.mark_navigation();
    true
}

/// The process entry sits in the "no places" section of the list
fn in_no_places_section(ctx: &TickContext<'_>, node: NodeId) -> bool {
    let header = &ctx.config.process.no_places_header;
    if header.is_empty() {
        return false;
    }
    let snapshot: &UiSnapshot = ctx.snapshot;
    match snapshot.find_by_text(header, ctx.config.markers.max_depth) {
        Some(h) => snapshot.bounds(node).top > snapshot.bounds(h).bottom - 50,
        None => false,
    }
}

/// Process list: open the configured process, scrolling to find it at most
/// `max_scrolls` times per visit.
#[instrument(level = "debug", skip_all)]
pub fn handle_process_list(ctx: &mut TickContext<'_>) -> bool {
    let config = ctx.config;
    let process = config.target.process.trim();
    if process.is_empty() {
        debug!("no process configured");
        return go_to_home_tab(ctx).is_some();
    }

    let snapshot = ctx.snapshot;
    if let Some(node) = snapshot.find_by_text(process, config.markers.max_depth) {
        if in_no_places_section(ctx, node) {
            info!(process, "process has no free places");
            return go_to_home_tab(ctx).is_some();
        }
        let target = snapshot.clickable_ancestor(node).unwrap_or(node);
        if ctx.tap_node(target, 0) {
            debug!(process, "process opened");
            let now = ctx.now;
            ctx.state.awaiting_load_until_ms = now + 400;
            ctx.state.mark_step(now);
            return true;
        }
        return false;
    }

    if ctx.state.process_scrolls < config.process.max_scrolls {
        if let Some(list) = snapshot.first_scrollable() {
            if ctx.scroll(list) {
                ctx.state.process_scrolls += 1;
                debug!(scrolls = ctx.state.process_scrolls, "process not visible, scrolled");
                return true;
            }
            return false;
        }
    }
    debug!(process, "process not found");
    ctx.state.process_scrolls = 0;
    go_to_home_tab(ctx).is_some()
}

/// Nothing to book: go back to the warehouse tab
pub fn handle_no_slots(ctx: &mut TickContext<'_>) -> bool {
    debug!("no slots for this operation");
    go_to_home_tab(ctx).is_some()
}
