use crate::actuator::TickContext;
use crate::snapshot::NodeId;
use tracing::{debug, instrument, warn};

/// Which strategy brought us back to the home tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationStrategy {
    TabById,
    TabByLabel,
    GeometryFallback,
    Back,
}

fn find_home_tab(ctx: &TickContext<'_>) -> Option<NodeId> {
    let nav = &ctx.config.navigation;
    let snapshot = ctx.snapshot;
    if !nav.home_tab_id.is_empty() {
        if let Some(id) = snapshot
            .find_by_resource_id(&nav.home_tab_id)
            .into_iter()
            .find(|id| snapshot.bounds(*id).is_tappable())
        {
            return Some(id);
        }
    }
    if !nav.home_tab_description.is_empty() {
        return snapshot
            .find_by_description(&nav.home_tab_description)
            .filter(|id| snapshot.bounds(*id).is_tappable());
    }
    None
}

fn find_home_label(ctx: &TickContext<'_>) -> Option<NodeId> {
    let label = ctx.config.navigation.home_tab_label.trim();
    if label.is_empty() {
        return None;
    }
    // Exact match: the label is a substring of other headings
    let label = label.to_lowercase();
    ctx.snapshot.find_first(usize::MAX, |a| {
        a.text_or_empty().trim().to_lowercase() == label
    })
}

/// Return to the warehouse tab, trying each strategy in order until one dispatches.
///
/// Any success opens the settle window, during which the loop takes no action.
#[instrument(level = "debug", skip(ctx))]
pub fn go_to_home_tab(ctx: &mut TickContext<'_>) -> Option<NavigationStrategy> {
    let config = ctx.config;
    if let Some(tab) = find_home_tab(ctx) {
        let bounds = ctx.snapshot.bounds(tab);
        if ctx.tap(bounds, 0) {
            debug!("home tab tapped by id");
            ctx.mark_navigation();
            return Some(NavigationStrategy::TabById);
        }
    }

    if let Some(label) = find_home_label(ctx) {
        let target = ctx.snapshot.clickable_ancestor(label).unwrap_or(label);
        if ctx.tap_node(target, 0) {
            debug!("home tab tapped by label");
            ctx.mark_navigation();
            return Some(NavigationStrategy::TabByLabel);
        }
    }

    let geometry = &config.navigation.geometry;
    if geometry.enabled {
        let point = geometry.home_tab;
        if ctx.tap(point.as_rect(), 0) {
            debug!(x = point.x, y = point.y, "home tab tapped by fixed coordinate");
            ctx.mark_navigation();
            return Some(NavigationStrategy::GeometryFallback);
        }
    }

    if ctx.back() {
        debug!("home tab not found, pressed back");
        ctx.mark_navigation();
        return Some(NavigationStrategy::Back);
    }

    warn!("navigation recovery failed");
    None
}
