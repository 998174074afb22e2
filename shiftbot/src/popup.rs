//! Detection and dismissal of interstitials (rating prompts, update nags, dialogs).

use crate::actuator::TickContext;
use crate::config::PopupConfig;
use crate::screen::Screen;
use crate::selector::any_present;
use crate::snapshot::{NodeId, UiSnapshot};
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissMethod {
    Button,
    CloseIcon,
    Back,
}

fn has_dialog_container(config: &PopupConfig, snapshot: &UiSnapshot) -> bool {
    snapshot
        .find_first(config.dialog_max_depth, |a| {
            let class = a.class_name.to_lowercase();
            config
                .dialog_classes
                .iter()
                .any(|c| class.contains(&c.to_lowercase()))
        })
        .is_some()
}

/// Whether the screen looks like an interstitial. Never true on a productive screen.
pub fn has_popup_indicators(config: &PopupConfig, snapshot: &UiSnapshot, screen: Screen) -> bool {
    if screen.is_productive() {
        return false;
    }
    any_present(&config.keywords, snapshot, usize::MAX) || has_dialog_container(config, snapshot)
}

fn dismiss_button_candidates(config: &PopupConfig, snapshot: &UiSnapshot) -> Vec<NodeId> {
    let mut out = Vec::new();
    for label in &config.dismiss_labels {
        for id in snapshot.bfs(usize::MAX) {
            if !label.matches(snapshot, id) {
                continue;
            }
            if let Some(clickable) = snapshot.clickable_ancestor(id) {
                if !out.contains(&clickable) {
                    out.push(clickable);
                }
            }
        }
    }
    out
}

fn close_icon_candidates(config: &PopupConfig, snapshot: &UiSnapshot) -> Vec<NodeId> {
    snapshot
        .bfs(config.close_icon_max_depth)
        .filter(|id| {
            let a = snapshot.attrs(*id);
            if !a.clickable || !config.close_icon_classes.iter().any(|c| a.class_name.contains(c.as_str())) {
                return false;
            }
            if a.bounds.width() > config.close_icon_max_px || a.bounds.height() > config.close_icon_max_px {
                return false;
            }
            let in_corner = a.bounds.top < config.close_icon_max_top
                && a.bounds.right > config.close_icon_min_right;
            let desc = a.description_or_empty().to_lowercase();
            let described = config
                .close_icon_descriptions
                .iter()
                .any(|d| desc.contains(d.as_str()));
            in_corner || described
        })
        .collect()
}

/// Dismiss a popup if one is showing. Returns the method that worked; `None` when there
/// was nothing to dismiss, the cooldown is still running, or every method failed.
#[instrument(level = "debug", skip(ctx))]
pub fn dismiss_popups(ctx: &mut TickContext<'_>, screen: Screen) -> Option<DismissMethod> {
    let all = ctx.config;
    let config = &all.popups;
    if let Some(last) = ctx.state.last_popup_dismiss_ms {
        if ctx.now.saturating_sub(last) < config.cooldown_ms {
            return None;
        }
    }
    if !has_popup_indicators(config, ctx.snapshot, screen) {
        return None;
    }
    debug!("popup detected");

    let method = dismiss(ctx, config);
    if let Some(method) = method {
        debug!(?method, "popup dismissed");
        ctx.state.last_popup_dismiss_ms = Some(ctx.now);
    }
    method
}

fn dismiss(ctx: &mut TickContext<'_>, config: &PopupConfig) -> Option<DismissMethod> {
    for id in dismiss_button_candidates(config, ctx.snapshot) {
        if ctx.tap_node(id, 0) {
            return Some(DismissMethod::Button);
        }
    }
    for id in close_icon_candidates(config, ctx.snapshot) {
        if ctx.tap_node(id, 0) {
            return Some(DismissMethod::CloseIcon);
        }
    }
    if ctx.back() {
        return Some(DismissMethod::Back);
    }
    None
}
