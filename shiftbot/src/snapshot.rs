//! Tick-scoped view of the target app's widget tree.
//!
//! A capture arrives as a nested [`UiNode`] tree (plus any other open windows) and is
//! flattened once into an arena addressed by [`NodeId`]. Every query in the crate works
//! on the arena, so parent links are available without reference counting and the whole
//! capture is dropped at the end of the tick.

use crate::types::Rect;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Helper functions for clean serialization
fn is_empty_string(opt: &Option<String>) -> bool {
    match opt {
        Some(s) => s.is_empty(),
        None => true,
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn default_true() -> bool {
    true
}

/// Attributes of a single widget as reported by the accessibility layer
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeAttributes {
    #[serde(default, skip_serializing_if = "is_empty_string")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "is_empty_string")]
    pub description: Option<String>,
    /// Stable view identifier, e.g. `ru.ozon.hire:id/warehouseTab`
    #[serde(default, skip_serializing_if = "is_empty_string")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub class_name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub clickable: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub checkable: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub checked: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub scrollable: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub selected: bool,
    #[serde(default)]
    pub bounds: Rect,
}

impl Default for NodeAttributes {
    fn default() -> Self {
        Self {
            text: None,
            description: None,
            resource_id: None,
            class_name: String::new(),
            clickable: false,
            checkable: false,
            checked: false,
            enabled: true,
            scrollable: false,
            selected: false,
            bounds: Rect::default(),
        }
    }
}

impl NodeAttributes {
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    pub fn resource_id_or_empty(&self) -> &str {
        self.resource_id.as_deref().unwrap_or("")
    }
}

impl fmt::Debug for NodeAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug_struct = f.debug_struct("NodeAttributes");

        if !self.class_name.is_empty() {
            debug_struct.field("class_name", &self.class_name);
        }
        if let Some(ref text) = self.text {
            if !text.is_empty() {
                debug_struct.field("text", text);
            }
        }
        if let Some(ref description) = self.description {
            if !description.is_empty() {
                debug_struct.field("description", description);
            }
        }
        if let Some(ref id) = self.resource_id {
            if !id.is_empty() {
                debug_struct.field("resource_id", id);
            }
        }
        // Only show flags that deviate from the defaults
        if self.clickable {
            debug_struct.field("clickable", &true);
        }
        if self.checkable {
            debug_struct.field("checked", &self.checked);
        }
        if !self.enabled {
            debug_struct.field("enabled", &false);
        }
        if self.scrollable {
            debug_struct.field("scrollable", &true);
        }
        if self.selected {
            debug_struct.field("selected", &true);
        }
        debug_struct.field("bounds", &self.bounds);
        debug_struct.finish()
    }
}

/// Represents a node in the captured UI tree, containing its attributes and children.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct UiNode {
    #[serde(flatten)]
    pub attributes: NodeAttributes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<UiNode>,
}

impl fmt::Debug for UiNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.debug_with_depth(f, 0, 12)
    }
}

impl UiNode {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            attributes: NodeAttributes {
                class_name: class_name.into(),
                ..NodeAttributes::default()
            },
            children: Vec::new(),
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.attributes.text = Some(text.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.attributes.description = Some(description.into());
        self
    }

    pub fn resource_id(mut self, id: impl Into<String>) -> Self {
        self.attributes.resource_id = Some(id.into());
        self
    }

    pub fn bounds(mut self, left: i32, top: i32, right: i32, bottom: i32) -> Self {
        self.attributes.bounds = Rect::new(left, top, right, bottom);
        self
    }

    pub fn clickable(mut self) -> Self {
        self.attributes.clickable = true;
        self
    }

    pub fn checkable(mut self, checked: bool) -> Self {
        self.attributes.checkable = true;
        self.attributes.checked = checked;
        self
    }

    pub fn scrollable(mut self) -> Self {
        self.attributes.scrollable = true;
        self
    }

    pub fn selected(mut self) -> Self {
        self.attributes.selected = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.attributes.enabled = false;
        self
    }

    pub fn child(mut self, child: UiNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = UiNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Helper method for debug formatting with depth control
    fn debug_with_depth(
        &self,
        f: &mut fmt::Formatter<'_>,
        current_depth: usize,
        max_depth: usize,
    ) -> fmt::Result {
        let mut debug_struct = f.debug_struct("UiNode");
        debug_struct.field("attributes", &self.attributes);

        if !self.children.is_empty() {
            if current_depth < max_depth {
                debug_struct.field(
                    "children",
                    &DebugChildrenWithDepth {
                        children: &self.children,
                        current_depth,
                        max_depth,
                    },
                );
            } else {
                debug_struct.field(
                    "children",
                    &format!("[{} children (depth limit reached)]", self.children.len()),
                );
            }
        }

        debug_struct.finish()
    }
}

struct DebugChildrenWithDepth<'a> {
    children: &'a [UiNode],
    current_depth: usize,
    max_depth: usize,
}

impl fmt::Debug for DebugChildrenWithDepth<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for child in self.children {
            list.entry(&DebugNodeWithDepth {
                node: child,
                current_depth: self.current_depth + 1,
                max_depth: self.max_depth,
            });
        }
        list.finish()
    }
}

struct DebugNodeWithDepth<'a> {
    node: &'a UiNode,
    current_depth: usize,
    max_depth: usize,
}

impl fmt::Debug for DebugNodeWithDepth<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.node
            .debug_with_depth(f, self.current_depth, self.max_depth)
    }
}

/// Handle to a node inside one [`UiSnapshot`]; meaningless for any other snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Slot {
    attrs: NodeAttributes,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    depth: usize,
    window: usize,
}

/// One capture of the foreground tree, flattened in breadth-first order per window.
///
/// Window 0 is the target app; further windows (system overlays, other apps) are only
/// consulted by queries that explicitly search all windows.
#[derive(Debug)]
pub struct UiSnapshot {
    slots: Vec<Slot>,
    windows: Vec<NodeId>,
    captured_at_ms: u64,
}

/// Case-insensitive substring match used by every text query
pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl UiSnapshot {
    pub fn new(app_root: UiNode, captured_at_ms: u64) -> Self {
        Self::with_windows(app_root, Vec::new(), captured_at_ms)
    }

    pub fn with_windows(app_root: UiNode, other_windows: Vec<UiNode>, captured_at_ms: u64) -> Self {
        let mut snapshot = Self {
            slots: Vec::new(),
            windows: Vec::with_capacity(other_windows.len() + 1),
            captured_at_ms,
        };
        snapshot.push_window(app_root);
        for window in other_windows {
            snapshot.push_window(window);
        }
        snapshot
    }

    fn push_window(&mut self, root: UiNode) {
        let window = self.windows.len();
        self.windows.push(NodeId(self.slots.len()));

        let mut queue: VecDeque<(UiNode, Option<NodeId>, usize)> = VecDeque::new();
        queue.push_back((root, None, 0));
        while let Some((mut node, parent, depth)) = queue.pop_front() {
            let id = NodeId(self.slots.len());
            let children = std::mem::take(&mut node.children);
            self.slots.push(Slot {
                attrs: node.attributes,
                parent,
                children: Vec::with_capacity(children.len()),
                depth,
                window,
            });
            if let Some(p) = parent {
                self.slots[p.0].children.push(id);
            }
            for child in children {
                queue.push_back((child, Some(id), depth + 1));
            }
        }
    }

    pub fn captured_at_ms(&self) -> u64 {
        self.captured_at_ms
    }

    /// Root of the target app window
    pub fn root(&self) -> NodeId {
        self.windows[0]
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn attrs(&self, id: NodeId) -> &NodeAttributes {
        &self.slots[id.0].attrs
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.slots[id.0].children
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.slots[id.0].depth
    }

    pub fn bounds(&self, id: NodeId) -> Rect {
        self.slots[id.0].attrs.bounds
    }

    /// Breadth-first walk of the app window down to `max_depth` (root is depth 0)
    pub fn bfs(&self, max_depth: usize) -> impl Iterator<Item = NodeId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .take_while(|(_, slot)| slot.window == 0)
            .filter(move |(_, slot)| slot.depth <= max_depth)
            .map(|(i, _)| NodeId(i))
    }

    /// Breadth-first walk of every captured window
    pub fn bfs_all_windows(&self, max_depth: usize) -> impl Iterator<Item = NodeId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(move |(_, slot)| slot.depth <= max_depth)
            .map(|(i, _)| NodeId(i))
    }

    pub fn find_first(
        &self,
        max_depth: usize,
        mut predicate: impl FnMut(&NodeAttributes) -> bool,
    ) -> Option<NodeId> {
        self.bfs(max_depth).find(|id| predicate(self.attrs(*id)))
    }

    pub fn find_all(
        &self,
        max_depth: usize,
        mut predicate: impl FnMut(&NodeAttributes) -> bool,
    ) -> Vec<NodeId> {
        self.bfs(max_depth)
            .filter(|id| predicate(self.attrs(*id)))
            .collect()
    }

    pub fn find_by_text(&self, text: &str, max_depth: usize) -> Option<NodeId> {
        self.find_first(max_depth, |a| contains_ci(a.text_or_empty(), text))
    }

    pub fn find_all_by_text(&self, text: &str, max_depth: usize) -> Vec<NodeId> {
        self.find_all(max_depth, |a| contains_ci(a.text_or_empty(), text))
    }

    pub fn has_text(&self, text: &str, max_depth: usize) -> bool {
        self.find_by_text(text, max_depth).is_some()
    }

    /// Exact resource-id lookup across all windows
    pub fn find_by_resource_id(&self, resource_id: &str) -> Vec<NodeId> {
        self.bfs_all_windows(usize::MAX)
            .filter(|id| self.attrs(*id).resource_id.as_deref() == Some(resource_id))
            .collect()
    }

    /// Description-contains lookup across all windows
    pub fn find_by_description(&self, description: &str) -> Option<NodeId> {
        self.bfs_all_windows(usize::MAX)
            .find(|id| contains_ci(self.attrs(*id).description_or_empty(), description))
    }

    /// The node itself if clickable, otherwise its nearest clickable ancestor
    pub fn clickable_ancestor(&self, id: NodeId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.attrs(node).clickable {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    pub fn first_scrollable(&self) -> Option<NodeId> {
        self.find_first(usize::MAX, |a| a.scrollable)
    }

    /// Concatenated text of a node and its descendants, breadth-first
    pub fn subtree_texts(&self, id: NodeId) -> Vec<&str> {
        let mut out = Vec::new();
        let mut queue = VecDeque::from([id]);
        while let Some(node) = queue.pop_front() {
            if let Some(text) = self.attrs(node).text.as_deref() {
                out.push(text);
            }
            queue.extend(self.children(node).iter().copied());
        }
        out
    }
}
