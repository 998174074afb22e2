use crate::snapshot::{contains_ci, NodeId, UiSnapshot};
use serde::{Deserialize, Serialize};

/// Represents ways to recognise a widget inside a snapshot.
///
/// Screen markers, popup keywords and dismiss labels are all stored as selectors so the
/// target app's wording lives in configuration rather than in the handlers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Selector {
    /// Case-insensitive text-contains match
    Text(String),
    /// Exact text match, case-sensitive
    ExactText(String),
    /// Exact resource id match
    Id(String),
    /// Case-insensitive description-contains match
    Desc(String),
    /// Class tag contains the given fragment (e.g. `Dialog`)
    ClassName(String),
    /// Inner selector, restricted to nodes reporting the selected state
    Selected(Box<Selector>),
    /// Represents an invalid selector string, with a reason.
    Invalid(String),
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Text(s) => write!(f, "text:{s}"),
            Selector::ExactText(s) => write!(f, "exact:{s}"),
            Selector::Id(s) => write!(f, "id:{s}"),
            Selector::Desc(s) => write!(f, "desc:{s}"),
            Selector::ClassName(s) => write!(f, "classname:{s}"),
            Selector::Selected(inner) => write!(f, "selected:{inner}"),
            Selector::Invalid(reason) => write!(f, "invalid:{reason}"),
        }
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        let lower = s.to_lowercase();
        match s {
            _ if s.trim().is_empty() => Selector::Invalid("Empty selector".to_string()),
            _ if lower.starts_with("selected:") => {
                let inner = Selector::from(&s["selected:".len()..]);
                match inner {
                    Selector::Invalid(reason) => Selector::Invalid(reason),
                    inner => Selector::Selected(Box::new(inner)),
                }
            }
            _ if lower.starts_with("text:") => non_empty(&s[5..], Selector::Text),
            _ if lower.starts_with("exact:") => non_empty(&s[6..], Selector::ExactText),
            _ if lower.starts_with("id:") => non_empty(s[3..].trim(), Selector::Id),
            _ if lower.starts_with("desc:") => non_empty(&s[5..], Selector::Desc),
            _ if lower.starts_with("classname:") => non_empty(s[10..].trim(), Selector::ClassName),
            _ if lower.starts_with("invalid:") => Selector::Invalid(s[8..].to_string()),
            // Bare strings are the common case: marker text as the user sees it
            _ => Selector::Text(s.to_string()),
        }
    }
}

fn non_empty(value: &str, make: fn(String) -> Selector) -> Selector {
    if value.is_empty() {
        Selector::Invalid("Selector prefix without a value".to_string())
    } else {
        make(value.to_string())
    }
}

impl From<String> for Selector {
    fn from(s: String) -> Self {
        Selector::from(s.as_str())
    }
}

impl From<Selector> for String {
    fn from(selector: Selector) -> Self {
        selector.to_string()
    }
}

impl Selector {
    pub fn is_valid(&self) -> bool {
        match self {
            Selector::Invalid(_) => false,
            Selector::Selected(inner) => inner.is_valid(),
            _ => true,
        }
    }

    /// Whether one node satisfies this selector
    pub fn matches(&self, snapshot: &UiSnapshot, id: NodeId) -> bool {
        let attrs = snapshot.attrs(id);
        match self {
            Selector::Text(t) => contains_ci(attrs.text_or_empty(), t),
            Selector::ExactText(t) => attrs.text.as_deref() == Some(t.as_str()),
            Selector::Id(rid) => attrs.resource_id.as_deref() == Some(rid.as_str()),
            Selector::Desc(d) => contains_ci(attrs.description_or_empty(), d),
            Selector::ClassName(c) => attrs.class_name.contains(c.as_str()),
            Selector::Selected(inner) => attrs.selected && inner.matches(snapshot, id),
            Selector::Invalid(_) => false,
        }
    }

    /// First node of the app window, breadth-first, matching this selector
    pub fn find(&self, snapshot: &UiSnapshot, max_depth: usize) -> Option<NodeId> {
        snapshot
            .bfs(max_depth)
            .find(|id| self.matches(snapshot, *id))
    }

    pub fn is_present(&self, snapshot: &UiSnapshot, max_depth: usize) -> bool {
        self.find(snapshot, max_depth).is_some()
    }
}

/// Any of the selectors is present
pub fn any_present(selectors: &[Selector], snapshot: &UiSnapshot, max_depth: usize) -> bool {
    selectors.iter().any(|s| s.is_present(snapshot, max_depth))
}

/// First node matching any of the selectors, trying selectors in order
pub fn find_any(selectors: &[Selector], snapshot: &UiSnapshot, max_depth: usize) -> Option<NodeId> {
    selectors.iter().find_map(|s| s.find(snapshot, max_depth))
}
