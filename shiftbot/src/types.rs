//! Common geometry types shared by the snapshot, the handlers and the UI source

use serde::{Deserialize, Serialize};
use std::fmt;

/// Screen bounds of a widget, in device pixels (`right`/`bottom` exclusive)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// A tiny square around a point, used for fixed-coordinate taps
    pub const fn around(x: i32, y: i32) -> Self {
        Self::new(x - 1, y - 1, x + 1, y + 1)
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn center_x(&self) -> i32 {
        (self.left + self.right) / 2
    }

    pub fn center_y(&self) -> i32 {
        (self.top + self.bottom) / 2
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// Large enough to be tapped without hitting a neighbour
    pub fn is_tappable(&self) -> bool {
        self.width() > 4 && self.height() > 4
    }
}

/// A fixed screen coordinate, used by the geometry fallbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn as_rect(self) -> Rect {
        Rect::around(self.x, self.y)
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{}][{},{}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}
