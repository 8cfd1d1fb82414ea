//! Common value types shared by the resolver, the search engine and the input sequencer

use crate::AutomationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A point in screen (pixel) space. Multi-monitor layouts may yield negative values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Bounding rectangle in screen space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rectangle with no area cannot be targeted by a pointer gesture.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }
}

/// Identifies a top-level window. `0` is never a valid handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowHandle(pub isize);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// Pointer buttons that can be pressed by the sequencer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
    X1,
    X2,
}

impl FromStr for MouseButton {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" => Ok(MouseButton::Left),
            "right" => Ok(MouseButton::Right),
            "middle" => Ok(MouseButton::Middle),
            "x1" => Ok(MouseButton::X1),
            "x2" => Ok(MouseButton::X2),
            other => Err(AutomationError::InvalidArgument(format!(
                "Unknown mouse button '{other}'. Use left, right, middle, x1 or x2."
            ))),
        }
    }
}

/// Direction of a button or key transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyState {
    Down,
    Up,
}

/// Which nodes a traversal counts as "real" elements.
///
/// The walk itself always follows the raw tree; the kind is applied as an
/// extra predicate next to the match criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalKind {
    Raw,
    #[default]
    Control,
    Content,
}

/// How far below the root a search may descend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    Children,
    #[default]
    Subtree,
}

/// Interaction patterns an element supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub invoke: bool,
    pub value: bool,
    pub toggle: bool,
    pub selection_item: bool,
    pub expand_collapse: bool,
    pub scroll: bool,
}

impl Capabilities {
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.invoke {
            names.push("invoke");
        }
        if self.value {
            names.push("value");
        }
        if self.toggle {
            names.push("toggle");
        }
        if self.selection_item {
            names.push("selection_item");
        }
        if self.expand_collapse {
            names.push("expand_collapse");
        }
        if self.scroll {
            names.push("scroll");
        }
        names
    }
}
