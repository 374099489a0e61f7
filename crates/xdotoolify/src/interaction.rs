// Interactions - simulated user input handed to the page driver
//
// The core never delivers input itself. It records what should happen and the
// driver performs it; the serde shape below is what drivers that speak JSON
// receive.

use serde::{Deserialize, Serialize};

/// Mouse button for click and press/release interactions
///
/// # Example
///
/// ```ignore
/// use xdotoolify::MouseButton;
///
/// let button = MouseButton::Right;
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    /// Left mouse button (default)
    #[default]
    Left,
    /// Right mouse button
    Right,
    /// Middle mouse button
    Middle,
}

/// Where a mouse move should end up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "kind")]
pub enum MoveTarget {
    /// Absolute coordinates in CSS pixels relative to the viewport
    Point { x: f64, y: f64 },
    /// Center of the first element matching a selector, plus an offset
    Selector {
        selector: String,
        #[serde(default)]
        offset_x: f64,
        #[serde(default)]
        offset_y: f64,
    },
}

impl MoveTarget {
    pub fn point(x: f64, y: f64) -> Self {
        MoveTarget::Point { x, y }
    }

    pub fn selector(selector: impl Into<String>) -> Self {
        MoveTarget::Selector {
            selector: selector.into(),
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

/// A single simulated input event.
///
/// Every interaction leaves the chain owing a verification step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "type")]
pub enum Interaction {
    /// Press and release a mouse button at the current pointer position
    Click { button: MouseButton },
    /// Press a mouse button without releasing it
    MouseDown { button: MouseButton },
    /// Release a previously pressed mouse button
    MouseUp { button: MouseButton },
    /// Move the pointer
    MouseMove { target: MoveTarget },
    /// Scroll by the given deltas
    Wheel { delta_x: i32, delta_y: i32 },
    /// Press and release a key combination such as `ctrl+a`
    Key { combo: String },
    /// Press a key without releasing it
    KeyDown { key: String },
    /// Release a previously pressed key
    KeyUp { key: String },
    /// Type text one character at a time
    Type { text: String },
}

impl Interaction {
    /// Short label used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Interaction::Click { .. } => "click",
            Interaction::MouseDown { .. } => "mousedown",
            Interaction::MouseUp { .. } => "mouseup",
            Interaction::MouseMove { .. } => "mousemove",
            Interaction::Wheel { .. } => "wheel",
            Interaction::Key { .. } => "key",
            Interaction::KeyDown { .. } => "keydown",
            Interaction::KeyUp { .. } => "keyup",
            Interaction::Type { .. } => "type",
        }
    }
}
