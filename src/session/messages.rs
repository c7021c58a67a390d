//! Input event types for a viewer pane

use crate::domain::Vec2;

/// Mouse/touch button driving a gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Annotates when a tool is armed, window/level otherwise
    Primary,
    /// Pans
    Secondary,
}

/// Pointer input in device coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { pos: Vec2, button: PointerButton },
    Move { pos: Vec2 },
    Up { pos: Vec2, button: PointerButton },
    /// Positive notches zoom in
    Wheel { notches: f64 },
}

impl PointerEvent {
    /// Device position carried by the event, if any
    pub fn position(&self) -> Option<Vec2> {
        match self {
            PointerEvent::Down { pos, .. }
            | PointerEvent::Move { pos }
            | PointerEvent::Up { pos, .. } => Some(*pos),
            PointerEvent::Wheel { .. } => None,
        }
    }
}
