//! Pointer gesture state machine
//!
//! One instance per pane is the only record of which tool is armed.
//! Transitions return an [`Effect`] for the session to carry out; the
//! machine itself never touches the model or the surface.

use super::messages::{PointerButton, PointerEvent};
use crate::domain::Vec2;
use crate::render::Hit;

/// Armed annotation tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    None,
    Point,
    Trace,
}

/// Default gestures available while no tool is armed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleDrag {
    WindowLevel,
    Pan,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionState {
    /// No tool armed; `drag` holds the gesture in progress and its last position
    Idle { drag: Option<(IdleDrag, Vec2)> },
    PlacingPoint,
    Drawing { dragging: bool },
}

/// Work requested by a transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    CreatePoint(Hit),
    BeginTrace(Vec2),
    ExtendTrace(Vec2),
    CommitTrace,
    /// Device-pixel drag delta
    Pan(Vec2),
    /// Device-pixel drag delta
    AdjustWindowLevel(Vec2),
    /// Wheel notches, positive zooms in
    Zoom(f64),
}

#[derive(Debug, Clone)]
pub struct InteractionMachine {
    state: InteractionState,
}

impl Default for InteractionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionMachine {
    pub fn new() -> Self {
        Self {
            state: InteractionState::Idle { drag: None },
        }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn active_tool(&self) -> Tool {
        match self.state {
            InteractionState::Idle { .. } => Tool::None,
            InteractionState::PlacingPoint => Tool::Point,
            InteractionState::Drawing { .. } => Tool::Trace,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, InteractionState::Drawing { dragging: true })
    }

    /// Arm or disarm the point tool; arming always disarms the trace tool
    pub fn set_point_mode(&mut self, enabled: bool) -> Option<Effect> {
        if enabled {
            let effect = self.leave_drawing();
            self.state = InteractionState::PlacingPoint;
            effect
        } else {
            if self.state == InteractionState::PlacingPoint {
                self.state = InteractionState::Idle { drag: None };
            }
            None
        }
    }

    /// Arm or disarm the trace tool; arming always disarms the point tool
    pub fn set_trace_mode(&mut self, enabled: bool) -> Option<Effect> {
        if enabled {
            if !matches!(self.state, InteractionState::Drawing { .. }) {
                self.state = InteractionState::Drawing { dragging: false };
            }
            None
        } else {
            let effect = self.leave_drawing();
            if matches!(self.state, InteractionState::Drawing { .. }) {
                self.state = InteractionState::Idle { drag: None };
            }
            effect
        }
    }

    /// A trace in progress is committed when the trace tool goes away
    fn leave_drawing(&mut self) -> Option<Effect> {
        if self.is_dragging() {
            self.state = InteractionState::Drawing { dragging: false };
            Some(Effect::CommitTrace)
        } else {
            None
        }
    }

    /// Back to Idle with nothing in flight
    pub fn reset(&mut self) {
        self.state = InteractionState::Idle { drag: None };
    }

    /// Route one pointer event; `hit` is `None` when the pointer is off the image
    pub fn handle(&mut self, event: &PointerEvent, hit: Option<Hit>) -> Option<Effect> {
        if let PointerEvent::Wheel { notches } = *event {
            return Some(Effect::Zoom(notches));
        }

        match (self.state, *event) {
            // Placing points
            (
                InteractionState::PlacingPoint,
                PointerEvent::Down {
                    button: PointerButton::Primary,
                    ..
                },
            ) => hit.map(Effect::CreatePoint),

            // Drawing traces
            (
                InteractionState::Drawing { dragging: false },
                PointerEvent::Down {
                    button: PointerButton::Primary,
                    ..
                },
            ) => {
                let hit = hit?;
                self.state = InteractionState::Drawing { dragging: true };
                Some(Effect::BeginTrace(hit.world))
            }
            (InteractionState::Drawing { dragging: true }, PointerEvent::Move { .. }) => {
                hit.map(|h| Effect::ExtendTrace(h.world))
            }
            (InteractionState::Drawing { dragging: true }, PointerEvent::Up { .. }) => {
                self.state = InteractionState::Drawing { dragging: false };
                Some(Effect::CommitTrace)
            }

            // Default gestures
            (InteractionState::Idle { drag: None }, PointerEvent::Down { pos, button }) => {
                let kind = match button {
                    PointerButton::Primary => IdleDrag::WindowLevel,
                    PointerButton::Secondary => IdleDrag::Pan,
                };
                self.state = InteractionState::Idle {
                    drag: Some((kind, pos)),
                };
                None
            }
            (InteractionState::Idle { drag: Some((kind, last)) }, PointerEvent::Move { pos }) => {
                self.state = InteractionState::Idle {
                    drag: Some((kind, pos)),
                };
                let delta = pos - last;
                Some(match kind {
                    IdleDrag::WindowLevel => Effect::AdjustWindowLevel(delta),
                    IdleDrag::Pan => Effect::Pan(delta),
                })
            }
            (InteractionState::Idle { drag: Some(_) }, PointerEvent::Up { .. }) => {
                self.state = InteractionState::Idle { drag: None };
                None
            }

            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PixelPos;

    fn hit() -> Option<Hit> {
        Some(Hit {
            pixel: PixelPos::new(2, 2),
            world: Vec2::new(0.1, 0.1),
        })
    }

    fn down() -> PointerEvent {
        PointerEvent::Down {
            pos: Vec2::new(10.0, 10.0),
            button: PointerButton::Primary,
        }
    }

    fn up() -> PointerEvent {
        PointerEvent::Up {
            pos: Vec2::new(10.0, 10.0),
            button: PointerButton::Primary,
        }
    }

    fn moved(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Move {
            pos: Vec2::new(x, y),
        }
    }

    fn all_states() -> Vec<InteractionMachine> {
        let mut idle_dragging = InteractionMachine::new();
        idle_dragging.handle(&down(), None);
        let mut placing = InteractionMachine::new();
        placing.set_point_mode(true);
        let mut drawing = InteractionMachine::new();
        drawing.set_trace_mode(true);
        let mut dragging = drawing.clone();
        dragging.handle(&down(), hit());
        vec![InteractionMachine::new(), idle_dragging, placing, drawing, dragging]
    }

    #[test]
    fn test_point_mode_forces_trace_off() {
        for mut machine in all_states() {
            machine.set_point_mode(true);
            assert_eq!(machine.active_tool(), Tool::Point);
            assert!(!machine.is_dragging());
        }
    }

    #[test]
    fn test_trace_mode_forces_point_off() {
        for mut machine in all_states() {
            machine.set_trace_mode(true);
            assert_eq!(machine.active_tool(), Tool::Trace);
        }
    }

    #[test]
    fn test_switching_tools_mid_trace_commits() {
        let mut machine = InteractionMachine::new();
        machine.set_trace_mode(true);
        machine.handle(&down(), hit());
        assert_eq!(machine.set_point_mode(true), Some(Effect::CommitTrace));
    }

    #[test]
    fn test_disarming_returns_to_idle() {
        let mut machine = InteractionMachine::new();
        machine.set_point_mode(true);
        machine.set_point_mode(false);
        assert_eq!(machine.state(), InteractionState::Idle { drag: None });

        machine.set_trace_mode(true);
        // Disarming the tool that is not armed changes nothing
        machine.set_point_mode(false);
        assert_eq!(machine.active_tool(), Tool::Trace);
        machine.set_trace_mode(false);
        assert_eq!(machine.active_tool(), Tool::None);
    }

    #[test]
    fn test_point_tool_stays_armed() {
        let mut machine = InteractionMachine::new();
        machine.set_point_mode(true);
        assert!(matches!(machine.handle(&down(), hit()), Some(Effect::CreatePoint(_))));
        assert!(matches!(machine.handle(&down(), hit()), Some(Effect::CreatePoint(_))));
        assert_eq!(machine.active_tool(), Tool::Point);
    }

    #[test]
    fn test_point_outside_image_ignored() {
        let mut machine = InteractionMachine::new();
        machine.set_point_mode(true);
        assert_eq!(machine.handle(&down(), None), None);
    }

    #[test]
    fn test_trace_gesture_sequence() {
        let mut machine = InteractionMachine::new();
        machine.set_trace_mode(true);
        assert_eq!(machine.handle(&down(), hit()), Some(Effect::BeginTrace(Vec2::new(0.1, 0.1))));
        assert!(machine.is_dragging());
        assert!(matches!(machine.handle(&moved(11.0, 11.0), hit()), Some(Effect::ExtendTrace(_))));
        // Off-image moves produce no vertex but keep the drag alive
        assert_eq!(machine.handle(&moved(-5.0, -5.0), None), None);
        assert!(machine.is_dragging());
        assert_eq!(machine.handle(&up(), None), Some(Effect::CommitTrace));
        assert_eq!(machine.state(), InteractionState::Drawing { dragging: false });
    }

    #[test]
    fn test_trace_down_outside_does_not_start() {
        let mut machine = InteractionMachine::new();
        machine.set_trace_mode(true);
        assert_eq!(machine.handle(&down(), None), None);
        assert!(!machine.is_dragging());
        assert_eq!(machine.handle(&moved(1.0, 1.0), hit()), None);
    }

    #[test]
    fn test_idle_drags_drive_defaults() {
        let mut machine = InteractionMachine::new();
        assert_eq!(machine.handle(&down(), hit()), None);
        assert_eq!(
            machine.handle(&moved(13.0, 6.0), hit()),
            Some(Effect::AdjustWindowLevel(Vec2::new(3.0, -4.0)))
        );
        machine.handle(&up(), hit());

        machine.handle(
            &PointerEvent::Down {
                pos: Vec2::new(0.0, 0.0),
                button: PointerButton::Secondary,
            },
            None,
        );
        assert_eq!(
            machine.handle(&moved(5.0, 5.0), None),
            Some(Effect::Pan(Vec2::new(5.0, 5.0)))
        );
    }

    #[test]
    fn test_wheel_zooms_in_every_state() {
        for mut machine in all_states() {
            assert_eq!(
                machine.handle(&PointerEvent::Wheel { notches: 1.0 }, None),
                Some(Effect::Zoom(1.0))
            );
        }
    }
}
