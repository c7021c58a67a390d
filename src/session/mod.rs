//! Per-pane viewer session
//!
//! This module contains:
//! - Pointer event types
//! - The interaction state machine deciding what each gesture does
//! - The session tying image, window/level, surface and annotations together

pub mod interaction;
pub mod messages;
pub mod state;

pub use interaction::{InteractionMachine, InteractionState, Tool};
pub use messages::{PointerButton, PointerEvent};
pub use state::{ToolStyle, ViewerSession};
