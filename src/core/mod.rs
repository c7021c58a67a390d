//! Pane orchestration
//!
//! This module contains:
//! - The typed toolbar command bus (bus.rs)
//! - Pane lifecycle: load, commands, persistence (pane.rs)
//! - The single/compare container owning the bus (compare.rs)

pub mod bus;
pub mod compare;
pub mod pane;

pub use bus::{CommandBus, PaneTag, Scope, ToolbarCommand, ToolbarSnapshot};
pub use compare::CompareView;
pub use pane::{fetch_image, LoadTicket, Notification, Pane, PaneState};
