//! Still-image viewer core for clinical ultrasound and radiograph frames
//!
//! Decodes a frame, maps it through a window/level transfer function,
//! and lets the user place points and draw traces in one pane or in two
//! synchronized panes.

pub mod annotations;
pub mod config;
pub mod core;
pub mod decode;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod render;
pub mod session;

pub use config::ViewerConfig;
pub use error::{Result, ViewerError};
