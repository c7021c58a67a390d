//! Display pipeline
//!
//! This module contains:
//! - The window/level transfer function (raw samples to RGBA texture)
//! - Camera and pixel/world/device coordinate mapping
//! - The rendering surface and its backend interface
//! - A tiny-skia software backend that composes frames offscreen

pub mod camera;
pub mod image;
pub mod mapper;
pub mod surface;
pub mod transfer;

pub use camera::Camera;
pub use image::SoftwareBackend;
pub use mapper::{CoordinateMapper, Hit, Placement};
pub use surface::{RenderingSurface, SceneBackend};
pub use transfer::WindowLevel;
