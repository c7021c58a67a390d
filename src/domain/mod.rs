//! Pure domain types with minimal dependencies
//!
//! Types here carry no rendering or I/O dependencies so every other
//! module can share them without cycles.

pub mod annotation;
pub mod geometry;

pub use annotation::*;
pub use geometry::*;
