//! Annotation model
//!
//! Ordered point and trace collections for one loaded image, kept in
//! lockstep with the overlay primitives on the rendering surface.

pub mod model;

pub use model::AnnotationModel;
