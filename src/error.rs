//! Error taxonomy for the viewer core.

use std::fmt;

/// Errors raised while loading, interacting with, or persisting a pane.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerError {
    /// Bytes could not be parsed as the declared format, or could not be fetched
    Decode(String),
    /// Bytes parsed, but the component count is neither 1 nor 3
    UnsupportedFormat { components: u16 },
    /// Pointer landed outside the image rectangle (never shown to the user)
    OutOfBounds { x: f64, y: f64 },
    /// Saving or loading annotations failed
    Persistence(String),
}

impl ViewerError {
    /// Whether this error should abort pane initialization.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ViewerError::Decode(_) | ViewerError::UnsupportedFormat { .. }
        )
    }
}

impl fmt::Display for ViewerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerError::Decode(msg) => write!(f, "Could not decode image: {}", msg),
            ViewerError::UnsupportedFormat { components } => write!(
                f,
                "Unsupported image format: {} components per pixel",
                components
            ),
            ViewerError::OutOfBounds { x, y } => {
                write!(f, "Pointer outside image at ({:.1}, {:.1})", x, y)
            }
            ViewerError::Persistence(msg) => write!(f, "Could not store annotations: {}", msg),
        }
    }
}

impl std::error::Error for ViewerError {}

/// Result alias for viewer operations.
pub type Result<T> = std::result::Result<T, ViewerError>;
