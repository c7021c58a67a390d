//! Configuration persistence for viewer settings

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Serializable color representation for config storage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Default for Rgb {
    fn default() -> Self {
        // Red, same as the default marker color
        Self {
            r: 0.9,
            g: 0.1,
            b: 0.1,
        }
    }
}

impl Rgb {
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Convert to image crate RGBA format (0-255)
    pub fn to_rgba_u8(self) -> [u8; 4] {
        [
            (self.r.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.g.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.b.clamp(0.0, 1.0) * 255.0).round() as u8,
            255,
        ]
    }
}

/// Trace widths must be finite and positive
pub fn is_valid_line_width(width: f32) -> bool {
    width.is_finite() && width > 0.0
}

/// Optional zoom clamp, expressed as a factor relative to the fitted view
///
/// `None` on either side leaves that side unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ZoomBounds {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl ZoomBounds {
    pub fn clamp(&self, zoom: f64) -> f64 {
        let zoom = match self.min {
            Some(min) => zoom.max(min),
            None => zoom,
        };
        match self.max {
            Some(max) => zoom.min(max),
            None => zoom,
        }
    }
}

/// Viewer configuration persisted between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Color given to newly placed points
    #[serde(default = "default_point_color")]
    pub point_color: Rgb,
    /// Color given to newly drawn traces
    #[serde(default = "default_trace_color")]
    pub trace_color: Rgb,
    /// Trace line width in device pixels
    #[serde(default = "default_line_width")]
    pub line_width: f32,
    /// Apparent marker radius in device pixels
    #[serde(default = "default_marker_size_px")]
    pub marker_size_px: f64,
    #[serde(default)]
    pub zoom: ZoomBounds,
    /// Zoom factor applied per wheel notch
    #[serde(default = "default_wheel_zoom_step")]
    pub wheel_zoom_step: f64,
    /// Fraction of the sample range swept by dragging across the full viewport
    #[serde(default = "default_window_level_sensitivity")]
    pub window_level_sensitivity: f64,
    /// Depth of the toolbar broadcast channel
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
    /// How long a transient notification stays visible
    #[serde(default = "default_notification_ttl_secs")]
    pub notification_ttl_secs: u64,
}

fn default_point_color() -> Rgb {
    Rgb::default()
}

fn default_trace_color() -> Rgb {
    Rgb {
        r: 1.0,
        g: 0.9,
        b: 0.0,
    } // Yellow
}

fn default_line_width() -> f32 {
    2.0
}

fn default_marker_size_px() -> f64 {
    5.0
}

fn default_wheel_zoom_step() -> f64 {
    1.1
}

fn default_window_level_sensitivity() -> f64 {
    1.0
}

fn default_bus_capacity() -> usize {
    64
}

fn default_notification_ttl_secs() -> u64 {
    5
}

impl ViewerConfig {
    /// Directory name under the platform config dir
    pub const ID: &'static str = "neoscope";

    fn config_file_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("No config directory on this platform")?;
        Ok(dir.join(Self::ID).join("config.json"))
    }

    /// Load configuration from disk, or return defaults if unavailable
    pub fn load() -> Self {
        match Self::config_file_path().and_then(|path| Self::load_from(&path)) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Error loading config, using defaults: {:?}", err);
                Self::default()
            }
        }
    }

    /// Load configuration from an explicit file; a missing file yields defaults
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = serde_json::from_str(&json)
            .with_context(|| format!("Malformed config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self) {
        if let Err(err) = Self::config_file_path().and_then(|path| self.save_to(&path)) {
            log::error!("Failed to save config: {:?}", err);
        }
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            point_color: default_point_color(),
            trace_color: default_trace_color(),
            line_width: default_line_width(),
            marker_size_px: default_marker_size_px(),
            // Unbounded unless configured
            zoom: ZoomBounds::default(),
            wheel_zoom_step: default_wheel_zoom_step(),
            window_level_sensitivity: default_window_level_sensitivity(),
            bus_capacity: default_bus_capacity(),
            notification_ttl_secs: default_notification_ttl_secs(),
        }
    }
}
