//! Orthographic, aspect-locked camera
//!
//! World space is y-up; device space is y-down pointer pixels. One device
//! pixel covers the same world distance on both axes.

use crate::config::ZoomBounds;
use crate::domain::{Rect, Vec2};

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    viewport: Rect,
    focal: Vec2,
    /// Half of the visible world height
    parallel_scale: f64,
    fit_focal: Vec2,
    fit_scale: f64,
    bounds: ZoomBounds,
}

impl Camera {
    pub fn new(viewport: Rect, bounds: ZoomBounds) -> Self {
        Self {
            viewport,
            focal: Vec2::ZERO,
            parallel_scale: 1.0,
            fit_focal: Vec2::ZERO,
            fit_scale: 1.0,
            bounds,
        }
    }

    /// Compute the view that fits a world rectangle and apply it
    pub fn fit(&mut self, center: Vec2, extent_w: f64, extent_h: f64) {
        let vw = self.viewport.width().max(1) as f64;
        let vh = self.viewport.height().max(1) as f64;
        let half_h = (extent_h / 2.0).max(extent_w / 2.0 * vh / vw);
        self.fit_focal = center;
        self.fit_scale = if half_h > 0.0 { half_h } else { 1.0 };
        self.reset();
    }

    /// Recenter and refit to the last fitted view
    pub fn reset(&mut self) {
        self.focal = self.fit_focal;
        self.parallel_scale = self.fit_scale;
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    pub fn focal(&self) -> Vec2 {
        self.focal
    }

    pub fn parallel_scale(&self) -> f64 {
        self.parallel_scale
    }

    /// Magnification relative to the fitted view
    pub fn zoom(&self) -> f64 {
        self.fit_scale / self.parallel_scale
    }

    /// Zoom in (`factor > 1`) or out, honouring configured bounds
    ///
    /// Returns the factor actually applied.
    pub fn zoom_by(&mut self, factor: f64) -> f64 {
        if !(factor.is_finite() && factor > 0.0) {
            return 1.0;
        }
        let before = self.zoom();
        let target = self.bounds.clamp(before * factor);
        self.parallel_scale = self.fit_scale / target;
        target / before
    }

    /// Move the view so content follows a pointer drag of `delta` device pixels
    pub fn pan_by_device(&mut self, delta: Vec2) {
        let wpp = self.world_per_pixel();
        self.focal = self.focal - Vec2::new(delta.x * wpp, -delta.y * wpp);
    }

    /// World distance covered by one device pixel
    pub fn world_per_pixel(&self) -> f64 {
        2.0 * self.parallel_scale / self.viewport.height().max(1) as f64
    }

    pub fn device_to_world(&self, device: Vec2) -> Vec2 {
        let rel = device - self.viewport.center();
        let wpp = self.world_per_pixel();
        self.focal + Vec2::new(rel.x * wpp, -rel.y * wpp)
    }

    pub fn world_to_device(&self, world: Vec2) -> Vec2 {
        let rel = world - self.focal;
        let ppw = 1.0 / self.world_per_pixel();
        self.viewport.center() + Vec2::new(rel.x * ppw, -rel.y * ppw)
    }
}
