//! Rendering surface: camera, textured quad and overlay primitives
//!
//! The scene graph itself lives behind [`SceneBackend`] so the annotation
//! model and interaction logic can run without a rendering context.

use std::collections::BTreeSet;

use image::RgbaImage;

use super::camera::Camera;
use super::mapper::{CoordinateMapper, Placement};
use crate::config::{Rgb, ViewerConfig};
use crate::domain::{AnnotationId, Rect, Vec2};

/// Narrow interface to a scene graph implementation
///
/// Marker and polyline coordinates are world space. Radii are world units.
pub trait SceneBackend {
    fn set_texture(&mut self, texture: &RgbaImage, placement: &Placement);
    fn add_marker(&mut self, id: AnnotationId, center: Vec2, radius: f64, color: Rgb);
    fn remove_marker(&mut self, id: AnnotationId);
    /// Apply a new radius to every marker
    fn set_marker_radius(&mut self, radius: f64);
    fn add_polyline(&mut self, id: AnnotationId, points: &[Vec2], color: Rgb, width: f32);
    /// Append one vertex to an existing polyline
    fn extend_polyline(&mut self, id: AnnotationId, point: Vec2);
    fn remove_overlay(&mut self, id: AnnotationId);
    fn reset_camera(&mut self, camera: &Camera);
    fn zoom_by(&mut self, factor: f64, camera: &Camera);
    fn pan_camera(&mut self, camera: &Camera);
    /// Free native resources; no other call follows
    fn release(&mut self);
}

/// Owns the camera and tracks which overlays the backend holds
pub struct RenderingSurface<B: SceneBackend> {
    backend: B,
    camera: Camera,
    placement: Placement,
    marker_size_px: f64,
    markers: BTreeSet<AnnotationId>,
    polylines: BTreeSet<AnnotationId>,
    texture_uploads: u64,
    released: bool,
}

impl<B: SceneBackend> RenderingSurface<B> {
    pub fn new(mut backend: B, mapper: &CoordinateMapper, viewport: Rect, config: &ViewerConfig) -> Self {
        let placement = *mapper.placement();
        let mut camera = Camera::new(viewport, config.zoom);
        let (ew, eh) = mapper.world_extent();
        camera.fit(placement.center(), ew, eh);
        backend.reset_camera(&camera);
        Self {
            backend,
            camera,
            placement,
            marker_size_px: config.marker_size_px,
            markers: BTreeSet::new(),
            polylines: BTreeSet::new(),
            texture_uploads: 0,
            released: false,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of times a texture was handed to the backend
    pub fn texture_uploads(&self) -> u64 {
        self.texture_uploads
    }

    pub fn overlay_count(&self) -> usize {
        self.markers.len() + self.polylines.len()
    }

    /// Marker radius in world units giving a constant apparent size
    pub fn marker_radius(&self) -> f64 {
        self.marker_size_px * self.camera.world_per_pixel()
    }

    pub fn set_texture(&mut self, texture: &RgbaImage) {
        self.texture_uploads += 1;
        self.backend.set_texture(texture, &self.placement);
    }

    pub fn add_marker(&mut self, id: AnnotationId, center: Vec2, color: Rgb) {
        let radius = self.marker_radius();
        self.backend.add_marker(id, center, radius, color);
        self.markers.insert(id);
    }

    pub fn remove_marker(&mut self, id: AnnotationId) {
        if self.markers.remove(&id) {
            self.backend.remove_marker(id);
        }
    }

    pub fn add_polyline(&mut self, id: AnnotationId, points: &[Vec2], color: Rgb, width: f32) {
        self.backend.add_polyline(id, points, color, width);
        self.polylines.insert(id);
    }

    pub fn extend_polyline(&mut self, id: AnnotationId, point: Vec2) {
        if self.polylines.contains(&id) {
            self.backend.extend_polyline(id, point);
        }
    }

    pub fn remove_polyline(&mut self, id: AnnotationId) {
        if self.polylines.remove(&id) {
            self.backend.remove_overlay(id);
        }
    }

    /// Recenter and refit the camera
    pub fn reset_view(&mut self) {
        self.camera.reset();
        self.backend.reset_camera(&self.camera);
        self.rescale_markers();
    }

    /// Adopt a new viewport size, refitting the view
    pub fn resize(&mut self, viewport: Rect) {
        let (ew, eh) = (self.placement.u.length(), self.placement.v.length());
        self.camera.set_viewport(viewport);
        self.camera.fit(self.placement.center(), ew, eh);
        self.backend.reset_camera(&self.camera);
        self.rescale_markers();
    }

    pub fn zoom_by(&mut self, factor: f64) {
        let applied = self.camera.zoom_by(factor);
        if applied != 1.0 {
            self.backend.zoom_by(applied, &self.camera);
            self.rescale_markers();
        }
    }

    pub fn pan_by_device(&mut self, delta: Vec2) {
        self.camera.pan_by_device(delta);
        self.backend.pan_camera(&self.camera);
    }

    fn rescale_markers(&mut self) {
        if !self.markers.is_empty() {
            let radius = self.marker_radius();
            self.backend.set_marker_radius(radius);
        }
    }

    /// Remove every overlay and free the backend; safe to call twice
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        for id in std::mem::take(&mut self.markers) {
            self.backend.remove_marker(id);
        }
        for id in std::mem::take(&mut self.polylines) {
            self.backend.remove_overlay(id);
        }
        self.backend.release();
        self.released = true;
        log::debug!("Rendering surface released");
    }
}

impl<B: SceneBackend> Drop for RenderingSurface<B> {
    fn drop(&mut self) {
        self.release();
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{RecordingBackend, SceneCall};
    use super::*;

    fn surface() -> (RenderingSurface<RecordingBackend>, RecordingBackend) {
        let backend = RecordingBackend::default();
        let mapper = CoordinateMapper::new(10, 10);
        let surface = RenderingSurface::new(
            backend.clone(),
            &mapper,
            Rect::from_size(100, 100),
            &ViewerConfig::default(),
        );
        (surface, backend)
    }

    #[test]
    fn test_marker_keeps_apparent_size() {
        let (mut surface, backend) = surface();
        surface.add_marker(AnnotationId(1), Vec2::ZERO, Rgb::default());
        let before = surface.marker_radius();
        surface.zoom_by(2.0);
        assert!((surface.marker_radius() - before / 2.0).abs() < 1e-12);
        assert!(backend.calls().contains(&SceneCall::SetMarkerRadius(before / 2.0)));
    }

    #[test]
    fn test_resize_refits_and_rescales_markers() {
        let (mut surface, backend) = surface();
        surface.add_marker(AnnotationId(1), Vec2::ZERO, Rgb::default());
        let before = surface.marker_radius();
        surface.zoom_by(3.0);
        surface.resize(Rect::from_size(200, 200));

        assert_eq!(surface.camera().viewport(), Rect::from_size(200, 200));
        assert_eq!(surface.camera().zoom(), 1.0);
        assert!((surface.marker_radius() - before / 2.0).abs() < 1e-12);
        let calls = backend.calls();
        assert_eq!(calls[calls.len() - 2], SceneCall::ResetCamera);
        assert!(matches!(calls.last(), Some(SceneCall::SetMarkerRadius(_))));
    }

    #[test]
    fn test_release_removes_everything_once() {
        let (mut surface, backend) = surface();
        surface.add_marker(AnnotationId(1), Vec2::ZERO, Rgb::default());
        surface.add_polyline(AnnotationId(2), &[Vec2::ZERO], Rgb::default(), 1.0);
        surface.release();
        drop(surface);

        let calls = backend.calls();
        let release_at = calls.iter().position(|c| *c == SceneCall::Release).unwrap();
        assert!(calls[..release_at].contains(&SceneCall::RemoveMarker(AnnotationId(1))));
        assert!(calls[..release_at].contains(&SceneCall::RemoveOverlay(AnnotationId(2))));
        assert_eq!(backend.count(|c| *c == SceneCall::Release), 1);
    }

    #[test]
    fn test_drop_releases() {
        let (surface, backend) = surface();
        drop(surface);
        assert_eq!(backend.calls().last(), Some(&SceneCall::Release));
    }

    #[test]
    fn test_removing_unknown_overlay_is_silent() {
        let (mut surface, backend) = surface();
        surface.remove_marker(AnnotationId(9));
        surface.remove_polyline(AnnotationId(9));
        surface.extend_polyline(AnnotationId(9), Vec2::ZERO);
        assert_eq!(backend.calls(), vec![SceneCall::ResetCamera]);
    }

    #[test]
    fn test_clamped_zoom_does_not_touch_backend() {
        let backend = RecordingBackend::default();
        let mut config = ViewerConfig::default();
        config.zoom.max = Some(1.0);
        let mapper = CoordinateMapper::new(4, 4);
        let mut surface =
            RenderingSurface::new(backend.clone(), &mapper, Rect::from_size(50, 50), &config);
        surface.zoom_by(3.0);
        assert_eq!(backend.count(|c| matches!(c, SceneCall::ZoomBy(_))), 0);
    }
}
