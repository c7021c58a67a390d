//! Software scene backend using tiny-skia
//!
//! Keeps the scene in plain collections and composes a frame on demand:
//! texture first, then traces, then point markers on top.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use image::RgbaImage;
use tiny_skia::{
    Color, FillRule, FilterQuality, LineCap, LineJoin, Paint, PathBuilder, Pixmap, PixmapPaint,
    Stroke, Transform,
};

use super::camera::Camera;
use super::mapper::Placement;
use super::surface::SceneBackend;
use crate::config::Rgb;
use crate::domain::{AnnotationId, Vec2};

/// Width of the dark rim around a marker, in device pixels
const MARKER_RIM_THICKNESS: f32 = 1.5;

#[derive(Debug, Clone)]
struct Marker {
    center: Vec2,
    color: Rgb,
}

#[derive(Debug, Clone)]
struct Polyline {
    points: Vec<Vec2>,
    color: Rgb,
    width: f32,
}

#[derive(Default)]
pub struct SoftwareBackend {
    texture: Option<(Pixmap, Placement)>,
    camera: Option<Camera>,
    markers: BTreeMap<AnnotationId, Marker>,
    marker_radius: f64,
    polylines: BTreeMap<AnnotationId, Polyline>,
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn polyline_count(&self) -> usize {
        self.polylines.len()
    }

    /// Compose the current scene at the camera's viewport size
    pub fn render(&self) -> Result<RgbaImage> {
        let camera = self.camera.as_ref().context("Scene has no camera yet")?;
        let viewport = camera.viewport();
        let (w, h) = (viewport.width().max(0) as u32, viewport.height().max(0) as u32);
        let mut pixmap = Pixmap::new(w, h).context("Viewport has zero size")?;
        pixmap.fill(Color::BLACK);

        if let Some((texture, placement)) = &self.texture {
            let transform = pixel_to_device(camera, placement, texture.width(), texture.height());
            let paint = PixmapPaint {
                quality: FilterQuality::Nearest,
                ..Default::default()
            };
            pixmap.draw_pixmap(0, 0, texture.as_ref(), &paint, transform, None);
        }

        for line in self.polylines.values() {
            draw_polyline(&mut pixmap, camera, line);
        }

        let radius_px = (self.marker_radius / camera.world_per_pixel()) as f32;
        for m in self.markers.values() {
            draw_marker(&mut pixmap, camera, m, radius_px);
        }

        RgbaImage::from_raw(w, h, pixmap.take()).context("Frame buffer size mismatch")
    }
}

/// Affine map from continuous texture pixel coordinates to device pixels
fn pixel_to_device(camera: &Camera, placement: &Placement, tex_w: u32, tex_h: u32) -> Transform {
    let d0 = camera.world_to_device(placement.origin);
    let dx = camera.world_to_device(placement.origin + placement.u * (1.0 / tex_w as f64)) - d0;
    let dy = camera.world_to_device(placement.origin + placement.v * (1.0 / tex_h as f64)) - d0;
    Transform::from_row(
        dx.x as f32,
        dx.y as f32,
        dy.x as f32,
        dy.y as f32,
        d0.x as f32,
        d0.y as f32,
    )
}

fn draw_polyline(pixmap: &mut Pixmap, camera: &Camera, line: &Polyline) {
    let mut points = line.points.iter().map(|p| camera.world_to_device(*p));
    let Some(first) = points.next() else {
        return;
    };

    let mut pb = PathBuilder::new();
    pb.move_to(first.x as f32, first.y as f32);
    for p in points {
        pb.line_to(p.x as f32, p.y as f32);
    }
    // A lone vertex yields no path
    let Some(path) = pb.finish() else {
        return;
    };

    let [r, g, b, a] = line.color.to_rgba_u8();
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;

    let stroke = Stroke {
        width: line.width.max(1.0),
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    };
    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
}

fn draw_marker(pixmap: &mut Pixmap, camera: &Camera, m: &Marker, radius_px: f32) {
    let c = camera.world_to_device(m.center);
    let Some(path) = PathBuilder::from_circle(c.x as f32, c.y as f32, radius_px.max(1.0)) else {
        return;
    };

    let [r, g, b, a] = m.color.to_rgba_u8();
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);

    // Dark rim so markers stay visible on bright tissue
    let mut rim = Paint::default();
    rim.set_color_rgba8(0, 0, 0, 220);
    rim.anti_alias = true;
    let stroke = Stroke {
        width: MARKER_RIM_THICKNESS,
        ..Default::default()
    };
    pixmap.stroke_path(&path, &rim, &stroke, Transform::identity(), None);
}

impl SceneBackend for SoftwareBackend {
    fn set_texture(&mut self, texture: &RgbaImage, placement: &Placement) {
        let size = tiny_skia::IntSize::from_wh(texture.width(), texture.height());
        // Opaque input, so straight and premultiplied alpha coincide
        match size.and_then(|size| Pixmap::from_vec(texture.as_raw().clone(), size)) {
            Some(pixmap) => self.texture = Some((pixmap, *placement)),
            None => log::warn!(
                "Ignoring texture of invalid size {}x{}",
                texture.width(),
                texture.height()
            ),
        }
    }

    fn add_marker(&mut self, id: AnnotationId, center: Vec2, radius: f64, color: Rgb) {
        self.marker_radius = radius;
        self.markers.insert(id, Marker { center, color });
    }

    fn remove_marker(&mut self, id: AnnotationId) {
        self.markers.remove(&id);
    }

    fn set_marker_radius(&mut self, radius: f64) {
        self.marker_radius = radius;
    }

    fn add_polyline(&mut self, id: AnnotationId, points: &[Vec2], color: Rgb, width: f32) {
        self.polylines.insert(
            id,
            Polyline {
                points: points.to_vec(),
                color,
                width,
            },
        );
    }

    fn extend_polyline(&mut self, id: AnnotationId, point: Vec2) {
        if let Some(line) = self.polylines.get_mut(&id) {
            line.points.push(point);
        }
    }

    fn remove_overlay(&mut self, id: AnnotationId) {
        self.polylines.remove(&id);
    }

    fn reset_camera(&mut self, camera: &Camera) {
        self.camera = Some(camera.clone());
    }

    fn zoom_by(&mut self, _factor: f64, camera: &Camera) {
        self.camera = Some(camera.clone());
    }

    fn pan_camera(&mut self, camera: &Camera) {
        self.camera = Some(camera.clone());
    }

    fn release(&mut self) {
        self.texture = None;
        self.markers.clear();
        self.polylines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;
    use crate::domain::Rect;
    use crate::render::mapper::CoordinateMapper;
    use crate::render::surface::RenderingSurface;
    use image::Rgba;

    fn white_surface(vw: u32, vh: u32) -> RenderingSurface<SoftwareBackend> {
        let mapper = CoordinateMapper::new(10, 10);
        let mut surface = RenderingSurface::new(
            SoftwareBackend::new(),
            &mapper,
            Rect::from_size(vw, vh),
            &ViewerConfig::default(),
        );
        surface.set_texture(&RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255])));
        surface
    }

    #[test]
    fn test_texture_fills_fitted_view() {
        let surface = white_surface(100, 100);
        let frame = surface.backend().render().unwrap();
        assert_eq!(frame.dimensions(), (100, 100));
        assert_eq!(frame.get_pixel(50, 50).0, [255, 255, 255, 255]);
        assert_eq!(frame.get_pixel(2, 97).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_letterbox_stays_black() {
        let surface = white_surface(200, 100);
        let frame = surface.backend().render().unwrap();
        assert_eq!(frame.get_pixel(10, 50).0, [0, 0, 0, 255]);
        assert_eq!(frame.get_pixel(100, 50).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_marker_drawn_in_color() {
        let mut surface = white_surface(100, 100);
        surface.add_marker(AnnotationId(1), Vec2::ZERO, Rgb::new(1.0, 0.0, 0.0));
        let frame = surface.backend().render().unwrap();
        assert_eq!(frame.get_pixel(50, 50).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_polyline_extends() {
        let mut surface = white_surface(100, 100);
        surface.add_polyline(AnnotationId(3), &[Vec2::new(-0.4, 0.0)], Rgb::new(0.0, 0.0, 1.0), 3.0);
        surface.extend_polyline(AnnotationId(3), Vec2::new(0.4, 0.0));
        let frame = surface.backend().render().unwrap();
        assert_eq!(frame.get_pixel(50, 50).0, [0, 0, 255, 255]);
        assert_eq!(surface.backend().polyline_count(), 1);
    }

    #[test]
    fn test_release_clears_scene() {
        let mut surface = white_surface(100, 100);
        surface.add_marker(AnnotationId(1), Vec2::ZERO, Rgb::default());
        surface.release();
        assert_eq!(surface.backend().marker_count(), 0);
        let frame = surface.backend().render().unwrap();
        assert_eq!(frame.get_pixel(50, 50).0, [0, 0, 0, 255]);
    }
}
