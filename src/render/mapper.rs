//! Pixel ↔ world ↔ device coordinate mapping
//!
//! The image occupies a placement rectangle in world space: an origin at
//! the top-left pixel corner plus two edge vectors spanning the full width
//! and height. The longer image side has world length 1, centered on the
//! world origin. Both directions are exact affine maps of that rectangle.
//!
//! Device positions go through the live [`Camera`]; nothing derived from
//! the camera is cached here.

use super::camera::Camera;
use crate::domain::{PixelPos, Vec2};
use crate::error::{Result, ViewerError};

/// Image rectangle in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// World position of pixel corner (0, 0)
    pub origin: Vec2,
    /// Edge along increasing pixel x, full image width
    pub u: Vec2,
    /// Edge along increasing pixel y, full image height
    pub v: Vec2,
}

impl Placement {
    pub fn center(&self) -> Vec2 {
        self.origin + self.u * 0.5 + self.v * 0.5
    }
}

/// Pointer position resolved against the image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub pixel: PixelPos,
    pub world: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateMapper {
    width: u32,
    height: u32,
    placement: Placement,
}

impl CoordinateMapper {
    /// Aspect-preserving placement for a `width` x `height` image
    pub fn new(width: u32, height: u32) -> Self {
        let (w, h) = (width.max(1) as f64, height.max(1) as f64);
        let s = 1.0 / w.max(h);
        let placement = Placement {
            origin: Vec2::new(-w * s / 2.0, h * s / 2.0),
            u: Vec2::new(w * s, 0.0),
            v: Vec2::new(0.0, -h * s),
        };
        Self {
            width,
            height,
            placement,
        }
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    /// World width and height of the placement rectangle
    pub fn world_extent(&self) -> (f64, f64) {
        (self.placement.u.length(), self.placement.v.length())
    }

    /// Continuous pixel coordinates (corner-based) to world
    pub fn pixel_to_world(&self, x: f64, y: f64) -> Vec2 {
        let p = &self.placement;
        p.origin + p.u * (x / self.width as f64) + p.v * (y / self.height as f64)
    }

    /// World position of a pixel's center
    pub fn pixel_center(&self, pixel: PixelPos) -> Vec2 {
        self.pixel_to_world(pixel.x as f64 + 0.5, pixel.y as f64 + 0.5)
    }

    /// World to continuous pixel coordinates, inverting the placement exactly
    pub fn world_to_pixel(&self, world: Vec2) -> (f64, f64) {
        let p = &self.placement;
        let d = world - p.origin;
        let det = p.u.cross(p.v);
        let a = d.cross(p.v) / det;
        let b = p.u.cross(d) / det;
        (a * self.width as f64, b * self.height as f64)
    }

    /// World to pixel index; positions outside the image are rejected, never clamped
    pub fn world_to_pixel_index(&self, world: Vec2) -> Result<PixelPos> {
        let (x, y) = self.world_to_pixel(world);
        let inside = x >= 0.0 && y >= 0.0 && x < self.width as f64 && y < self.height as f64;
        if !inside {
            // NaN lands here too
            return Err(ViewerError::OutOfBounds { x, y });
        }
        let pixel = PixelPos::new(x.floor() as u32, y.floor() as u32);
        // Guard against rounding right at the far edge
        if pixel.x >= self.width || pixel.y >= self.height {
            return Err(ViewerError::OutOfBounds { x, y });
        }
        Ok(pixel)
    }

    /// Resolve a device position against the image under the current camera
    pub fn device_hit(&self, camera: &Camera, device: Vec2) -> Result<Hit> {
        let world = camera.device_to_world(device);
        let pixel = self.world_to_pixel_index(world)?;
        Ok(Hit { pixel, world })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZoomBounds;
    use crate::domain::Rect;

    fn fitted_camera(mapper: &CoordinateMapper, w: u32, h: u32) -> Camera {
        let mut cam = Camera::new(Rect::from_size(w, h), ZoomBounds::default());
        let (ew, eh) = mapper.world_extent();
        cam.fit(mapper.placement().center(), ew, eh);
        cam
    }

    #[test]
    fn test_aspect_preserved() {
        let mapper = CoordinateMapper::new(200, 100);
        assert_eq!(mapper.world_extent(), (1.0, 0.5));
        assert_eq!(mapper.placement().center(), Vec2::ZERO);
    }

    #[test]
    fn test_pixel_world_inverse() {
        let mapper = CoordinateMapper::new(37, 91);
        for &(x, y) in &[(0.0, 0.0), (36.5, 90.5), (12.25, 3.75)] {
            let (bx, by) = mapper.world_to_pixel(mapper.pixel_to_world(x, y));
            assert!((bx - x).abs() < 1e-9 && (by - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_row_zero_is_top() {
        let mapper = CoordinateMapper::new(10, 10);
        let top = mapper.pixel_center(PixelPos::new(0, 0));
        let bottom = mapper.pixel_center(PixelPos::new(0, 9));
        assert!(top.y > bottom.y);
    }

    #[test]
    fn test_pixel_center_resolves_to_same_index() {
        let mapper = CoordinateMapper::new(10, 10);
        for y in 0..10 {
            for x in 0..10 {
                let p = PixelPos::new(x, y);
                assert_eq!(mapper.world_to_pixel_index(mapper.pixel_center(p)).unwrap(), p);
            }
        }
    }

    #[test]
    fn test_outside_rejected_not_clamped() {
        let mapper = CoordinateMapper::new(10, 10);
        let just_right = mapper.pixel_to_world(10.0, 5.0);
        assert!(matches!(
            mapper.world_to_pixel_index(just_right),
            Err(ViewerError::OutOfBounds { .. })
        ));
        let above = mapper.pixel_to_world(5.0, -0.01);
        assert!(mapper.world_to_pixel_index(above).is_err());
    }

    #[test]
    fn test_device_hit_through_camera() {
        let mapper = CoordinateMapper::new(10, 10);
        let mut cam = fitted_camera(&mapper, 100, 100);
        // 10 device px per image pixel when fitted
        let hit = mapper.device_hit(&cam, Vec2::new(25.0, 25.0)).unwrap();
        assert_eq!(hit.pixel, PixelPos::new(2, 2));

        // After zooming 2x about the center the same device spot moves inward
        cam.zoom_by(2.0);
        let hit = mapper.device_hit(&cam, Vec2::new(25.0, 25.0)).unwrap();
        assert_eq!(hit.pixel, PixelPos::new(3, 3));
    }

    #[test]
    fn test_device_outside_image_in_letterbox() {
        let mapper = CoordinateMapper::new(10, 10);
        let cam = fitted_camera(&mapper, 200, 100);
        // Viewport is wider than the image, so the left band is letterbox
        assert!(mapper.device_hit(&cam, Vec2::new(10.0, 50.0)).is_err());
        assert!(mapper.device_hit(&cam, Vec2::new(100.0, 50.0)).is_ok());
    }
}
