//! Point and trace collections for one loaded image
//!
//! Every mutation updates the rendering surface before returning, so the
//! overlay always mirrors the model.

use crate::config::Rgb;
use crate::decode::ImageBuffer;
use crate::domain::{
    AnnotationId, AnnotationRecord, PixelPos, Point, PointPayload, SampleValue, Trace,
    TracePayload, Vec2,
};
use crate::render::{RenderingSurface, SceneBackend};

#[derive(Debug, Default)]
pub struct AnnotationModel {
    points: Vec<Point>,
    traces: Vec<Trace>,
    /// Trace being drawn, not yet committed
    pending: Option<Trace>,
    next_id: u64,
}

impl AnnotationModel {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> AnnotationId {
        self.next_id += 1;
        AnnotationId(self.next_id)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    pub fn pending_trace(&self) -> Option<&Trace> {
        self.pending.as_ref()
    }

    // ========================================================================
    // Points
    // ========================================================================

    pub fn create_point<B: SceneBackend>(
        &mut self,
        surface: &mut RenderingSurface<B>,
        pixel: PixelPos,
        world: Vec2,
        sample: Option<SampleValue>,
        color: Rgb,
    ) -> AnnotationId {
        let id = self.allocate_id();
        self.points.push(Point {
            id,
            pixel,
            world,
            sample,
            color,
        });
        surface.add_marker(id, world, color);
        log::trace!("Point {:?} at pixel ({}, {})", id, pixel.x, pixel.y);
        id
    }

    /// Remove the most recent point; no-op when empty
    pub fn undo_point<B: SceneBackend>(
        &mut self,
        surface: &mut RenderingSurface<B>,
    ) -> Option<AnnotationId> {
        let point = self.points.pop()?;
        surface.remove_marker(point.id);
        Some(point.id)
    }

    pub fn clear_points<B: SceneBackend>(&mut self, surface: &mut RenderingSurface<B>) {
        for point in self.points.drain(..) {
            surface.remove_marker(point.id);
        }
    }

    // ========================================================================
    // Traces
    // ========================================================================

    /// Open a new trace at `world`
    ///
    /// A trace still open from an interrupted gesture is committed first.
    pub fn begin_trace<B: SceneBackend>(
        &mut self,
        surface: &mut RenderingSurface<B>,
        world: Vec2,
        color: Rgb,
        line_width: f32,
    ) -> AnnotationId {
        if self.pending.is_some() {
            self.commit_trace(surface);
        }
        let id = self.allocate_id();
        let points = vec![world];
        surface.add_polyline(id, &points, color, line_width);
        self.pending = Some(Trace {
            id,
            points,
            color,
            line_width,
        });
        id
    }

    /// Append a vertex to the open trace; returns false when none is open
    pub fn extend_trace<B: SceneBackend>(
        &mut self,
        surface: &mut RenderingSurface<B>,
        world: Vec2,
    ) -> bool {
        let Some(trace) = self.pending.as_mut() else {
            return false;
        };
        trace.points.push(world);
        surface.extend_polyline(trace.id, world);
        true
    }

    /// Close the open trace, keeping it only with at least two vertices
    pub fn commit_trace<B: SceneBackend>(
        &mut self,
        surface: &mut RenderingSurface<B>,
    ) -> Option<AnnotationId> {
        let trace = self.pending.take()?;
        if trace.is_committable() {
            let id = trace.id;
            self.traces.push(trace);
            Some(id)
        } else {
            log::trace!("Discarding trace {:?} with {} vertex", trace.id, trace.points.len());
            surface.remove_polyline(trace.id);
            None
        }
    }

    /// Remove the most recent committed trace; no-op when empty
    pub fn undo_trace<B: SceneBackend>(
        &mut self,
        surface: &mut RenderingSurface<B>,
    ) -> Option<AnnotationId> {
        let trace = self.traces.pop()?;
        surface.remove_polyline(trace.id);
        Some(trace.id)
    }

    /// Remove committed traces and drop any open one
    pub fn clear_traces<B: SceneBackend>(&mut self, surface: &mut RenderingSurface<B>) {
        if let Some(trace) = self.pending.take() {
            surface.remove_polyline(trace.id);
        }
        for trace in self.traces.drain(..) {
            surface.remove_polyline(trace.id);
        }
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Committed annotations as store records, points first
    pub fn records(&self) -> Vec<AnnotationRecord> {
        self.points
            .iter()
            .map(AnnotationRecord::from)
            .chain(self.traces.iter().map(AnnotationRecord::from))
            .collect()
    }

    /// Re-create stored annotations, skipping any that break the invariants
    ///
    /// Returns how many records were applied.
    pub fn restore<B: SceneBackend>(
        &mut self,
        surface: &mut RenderingSurface<B>,
        image: &ImageBuffer,
        records: Vec<AnnotationRecord>,
    ) -> usize {
        let mut applied = 0;
        for record in records {
            match record {
                AnnotationRecord::Point(PointPayload {
                    pixel,
                    world,
                    sample,
                    color,
                }) => {
                    if !image.contains(pixel) {
                        log::warn!("Skipping stored point outside image at {:?}", pixel);
                        continue;
                    }
                    self.create_point(surface, pixel, world, sample, color);
                }
                AnnotationRecord::Trace(TracePayload {
                    points,
                    color,
                    line_width,
                }) => {
                    if points.len() < Trace::MIN_POINTS {
                        log::warn!("Skipping stored trace with {} vertices", points.len());
                        continue;
                    }
                    let id = self.allocate_id();
                    surface.add_polyline(id, &points, color, line_width);
                    self.traces.push(Trace {
                        id,
                        points,
                        color,
                        line_width,
                    });
                }
            }
            applied += 1;
        }
        applied
    }
}
