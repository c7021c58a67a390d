//! Annotation types for marking up a loaded image
//!
//! Points keep both their pixel index and world position; traces store
//! world positions only.

use serde::{Deserialize, Serialize};

use super::geometry::{PixelPos, Vec2};
use crate::config::Rgb;

/// Identifier of a point or trace, unique within one pane
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotationId(pub u64);

/// Raw sample under a placed point
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleValue {
    Gray(f32),
    Rgb([f32; 3]),
}

/// Anatomical point marker
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    pub id: AnnotationId,
    /// Always inside `[0, width) x [0, height)` of the image it was placed on
    pub pixel: PixelPos,
    pub world: Vec2,
    pub sample: Option<SampleValue>,
    /// Fixed at creation
    pub color: Rgb,
}

/// Free-hand measurement trace
#[derive(Clone, Debug, PartialEq)]
pub struct Trace {
    pub id: AnnotationId,
    /// Ordered world positions, at least two once committed
    pub points: Vec<Vec2>,
    pub color: Rgb,
    pub line_width: f32,
}

impl Trace {
    /// Minimum vertex count for a trace to be kept on commit
    pub const MIN_POINTS: usize = 2;

    pub fn is_committable(&self) -> bool {
        self.points.len() >= Self::MIN_POINTS
    }
}

/// Stored form of a point
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointPayload {
    pub pixel: PixelPos,
    pub world: Vec2,
    #[serde(default)]
    pub sample: Option<SampleValue>,
    pub color: Rgb,
}

/// Stored form of a trace
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TracePayload {
    pub points: Vec<Vec2>,
    pub color: Rgb,
    pub line_width: f32,
}

/// Tagged record exchanged with the annotation store
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "lowercase")]
pub enum AnnotationRecord {
    Point(PointPayload),
    Trace(TracePayload),
}

impl From<&Point> for AnnotationRecord {
    fn from(p: &Point) -> Self {
        AnnotationRecord::Point(PointPayload {
            pixel: p.pixel,
            world: p.world,
            sample: p.sample,
            color: p.color,
        })
    }
}

impl From<&Trace> for AnnotationRecord {
    fn from(t: &Trace) -> Self {
        AnnotationRecord::Trace(TracePayload {
            points: t.points.clone(),
            color: t.color,
            line_width: t.line_width,
        })
    }
}
