//! Viewer session for one loaded image
//!
//! Owns the decoded image, the current window/level, the coordinate mapper,
//! the rendering surface, the annotation model and the interaction machine.
//! Dropping it releases the surface.

use crate::annotations::AnnotationModel;
use crate::config::{is_valid_line_width, Rgb, ViewerConfig};
use crate::core::bus::{ToolbarCommand, ToolbarSnapshot};
use crate::decode::{Components, ImageBuffer};
use crate::domain::{AnnotationId, AnnotationRecord, Rect, Vec2};
use crate::render::{transfer, CoordinateMapper, RenderingSurface, SceneBackend, WindowLevel};

use super::interaction::{Effect, InteractionMachine, InteractionState, Tool};
use super::messages::PointerEvent;

/// Style applied to annotations created from now on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolStyle {
    pub point_color: Rgb,
    pub trace_color: Rgb,
    pub line_width: f32,
}

impl ToolStyle {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            point_color: config.point_color,
            trace_color: config.trace_color,
            line_width: config.line_width,
        }
    }
}

/// Everything one pane holds for a loaded image
///
/// Dropping the session releases the rendering surface and its overlays.
pub struct ViewerSession<B: SceneBackend> {
    image_id: String,
    image: ImageBuffer,
    window_level: WindowLevel,
    mapper: CoordinateMapper,
    surface: RenderingSurface<B>,
    annotations: AnnotationModel,
    interaction: InteractionMachine,
    style: ToolStyle,
    wheel_zoom_step: f64,
    window_level_sensitivity: f64,
}

impl<B: SceneBackend> ViewerSession<B> {
    pub fn new(
        image_id: impl Into<String>,
        image: ImageBuffer,
        backend: B,
        viewport: Rect,
        config: &ViewerConfig,
    ) -> Self {
        let mapper = CoordinateMapper::new(image.width(), image.height());
        let mut surface = RenderingSurface::new(backend, &mapper, viewport, config);
        let window_level = WindowLevel::initial(&image);
        surface.set_texture(&transfer::apply(&image, window_level));

        Self {
            image_id: image_id.into(),
            image,
            window_level,
            mapper,
            surface,
            annotations: AnnotationModel::new(),
            interaction: InteractionMachine::new(),
            style: ToolStyle::from_config(config),
            wheel_zoom_step: config.wheel_zoom_step,
            window_level_sensitivity: config.window_level_sensitivity,
        }
    }

    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    pub fn image(&self) -> &ImageBuffer {
        &self.image
    }

    pub fn window_level(&self) -> WindowLevel {
        self.window_level
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    pub fn surface(&self) -> &RenderingSurface<B> {
        &self.surface
    }

    pub fn annotations(&self) -> &AnnotationModel {
        &self.annotations
    }

    pub fn interaction(&self) -> InteractionState {
        self.interaction.state()
    }

    pub fn active_tool(&self) -> Tool {
        self.interaction.active_tool()
    }

    pub fn style(&self) -> ToolStyle {
        self.style
    }

    // ========================================================================
    // Window/level
    // ========================================================================

    /// Change the window, re-running the transfer function only on a real change
    ///
    /// Returns whether the texture was recomputed.
    pub fn set_window_level(&mut self, window_level: WindowLevel) -> bool {
        if self.image.components() == Components::Rgb || window_level == self.window_level {
            return false;
        }
        self.window_level = window_level;
        self.surface
            .set_texture(&transfer::apply(&self.image, window_level));
        log::trace!(
            "Window/level now {:.1}/{:.1}",
            window_level.width(),
            window_level.center()
        );
        true
    }

    /// Back to the full-range window of the loaded image
    pub fn auto_window_level(&mut self) -> bool {
        self.set_window_level(WindowLevel::initial(&self.image))
    }

    fn drag_window_level(&mut self, delta: Vec2) {
        let Some(range) = self.image.value_range() else {
            return;
        };
        let viewport = self.surface.camera().viewport();
        let span = range.span().max(1.0) * self.window_level_sensitivity;
        let d_width = delta.x * span / viewport.width().max(1) as f64;
        let d_center = delta.y * span / viewport.height().max(1) as f64;
        let next = self.window_level.adjusted(d_width, d_center);
        self.set_window_level(next);
    }

    // ========================================================================
    // View
    // ========================================================================

    pub fn reset_view(&mut self) {
        self.surface.reset_view();
    }

    pub fn zoom_by(&mut self, factor: f64) {
        self.surface.zoom_by(factor);
    }

    /// The pane's viewport changed size
    pub fn resize(&mut self, viewport: Rect) {
        self.surface.resize(viewport);
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.surface.pan_by_device(delta);
    }

    // ========================================================================
    // Tools
    // ========================================================================

    pub fn set_point_mode(&mut self, enabled: bool) {
        if let Some(effect) = self.interaction.set_point_mode(enabled) {
            self.apply(effect);
        }
    }

    pub fn set_trace_mode(&mut self, enabled: bool) {
        if let Some(effect) = self.interaction.set_trace_mode(enabled) {
            self.apply(effect);
        }
    }

    pub fn set_point_color(&mut self, color: Rgb) {
        self.style.point_color = color;
    }

    pub fn set_trace_color(&mut self, color: Rgb) {
        self.style.trace_color = color;
    }

    pub fn set_line_width(&mut self, width: f32) {
        if is_valid_line_width(width) {
            self.style.line_width = width;
        } else {
            log::warn!("Ignoring invalid line width {}", width);
        }
    }

    pub fn undo_point(&mut self) -> Option<AnnotationId> {
        self.annotations.undo_point(&mut self.surface)
    }

    pub fn undo_trace(&mut self) -> Option<AnnotationId> {
        self.annotations.undo_trace(&mut self.surface)
    }

    pub fn clear_points(&mut self) {
        self.annotations.clear_points(&mut self.surface);
    }

    pub fn clear_traces(&mut self) {
        // A drag in flight keeps going but has nothing left to extend
        self.annotations.clear_traces(&mut self.surface);
    }

    /// Adopt the toolbar's current state without replaying history
    pub fn adopt_snapshot(&mut self, snapshot: &ToolbarSnapshot) {
        self.style.point_color = snapshot.point_color;
        self.style.trace_color = snapshot.trace_color;
        self.set_line_width(snapshot.line_width);
        if snapshot.point_mode {
            self.set_point_mode(true);
        } else if snapshot.trace_mode {
            self.set_trace_mode(true);
        }
    }

    /// Carry out a toolbar command already filtered for this pane
    pub fn apply_command(&mut self, command: &ToolbarCommand) {
        match *command {
            ToolbarCommand::ResetView => self.reset_view(),
            ToolbarCommand::AutoWindowLevel => {
                self.auto_window_level();
            }
            ToolbarCommand::SetPointMode(enabled) => self.set_point_mode(enabled),
            ToolbarCommand::SetTraceMode(enabled) => self.set_trace_mode(enabled),
            ToolbarCommand::SetPointColor(color) => self.set_point_color(color),
            ToolbarCommand::SetTraceColor(color) => self.set_trace_color(color),
            ToolbarCommand::SetLineWidth(width) => self.set_line_width(width),
            ToolbarCommand::ClearPoints => self.clear_points(),
            ToolbarCommand::ClearTraces => self.clear_traces(),
        }
    }

    // ========================================================================
    // Pointer input
    // ========================================================================

    /// Route a pointer event through the state machine, applying its effect
    /// before returning
    pub fn handle_pointer(&mut self, event: PointerEvent) {
        // Resolved against the camera as it is right now
        let hit = event.position().and_then(|pos| {
            match self.mapper.device_hit(self.surface.camera(), pos) {
                Ok(hit) => Some(hit),
                Err(err) => {
                    log::trace!("{}", err);
                    None
                }
            }
        });

        if let Some(effect) = self.interaction.handle(&event, hit) {
            self.apply(effect);
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::CreatePoint(hit) => {
                let sample = self.image.sample_at(hit.pixel);
                self.annotations.create_point(
                    &mut self.surface,
                    hit.pixel,
                    hit.world,
                    sample,
                    self.style.point_color,
                );
            }
            Effect::BeginTrace(world) => {
                self.annotations.begin_trace(
                    &mut self.surface,
                    world,
                    self.style.trace_color,
                    self.style.line_width,
                );
            }
            Effect::ExtendTrace(world) => {
                self.annotations.extend_trace(&mut self.surface, world);
            }
            Effect::CommitTrace => {
                self.annotations.commit_trace(&mut self.surface);
            }
            Effect::Pan(delta) => self.pan_by(delta),
            Effect::AdjustWindowLevel(delta) => self.drag_window_level(delta),
            Effect::Zoom(notches) => self.zoom_by(self.wheel_zoom_step.powf(notches)),
        }
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    pub fn records(&self) -> Vec<AnnotationRecord> {
        self.annotations.records()
    }

    pub fn restore(&mut self, records: Vec<AnnotationRecord>) -> usize {
        self.annotations
            .restore(&mut self.surface, &self.image, records)
    }

    /// Release the rendering surface, camera and overlays
    pub fn close(mut self) {
        self.surface.release();
        log::debug!("Closed session for {}", self.image_id);
    }
}
