//! Single or side-by-side viewing
//!
//! The compare view owns the command bus and injects a subscription into
//! each pane it mounts. Panes share nothing else.

use super::bus::{CommandBus, PaneTag, Scope, ToolbarCommand};
use super::pane::{fetch_image, LoadTicket, Pane};
use crate::config::ViewerConfig;
use crate::decode::ImageBuffer;
use crate::domain::Rect;
use crate::error::ViewerError;
use crate::persistence::{AnnotationStore, ImageSource};
use crate::render::SceneBackend;

pub struct CompareView<B: SceneBackend> {
    bus: CommandBus,
    config: ViewerConfig,
    left: Option<Pane<B>>,
    right: Option<Pane<B>>,
}

impl<B: SceneBackend> CompareView<B> {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            bus: CommandBus::new(config),
            config: config.clone(),
            left: None,
            right: None,
        }
    }

    pub fn bus(&self) -> &CommandBus {
        &self.bus
    }

    pub fn pane(&self, tag: PaneTag) -> Option<&Pane<B>> {
        match tag {
            PaneTag::Left => self.left.as_ref(),
            PaneTag::Right => self.right.as_ref(),
        }
    }

    pub fn pane_mut(&mut self, tag: PaneTag) -> Option<&mut Pane<B>> {
        match tag {
            PaneTag::Left => self.left.as_mut(),
            PaneTag::Right => self.right.as_mut(),
        }
    }

    /// Mount a pane and start loading `image_id` into it
    ///
    /// An existing pane with the same tag is loaded over, releasing its
    /// previous session.
    pub fn mount(&mut self, tag: PaneTag, image_id: impl Into<String>) -> LoadTicket {
        let slot = match tag {
            PaneTag::Left => &mut self.left,
            PaneTag::Right => &mut self.right,
        };
        let pane = slot.get_or_insert_with(|| Pane::new(self.bus.subscribe(tag), &self.config));
        pane.begin_load(image_id)
    }

    /// Hand a finished load to its pane; false if the pane is gone
    pub fn deliver(
        &mut self,
        tag: PaneTag,
        ticket: &LoadTicket,
        result: Result<ImageBuffer, ViewerError>,
        backend: B,
        viewport: Rect,
        store: &dyn AnnotationStore,
    ) -> bool {
        let snapshot = *self.bus.snapshot();
        match self.pane_mut(tag) {
            Some(pane) => pane.complete_load(ticket, result, backend, viewport, &snapshot, store),
            None => {
                log::debug!("No {:?} pane for finished load", tag);
                false
            }
        }
    }

    /// Mount, fetch, decode and deliver in one step
    pub async fn load(
        &mut self,
        tag: PaneTag,
        image_id: &str,
        source: &dyn ImageSource,
        backend: B,
        viewport: Rect,
        store: &dyn AnnotationStore,
    ) -> bool {
        let ticket = self.mount(tag, image_id);
        let result = fetch_image(source, image_id).await;
        self.deliver(tag, &ticket, result, backend, viewport, store)
    }

    /// Release a pane; its scope simply stops matching anyone
    pub fn unmount(&mut self, tag: PaneTag) {
        let slot = match tag {
            PaneTag::Left => &mut self.left,
            PaneTag::Right => &mut self.right,
        };
        if let Some(mut pane) = slot.take() {
            pane.unmount();
        }
    }

    /// Publish a toolbar command, then let each mounted pane react
    pub fn broadcast(&mut self, scope: Scope, command: ToolbarCommand) {
        self.bus.publish(scope, command);
        for pane in [self.left.as_mut(), self.right.as_mut()].into_iter().flatten() {
            pane.process_commands();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Vec2;
    use crate::persistence::{MemoryImageSource, MemoryStore};
    use crate::render::surface::testing::{RecordingBackend, SceneCall};
    use crate::session::{PointerButton, PointerEvent, Tool};

    fn image() -> ImageBuffer {
        ImageBuffer::new(10, 10, 1, vec![1.0; 100]).unwrap()
    }

    fn ready(view: &mut CompareView<RecordingBackend>, tag: PaneTag) -> RecordingBackend {
        let ticket = view.mount(tag, format!("{:?}.png", tag));
        let backend = RecordingBackend::default();
        assert!(view.deliver(
            tag,
            &ticket,
            Ok(image()),
            backend.clone(),
            Rect::from_size(100, 100),
            &MemoryStore::new(),
        ));
        backend
    }

    fn click(view: &mut CompareView<RecordingBackend>, tag: PaneTag, x: f64, y: f64) {
        let pane = view.pane_mut(tag).unwrap();
        let pos = Vec2::new(x, y);
        pane.handle_pointer(PointerEvent::Down {
            pos,
            button: PointerButton::Primary,
        });
        pane.handle_pointer(PointerEvent::Up {
            pos,
            button: PointerButton::Primary,
        });
    }

    fn point_count(view: &CompareView<RecordingBackend>, tag: PaneTag) -> usize {
        view.pane(tag)
            .and_then(|p| p.session())
            .map(|s| s.annotations().points().len())
            .unwrap_or(0)
    }

    #[test]
    fn test_clear_points_left_scope() {
        let mut view = CompareView::new(&ViewerConfig::default());
        ready(&mut view, PaneTag::Left);
        ready(&mut view, PaneTag::Right);
        view.broadcast(Scope::Both, ToolbarCommand::SetPointMode(true));
        for tag in [PaneTag::Left, PaneTag::Right] {
            click(&mut view, tag, 25.0, 25.0);
            click(&mut view, tag, 75.0, 75.0);
            assert_eq!(point_count(&view, tag), 2);
        }

        view.broadcast(Scope::Left, ToolbarCommand::ClearPoints);
        assert_eq!(point_count(&view, PaneTag::Left), 0);
        assert_eq!(point_count(&view, PaneTag::Right), 2);
    }

    #[tokio::test]
    async fn test_malformed_bytes_fail_pane() {
        let mut source = MemoryImageSource::new();
        source.insert("broken.png", vec![0x89, b'P', b'N', b'G', 0, 1, 2]);
        let mut view = CompareView::new(&ViewerConfig::default());
        let backend = RecordingBackend::default();
        assert!(
            view.load(
                PaneTag::Left,
                "broken.png",
                &source,
                backend.clone(),
                Rect::from_size(100, 100),
                &MemoryStore::new(),
            )
            .await
        );

        let pane = view.pane(PaneTag::Left).unwrap();
        assert!(matches!(pane.error(), Some(ViewerError::Decode(_))));
        assert!(pane.session().is_none());
        // No surface was ever built for the failed pane
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_failed_pane_does_not_affect_other() {
        let mut view = CompareView::new(&ViewerConfig::default());
        let ticket = view.mount(PaneTag::Left, "bad.dcm");
        view.deliver(
            PaneTag::Left,
            &ticket,
            Err(ViewerError::UnsupportedFormat { components: 4 }),
            RecordingBackend::default(),
            Rect::from_size(100, 100),
            &MemoryStore::new(),
        );
        ready(&mut view, PaneTag::Right);

        view.broadcast(Scope::Both, ToolbarCommand::SetTraceMode(true));
        assert!(view.pane(PaneTag::Left).unwrap().error().is_some());
        let right = view.pane(PaneTag::Right).unwrap().session().unwrap();
        assert_eq!(right.active_tool(), Tool::Trace);
    }

    #[test]
    fn test_late_mount_adopts_toolbar() {
        let mut view = CompareView::new(&ViewerConfig::default());
        ready(&mut view, PaneTag::Left);
        view.broadcast(Scope::Both, ToolbarCommand::SetPointMode(true));
        ready(&mut view, PaneTag::Right);
        let right = view.pane(PaneTag::Right).unwrap().session().unwrap();
        assert_eq!(right.active_tool(), Tool::Point);
    }

    #[test]
    fn test_late_pane_matches_refused_line_width() {
        let mut view = CompareView::new(&ViewerConfig::default());
        ready(&mut view, PaneTag::Left);
        view.broadcast(Scope::Both, ToolbarCommand::SetLineWidth(-3.0));
        ready(&mut view, PaneTag::Right);

        let width = |tag| view.pane(tag).unwrap().session().unwrap().style().line_width;
        assert_eq!(width(PaneTag::Left), ViewerConfig::default().line_width);
        assert_eq!(width(PaneTag::Right), width(PaneTag::Left));
    }

    #[test]
    fn test_unmount_discards_late_load() {
        let mut view = CompareView::new(&ViewerConfig::default());
        let ticket = view.mount(PaneTag::Right, "slow.png");
        view.unmount(PaneTag::Right);
        let backend = RecordingBackend::default();
        assert!(!view.deliver(
            PaneTag::Right,
            &ticket,
            Ok(image()),
            backend.clone(),
            Rect::from_size(100, 100),
            &MemoryStore::new(),
        ));
        assert!(!ticket.is_live());
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_unmount_releases_surface() {
        let mut view = CompareView::new(&ViewerConfig::default());
        let backend = ready(&mut view, PaneTag::Left);
        view.broadcast(Scope::Both, ToolbarCommand::SetPointMode(true));
        click(&mut view, PaneTag::Left, 25.0, 25.0);
        view.unmount(PaneTag::Left);
        let calls = backend.calls();
        assert_eq!(calls.last(), Some(&SceneCall::Release));
        assert!(view.pane(PaneTag::Left).is_none());
    }
}
