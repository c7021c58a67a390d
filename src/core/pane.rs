//! One viewer pane: load lifecycle, command intake and persistence

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Local};

use super::bus::{PaneSubscription, PaneTag, ToolbarSnapshot};
use crate::config::ViewerConfig;
use crate::decode::{self, ImageBuffer};
use crate::domain::Rect;
use crate::error::ViewerError;
use crate::persistence::{AnnotationStore, ImageSource};
use crate::render::SceneBackend;
use crate::session::{PointerEvent, ViewerSession};

/// Liveness guard handed to an in-flight load
///
/// Revoked when the pane unmounts or starts loading another image.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    alive: Arc<AtomicBool>,
}

impl LoadTicket {
    fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_live(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    fn revoke(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

/// Fetch and decode an image; every fetch failure counts as a decode failure
pub async fn fetch_image(
    source: &dyn ImageSource,
    image_id: &str,
) -> Result<ImageBuffer, ViewerError> {
    let fetched = source
        .fetch(image_id)
        .await
        .map_err(|e| ViewerError::Decode(format!("{:#}", e)))?;
    decode::decode(&fetched.bytes, fetched.format)
}

/// User-visible message that disappears after its TTL
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub message: String,
    pub raised_at: DateTime<Local>,
    pub ttl: Duration,
}

impl Notification {
    fn new(error: &ViewerError, ttl_secs: u64) -> Self {
        let secs = i64::try_from(ttl_secs).unwrap_or(i64::MAX).min(i64::MAX / 1000);
        Self {
            message: error.to_string(),
            raised_at: Local::now(),
            ttl: Duration::seconds(secs),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Local>) -> bool {
        now - self.raised_at >= self.ttl
    }
}

pub enum PaneState<B: SceneBackend> {
    /// Mounted, no image requested yet
    Empty,
    Loading,
    Ready(Box<ViewerSession<B>>),
    /// Full-pane error shown in place of the image
    Failed(ViewerError),
    Closed,
}

pub struct Pane<B: SceneBackend> {
    tag: PaneTag,
    image_id: Option<String>,
    state: PaneState<B>,
    subscription: PaneSubscription,
    ticket: Option<LoadTicket>,
    notification: Option<Notification>,
    config: ViewerConfig,
}

impl<B: SceneBackend> Pane<B> {
    pub fn new(subscription: PaneSubscription, config: &ViewerConfig) -> Self {
        Self {
            tag: subscription.tag(),
            image_id: None,
            state: PaneState::Empty,
            subscription,
            ticket: None,
            notification: None,
            config: config.clone(),
        }
    }

    pub fn tag(&self) -> PaneTag {
        self.tag
    }

    pub fn image_id(&self) -> Option<&str> {
        self.image_id.as_deref()
    }

    pub fn state(&self) -> &PaneState<B> {
        &self.state
    }

    pub fn session(&self) -> Option<&ViewerSession<B>> {
        match &self.state {
            PaneState::Ready(session) => Some(&**session),
            _ => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut ViewerSession<B>> {
        match &mut self.state {
            PaneState::Ready(session) => Some(&mut **session),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ViewerError> {
        match &self.state {
            PaneState::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, PaneState::Loading)
    }

    /// Start loading a new image, discarding the current session
    pub fn begin_load(&mut self, image_id: impl Into<String>) -> LoadTicket {
        self.close_session();
        let ticket = LoadTicket::new();
        self.ticket = Some(ticket.clone());
        self.image_id = Some(image_id.into());
        self.state = PaneState::Loading;
        ticket
    }

    /// Finish a load started by [`Pane::begin_load`]
    ///
    /// Returns false, dropping the result, if the ticket was revoked.
    pub fn complete_load(
        &mut self,
        ticket: &LoadTicket,
        result: Result<ImageBuffer, ViewerError>,
        backend: B,
        viewport: Rect,
        snapshot: &ToolbarSnapshot,
        store: &dyn AnnotationStore,
    ) -> bool {
        if !ticket.is_live() {
            log::debug!("Discarding late load for {:?} pane", self.tag);
            return false;
        }
        ticket.revoke();
        self.ticket = None;
        let image_id = self.image_id.clone().unwrap_or_default();

        // Anything queued while loading is already reflected in the snapshot
        let skipped = self.subscription.drain().len();
        if skipped > 0 {
            log::trace!("Skipped {} commands queued during load", skipped);
        }

        let image = match result {
            Ok(image) => image,
            Err(err) => {
                log::error!("Failed to load {}: {}", image_id, err);
                self.state = PaneState::Failed(err);
                return true;
            }
        };

        let mut session = ViewerSession::new(image_id.clone(), image, backend, viewport, &self.config);
        session.adopt_snapshot(snapshot);

        match store.load(&image_id) {
            Ok(records) if !records.is_empty() => {
                let applied = session.restore(records);
                log::debug!("Restored {} annotations for {}", applied, image_id);
            }
            Ok(_) => {}
            Err(err) => {
                let err = ViewerError::Persistence(format!("{:#}", err));
                log::warn!("{}", err);
                self.raise(&err);
            }
        }

        log::debug!("{:?} pane ready with {}", self.tag, image_id);
        self.state = PaneState::Ready(Box::new(session));
        true
    }

    /// Apply queued toolbar commands addressed to this pane
    ///
    /// Returns how many were applied; panes without a session discard them.
    pub fn process_commands(&mut self) -> usize {
        let commands = self.subscription.drain();
        let Some(session) = self.session_mut() else {
            return 0;
        };
        for command in &commands {
            session.apply_command(command);
        }
        commands.len()
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        if let Some(session) = self.session_mut() {
            session.handle_pointer(event);
        }
    }

    /// Persist the current annotations
    ///
    /// On failure the in-memory model is kept and one notification is raised,
    /// so calling again retries.
    pub fn save_annotations(&mut self, store: &dyn AnnotationStore) -> Result<usize, ViewerError> {
        let Some(session) = self.session() else {
            return Ok(0);
        };
        let records = session.records();
        match store.save(session.image_id(), &records) {
            Ok(stored) => Ok(stored.len()),
            Err(err) => {
                let err = ViewerError::Persistence(format!("{:#}", err));
                log::warn!("{}", err);
                self.raise(&err);
                Err(err)
            }
        }
    }

    fn raise(&mut self, err: &ViewerError) {
        self.notification = Some(Notification::new(err, self.config.notification_ttl_secs));
    }

    /// The pending notification, dropping it once expired
    pub fn notification(&mut self) -> Option<&Notification> {
        if self
            .notification
            .as_ref()
            .is_some_and(|n| n.is_expired_at(Local::now()))
        {
            self.notification = None;
        }
        self.notification.as_ref()
    }

    pub fn take_notification(&mut self) -> Option<Notification> {
        self.notification.take()
    }

    fn close_session(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            ticket.revoke();
        }
        if let PaneState::Ready(session) = std::mem::replace(&mut self.state, PaneState::Empty) {
            session.close();
        }
    }

    /// Revoke any in-flight load and release the rendering surface
    pub fn unmount(&mut self) {
        self.close_session();
        self.state = PaneState::Closed;
    }
}

impl<B: SceneBackend> Drop for Pane<B> {
    fn drop(&mut self) {
        self.unmount();
    }
}
