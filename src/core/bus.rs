//! Toolbar command bus shared by the panes of a compare view
//!
//! Publishing is fire-and-forget over a `tokio::sync::broadcast` channel.
//! A pane mounted later does not see earlier commands; it adopts the
//! [`ToolbarSnapshot`] instead.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

use crate::config::{is_valid_line_width, Rgb, ViewerConfig};

/// Which side of a compare view a pane occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaneTag {
    Left,
    Right,
}

/// Panes a broadcast targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Left,
    Right,
    Both,
}

impl Scope {
    pub fn includes(self, tag: PaneTag) -> bool {
        matches!(
            (self, tag),
            (Scope::Both, _) | (Scope::Left, PaneTag::Left) | (Scope::Right, PaneTag::Right)
        )
    }
}

impl From<PaneTag> for Scope {
    fn from(tag: PaneTag) -> Self {
        match tag {
            PaneTag::Left => Scope::Left,
            PaneTag::Right => Scope::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolbarCommand {
    ResetView,
    AutoWindowLevel,
    SetPointMode(bool),
    SetTraceMode(bool),
    SetPointColor(Rgb),
    SetTraceColor(Rgb),
    SetLineWidth(f32),
    ClearPoints,
    ClearTraces,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Broadcast {
    pub scope: Scope,
    pub command: ToolbarCommand,
}

/// Current toolbar state; `point_mode` and `trace_mode` are never both set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolbarSnapshot {
    pub point_mode: bool,
    pub trace_mode: bool,
    pub point_color: Rgb,
    pub trace_color: Rgb,
    pub line_width: f32,
}

impl ToolbarSnapshot {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            point_mode: false,
            trace_mode: false,
            point_color: config.point_color,
            trace_color: config.trace_color,
            line_width: config.line_width,
        }
    }

    fn apply(&mut self, command: ToolbarCommand) {
        match command {
            ToolbarCommand::SetPointMode(enabled) => {
                self.point_mode = enabled;
                if enabled {
                    self.trace_mode = false;
                }
            }
            ToolbarCommand::SetTraceMode(enabled) => {
                self.trace_mode = enabled;
                if enabled {
                    self.point_mode = false;
                }
            }
            ToolbarCommand::SetPointColor(color) => self.point_color = color,
            ToolbarCommand::SetTraceColor(color) => self.trace_color = color,
            ToolbarCommand::SetLineWidth(width) => {
                if is_valid_line_width(width) {
                    self.line_width = width;
                }
            }
            ToolbarCommand::ResetView
            | ToolbarCommand::AutoWindowLevel
            | ToolbarCommand::ClearPoints
            | ToolbarCommand::ClearTraces => {}
        }
    }
}

pub struct CommandBus {
    sender: broadcast::Sender<Broadcast>,
    snapshot: ToolbarSnapshot,
}

impl CommandBus {
    pub fn new(config: &ViewerConfig) -> Self {
        let (sender, _) = broadcast::channel(config.bus_capacity.max(1));
        Self {
            sender,
            snapshot: ToolbarSnapshot::from_config(config),
        }
    }

    /// Send a command without waiting on any pane
    pub fn publish(&mut self, scope: Scope, command: ToolbarCommand) {
        self.snapshot.apply(command);
        // No receivers just means no pane is mounted yet
        if self.sender.send(Broadcast { scope, command }).is_err() {
            log::trace!("No pane listening for {:?}", command);
        }
    }

    pub fn subscribe(&self, tag: PaneTag) -> PaneSubscription {
        PaneSubscription {
            tag,
            receiver: self.sender.subscribe(),
        }
    }

    pub fn snapshot(&self) -> &ToolbarSnapshot {
        &self.snapshot
    }
}

/// One pane's end of the bus, filtered by its tag
pub struct PaneSubscription {
    tag: PaneTag,
    receiver: broadcast::Receiver<Broadcast>,
}

impl PaneSubscription {
    pub fn tag(&self) -> PaneTag {
        self.tag
    }

    /// Pull every queued command addressed to this pane, oldest first
    pub fn drain(&mut self) -> Vec<ToolbarCommand> {
        let mut commands = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(msg) if msg.scope.includes(self.tag) => commands.push(msg.command),
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    log::warn!("{:?} pane missed {} toolbar commands", self.tag, skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        commands
    }
}
