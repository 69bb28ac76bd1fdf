//! Notifications produced by graph and editor mutations.
//!
//! Mutations never call listeners directly. They push onto an [`EventQueue`]
//! which the editor drains after the mutating call has returned, so a
//! listener that mutates the graph never observes a half-applied change.

use crate::id::NodeId;
use crate::model::{ConnectionKey, EditorMode};
use serde::Serialize;
use std::collections::VecDeque;

/// Every notification carries identifiers only, never graph content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FlowEvent {
    NodeCreated { id: NodeId },
    NodeRemoved { id: NodeId },
    NodeSelected { id: NodeId },
    NodeUnselected { id: NodeId },
    NodeMoved { id: NodeId },
    NodeDataChanged { id: NodeId },

    ConnectionStarted { node: NodeId, slot: String },
    ConnectionCreated(ConnectionKey),
    ConnectionRemoved(ConnectionKey),
    ConnectionSelected(ConnectionKey),
    ConnectionUnselected(ConnectionKey),
    ConnectionCancelled { node: NodeId, slot: String },

    RerouteAdded { connection: ConnectionKey, index: usize },
    RerouteRemoved { connection: ConnectionKey, index: usize },
    RerouteMoved { connection: ConnectionKey, index: usize },

    ModuleCreated { name: String },
    ModuleChanged { name: String },
    ModuleRemoved { name: String },

    ZoomChanged { zoom: f64 },
    PanChanged { x: f64, y: f64 },
    Imported,
    Exported,
    EditorModeChanged { mode: EditorMode },

    PointerMoved { x: f64, y: f64 },
    Clicked { x: f64, y: f64 },
    ContextMenu { x: f64, y: f64 },
}

/// Discriminant of a [`FlowEvent`], used to subscribe to one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    NodeCreated,
    NodeRemoved,
    NodeSelected,
    NodeUnselected,
    NodeMoved,
    NodeDataChanged,
    ConnectionStarted,
    ConnectionCreated,
    ConnectionRemoved,
    ConnectionSelected,
    ConnectionUnselected,
    ConnectionCancelled,
    RerouteAdded,
    RerouteRemoved,
    RerouteMoved,
    ModuleCreated,
    ModuleChanged,
    ModuleRemoved,
    ZoomChanged,
    PanChanged,
    Imported,
    Exported,
    EditorModeChanged,
    PointerMoved,
    Clicked,
    ContextMenu,
}

impl EventKind {
    pub const ALL: [EventKind; 26] = [
        Self::NodeCreated,
        Self::NodeRemoved,
        Self::NodeSelected,
        Self::NodeUnselected,
        Self::NodeMoved,
        Self::NodeDataChanged,
        Self::ConnectionStarted,
        Self::ConnectionCreated,
        Self::ConnectionRemoved,
        Self::ConnectionSelected,
        Self::ConnectionUnselected,
        Self::ConnectionCancelled,
        Self::RerouteAdded,
        Self::RerouteRemoved,
        Self::RerouteMoved,
        Self::ModuleCreated,
        Self::ModuleChanged,
        Self::ModuleRemoved,
        Self::ZoomChanged,
        Self::PanChanged,
        Self::Imported,
        Self::Exported,
        Self::EditorModeChanged,
        Self::PointerMoved,
        Self::Clicked,
        Self::ContextMenu,
    ];

    /// The wire name, as it appears in the `type` field of a serialized event.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NodeCreated => "nodeCreated",
            Self::NodeRemoved => "nodeRemoved",
            Self::NodeSelected => "nodeSelected",
            Self::NodeUnselected => "nodeUnselected",
            Self::NodeMoved => "nodeMoved",
            Self::NodeDataChanged => "nodeDataChanged",
            Self::ConnectionStarted => "connectionStarted",
            Self::ConnectionCreated => "connectionCreated",
            Self::ConnectionRemoved => "connectionRemoved",
            Self::ConnectionSelected => "connectionSelected",
            Self::ConnectionUnselected => "connectionUnselected",
            Self::ConnectionCancelled => "connectionCancelled",
            Self::RerouteAdded => "rerouteAdded",
            Self::RerouteRemoved => "rerouteRemoved",
            Self::RerouteMoved => "rerouteMoved",
            Self::ModuleCreated => "moduleCreated",
            Self::ModuleChanged => "moduleChanged",
            Self::ModuleRemoved => "moduleRemoved",
            Self::ZoomChanged => "zoomChanged",
            Self::PanChanged => "panChanged",
            Self::Imported => "imported",
            Self::Exported => "exported",
            Self::EditorModeChanged => "editorModeChanged",
            Self::PointerMoved => "pointerMoved",
            Self::Clicked => "clicked",
            Self::ContextMenu => "contextMenu",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl FlowEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::NodeCreated { .. } => EventKind::NodeCreated,
            Self::NodeRemoved { .. } => EventKind::NodeRemoved,
            Self::NodeSelected { .. } => EventKind::NodeSelected,
            Self::NodeUnselected { .. } => EventKind::NodeUnselected,
            Self::NodeMoved { .. } => EventKind::NodeMoved,
            Self::NodeDataChanged { .. } => EventKind::NodeDataChanged,
            Self::ConnectionStarted { .. } => EventKind::ConnectionStarted,
            Self::ConnectionCreated(_) => EventKind::ConnectionCreated,
            Self::ConnectionRemoved(_) => EventKind::ConnectionRemoved,
            Self::ConnectionSelected(_) => EventKind::ConnectionSelected,
            Self::ConnectionUnselected(_) => EventKind::ConnectionUnselected,
            Self::ConnectionCancelled { .. } => EventKind::ConnectionCancelled,
            Self::RerouteAdded { .. } => EventKind::RerouteAdded,
            Self::RerouteRemoved { .. } => EventKind::RerouteRemoved,
            Self::RerouteMoved { .. } => EventKind::RerouteMoved,
            Self::ModuleCreated { .. } => EventKind::ModuleCreated,
            Self::ModuleChanged { .. } => EventKind::ModuleChanged,
            Self::ModuleRemoved { .. } => EventKind::ModuleRemoved,
            Self::ZoomChanged { .. } => EventKind::ZoomChanged,
            Self::PanChanged { .. } => EventKind::PanChanged,
            Self::Imported => EventKind::Imported,
            Self::Exported => EventKind::Exported,
            Self::EditorModeChanged { .. } => EventKind::EditorModeChanged,
            Self::PointerMoved { .. } => EventKind::PointerMoved,
            Self::Clicked { .. } => EventKind::Clicked,
            Self::ContextMenu { .. } => EventKind::ContextMenu,
        }
    }
}

// ─── Queue ───────────────────────────────────────────────────────────────

/// FIFO of notifications waiting to be delivered.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<FlowEvent>,
    silent: bool,
}

impl EventQueue {
    pub fn push(&mut self, event: FlowEvent) {
        if self.silent {
            return;
        }
        log::trace!("event {:?}", event.kind());
        self.pending.push_back(event);
    }

    pub fn pop(&mut self) -> Option<FlowEvent> {
        self.pending.pop_front()
    }

    /// Take everything queued so far, oldest first.
    pub fn drain(&mut self) -> Vec<FlowEvent> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// While silent, pushed events are dropped.
    pub fn set_silent(&mut self, silent: bool) {
        self.silent = silent;
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }
}
