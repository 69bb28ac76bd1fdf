//! Error type shared by every graph-store operation.
//!
//! Interactive outcomes (a link dropped on nothing, a connection across
//! modules) are not errors: they surface as cancellation events or as a
//! [`ConnectOutcome`](crate::store::ConnectOutcome).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlowError {
    /// No node with this id exists in any module.
    #[error("invalid node id `{0}`")]
    InvalidId(String),

    /// No module with this name exists.
    #[error("module `{0}` does not exist")]
    InvalidModule(String),

    #[error("module `{0}` already exists")]
    ModuleExists(String),

    /// The default module can be cleared but never removed.
    #[error("module `{0}` cannot be removed")]
    ProtectedModule(String),

    /// A slot name that does not parse, or points past the node's slots.
    #[error("node `{node}` has no slot `{slot}`")]
    InvalidSlot { node: String, slot: String },

    #[error("position ({x}, {y}) must not be negative")]
    InvalidPosition { x: f64, y: f64 },

    #[error("renderer `{0}` is not registered")]
    UnregisteredRenderer(String),

    #[error("connection has no waypoint {index}")]
    InvalidWaypoint { index: usize },

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

pub type Result<T> = std::result::Result<T, FlowError>;
