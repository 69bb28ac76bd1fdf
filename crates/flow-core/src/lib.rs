pub mod curve;
pub mod error;
pub mod events;
pub mod id;
pub mod model;
pub mod renderer;
pub mod snapshot;
pub mod store;
pub mod viewport;

pub use curve::{
    CubicSegment, CurveKind, CurveSettings, LinkPath, PathMode, compute_segment, stitch_link,
};
pub use error::{FlowError, Result};
pub use events::{EventKind, EventQueue, FlowEvent};
pub use id::{IdGenerator, IdStrategy, NodeId};
pub use model::*;
pub use renderer::{RendererRegistration, RendererRegistry};
pub use snapshot::{ConnectionRecord, GraphSnapshot, ModuleRecord, NodeRecord, TypeNode};
pub use store::{ConnectOutcome, GraphStore, HOME_MODULE};
pub use viewport::Viewport;
