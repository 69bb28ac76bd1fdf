//! Editor configuration.
//!
//! Every field has a default, so hosts can pass partial JSON.

use flow_core::{CurveSettings, IdStrategy, PathMode, Viewport};
use flow_render::BoxLayout;
use serde::{Deserialize, Serialize};

pub use flow_core::EditorMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Curvature of links without waypoints.
    pub curvature: f64,
    /// Curvature of the first and last segment of a rerouted link.
    pub reroute_curvature_start_end: f64,
    /// Curvature of the inner segments of a rerouted link.
    pub reroute_curvature: f64,
    /// Radius of a waypoint marker, in graph units.
    pub reroute_width: f64,
    /// Double-clicking a selected link inserts a waypoint.
    pub reroute: bool,
    /// Draw each segment of a rerouted link as its own path.
    pub reroute_fix_curvature: bool,
    /// Dropping a link anywhere on a node binds it to the first input.
    pub force_first_input: bool,
    /// Pressing a text control inside a node still drags the node.
    pub draggable_inputs: bool,
    /// Nodes stay selectable but cannot be dragged.
    pub block_position: bool,
    /// Max distance from a link, in graph units, that still selects it.
    pub link_hit_tolerance: f64,

    pub zoom: f64,
    pub zoom_min: f64,
    pub zoom_max: f64,
    pub zoom_step: f64,

    pub mode: EditorMode,
    pub id_strategy: IdStrategy,
    pub layout: BoxLayout,
}

impl Default for EditorConfig {
    fn default() -> Self {
        let viewport = Viewport::default();
        Self {
            curvature: 0.5,
            reroute_curvature_start_end: 0.5,
            reroute_curvature: 0.5,
            reroute_width: 6.0,
            reroute: false,
            reroute_fix_curvature: false,
            force_first_input: false,
            draggable_inputs: true,
            block_position: false,
            link_hit_tolerance: 5.0,
            zoom: 1.0,
            zoom_min: viewport.zoom_min,
            zoom_max: viewport.zoom_max,
            zoom_step: viewport.zoom_step,
            mode: EditorMode::Edit,
            id_strategy: IdStrategy::default(),
            layout: BoxLayout::default(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn curve_settings(&self) -> CurveSettings {
        CurveSettings {
            curvature: self.curvature,
            reroute_start_end: self.reroute_curvature_start_end,
            reroute: self.reroute_curvature,
        }
    }

    pub fn path_mode(&self) -> PathMode {
        if self.reroute_fix_curvature {
            PathMode::PerSegment
        } else {
            PathMode::Combined
        }
    }

    /// Initial viewport: configured limits and zoom, no pan.
    pub fn viewport(&self) -> Viewport {
        let mut viewport = Viewport::new(self.zoom_min, self.zoom_max, self.zoom_step);
        viewport.set_zoom(self.zoom);
        viewport
    }
}
