//! Node geometry: body rectangles and slot anchor points in graph space.
//!
//! Node bodies are drawn by an external renderer, so the core only needs a
//! predictable box model to place slots and hit-test them.

use flow_core::{Node, Point, SlotDirection};
use kurbo::Rect;
use serde::{Deserialize, Serialize};

/// Geometry the editor needs from a node's visual.
pub trait NodeLayout {
    /// Body rectangle in graph space.
    fn node_bounds(&self, node: &Node) -> Rect;

    /// Centre of a slot's connector dot, where links attach.
    fn slot_anchor(&self, node: &Node, direction: SlotDirection, index: usize) -> Point;

    /// Radius around an anchor that counts as hitting the slot.
    fn slot_radius(&self) -> f64;
}

/// Fixed-width boxes with a header and one row per slot.
///
/// Inputs sit on the left edge, outputs on the right edge, centred in
/// their row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxLayout {
    pub width: f64,
    pub header: f64,
    pub slot_pitch: f64,
    pub slot_radius: f64,
}

impl Default for BoxLayout {
    fn default() -> Self {
        Self {
            width: 160.0,
            header: 32.0,
            slot_pitch: 24.0,
            slot_radius: 8.0,
        }
    }
}

impl BoxLayout {
    fn rows(node: &Node) -> usize {
        node.inputs.len().max(node.outputs.len()).max(1)
    }

    pub fn height(&self, node: &Node) -> f64 {
        self.header + Self::rows(node) as f64 * self.slot_pitch
    }
}

impl NodeLayout for BoxLayout {
    fn node_bounds(&self, node: &Node) -> Rect {
        Rect::new(
            node.position.x,
            node.position.y,
            node.position.x + self.width,
            node.position.y + self.height(node),
        )
    }

    fn slot_anchor(&self, node: &Node, direction: SlotDirection, index: usize) -> Point {
        let x = match direction {
            SlotDirection::Input => node.position.x,
            SlotDirection::Output => node.position.x + self.width,
        };
        let y = node.position.y + self.header + (index as f64 + 0.5) * self.slot_pitch;
        Point::new(x, y)
    }

    fn slot_radius(&self) -> f64 {
        self.slot_radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_core::{IdStrategy, GraphStore, NodeSpec};

    fn node(inputs: usize, outputs: usize) -> Node {
        let mut store = GraphStore::new(IdStrategy::Counter);
        let id = store
            .add_node(NodeSpec::new("n", inputs, outputs).at(100.0, 50.0))
            .unwrap();
        store.node(id).unwrap().clone()
    }

    #[test]
    fn bounds_grow_with_slot_rows() {
        let layout = BoxLayout::default();
        let small = layout.node_bounds(&node(0, 0));
        let big = layout.node_bounds(&node(1, 3));
        assert_eq!(small.height(), 32.0 + 24.0);
        assert_eq!(big.height(), 32.0 + 3.0 * 24.0);
        assert_eq!(big.x0, 100.0);
        assert_eq!(big.width(), 160.0);
    }

    #[test]
    fn anchors_sit_on_edges() {
        let layout = BoxLayout::default();
        let n = node(2, 1);
        assert_eq!(
            layout.slot_anchor(&n, SlotDirection::Input, 1),
            Point::new(100.0, 50.0 + 32.0 + 36.0)
        );
        assert_eq!(
            layout.slot_anchor(&n, SlotDirection::Output, 0),
            Point::new(260.0, 50.0 + 32.0 + 12.0)
        );
    }

    #[test]
    fn partial_config_fills_defaults() {
        let layout: BoxLayout = serde_json::from_str(r#"{"width": 200}"#).unwrap();
        assert_eq!(layout.width, 200.0);
        assert_eq!(layout.header, 32.0);
    }
}
