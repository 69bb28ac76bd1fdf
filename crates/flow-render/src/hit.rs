//! Hit testing: graph-space point → what the pointer is over.
//!
//! Priority, first match wins: delete button, waypoints, slots, node bodies
//! (topmost first), links, background.

use crate::layout::NodeLayout;
use crate::paths::LinkPaths;
use flow_core::{ConnectionKey, Module, NodeId, Point, SlotDirection};

/// Radius of the delete affordance, in graph units.
pub const DELETE_BUTTON_RADIUS: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    /// Empty background.
    Canvas,
    /// A node body, outside any slot.
    Node(NodeId),
    /// A text-editing control inside a node body. Only the host can tell,
    /// so this is never produced by [`hit_test`].
    TextControl(NodeId),
    InputSlot { node: NodeId, index: usize },
    OutputSlot { node: NodeId, index: usize },
    /// A link, with the segment under the pointer.
    Link { key: ConnectionKey, segment: usize },
    Waypoint { key: ConnectionKey, index: usize },
    DeleteButton,
}

impl HitTarget {
    /// The node this target belongs to, if any.
    pub fn node(&self) -> Option<NodeId> {
        match *self {
            Self::Node(id) | Self::TextControl(id) => Some(id),
            Self::InputSlot { node, .. } | Self::OutputSlot { node, .. } => Some(node),
            _ => None,
        }
    }
}

/// Everything hit testing looks at.
pub struct HitScene<'a> {
    pub module: &'a Module,
    pub layout: &'a dyn NodeLayout,
    pub paths: &'a LinkPaths,
    /// Centre of the delete affordance, when shown.
    pub delete_button: Option<Point>,
    /// Radius of a waypoint marker.
    pub waypoint_radius: f64,
    /// Max distance from a curve that still counts as hitting the link.
    pub link_tolerance: f64,
}

/// Find what lies under `p` (graph space).
pub fn hit_test(scene: &HitScene<'_>, p: Point) -> HitTarget {
    if let Some(center) = scene.delete_button
        && center.distance(p) <= DELETE_BUTTON_RADIUS
    {
        return HitTarget::DeleteButton;
    }

    // Waypoints, last painted first.
    for node in scene.module.nodes.values().rev() {
        for key in node.outgoing() {
            let slot = &node.outputs[key.source_slot];
            let Some(i) = slot.find(key.target, key.target_slot) else {
                continue;
            };
            let hit = slot.connections[i]
                .waypoints
                .iter()
                .rposition(|w| w.distance(p) <= scene.waypoint_radius);
            if let Some(index) = hit {
                return HitTarget::Waypoint { key, index };
            }
        }
    }

    let radius = scene.layout.slot_radius();
    for node in scene.module.nodes.values().rev() {
        for (direction, count) in [
            (SlotDirection::Output, node.outputs.len()),
            (SlotDirection::Input, node.inputs.len()),
        ] {
            for index in 0..count {
                let anchor = scene.layout.slot_anchor(node, direction, index);
                if anchor.distance(p) <= radius {
                    return match direction {
                        SlotDirection::Input => HitTarget::InputSlot {
                            node: node.id,
                            index,
                        },
                        SlotDirection::Output => HitTarget::OutputSlot {
                            node: node.id,
                            index,
                        },
                    };
                }
            }
        }
    }

    let kp: kurbo::Point = p.into();
    for node in scene.module.nodes.values().rev() {
        if scene.layout.node_bounds(node).contains(kp) {
            return HitTarget::Node(node.id);
        }
    }

    let nearest = scene
        .paths
        .iter()
        .filter_map(|(key, path)| {
            path.nearest_segment(p)
                .map(|(segment, distance)| (*key, segment, distance))
        })
        .filter(|(_, _, distance)| *distance <= scene.link_tolerance)
        .min_by(|a, b| a.2.total_cmp(&b.2));
    if let Some((key, segment, _)) = nearest {
        return HitTarget::Link { key, segment };
    }

    HitTarget::Canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::BoxLayout;
    use flow_core::{GraphStore, IdStrategy, NodeSpec};
    use kurbo::ParamCurve;
    use pretty_assertions::assert_eq;

    struct Fixture {
        store: GraphStore,
        paths: LinkPaths,
        layout: BoxLayout,
        a: NodeId,
        b: NodeId,
        key: ConnectionKey,
    }

    fn fixture() -> Fixture {
        let mut store = GraphStore::new(IdStrategy::Counter);
        let a = store.add_node(NodeSpec::new("a", 1, 1).at(0.0, 0.0)).unwrap();
        let b = store.add_node(NodeSpec::new("b", 1, 1).at(400.0, 0.0)).unwrap();
        let key = ConnectionKey::new(a, 0, b, 0);
        store.add_connection(key, None).unwrap();
        store
            .add_waypoint(key, 0, Point::new(280.0, 200.0))
            .unwrap();
        let layout = BoxLayout::default();
        let mut paths = LinkPaths::default();
        paths.rebuild(store.active(), &layout);
        Fixture {
            store,
            paths,
            layout,
            a,
            b,
            key,
        }
    }

    fn hit(f: &Fixture, p: Point, delete_button: Option<Point>) -> HitTarget {
        let scene = HitScene {
            module: f.store.active(),
            layout: &f.layout,
            paths: &f.paths,
            delete_button,
            waypoint_radius: 6.0,
            link_tolerance: 5.0,
        };
        hit_test(&scene, p)
    }

    #[test]
    fn background() {
        let f = fixture();
        assert_eq!(hit(&f, Point::new(1000.0, 1000.0), None), HitTarget::Canvas);
    }

    #[test]
    fn node_body() {
        let f = fixture();
        assert_eq!(hit(&f, Point::new(80.0, 10.0), None), HitTarget::Node(f.a));
    }

    #[test]
    fn slots_win_over_bodies() {
        let f = fixture();
        assert_eq!(
            hit(&f, Point::new(160.0, 44.0), None),
            HitTarget::OutputSlot { node: f.a, index: 0 }
        );
        assert_eq!(
            hit(&f, Point::new(402.0, 46.0), None),
            HitTarget::InputSlot { node: f.b, index: 0 }
        );
    }

    #[test]
    fn waypoint_marker() {
        let f = fixture();
        assert_eq!(
            hit(&f, Point::new(283.0, 198.0), None),
            HitTarget::Waypoint { key: f.key, index: 0 }
        );
    }

    #[test]
    fn link_curve() {
        let f = fixture();
        let path = f.paths.get(&f.key).unwrap();
        let on_curve = path.segments[1].to_kurbo().eval(0.5);
        assert_eq!(
            hit(&f, on_curve.into(), None),
            HitTarget::Link {
                key: f.key,
                segment: 1
            }
        );
    }

    #[test]
    fn delete_button_wins() {
        let f = fixture();
        let at = Point::new(80.0, 10.0);
        assert_eq!(hit(&f, at, Some(at)), HitTarget::DeleteButton);
    }

    #[test]
    fn topmost_node_wins() {
        let mut f = fixture();
        let c = f
            .store
            .add_node(NodeSpec::new("c", 0, 0).at(40.0, 0.0))
            .unwrap();
        assert_eq!(hit(&f, Point::new(100.0, 10.0), None), HitTarget::Node(c));
        assert_eq!(
            HitTarget::OutputSlot { node: c, index: 0 }.node(),
            Some(c)
        );
    }
}
