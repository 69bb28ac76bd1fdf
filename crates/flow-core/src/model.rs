//! Core data model for flow graphs.
//!
//! A graph is a set of named modules; each module owns its nodes. A node has
//! ordered input and output slots, and every connection is stored twice: once
//! on the source node's output slot and once, mirrored, on the target node's
//! input slot. Slots are addressed by position; `input_3` / `output_1` are
//! display labels derived from that position (1-based).

use crate::id::NodeId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

// ─── Geometry ────────────────────────────────────────────────────────────

/// A point in graph space (or screen space, depending on context).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<Point> for kurbo::Point {
    fn from(p: Point) -> Self {
        kurbo::Point::new(p.x, p.y)
    }
}

impl From<kurbo::Point> for Point {
    fn from(p: kurbo::Point) -> Self {
        Point::new(p.x, p.y)
    }
}

// ─── Slots ───────────────────────────────────────────────────────────────

/// Which side of a node a slot sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotDirection {
    Input,
    Output,
}

impl SlotDirection {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }
}

/// Display label of the slot at `index` (0-based): `input_1`, `output_3`, ...
pub fn slot_name(direction: SlotDirection, index: usize) -> String {
    format!("{}_{}", direction.prefix(), index + 1)
}

/// Parse `input_N` / `output_N` back into a direction and 0-based index.
pub fn parse_slot_name(name: &str) -> Option<(SlotDirection, usize)> {
    let (prefix, number) = name.rsplit_once('_')?;
    let direction = match prefix {
        "input" => SlotDirection::Input,
        "output" => SlotDirection::Output,
        _ => return None,
    };
    let n: usize = number.parse().ok()?;
    if n == 0 {
        return None;
    }
    Some((direction, n - 1))
}

/// One half of a mirrored edge, stored on the slot it is attached to.
///
/// `node`/`slot` point at the opposite end. Waypoints are only kept on the
/// output-side record; the input-side mirror leaves them empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub node: NodeId,
    pub slot: usize,
    pub waypoints: SmallVec<[Point; 2]>,
    pub style: Option<String>,
}

impl Connection {
    pub fn new(node: NodeId, slot: usize, style: Option<String>) -> Self {
        Self {
            node,
            slot,
            waypoints: SmallVec::new(),
            style,
        }
    }

    pub fn points_at(&self, node: NodeId, slot: usize) -> bool {
        self.node == node && self.slot == slot
    }
}

/// A single input or output attachment point.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Slot {
    pub connections: SmallVec<[Connection; 2]>,
}

impl Slot {
    pub fn find(&self, node: NodeId, slot: usize) -> Option<usize> {
        self.connections.iter().position(|c| c.points_at(node, slot))
    }
}

/// Identifies one edge from its source end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    pub source: NodeId,
    pub source_slot: usize,
    pub target: NodeId,
    pub target_slot: usize,
}

impl ConnectionKey {
    pub fn new(source: NodeId, source_slot: usize, target: NodeId, target_slot: usize) -> Self {
        Self {
            source,
            source_slot,
            target,
            target_slot,
        }
    }

    pub fn source_slot_name(&self) -> String {
        slot_name(SlotDirection::Output, self.source_slot)
    }

    pub fn target_slot_name(&self) -> String {
        slot_name(SlotDirection::Input, self.target_slot)
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.source == node || self.target == node
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.source,
            self.source_slot_name(),
            self.target,
            self.target_slot_name()
        )
    }
}

/// Events carry slot labels rather than indices.
impl Serialize for ConnectionKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("ConnectionKey", 4)?;
        s.serialize_field("sourceNodeId", &self.source)?;
        s.serialize_field("sourceSlot", &self.source_slot_name())?;
        s.serialize_field("targetNodeId", &self.target)?;
        s.serialize_field("targetSlot", &self.target_slot_name())?;
        s.end()
    }
}

// ─── Rendering descriptor ────────────────────────────────────────────────

/// How a node body is drawn. The core never looks inside the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderDescriptor {
    /// Raw markup drawn as-is.
    Inline(String),
    /// Name of a renderer registered with the store.
    Registered(String),
    /// Name of a registered component from a third-party component framework.
    Component(String),
}

impl RenderDescriptor {
    /// The registry name this node depends on, if any.
    pub fn renderer_name(&self) -> Option<&str> {
        match self {
            Self::Inline(_) => None,
            Self::Registered(name) | Self::Component(name) => Some(name),
        }
    }

    pub fn template(&self) -> &str {
        match self {
            Self::Inline(s) | Self::Registered(s) | Self::Component(s) => s,
        }
    }
}

impl Default for RenderDescriptor {
    fn default() -> Self {
        Self::Inline(String::new())
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub position: Point,
    pub render: RenderDescriptor,
    pub payload: serde_json::Value,
    pub class_names: String,
    pub prevent_remove: bool,
    pub inputs: Vec<Slot>,
    pub outputs: Vec<Slot>,
}

impl Node {
    pub fn slots(&self, direction: SlotDirection) -> &[Slot] {
        match direction {
            SlotDirection::Input => &self.inputs,
            SlotDirection::Output => &self.outputs,
        }
    }

    pub fn slots_mut(&mut self, direction: SlotDirection) -> &mut Vec<Slot> {
        match direction {
            SlotDirection::Input => &mut self.inputs,
            SlotDirection::Output => &mut self.outputs,
        }
    }

    pub fn slot(&self, direction: SlotDirection, index: usize) -> Option<&Slot> {
        self.slots(direction).get(index)
    }

    /// All edges leaving this node, as keys.
    pub fn outgoing(&self) -> impl Iterator<Item = ConnectionKey> + '_ {
        self.outputs.iter().enumerate().flat_map(move |(i, slot)| {
            slot.connections
                .iter()
                .map(move |c| ConnectionKey::new(self.id, i, c.node, c.slot))
        })
    }

    /// All edges arriving at this node, as keys.
    pub fn incoming(&self) -> impl Iterator<Item = ConnectionKey> + '_ {
        self.inputs.iter().enumerate().flat_map(move |(i, slot)| {
            slot.connections
                .iter()
                .map(move |c| ConnectionKey::new(c.node, c.slot, self.id, i))
        })
    }

    /// Every edge incident on this node, outgoing first.
    pub fn incident(&self) -> Vec<ConnectionKey> {
        self.outgoing().chain(self.incoming()).collect()
    }
}

/// Parameters for creating a node; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    pub name: String,
    pub inputs: usize,
    pub outputs: usize,
    pub position: Point,
    pub render: RenderDescriptor,
    pub payload: serde_json::Value,
    pub class_names: String,
    pub prevent_remove: bool,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>, inputs: usize, outputs: usize) -> Self {
        Self {
            name: name.into(),
            inputs,
            outputs,
            position: Point::default(),
            render: RenderDescriptor::default(),
            payload: serde_json::Value::Object(Default::default()),
            class_names: String::new(),
            prevent_remove: false,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Point::new(x, y);
        self
    }

    pub fn render(mut self, render: RenderDescriptor) -> Self {
        self.render = render;
        self
    }

    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn class_names(mut self, class_names: impl Into<String>) -> Self {
        self.class_names = class_names.into();
        self
    }

    pub fn prevent_remove(mut self, prevent: bool) -> Self {
        self.prevent_remove = prevent;
        self
    }

    pub(crate) fn build(self, id: NodeId) -> Node {
        Node {
            id,
            name: self.name,
            position: self.position,
            render: self.render,
            payload: self.payload,
            class_names: self.class_names,
            prevent_remove: self.prevent_remove,
            inputs: vec![Slot::default(); self.inputs],
            outputs: vec![Slot::default(); self.outputs],
        }
    }
}

// ─── Editor mode ─────────────────────────────────────────────────────────

/// What the user may do with the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorMode {
    /// Full editing.
    #[default]
    Edit,
    /// Nodes and links are frozen; the canvas can still be panned.
    Fixed,
    /// Read-only viewing; panning only.
    View,
}

impl EditorMode {
    pub fn can_edit(self) -> bool {
        self == Self::Edit
    }
}

// ─── Modules ─────────────────────────────────────────────────────────────

/// A named partition of the graph. Node order is creation order, which is
/// also paint order (last is topmost).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub nodes: IndexMap<NodeId, Node>,
}

impl Module {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check that every record has exactly one mirror on the remote node,
    /// pointing back, and that no slot holds the same link twice.
    pub fn check_mirrors(&self) -> Result<(), String> {
        for node in self.nodes.values() {
            for (direction, slots) in [
                (SlotDirection::Output, &node.outputs),
                (SlotDirection::Input, &node.inputs),
            ] {
                for (index, slot) in slots.iter().enumerate() {
                    for conn in &slot.connections {
                        if conn.node == node.id {
                            return Err(format!("node `{}` is connected to itself", node.id));
                        }
                        let remote = self.nodes.get(&conn.node).ok_or_else(|| {
                            format!(
                                "`{}`.{} points at `{}` outside the module",
                                node.id,
                                slot_name(direction, index),
                                conn.node
                            )
                        })?;
                        let mirrors = remote
                            .slot(direction.opposite(), conn.slot)
                            .map(|s| {
                                s.connections
                                    .iter()
                                    .filter(|c| c.points_at(node.id, index))
                                    .count()
                            })
                            .unwrap_or(0);
                        if mirrors != 1 {
                            return Err(format!(
                                "`{}`.{} -> `{}`.{} has {mirrors} mirrored records",
                                node.id,
                                slot_name(direction, index),
                                conn.node,
                                slot_name(direction.opposite(), conn.slot)
                            ));
                        }
                    }
                    if slot.connections.len() > 1 {
                        for (i, a) in slot.connections.iter().enumerate() {
                            if slot.connections[i + 1..]
                                .iter()
                                .any(|b| b.points_at(a.node, a.slot))
                            {
                                return Err(format!(
                                    "`{}`.{} holds a duplicate connection",
                                    node.id,
                                    slot_name(direction, index)
                                ));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_names_are_one_based() {
        assert_eq!(slot_name(SlotDirection::Input, 0), "input_1");
        assert_eq!(slot_name(SlotDirection::Output, 9), "output_10");
    }

    #[test]
    fn parse_slot_names() {
        assert_eq!(parse_slot_name("input_1"), Some((SlotDirection::Input, 0)));
        assert_eq!(
            parse_slot_name("output_12"),
            Some((SlotDirection::Output, 11))
        );
        assert_eq!(parse_slot_name("input_0"), None);
        assert_eq!(parse_slot_name("inputs_1"), None);
        assert_eq!(parse_slot_name("output"), None);
    }

    #[test]
    fn node_spec_builds_empty_slots() {
        let node = NodeSpec::new("math", 2, 3)
            .at(10.0, 20.0)
            .build(NodeId::intern("n1"));
        assert_eq!(node.inputs.len(), 2);
        assert_eq!(node.outputs.len(), 3);
        assert!(node.inputs.iter().all(|s| s.connections.is_empty()));
        assert_eq!(node.position, Point::new(10.0, 20.0));
    }

    #[test]
    fn connection_key_display() {
        let key = ConnectionKey::new(NodeId::intern("a"), 0, NodeId::intern("b"), 1);
        assert_eq!(key.to_string(), "a.output_1 -> b.input_2");
    }

    #[test]
    fn connection_key_serializes_slot_labels() {
        let key = ConnectionKey::new(NodeId::intern("a"), 1, NodeId::intern("b"), 0);
        let json = serde_json::to_value(key).unwrap();
        assert_eq!(json["sourceSlot"], "output_2");
        assert_eq!(json["targetSlot"], "input_1");
        assert_eq!(json["targetNodeId"], "b");
    }
}
