//! Export/import format.
//!
//! ```json
//! { "Home": { "data": { "1": { "id": "1", "name": "start", "html": "...",
//!     "pos_x": 10, "pos_y": 20, "typenode": false, "classname": "",
//!     "preventRemove": false, "data": {},
//!     "inputs":  { "input_1":  [ { "node": "2", "input": "output_1" } ] },
//!     "outputs": { "output_1": [ { "node": "3", "output": "input_1",
//!                                  "points": [ { "pos_x": 5, "pos_y": 6 } ] } ] } } } } }
//! ```
//!
//! Records use slot labels; the in-memory model uses slot positions. Decoding
//! validates everything the store relies on (contiguous slots, mirrored
//! records, connections inside one module) before anything is replaced.

use crate::error::{FlowError, Result};
use crate::id::NodeId;
use crate::model::{
    Connection, Module, Node, Point, RenderDescriptor, Slot, SlotDirection, parse_slot_name,
    slot_name,
};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;

/// The whole graph: module name to module contents.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphSnapshot {
    pub modules: IndexMap<String, ModuleRecord>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuleRecord {
    #[serde(default)]
    pub data: IndexMap<String, NodeRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(deserialize_with = "id_from_str_or_number")]
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub html: String,
    pub pos_x: f64,
    pub pos_y: f64,
    #[serde(default)]
    pub typenode: TypeNode,
    #[serde(default)]
    pub classname: String,
    #[serde(default, rename = "preventRemove")]
    pub prevent_remove: bool,
    #[serde(default = "empty_payload")]
    pub data: serde_json::Value,
    #[serde(default)]
    pub inputs: IndexMap<String, Vec<ConnectionRecord>>,
    #[serde(default)]
    pub outputs: IndexMap<String, Vec<ConnectionRecord>>,
}

/// One half of a mirrored edge. Input-side records name the remote output in
/// `input`; output-side records name the remote input in `output`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    #[serde(deserialize_with = "id_from_str_or_number")]
    pub node: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<PointRecord>,
    #[serde(default, rename = "pathClass", skip_serializing_if = "Option::is_none")]
    pub path_class: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub pos_x: f64,
    pub pos_y: f64,
}

/// Render kind on the wire: `false` inline markup, `true` registered
/// renderer, `"vue"` component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeNode {
    #[default]
    Inline,
    Registered,
    Component,
}

impl Serialize for TypeNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Inline => serializer.serialize_bool(false),
            Self::Registered => serializer.serialize_bool(true),
            Self::Component => serializer.serialize_str("vue"),
        }
    }
}

impl<'de> Deserialize<'de> for TypeNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Named(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Flag(false) => Ok(Self::Inline),
            Raw::Flag(true) => Ok(Self::Registered),
            Raw::Named(name) if name == "vue" => Ok(Self::Component),
            Raw::Named(other) => Err(serde::de::Error::custom(format!(
                "unknown typenode `{other}`"
            ))),
        }
    }
}

/// Older exports write counter ids as numbers.
fn id_from_str_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<NodeId, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => NodeId::intern(&s),
        Raw::Number(n) => NodeId::intern(&n.to_string()),
    })
}

// ─── Model → records ─────────────────────────────────────────────────────

impl GraphSnapshot {
    pub fn from_modules<'a>(modules: impl IntoIterator<Item = (&'a String, &'a Module)>) -> Self {
        let modules = modules
            .into_iter()
            .map(|(name, module)| (name.clone(), ModuleRecord::from_module(module)))
            .collect();
        Self { modules }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| FlowError::InvalidSnapshot(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| FlowError::InvalidSnapshot(e.to_string()))
    }

    /// Decode into modules, checking that every connection is mirrored and
    /// stays inside its module.
    pub fn into_modules(self) -> Result<IndexMap<String, Module>> {
        let mut modules = IndexMap::with_capacity(self.modules.len());
        for (name, record) in self.modules {
            let module = record.into_module()?;
            module
                .check_mirrors()
                .map_err(|e| FlowError::InvalidSnapshot(format!("{name}: {e}")))?;
            modules.insert(name, module);
        }

        let mut seen = std::collections::HashSet::new();
        for module in modules.values() {
            for id in module.nodes.keys() {
                if !seen.insert(*id) {
                    return Err(FlowError::InvalidSnapshot(format!(
                        "node `{id}` appears in more than one module"
                    )));
                }
            }
        }
        Ok(modules)
    }
}

impl ModuleRecord {
    pub fn from_module(module: &Module) -> Self {
        let data = module
            .nodes
            .values()
            .map(|node| (node.id.to_string(), NodeRecord::from_node(node)))
            .collect();
        Self { data }
    }

    pub fn into_module(self) -> Result<Module> {
        let mut module = Module::default();
        for (key, record) in self.data {
            if record.id.as_str() != key {
                return Err(FlowError::InvalidSnapshot(format!(
                    "node stored under `{key}` has id `{}`",
                    record.id
                )));
            }
            let node = record.into_node()?;
            module.nodes.insert(node.id, node);
        }
        Ok(module)
    }
}

impl NodeRecord {
    pub fn from_node(node: &Node) -> Self {
        let (typenode, html) = match &node.render {
            RenderDescriptor::Inline(s) => (TypeNode::Inline, s.clone()),
            RenderDescriptor::Registered(s) => (TypeNode::Registered, s.clone()),
            RenderDescriptor::Component(s) => (TypeNode::Component, s.clone()),
        };
        Self {
            id: node.id,
            name: node.name.clone(),
            html,
            pos_x: node.position.x,
            pos_y: node.position.y,
            typenode,
            classname: node.class_names.clone(),
            prevent_remove: node.prevent_remove,
            data: node.payload.clone(),
            inputs: slots_to_records(&node.inputs, SlotDirection::Input),
            outputs: slots_to_records(&node.outputs, SlotDirection::Output),
        }
    }

    pub fn into_node(self) -> Result<Node> {
        let render = match self.typenode {
            TypeNode::Inline => RenderDescriptor::Inline(self.html),
            TypeNode::Registered => RenderDescriptor::Registered(self.html),
            TypeNode::Component => RenderDescriptor::Component(self.html),
        };
        Ok(Node {
            id: self.id,
            name: self.name,
            position: Point::new(self.pos_x, self.pos_y),
            render,
            payload: self.data,
            class_names: self.classname,
            prevent_remove: self.prevent_remove,
            inputs: records_to_slots(self.id, self.inputs, SlotDirection::Input)?,
            outputs: records_to_slots(self.id, self.outputs, SlotDirection::Output)?,
        })
    }
}

fn empty_payload() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

fn slots_to_records(
    slots: &[Slot],
    direction: SlotDirection,
) -> IndexMap<String, Vec<ConnectionRecord>> {
    slots
        .iter()
        .enumerate()
        .map(|(i, slot)| {
            let records = slot
                .connections
                .iter()
                .map(|c| {
                    let remote = slot_name(direction.opposite(), c.slot);
                    let (input, output) = match direction {
                        SlotDirection::Input => (Some(remote), None),
                        SlotDirection::Output => (None, Some(remote)),
                    };
                    ConnectionRecord {
                        node: c.node,
                        input,
                        output,
                        points: c
                            .waypoints
                            .iter()
                            .map(|p| PointRecord {
                                pos_x: p.x,
                                pos_y: p.y,
                            })
                            .collect(),
                        path_class: c.style.clone(),
                    }
                })
                .collect();
            (slot_name(direction, i), records)
        })
        .collect()
}

// ─── Records → model ─────────────────────────────────────────────────────

fn invalid_slot(node: NodeId, slot: &str) -> FlowError {
    FlowError::InvalidSnapshot(format!("node `{node}` has malformed slot `{slot}`"))
}

fn records_to_slots(
    node: NodeId,
    records: IndexMap<String, Vec<ConnectionRecord>>,
    direction: SlotDirection,
) -> Result<Vec<Slot>> {
    let mut slots: Vec<Option<Slot>> = vec![None; records.len()];

    for (name, connections) in records {
        let index = match parse_slot_name(&name) {
            Some((dir, index)) if dir == direction && index < slots.len() => index,
            _ => return Err(invalid_slot(node, &name)),
        };
        if slots[index].is_some() {
            return Err(invalid_slot(node, &name));
        }

        let mut slot = Slot::default();
        for record in connections {
            let remote_name = match direction {
                SlotDirection::Input => record.input.as_deref(),
                SlotDirection::Output => record.output.as_deref(),
            }
            .ok_or_else(|| invalid_slot(node, &name))?;
            let remote_slot = match parse_slot_name(remote_name) {
                Some((dir, i)) if dir == direction.opposite() => i,
                _ => return Err(invalid_slot(record.node, remote_name)),
            };

            let mut connection = Connection::new(record.node, remote_slot, record.path_class);
            if direction == SlotDirection::Output {
                connection.waypoints = record
                    .points
                    .iter()
                    .map(|p| Point::new(p.pos_x, p.pos_y))
                    .collect::<SmallVec<_>>();
            }
            slot.connections.push(connection);
        }
        slots[index] = Some(slot);
    }

    // `records.len()` slots named 1..=len with no duplicates means every
    // entry is filled.
    Ok(slots.into_iter().flatten().collect())
}
