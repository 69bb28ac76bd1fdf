//! Graph store: modules, nodes and mirrored connections.
//!
//! Every connection lives twice, on the source's output slot and on the
//! target's input slot. All structural edits go through the paired
//! primitives `link_slots` and `unlink_slots`, so
//! no call site can touch one side without the other.
//!
//! Operations push [`FlowEvent`]s onto the store's queue instead of calling
//! listeners; the caller drains the queue once the operation has returned.

use crate::error::{FlowError, Result};
use crate::events::{EventQueue, FlowEvent};
use crate::id::{IdGenerator, IdStrategy, NodeId};
use crate::model::*;
use crate::renderer::{RendererRegistration, RendererRegistry};
use crate::snapshot::GraphSnapshot;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;

/// Name of the module that always exists.
pub const HOME_MODULE: &str = "Home";

/// Result of [`GraphStore::add_connection`]. Only `Created` changes the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectOutcome {
    Created,
    /// The exact edge already exists.
    Duplicate,
    /// Source and target are the same node.
    SameNode,
    /// Source and target live in different modules.
    CrossModule,
}

impl ConnectOutcome {
    pub fn is_created(self) -> bool {
        self == Self::Created
    }
}

#[derive(Debug)]
pub struct GraphStore {
    modules: IndexMap<String, Module>,
    active: String,
    /// Which module each node lives in.
    index: HashMap<NodeId, String>,
    ids: IdGenerator,
    renderers: RendererRegistry,
    events: EventQueue,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(IdStrategy::default())
    }
}

impl GraphStore {
    pub fn new(strategy: IdStrategy) -> Self {
        let mut modules = IndexMap::new();
        modules.insert(HOME_MODULE.to_string(), Module::default());
        Self {
            modules,
            active: HOME_MODULE.to_string(),
            index: HashMap::new(),
            ids: IdGenerator::new(strategy),
            renderers: RendererRegistry::default(),
            events: EventQueue::default(),
        }
    }

    // ─── Events & renderers ──────────────────────────────────────────────

    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventQueue {
        &mut self.events
    }

    pub fn register_renderer(&mut self, name: impl Into<String>, registration: RendererRegistration) {
        self.renderers.register(name, registration);
    }

    pub fn is_renderer_registered(&self, name: &str) -> bool {
        self.renderers.contains(name)
    }

    pub fn renderers(&self) -> &RendererRegistry {
        &self.renderers
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn active_module(&self) -> &str {
        &self.active
    }

    /// Nodes of the active module, in paint order.
    pub fn active(&self) -> &Module {
        // The active module is never missing: `change_module` and
        // `remove_module` only ever point it at an existing entry.
        &self.modules[self.active.as_str()]
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        let module = self.index.get(&id)?;
        self.modules.get(module)?.nodes.get(&id)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let module = self.index.get(&id)?;
        self.modules.get_mut(module)?.nodes.get_mut(&id)
    }

    fn require(&self, id: NodeId) -> Result<&Node> {
        self.node(id)
            .ok_or_else(|| FlowError::InvalidId(id.to_string()))
    }

    fn require_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.node_mut(id)
            .ok_or_else(|| FlowError::InvalidId(id.to_string()))
    }

    /// Ids of every node named `name`, across all modules.
    pub fn nodes_by_name(&self, name: &str) -> Vec<NodeId> {
        self.modules
            .values()
            .flat_map(|m| m.nodes.values())
            .filter(|n| n.name == name)
            .map(|n| n.id)
            .collect()
    }

    pub fn module_of(&self, id: NodeId) -> Option<&str> {
        self.index.get(&id).map(String::as_str)
    }

    /// Resolve a slot label (`input_2`) to its position on `id`.
    pub fn slot_index(&self, id: NodeId, direction: SlotDirection, name: &str) -> Result<usize> {
        let node = self.require(id)?;
        match parse_slot_name(name) {
            Some((dir, index)) if dir == direction && index < node.slots(direction).len() => {
                Ok(index)
            }
            _ => Err(FlowError::InvalidSlot {
                node: id.to_string(),
                slot: name.to_string(),
            }),
        }
    }

    /// The output-side record of an edge, which carries its waypoints.
    pub fn connection(&self, key: ConnectionKey) -> Option<&Connection> {
        let slot = self.node(key.source)?.outputs.get(key.source_slot)?;
        slot.find(key.target, key.target_slot)
            .map(|i| &slot.connections[i])
    }

    pub fn has_connection(&self, key: ConnectionKey) -> bool {
        self.connection(key).is_some()
    }

    /// Every edge in the active module.
    pub fn connections(&self) -> impl Iterator<Item = ConnectionKey> + '_ {
        self.active().nodes.values().flat_map(Node::outgoing)
    }

    // ─── Nodes ───────────────────────────────────────────────────────────

    /// Create a node in the active module.
    pub fn add_node(&mut self, spec: NodeSpec) -> Result<NodeId> {
        if let Some(name) = spec.render.renderer_name()
            && !self.renderers.contains(name)
        {
            return Err(FlowError::UnregisteredRenderer(name.to_string()));
        }

        let id = self.ids.next_id();
        let node = spec.build(id);
        log::debug!(
            "add node {id:?} `{}` ({} in, {} out) to `{}`",
            node.name,
            node.inputs.len(),
            node.outputs.len(),
            self.active
        );
        let active = self.active.clone();
        if let Some(module) = self.modules.get_mut(&active) {
            module.nodes.insert(id, node);
        }
        self.index.insert(id, active);
        self.events.push(FlowEvent::NodeCreated { id });
        Ok(id)
    }

    /// Remove a node and every connection incident on it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        let incident = self.require(id)?.incident();
        for key in incident {
            self.unlink_slots(key);
            self.events.push(FlowEvent::ConnectionRemoved(key));
        }

        if let Some(module) = self.index.remove(&id)
            && let Some(m) = self.modules.get_mut(&module)
        {
            m.nodes.shift_remove(&id);
        }
        log::debug!("remove node {id:?}");
        self.events.push(FlowEvent::NodeRemoved { id });
        self.debug_check();
        Ok(())
    }

    /// Place a node at an absolute graph position.
    pub fn set_node_position(&mut self, id: NodeId, position: Point) -> Result<()> {
        if !position.x.is_finite()
            || !position.y.is_finite()
            || position.x < 0.0
            || position.y < 0.0
        {
            return Err(FlowError::InvalidPosition {
                x: position.x,
                y: position.y,
            });
        }
        self.require_mut(id)?.position = position;
        Ok(())
    }

    /// Move a node by a graph-space delta; each axis stops at zero.
    pub fn translate_node(&mut self, id: NodeId, dx: f64, dy: f64) -> Result<Point> {
        let node = self.require_mut(id)?;
        node.position = Point::new(
            (node.position.x + dx).max(0.0),
            (node.position.y + dy).max(0.0),
        );
        log::trace!("translate {id:?} to {:?}", node.position);
        Ok(node.position)
    }

    pub fn set_node_payload(&mut self, id: NodeId, payload: serde_json::Value) -> Result<()> {
        self.require_mut(id)?.payload = payload;
        self.events.push(FlowEvent::NodeDataChanged { id });
        Ok(())
    }

    // ─── Connections ─────────────────────────────────────────────────────

    pub fn add_connection(
        &mut self,
        key: ConnectionKey,
        style: Option<String>,
    ) -> Result<ConnectOutcome> {
        let source = self.require(key.source)?;
        if key.source_slot >= source.outputs.len() {
            return Err(FlowError::InvalidSlot {
                node: key.source.to_string(),
                slot: key.source_slot_name(),
            });
        }
        let target = self.require(key.target)?;
        if key.target_slot >= target.inputs.len() {
            return Err(FlowError::InvalidSlot {
                node: key.target.to_string(),
                slot: key.target_slot_name(),
            });
        }

        let outcome = if key.source == key.target {
            ConnectOutcome::SameNode
        } else if self.module_of(key.source) != self.module_of(key.target) {
            ConnectOutcome::CrossModule
        } else if self.has_connection(key) {
            ConnectOutcome::Duplicate
        } else {
            self.link_slots(key, style);
            self.events.push(FlowEvent::ConnectionCreated(key));
            self.debug_check();
            ConnectOutcome::Created
        };
        log::debug!("connect {key}: {outcome:?}");
        Ok(outcome)
    }

    /// Remove both records of an edge. Returns whether it existed.
    pub fn remove_connection(&mut self, key: ConnectionKey) -> bool {
        let removed = self.unlink_slots(key).is_some();
        if removed {
            log::debug!("disconnect {key}");
            self.events.push(FlowEvent::ConnectionRemoved(key));
            self.debug_check();
        }
        removed
    }

    /// Remove every connection attached to one slot.
    pub fn remove_slot_connections(
        &mut self,
        id: NodeId,
        direction: SlotDirection,
        index: usize,
    ) -> Result<usize> {
        let keys = self.slot_keys(id, direction, index)?;
        for key in &keys {
            self.unlink_slots(*key);
            self.events.push(FlowEvent::ConnectionRemoved(*key));
        }
        self.debug_check();
        Ok(keys.len())
    }

    fn slot_keys(
        &self,
        id: NodeId,
        direction: SlotDirection,
        index: usize,
    ) -> Result<Vec<ConnectionKey>> {
        let node = self.require(id)?;
        let slot = node
            .slot(direction, index)
            .ok_or_else(|| FlowError::InvalidSlot {
                node: id.to_string(),
                slot: slot_name(direction, index),
            })?;
        Ok(slot
            .connections
            .iter()
            .map(|c| match direction {
                SlotDirection::Output => ConnectionKey::new(id, index, c.node, c.slot),
                SlotDirection::Input => ConnectionKey::new(c.node, c.slot, id, index),
            })
            .collect())
    }

    /// Insert both records of an edge. Callers have already checked that
    /// both endpoints exist and the edge is new.
    fn link_slots(&mut self, key: ConnectionKey, style: Option<String>) {
        if let Some(source) = self.node_mut(key.source)
            && let Some(slot) = source.outputs.get_mut(key.source_slot)
        {
            slot.connections.push(Connection::new(
                key.target,
                key.target_slot,
                style.clone(),
            ));
        }
        if let Some(target) = self.node_mut(key.target)
            && let Some(slot) = target.inputs.get_mut(key.target_slot)
        {
            slot.connections
                .push(Connection::new(key.source, key.source_slot, style));
        }
    }

    /// Remove both records of an edge, returning the output-side record.
    /// Neither side is touched unless both are found.
    fn unlink_slots(&mut self, key: ConnectionKey) -> Option<Connection> {
        let forward = self
            .node(key.source)?
            .outputs
            .get(key.source_slot)?
            .find(key.target, key.target_slot)?;
        let reverse = self
            .node(key.target)?
            .inputs
            .get(key.target_slot)?
            .find(key.source, key.source_slot)?;

        let target = self.node_mut(key.target)?;
        target.inputs[key.target_slot].connections.remove(reverse);
        let source = self.node_mut(key.source)?;
        Some(source.outputs[key.source_slot].connections.remove(forward))
    }

    // ─── Slots ───────────────────────────────────────────────────────────

    /// Append a slot; returns its position.
    pub fn add_slot(&mut self, id: NodeId, direction: SlotDirection) -> Result<usize> {
        let slots = self.require_mut(id)?.slots_mut(direction);
        slots.push(Slot::default());
        let index = slots.len() - 1;
        log::debug!("add {} to {id:?}", slot_name(direction, index));
        Ok(index)
    }

    /// Remove slot `index`, dropping its connections, and shift every later
    /// slot down by one. Remote mirrors of the shifted slots are rewritten
    /// to the new positions.
    pub fn remove_slot(&mut self, id: NodeId, direction: SlotDirection, index: usize) -> Result<()> {
        self.remove_slot_connections(id, direction, index)?;

        let node = self.require_mut(id)?;
        node.slots_mut(direction).remove(index);

        let shifted: Vec<(usize, NodeId, usize)> = node.slots(direction)[index..]
            .iter()
            .enumerate()
            .flat_map(|(offset, slot)| {
                slot.connections
                    .iter()
                    .map(move |c| (index + offset, c.node, c.slot))
            })
            .collect();

        // Ascending order: a record for old position `j + 1` is rewritten to
        // `j` before anything at `j + 2` is looked at, so rewrites never
        // collide with records not yet visited.
        for (new_pos, remote, remote_slot) in shifted {
            let Some(remote_node) = self.node_mut(remote) else {
                continue;
            };
            let Some(slot) = remote_node
                .slots_mut(direction.opposite())
                .get_mut(remote_slot)
            else {
                continue;
            };
            if let Some(record) = slot
                .connections
                .iter_mut()
                .find(|c| c.points_at(id, new_pos + 1))
            {
                record.slot = new_pos;
            }
        }

        log::debug!("remove {} from {id:?}", slot_name(direction, index));
        self.debug_check();
        Ok(())
    }

    // ─── Waypoints ───────────────────────────────────────────────────────

    fn waypoints_mut(&mut self, key: ConnectionKey) -> Result<&mut smallvec::SmallVec<[Point; 2]>> {
        let missing = || FlowError::InvalidId(key.to_string());
        let source = self.node_mut(key.source).ok_or_else(missing)?;
        let slot = source
            .outputs
            .get_mut(key.source_slot)
            .ok_or_else(missing)?;
        let index = slot
            .find(key.target, key.target_slot)
            .ok_or_else(missing)?;
        Ok(&mut slot.connections[index].waypoints)
    }

    pub fn waypoints(&self, key: ConnectionKey) -> Option<&[Point]> {
        self.connection(key).map(|c| c.waypoints.as_slice())
    }

    /// Insert a waypoint at `index` (0 is nearest the source).
    pub fn add_waypoint(&mut self, key: ConnectionKey, index: usize, point: Point) -> Result<()> {
        let points = self.waypoints_mut(key)?;
        if index > points.len() {
            return Err(FlowError::InvalidWaypoint { index });
        }
        points.insert(index, point);
        self.events.push(FlowEvent::RerouteAdded {
            connection: key,
            index,
        });
        Ok(())
    }

    pub fn move_waypoint(&mut self, key: ConnectionKey, index: usize, point: Point) -> Result<()> {
        let points = self.waypoints_mut(key)?;
        let slot = points
            .get_mut(index)
            .ok_or(FlowError::InvalidWaypoint { index })?;
        *slot = point;
        Ok(())
    }

    pub fn remove_waypoint(&mut self, key: ConnectionKey, index: usize) -> Result<Point> {
        let points = self.waypoints_mut(key)?;
        if index >= points.len() {
            return Err(FlowError::InvalidWaypoint { index });
        }
        let removed = points.remove(index);
        self.events.push(FlowEvent::RerouteRemoved {
            connection: key,
            index,
        });
        Ok(removed)
    }

    // ─── Modules ─────────────────────────────────────────────────────────

    pub fn add_module(&mut self, name: &str) -> Result<()> {
        if self.modules.contains_key(name) {
            return Err(FlowError::ModuleExists(name.to_string()));
        }
        self.modules.insert(name.to_string(), Module::default());
        self.events.push(FlowEvent::ModuleCreated {
            name: name.to_string(),
        });
        Ok(())
    }

    /// Make `name` the active module.
    pub fn change_module(&mut self, name: &str) -> Result<()> {
        if !self.modules.contains_key(name) {
            return Err(FlowError::InvalidModule(name.to_string()));
        }
        log::debug!("change module `{}` -> `{name}`", self.active);
        self.active = name.to_string();
        self.events.push(FlowEvent::ModuleChanged {
            name: name.to_string(),
        });
        Ok(())
    }

    /// Delete a module and its nodes. Removing the active module switches
    /// to `Home` first.
    pub fn remove_module(&mut self, name: &str) -> Result<()> {
        if name == HOME_MODULE {
            return Err(FlowError::ProtectedModule(name.to_string()));
        }
        if !self.modules.contains_key(name) {
            return Err(FlowError::InvalidModule(name.to_string()));
        }
        if self.active == name {
            self.change_module(HOME_MODULE)?;
        }
        if let Some(module) = self.modules.shift_remove(name) {
            for id in module.nodes.keys() {
                self.index.remove(id);
            }
        }
        self.events.push(FlowEvent::ModuleRemoved {
            name: name.to_string(),
        });
        Ok(())
    }

    /// Empty the active module. Connections never leave a module, so no
    /// other module is affected.
    pub fn clear_module(&mut self) {
        let active = self.active.clone();
        if let Some(module) = self.modules.get_mut(&active) {
            for id in module.nodes.keys() {
                self.index.remove(id);
            }
            module.nodes.clear();
        }
        log::debug!("clear module `{active}`");
    }

    /// Drop every module and start over with an empty `Home`.
    pub fn clear(&mut self) {
        self.modules.clear();
        self.modules
            .insert(HOME_MODULE.to_string(), Module::default());
        self.active = HOME_MODULE.to_string();
        self.index.clear();
        self.ids.reset();
    }

    // ─── Snapshot ────────────────────────────────────────────────────────

    pub fn export(&mut self) -> GraphSnapshot {
        let snapshot = GraphSnapshot::from_modules(&self.modules);
        self.events.push(FlowEvent::Exported);
        snapshot
    }

    /// Replace the whole graph. Nothing changes unless the snapshot is valid.
    /// The active module is kept when the snapshot has it, otherwise `Home`.
    pub fn import(&mut self, snapshot: GraphSnapshot) -> Result<()> {
        let mut modules = snapshot.into_modules().inspect_err(|e| {
            log::warn!("rejected snapshot: {e}");
        })?;
        if !modules.contains_key(HOME_MODULE) {
            modules.insert(HOME_MODULE.to_string(), Module::default());
        }

        let active = std::mem::take(&mut self.active);
        self.clear();
        for (name, module) in &modules {
            for node in module.nodes.values() {
                if let Some(renderer) = node.render.renderer_name()
                    && !self.renderers.contains(renderer)
                {
                    log::warn!("node {:?} uses unregistered renderer `{renderer}`", node.id);
                }
                self.index.insert(node.id, name.clone());
                self.ids.observe(node.id);
            }
        }
        if modules.contains_key(&active) {
            self.active = active;
        }
        self.modules = modules;
        log::debug!(
            "imported {} modules, {} nodes",
            self.modules.len(),
            self.index.len()
        );
        self.events.push(FlowEvent::Imported);
        self.debug_check();
        Ok(())
    }

    // ─── Invariants ──────────────────────────────────────────────────────

    /// Verify the mirror invariant in every module and that the node index
    /// agrees with module membership.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        if !self.modules.contains_key(HOME_MODULE) {
            return Err("`Home` module is missing".into());
        }
        if !self.modules.contains_key(&self.active) {
            return Err(format!("active module `{}` is missing", self.active));
        }
        let mut count = 0;
        for (name, module) in &self.modules {
            module.check_mirrors().map_err(|e| format!("{name}: {e}"))?;
            for id in module.nodes.keys() {
                count += 1;
                if self.index.get(id) != Some(name) {
                    return Err(format!("node {id:?} is not indexed under `{name}`"));
                }
            }
        }
        if count != self.index.len() {
            return Err("node index has stale entries".into());
        }
        Ok(())
    }

    fn debug_check(&self) {
        debug_assert!(
            self.check_invariants().is_ok(),
            "graph invariant violated: {:?}",
            self.check_invariants()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store() -> GraphStore {
        GraphStore::new(IdStrategy::Counter)
    }

    fn key(a: NodeId, out: usize, b: NodeId, inp: usize) -> ConnectionKey {
        ConnectionKey::new(a, out, b, inp)
    }

    #[test]
    fn starts_with_home() {
        let s = store();
        assert_eq!(s.active_module(), HOME_MODULE);
        assert!(s.active().is_empty());
        assert!(s.check_invariants().is_ok());
    }

    #[test]
    fn add_node_assigns_counter_ids() {
        let mut s = store();
        let a = s.add_node(NodeSpec::new("a", 0, 1)).unwrap();
        let b = s.add_node(NodeSpec::new("b", 1, 0)).unwrap();
        assert_eq!(a.as_str(), "1");
        assert_eq!(b.as_str(), "2");
        assert_eq!(s.module_of(a), Some(HOME_MODULE));
        assert_eq!(
            s.events_mut().drain(),
            vec![
                FlowEvent::NodeCreated { id: a },
                FlowEvent::NodeCreated { id: b }
            ]
        );
    }

    #[test]
    fn unregistered_renderer_is_rejected() {
        let mut s = store();
        let spec = NodeSpec::new("x", 1, 1).render(RenderDescriptor::Registered("card".into()));
        assert_eq!(
            s.add_node(spec.clone()),
            Err(FlowError::UnregisteredRenderer("card".into()))
        );
        s.register_renderer("card", RendererRegistration::new("<card/>"));
        assert!(s.add_node(spec).is_ok());
    }

    #[test]
    fn connection_is_mirrored() {
        let mut s = store();
        let a = s.add_node(NodeSpec::new("a", 0, 1)).unwrap();
        let b = s.add_node(NodeSpec::new("b", 1, 0)).unwrap();
        let k = key(a, 0, b, 0);

        assert_eq!(
            s.add_connection(k, Some("hot".into())),
            Ok(ConnectOutcome::Created)
        );
        let fwd = &s.node(a).unwrap().outputs[0].connections[0];
        let rev = &s.node(b).unwrap().inputs[0].connections[0];
        assert!(fwd.points_at(b, 0));
        assert!(rev.points_at(a, 0));
        assert_eq!(rev.style.as_deref(), Some("hot"));
    }

    #[test]
    fn duplicate_and_self_connections_are_suppressed() {
        let mut s = store();
        let a = s.add_node(NodeSpec::new("a", 1, 1)).unwrap();
        let b = s.add_node(NodeSpec::new("b", 1, 1)).unwrap();

        assert_eq!(s.add_connection(key(a, 0, b, 0), None), Ok(ConnectOutcome::Created));
        assert_eq!(s.add_connection(key(a, 0, b, 0), None), Ok(ConnectOutcome::Duplicate));
        assert_eq!(s.add_connection(key(a, 0, a, 0), None), Ok(ConnectOutcome::SameNode));
        assert_eq!(s.node(a).unwrap().outputs[0].connections.len(), 1);
        assert_eq!(s.node(b).unwrap().inputs[0].connections.len(), 1);
        assert!(s.node(a).unwrap().inputs[0].connections.is_empty());
    }

    #[test]
    fn cross_module_connection_is_a_no_op() {
        let mut s = store();
        let a = s.add_node(NodeSpec::new("a", 0, 1)).unwrap();
        s.add_module("Other").unwrap();
        s.change_module("Other").unwrap();
        let b = s.add_node(NodeSpec::new("b", 1, 0)).unwrap();

        assert_eq!(
            s.add_connection(key(a, 0, b, 0), None),
            Ok(ConnectOutcome::CrossModule)
        );
        assert!(s.node(a).unwrap().outputs[0].connections.is_empty());
    }

    #[test]
    fn bad_slot_is_an_error() {
        let mut s = store();
        let a = s.add_node(NodeSpec::new("a", 0, 1)).unwrap();
        let b = s.add_node(NodeSpec::new("b", 1, 0)).unwrap();
        assert!(matches!(
            s.add_connection(key(a, 3, b, 0), None),
            Err(FlowError::InvalidSlot { .. })
        ));
        assert_eq!(
            s.slot_index(b, SlotDirection::Input, "input_1"),
            Ok(0)
        );
        assert!(s.slot_index(b, SlotDirection::Input, "output_1").is_err());
        assert!(s.slot_index(b, SlotDirection::Input, "input_2").is_err());
    }

    #[test]
    fn remove_connection_removes_both_sides() {
        let mut s = store();
        let a = s.add_node(NodeSpec::new("a", 0, 1)).unwrap();
        let b = s.add_node(NodeSpec::new("b", 1, 0)).unwrap();
        s.add_connection(key(a, 0, b, 0), None).unwrap();

        assert!(s.remove_connection(key(a, 0, b, 0)));
        assert!(!s.remove_connection(key(a, 0, b, 0)));
        assert!(s.node(a).unwrap().outputs[0].connections.is_empty());
        assert!(s.node(b).unwrap().inputs[0].connections.is_empty());
    }

    #[test]
    fn remove_node_cascades_only_incident_edges() {
        let mut s = store();
        let a = s.add_node(NodeSpec::new("a", 0, 1)).unwrap();
        let b = s.add_node(NodeSpec::new("b", 1, 1)).unwrap();
        let c = s.add_node(NodeSpec::new("c", 1, 0)).unwrap();
        let d = s.add_node(NodeSpec::new("d", 1, 0)).unwrap();
        s.add_connection(key(a, 0, b, 0), None).unwrap();
        s.add_connection(key(b, 0, c, 0), None).unwrap();
        s.add_connection(key(a, 0, d, 0), None).unwrap();
        s.events_mut().drain();

        s.remove_node(b).unwrap();
        assert!(s.node(b).is_none());
        assert_eq!(s.module_of(b), None);

        let remaining: Vec<_> = s.connections().collect();
        assert_eq!(remaining, vec![key(a, 0, d, 0)]);
        assert!(s.node(c).unwrap().inputs[0].connections.is_empty());

        let events = s.events_mut().drain();
        assert_eq!(events.last(), Some(&FlowEvent::NodeRemoved { id: b }));
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn remove_missing_node_is_invalid_id() {
        let mut s = store();
        assert_eq!(
            s.remove_node(NodeId::intern("404")),
            Err(FlowError::InvalidId("404".into()))
        );
    }

    #[test]
    fn remove_only_input_slot_drops_connection() {
        let mut s = store();
        let a = s.add_node(NodeSpec::new("a", 0, 1)).unwrap();
        let b = s.add_node(NodeSpec::new("b", 1, 0)).unwrap();
        s.add_connection(key(a, 0, b, 0), None).unwrap();

        s.remove_slot(b, SlotDirection::Input, 0).unwrap();
        assert!(s.node(b).unwrap().inputs.is_empty());
        assert!(s.node(a).unwrap().outputs[0].connections.is_empty());
    }

    #[test]
    fn remove_slot_renumbers_remote_mirrors() {
        let mut s = store();
        let src = s.add_node(NodeSpec::new("src", 0, 2)).unwrap();
        let dst = s.add_node(NodeSpec::new("dst", 4, 0)).unwrap();
        s.add_connection(key(src, 0, dst, 0), None).unwrap();
        s.add_connection(key(src, 0, dst, 2), None).unwrap();
        s.add_connection(key(src, 1, dst, 3), None).unwrap();
        s.add_connection(key(src, 0, dst, 3), None).unwrap();

        s.remove_slot(dst, SlotDirection::Input, 1).unwrap();

        assert_eq!(s.node(dst).unwrap().inputs.len(), 3);
        let mut keys: Vec<_> = s.connections().collect();
        keys.sort_by_key(|k| (k.source_slot, k.target_slot));
        assert_eq!(
            keys,
            vec![
                key(src, 0, dst, 0),
                key(src, 0, dst, 1),
                key(src, 0, dst, 2),
                key(src, 1, dst, 2),
            ]
        );
        assert!(s.check_invariants().is_ok());
    }

    #[test]
    fn remove_output_slot_keeps_waypoints_of_shifted_links() {
        let mut s = store();
        let src = s.add_node(NodeSpec::new("src", 0, 3)).unwrap();
        let dst = s.add_node(NodeSpec::new("dst", 1, 0)).unwrap();
        s.add_connection(key(src, 0, dst, 0), None).unwrap();
        s.add_connection(key(src, 2, dst, 0), None).unwrap();
        s.add_waypoint(key(src, 2, dst, 0), 0, Point::new(5.0, 5.0))
            .unwrap();

        s.remove_slot(src, SlotDirection::Output, 0).unwrap();

        assert_eq!(
            s.waypoints(key(src, 1, dst, 0)),
            Some(&[Point::new(5.0, 5.0)][..])
        );
        let rev = &s.node(dst).unwrap().inputs[0].connections;
        assert_eq!(rev.len(), 1);
        assert!(rev[0].points_at(src, 1));
    }

    #[test]
    fn add_slot_appends() {
        let mut s = store();
        let a = s.add_node(NodeSpec::new("a", 1, 0)).unwrap();
        assert_eq!(s.add_slot(a, SlotDirection::Input), Ok(1));
        assert_eq!(s.add_slot(a, SlotDirection::Output), Ok(0));
        assert_eq!(s.node(a).unwrap().inputs.len(), 2);
    }

    #[test]
    fn positions() {
        let mut s = store();
        let a = s.add_node(NodeSpec::new("a", 0, 0).at(10.0, 10.0)).unwrap();
        assert!(matches!(
            s.set_node_position(a, Point::new(-1.0, 0.0)),
            Err(FlowError::InvalidPosition { .. })
        ));
        for bad in [
            Point::new(f64::NAN, 0.0),
            Point::new(0.0, f64::INFINITY),
        ] {
            assert!(matches!(
                s.set_node_position(a, bad),
                Err(FlowError::InvalidPosition { .. })
            ));
        }
        assert_eq!(s.node(a).unwrap().position, Point::new(10.0, 10.0));
        assert_eq!(s.translate_node(a, -25.0, 5.0), Ok(Point::new(0.0, 15.0)));
    }

    #[test]
    fn payload_change_emits_event() {
        let mut s = store();
        let a = s.add_node(NodeSpec::new("a", 0, 0)).unwrap();
        s.events_mut().drain();
        s.set_node_payload(a, serde_json::json!({"v": 2})).unwrap();
        assert_eq!(s.node(a).unwrap().payload["v"], 2);
        assert_eq!(
            s.events_mut().drain(),
            vec![FlowEvent::NodeDataChanged { id: a }]
        );
    }

    #[test]
    fn waypoint_editing() {
        let mut s = store();
        let a = s.add_node(NodeSpec::new("a", 0, 1)).unwrap();
        let b = s.add_node(NodeSpec::new("b", 1, 0)).unwrap();
        let k = key(a, 0, b, 0);
        s.add_connection(k, None).unwrap();

        s.add_waypoint(k, 0, Point::new(1.0, 1.0)).unwrap();
        s.add_waypoint(k, 1, Point::new(3.0, 3.0)).unwrap();
        s.add_waypoint(k, 1, Point::new(2.0, 2.0)).unwrap();
        assert_eq!(
            s.add_waypoint(k, 9, Point::default()),
            Err(FlowError::InvalidWaypoint { index: 9 })
        );
        s.move_waypoint(k, 2, Point::new(4.0, 4.0)).unwrap();
        assert_eq!(s.remove_waypoint(k, 0), Ok(Point::new(1.0, 1.0)));
        assert_eq!(
            s.waypoints(k),
            Some(&[Point::new(2.0, 2.0), Point::new(4.0, 4.0)][..])
        );
        assert!(s.node(b).unwrap().inputs[0].connections[0].waypoints.is_empty());
    }

    #[test]
    fn modules() {
        let mut s = store();
        assert_eq!(
            s.add_module(HOME_MODULE),
            Err(FlowError::ModuleExists("Home".into()))
        );
        assert_eq!(
            s.remove_module(HOME_MODULE),
            Err(FlowError::ProtectedModule("Home".into()))
        );
        s.add_module("Sub").unwrap();
        s.change_module("Sub").unwrap();
        let n = s.add_node(NodeSpec::new("n", 0, 0)).unwrap();
        assert_eq!(s.module_of(n), Some("Sub"));

        s.remove_module("Sub").unwrap();
        assert_eq!(s.active_module(), HOME_MODULE);
        assert!(s.node(n).is_none());
        assert!(s.check_invariants().is_ok());
        assert_eq!(
            s.change_module("Sub"),
            Err(FlowError::InvalidModule("Sub".into()))
        );
    }

    #[test]
    fn nodes_by_name_spans_modules() {
        let mut s = store();
        let a = s.add_node(NodeSpec::new("math", 0, 0)).unwrap();
        s.add_module("Sub").unwrap();
        s.change_module("Sub").unwrap();
        let b = s.add_node(NodeSpec::new("math", 0, 0)).unwrap();
        s.add_node(NodeSpec::new("other", 0, 0)).unwrap();
        assert_eq!(s.nodes_by_name("math"), vec![a, b]);
    }

    #[test]
    fn clear_module_and_clear() {
        let mut s = store();
        s.add_node(NodeSpec::new("a", 0, 0)).unwrap();
        s.add_module("Sub").unwrap();
        s.clear_module();
        assert!(s.active().is_empty());
        assert!(s.module("Sub").is_some());

        s.clear();
        assert_eq!(s.module_names().collect::<Vec<_>>(), vec![HOME_MODULE]);
        assert_eq!(s.add_node(NodeSpec::new("a", 0, 0)).unwrap().as_str(), "1");
    }

    #[test]
    fn export_import_is_identity() {
        let mut s = store();
        let a = s.add_node(NodeSpec::new("a", 0, 2).at(5.0, 5.0)).unwrap();
        let b = s.add_node(NodeSpec::new("b", 2, 0).at(300.0, 40.0)).unwrap();
        s.add_connection(key(a, 1, b, 0), Some("x".into())).unwrap();
        s.add_waypoint(key(a, 1, b, 0), 0, Point::new(100.0, 100.0))
            .unwrap();
        s.add_module("Sub").unwrap();

        let snapshot = s.export();
        let before: Vec<_> = s.module_names().map(str::to_string).collect();
        let nodes_before = s.active().clone();

        s.import(snapshot.clone()).unwrap();
        assert_eq!(s.module_names().map(str::to_string).collect::<Vec<_>>(), before);
        assert_eq!(s.active(), &nodes_before);
        assert_eq!(s.export(), snapshot);
    }

    #[test]
    fn null_payload_survives_json_round_trip() {
        let mut s = store();
        let a = s.add_node(NodeSpec::new("a", 0, 0)).unwrap();
        s.set_node_payload(a, serde_json::Value::Null).unwrap();

        let json = s.export().to_json().unwrap();
        s.import(GraphSnapshot::from_json(&json).unwrap()).unwrap();
        assert_eq!(s.node(a).unwrap().payload, serde_json::Value::Null);
        assert_eq!(s.export().to_json().unwrap(), json);
    }

    #[test]
    fn import_advances_counter() {
        let mut s = store();
        let json = r#"{ "Home": { "data": {
            "17": { "id": "17", "name": "x", "pos_x": 0, "pos_y": 0 } } } }"#;
        s.import(GraphSnapshot::from_json(json).unwrap()).unwrap();
        assert_eq!(s.add_node(NodeSpec::new("y", 0, 0)).unwrap().as_str(), "18");
    }

    #[test]
    fn invalid_import_leaves_state_alone() {
        let mut s = store();
        let a = s.add_node(NodeSpec::new("a", 0, 0)).unwrap();
        let json = r#"{ "Home": { "data": {
            "1": { "id": "2", "name": "x", "pos_x": 0, "pos_y": 0 } } } }"#;
        assert!(s.import(GraphSnapshot::from_json(json).unwrap()).is_err());
        assert!(s.node(a).is_some());
    }
}
