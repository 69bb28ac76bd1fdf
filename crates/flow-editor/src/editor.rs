//! The editor facade.
//!
//! Owns the graph store, viewport, link path cache, interaction machine and
//! event bus, and keeps the render adapter in step with all of them. Every
//! public method applies its change completely, then flushes queued events
//! to listeners.

use crate::bus::{self, EventBus, ListenerId};
use crate::config::{EditorConfig, EditorMode};
use crate::input::InputEvent;
use crate::interaction::{
    EditorAction, InteractionMachine, InteractionState, MachineContext, Selection,
};
use flow_core::{
    ConnectOutcome, ConnectionKey, CurveKind, EventKind, FlowError, FlowEvent, GraphSnapshot,
    GraphStore, LinkPath, Node, NodeId, NodeSpec, Point, RendererRegistration, Result,
    SlotDirection, Viewport, compute_segment, slot_name,
};
use flow_render::{
    HitScene, HitTarget, LinkPaths, NodeLayout, NullAdapter, RenderAdapter, hit_test,
    mount_module,
};

pub struct Editor {
    store: GraphStore,
    viewport: Viewport,
    paths: LinkPaths,
    layout: Box<dyn NodeLayout>,
    adapter: Box<dyn RenderAdapter>,
    machine: InteractionMachine,
    bus: EventBus,
    config: EditorConfig,
    selection: Selection,
    /// Graph-space centre of the delete affordance, when shown.
    delete_button: Option<Point>,
    transient: Option<LinkPath>,
    /// Non-zero while events must stay queued: during a flush or while a
    /// batch of actions is being applied.
    hold: u32,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("module", &self.store.active_module())
            .field("viewport", &self.viewport)
            .field("selection", &self.selection)
            .field("state", &self.machine.state())
            .finish_non_exhaustive()
    }
}

impl Editor {
    /// A headless editor.
    pub fn new(config: EditorConfig) -> Self {
        Self::with_adapter(config, Box::new(NullAdapter))
    }

    pub fn with_adapter(config: EditorConfig, mut adapter: Box<dyn RenderAdapter>) -> Self {
        let viewport = config.viewport();
        adapter.set_viewport(&viewport);
        Self {
            store: GraphStore::new(config.id_strategy),
            viewport,
            paths: LinkPaths::new(config.curve_settings()),
            layout: Box::new(config.layout),
            adapter,
            machine: InteractionMachine::new(),
            bus: EventBus::default(),
            config,
            selection: Selection::None,
            delete_button: None,
            transient: None,
            hold: 0,
        }
    }

    /// Replace the node geometry and redraw.
    pub fn set_layout(&mut self, layout: Box<dyn NodeLayout>) {
        self.layout = layout;
        self.redraw();
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn layout(&self) -> &dyn NodeLayout {
        self.layout.as_ref()
    }

    pub fn paths(&self) -> &LinkPaths {
        &self.paths
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn state(&self) -> InteractionState {
        self.machine.state()
    }

    pub fn mode(&self) -> EditorMode {
        self.config.mode
    }

    /// Where the delete affordance is shown, in graph space.
    pub fn delete_affordance(&self) -> Option<Point> {
        self.delete_button
    }

    /// The uncommitted link following the pointer, in graph space.
    pub fn transient_link(&self) -> Option<&LinkPath> {
        self.transient.as_ref()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.store.node(id)
    }

    pub fn nodes_by_name(&self, name: &str) -> Vec<NodeId> {
        self.store.nodes_by_name(name)
    }

    pub fn module_of(&self, id: NodeId) -> Option<&str> {
        self.store.module_of(id)
    }

    // ─── Events ──────────────────────────────────────────────────────────

    /// Listen to one kind of event.
    pub fn on(
        &mut self,
        kind: EventKind,
        listener: impl FnMut(&mut Editor, &FlowEvent) + 'static,
    ) -> ListenerId {
        self.bus.on(kind, Box::new(listener))
    }

    /// Listen to every event.
    pub fn on_any(&mut self, listener: impl FnMut(&mut Editor, &FlowEvent) + 'static) -> ListenerId {
        self.bus.on_any(Box::new(listener))
    }

    pub fn remove_listener(&mut self, id: ListenerId) {
        self.bus.remove(id);
    }

    pub(crate) fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Stop recording events (e.g. while loading), or resume.
    pub fn set_silent(&mut self, silent: bool) {
        self.store.events_mut().set_silent(silent);
    }

    /// Deliver queued events, oldest first. Events raised by listeners are
    /// appended to the same queue and delivered in this flush.
    pub fn flush(&mut self) {
        if self.hold > 0 {
            return;
        }
        self.hold += 1;
        while let Some(event) = self.store.events_mut().pop() {
            bus::dispatch(self, &event);
        }
        self.hold -= 1;
    }

    fn emit(&mut self, event: FlowEvent) {
        self.store.events_mut().push(event);
    }

    // ─── Renderers ───────────────────────────────────────────────────────

    pub fn register_renderer(&mut self, name: impl Into<String>, registration: RendererRegistration) {
        self.store.register_renderer(name, registration);
    }

    pub fn is_renderer_registered(&self, name: &str) -> bool {
        self.store.is_renderer_registered(name)
    }

    // ─── Nodes ───────────────────────────────────────────────────────────

    pub fn add_node(&mut self, spec: NodeSpec) -> Result<NodeId> {
        let id = self.store.add_node(spec)?;
        self.mount(id);
        self.flush();
        Ok(id)
    }

    /// Remove a node and every connection touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        let visible = self.is_visible(id);
        self.store.remove_node(id)?;
        if visible {
            for key in self.paths.remove_node(id) {
                self.adapter.remove_link(key);
            }
            self.adapter.unmount_node(id);
        }
        self.settle_gesture();
        let stale = match self.selection {
            Selection::Node(n) => n == id,
            Selection::Link(key) => key.touches(id),
            Selection::None => false,
        };
        if stale {
            self.set_selection(Selection::None);
            self.hide_delete_button();
        }
        self.flush();
        Ok(())
    }

    pub fn set_node_position(&mut self, id: NodeId, x: f64, y: f64) -> Result<()> {
        self.store.set_node_position(id, Point::new(x, y))?;
        self.refresh_node(id);
        self.flush();
        Ok(())
    }

    pub fn set_node_payload(&mut self, id: NodeId, payload: serde_json::Value) -> Result<()> {
        self.store.set_node_payload(id, payload)?;
        self.flush();
        Ok(())
    }

    // ─── Connections ─────────────────────────────────────────────────────

    pub fn add_connection(
        &mut self,
        key: ConnectionKey,
        style: Option<String>,
    ) -> Result<ConnectOutcome> {
        let outcome = self.store.add_connection(key, style)?;
        if outcome.is_created() && self.is_visible(key.source) {
            self.draw_link(key);
        }
        self.flush();
        Ok(outcome)
    }

    /// Connect by slot labels, e.g. `("output_1", "input_2")`.
    pub fn connect(
        &mut self,
        source: NodeId,
        output: &str,
        target: NodeId,
        input: &str,
    ) -> Result<ConnectOutcome> {
        let key = self.resolve_key(source, output, target, input)?;
        self.add_connection(key, None)
    }

    pub fn remove_connection(&mut self, key: ConnectionKey) -> bool {
        let removed = self.store.remove_connection(key);
        if removed {
            self.forget_link(key);
        }
        self.flush();
        removed
    }

    /// Disconnect by slot labels.
    pub fn disconnect(
        &mut self,
        source: NodeId,
        output: &str,
        target: NodeId,
        input: &str,
    ) -> Result<bool> {
        let key = self.resolve_key(source, output, target, input)?;
        Ok(self.remove_connection(key))
    }

    fn resolve_key(
        &self,
        source: NodeId,
        output: &str,
        target: NodeId,
        input: &str,
    ) -> Result<ConnectionKey> {
        let source_slot = self.store.slot_index(source, SlotDirection::Output, output)?;
        let target_slot = self.store.slot_index(target, SlotDirection::Input, input)?;
        Ok(ConnectionKey::new(source, source_slot, target, target_slot))
    }

    // ─── Slots ───────────────────────────────────────────────────────────

    pub fn add_slot(&mut self, id: NodeId, direction: SlotDirection) -> Result<usize> {
        let before = self.incident(id);
        let index = self.store.add_slot(id, direction)?;
        self.mount(id);
        self.redraw_links_of(id, before);
        self.flush();
        Ok(index)
    }

    /// Remove slot `index`, dropping its connections and renumbering the
    /// slots after it.
    pub fn remove_slot(&mut self, id: NodeId, direction: SlotDirection, index: usize) -> Result<()> {
        let before = self.incident(id);
        self.store.remove_slot(id, direction, index)?;
        self.mount(id);
        self.redraw_links_of(id, before);
        self.settle_gesture();
        self.flush();
        Ok(())
    }

    /// [`remove_slot`](Self::remove_slot) by label, e.g. `"input_2"`.
    pub fn remove_slot_named(
        &mut self,
        id: NodeId,
        direction: SlotDirection,
        name: &str,
    ) -> Result<()> {
        let index = self.store.slot_index(id, direction, name)?;
        self.remove_slot(id, direction, index)
    }

    /// Drop every connection on one slot, keeping the slot.
    pub fn remove_slot_connections(
        &mut self,
        id: NodeId,
        direction: SlotDirection,
        index: usize,
    ) -> Result<()> {
        let before = self.incident(id);
        self.store.remove_slot_connections(id, direction, index)?;
        self.redraw_links_of(id, before);
        self.flush();
        Ok(())
    }

    // ─── Waypoints ───────────────────────────────────────────────────────

    pub fn add_waypoint(&mut self, key: ConnectionKey, index: usize, point: Point) -> Result<()> {
        self.store.add_waypoint(key, index, point)?;
        self.draw_link(key);
        self.flush();
        Ok(())
    }

    /// Add a waypoint at `at`, splitting the segment of the link nearest to
    /// it. Returns the waypoint's index.
    pub fn insert_waypoint(&mut self, key: ConnectionKey, at: Point) -> Result<usize> {
        let index = self.insertion_index(key, at)?;
        self.add_waypoint(key, index, at)?;
        Ok(index)
    }

    fn insertion_index(&self, key: ConnectionKey, at: Point) -> Result<usize> {
        let count = self
            .store
            .waypoints(key)
            .map(<[Point]>::len)
            .ok_or_else(|| FlowError::InvalidId(key.to_string()))?;
        Ok(self
            .paths
            .get(&key)
            .map(|path| path.insertion_index(at))
            .unwrap_or(count))
    }

    pub fn move_waypoint(&mut self, key: ConnectionKey, index: usize, point: Point) -> Result<()> {
        self.store.move_waypoint(key, index, point)?;
        self.draw_link(key);
        self.flush();
        Ok(())
    }

    pub fn remove_waypoint(&mut self, key: ConnectionKey, index: usize) -> Result<Point> {
        let removed = self.store.remove_waypoint(key, index)?;
        self.draw_link(key);
        self.settle_gesture();
        self.flush();
        Ok(removed)
    }

    // ─── Modules ─────────────────────────────────────────────────────────

    pub fn add_module(&mut self, name: &str) -> Result<()> {
        self.store.add_module(name)?;
        self.flush();
        Ok(())
    }

    /// Switch modules. The viewport returns to its origin at zoom 1.
    pub fn change_module(&mut self, name: &str) -> Result<()> {
        self.store.change_module(name)?;
        self.viewport.reset();
        self.reload();
        self.flush();
        Ok(())
    }

    pub fn remove_module(&mut self, name: &str) -> Result<()> {
        let was_active = self.store.active_module() == name;
        self.store.remove_module(name)?;
        if was_active {
            self.viewport.reset();
            self.reload();
        }
        self.flush();
        Ok(())
    }

    /// Remove every node of the active module.
    pub fn clear_module(&mut self) {
        self.store.clear_module();
        self.reload();
        self.flush();
    }

    /// Start over with a single empty `Home` module.
    pub fn clear(&mut self) {
        self.store.clear();
        self.reload();
        self.flush();
    }

    // ─── Snapshot ────────────────────────────────────────────────────────

    pub fn export(&mut self) -> GraphSnapshot {
        let snapshot = self.store.export();
        self.flush();
        snapshot
    }

    pub fn export_json(&mut self) -> Result<String> {
        self.export().to_json()
    }

    /// Replace the whole graph and redraw the active module from scratch.
    pub fn import(&mut self, snapshot: GraphSnapshot) -> Result<()> {
        self.store.import(snapshot)?;
        self.reload();
        self.flush();
        Ok(())
    }

    pub fn import_json(&mut self, json: &str) -> Result<()> {
        self.import(GraphSnapshot::from_json(json)?)
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    pub fn zoom_in(&mut self) {
        self.change_viewport(Viewport::zoom_in);
        self.flush();
    }

    pub fn zoom_out(&mut self) {
        self.change_viewport(Viewport::zoom_out);
        self.flush();
    }

    pub fn zoom_reset(&mut self) {
        self.change_viewport(Viewport::zoom_reset);
        self.flush();
    }

    /// Set the zoom, clamped to the configured range.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.change_viewport(|v| v.set_zoom(zoom));
        self.flush();
    }

    pub fn set_pan(&mut self, x: f64, y: f64) {
        let pan = Point::new(x, y);
        self.change_viewport(|v| v.set_pan(pan));
        self.flush();
    }

    fn change_viewport(&mut self, change: impl FnOnce(&mut Viewport) -> bool) {
        let before = self.viewport;
        if !change(&mut self.viewport) {
            return;
        }
        if self.viewport.zoom != before.zoom {
            self.emit(FlowEvent::ZoomChanged {
                zoom: self.viewport.zoom,
            });
        }
        if self.viewport.pan != before.pan {
            self.emit(FlowEvent::PanChanged {
                x: self.viewport.pan.x,
                y: self.viewport.pan.y,
            });
        }
        self.adapter.set_viewport(&self.viewport);
    }

    // ─── Mode and selection ──────────────────────────────────────────────

    /// Leaving edit mode drops the selection and any gesture in progress.
    pub fn set_mode(&mut self, mode: EditorMode) {
        self.config.mode = mode;
        if !mode.can_edit() {
            self.abandon_gesture();
            self.hide_delete_button();
            self.set_selection(Selection::None);
        }
        log::debug!("editor mode {mode:?}");
        self.emit(FlowEvent::EditorModeChanged { mode });
        self.flush();
    }

    pub fn select(&mut self, selection: Selection) {
        self.set_selection(selection);
        self.flush();
    }

    fn set_selection(&mut self, selection: Selection) {
        if selection == self.selection {
            return;
        }
        match self.selection {
            Selection::Node(id) => self.emit(FlowEvent::NodeUnselected { id }),
            Selection::Link(key) => self.emit(FlowEvent::ConnectionUnselected(key)),
            Selection::None => {}
        }
        match selection {
            Selection::Node(id) => self.emit(FlowEvent::NodeSelected { id }),
            Selection::Link(key) => self.emit(FlowEvent::ConnectionSelected(key)),
            Selection::None => {}
        }
        self.selection = selection;
        self.adapter
            .set_selection(selection.node(), selection.link());
    }

    /// Remove the selected node or link. Nodes flagged `prevent_remove`
    /// stay.
    pub fn delete_selection(&mut self) {
        match self.selection {
            Selection::Node(id) => {
                let locked = self.store.node(id).is_some_and(|n| n.prevent_remove);
                if !locked && let Err(e) = self.remove_node(id) {
                    log::warn!("delete selection: {e}");
                }
            }
            Selection::Link(key) => {
                self.remove_connection(key);
            }
            Selection::None => {}
        }
        self.flush();
    }

    fn show_delete_button(&mut self, pointer: Point) {
        let at = match self.selection {
            Selection::Node(id) => match self.store.node(id) {
                Some(node) => {
                    let bounds = self.layout.node_bounds(node);
                    Point::new(bounds.x1, bounds.y0)
                }
                None => return,
            },
            Selection::Link(_) => pointer,
            Selection::None => return,
        };
        self.delete_button = Some(at);
        self.adapter.show_delete_button(Some(at));
    }

    fn hide_delete_button(&mut self) {
        if self.delete_button.take().is_some() {
            self.adapter.show_delete_button(None);
        }
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// What lies under a graph-space point.
    pub fn hit_test(&self, graph: Point) -> HitTarget {
        let scene = HitScene {
            module: self.store.active(),
            layout: self.layout.as_ref(),
            paths: &self.paths,
            delete_button: self.delete_button,
            waypoint_radius: self.config.reroute_width,
            link_tolerance: self.config.link_hit_tolerance,
        };
        hit_test(&scene, graph)
    }

    /// Feed one input event, hit-testing it against the current scene.
    ///
    /// Moves are not hit-tested: they only continue the gesture started by
    /// the press.
    pub fn handle(&mut self, event: &InputEvent) {
        let hit = match event {
            InputEvent::PointerDown { x, y, .. }
            | InputEvent::PointerUp { x, y, .. }
            | InputEvent::DoubleClick { x, y } => {
                self.hit_test(self.viewport.to_graph(Point::new(*x, *y)))
            }
            _ => HitTarget::Canvas,
        };
        self.handle_at(event, hit);
    }

    /// Feed one input event with a hit target the host determined itself,
    /// e.g. [`HitTarget::TextControl`].
    pub fn handle_at(&mut self, event: &InputEvent, hit: HitTarget) {
        let ctx = MachineContext {
            module: self.store.active(),
            viewport: &self.viewport,
            config: &self.config,
            selection: self.selection,
        };
        let actions = self.machine.handle(event, hit, &ctx);
        self.apply_all(actions);
        self.flush();
    }

    fn abandon_gesture(&mut self) {
        let actions = self.machine.reset();
        self.apply_all(actions);
    }

    /// Drop a gesture whose node, slot or waypoint was removed under it.
    fn settle_gesture(&mut self) {
        if !self.machine.state().is_live_in(self.store.active()) {
            self.abandon_gesture();
        }
    }

    fn apply_all(&mut self, actions: Vec<EditorAction>) {
        self.hold += 1;
        for action in actions {
            self.apply(action);
        }
        self.hold -= 1;
    }

    fn apply(&mut self, action: EditorAction) {
        match action {
            EditorAction::Select(selection) => self.set_selection(selection),
            EditorAction::TranslateNode { id, dx, dy } => {
                if self.store.translate_node(id, dx, dy).is_ok() {
                    self.refresh_node(id);
                }
            }
            EditorAction::NodeMoved(id) => self.emit(FlowEvent::NodeMoved { id }),

            EditorAction::StartLink { node, slot } => {
                self.emit(FlowEvent::ConnectionStarted {
                    node,
                    slot: slot_name(SlotDirection::Output, slot),
                });
                self.show_transient(node, slot, None);
            }
            EditorAction::UpdateTransientLink { node, slot, to } => {
                self.show_transient(node, slot, Some(to));
            }
            EditorAction::CommitLink(key) => {
                self.clear_transient();
                match self.store.add_connection(key, None) {
                    Ok(ConnectOutcome::Created) => self.draw_link(key),
                    outcome => {
                        log::debug!("link {key} not created: {outcome:?}");
                        self.emit(FlowEvent::ConnectionCancelled {
                            node: key.source,
                            slot: key.source_slot_name(),
                        });
                    }
                }
            }
            EditorAction::CancelLink { node, slot } => {
                self.clear_transient();
                self.emit(FlowEvent::ConnectionCancelled {
                    node,
                    slot: slot_name(SlotDirection::Output, slot),
                });
            }

            EditorAction::MoveWaypoint { key, index, to } => {
                if self.store.move_waypoint(key, index, to).is_ok() {
                    self.draw_link(key);
                }
            }
            EditorAction::WaypointMoved { key, index } => self.emit(FlowEvent::RerouteMoved {
                connection: key,
                index,
            }),
            EditorAction::InsertWaypoint { key, at } => {
                if let Err(e) = self.insert_waypoint(key, at) {
                    log::warn!("insert waypoint on {key}: {e}");
                }
            }
            EditorAction::RemoveWaypoint { key, index } => {
                if let Err(e) = self.remove_waypoint(key, index) {
                    log::warn!("remove waypoint {index} of {key}: {e}");
                }
            }

            EditorAction::SetPan(pan) => self.change_viewport(|v| v.set_pan(pan)),
            EditorAction::ZoomIn => self.change_viewport(Viewport::zoom_in),
            EditorAction::ZoomOut => self.change_viewport(Viewport::zoom_out),
            EditorAction::ZoomReset => self.change_viewport(Viewport::zoom_reset),

            EditorAction::DeleteSelection => self.delete_selection(),
            EditorAction::ShowDeleteButton { pointer } => self.show_delete_button(pointer),
            EditorAction::HideDeleteButton => self.hide_delete_button(),

            EditorAction::PointerMoved(p) => self.emit(FlowEvent::PointerMoved { x: p.x, y: p.y }),
            EditorAction::Clicked(p) => self.emit(FlowEvent::Clicked { x: p.x, y: p.y }),
            EditorAction::ContextMenu(p) => self.emit(FlowEvent::ContextMenu { x: p.x, y: p.y }),
        }
    }

    // ─── Drawing ─────────────────────────────────────────────────────────

    fn is_visible(&self, id: NodeId) -> bool {
        self.store.module_of(id) == Some(self.store.active_module())
    }

    fn incident(&self, id: NodeId) -> Vec<ConnectionKey> {
        self.store.node(id).map(Node::incident).unwrap_or_default()
    }

    /// Mount (or remount) a node of the active module.
    fn mount(&mut self, id: NodeId) {
        if let Some(node) = self.store.active().nodes.get(&id) {
            let registration = node
                .render
                .renderer_name()
                .and_then(|name| self.store.renderers().get(name));
            self.adapter.mount_node(node, registration);
        }
    }

    /// A node moved: move its visual and recompute its links only.
    fn refresh_node(&mut self, id: NodeId) {
        let Some(position) = self.store.active().nodes.get(&id).map(|n| n.position) else {
            return;
        };
        self.adapter.move_node(id, position);
        let keys = self
            .paths
            .refresh_node(self.store.active(), self.layout.as_ref(), id);
        for key in keys {
            self.paint_link(key);
        }
    }

    /// Recompute one link and hand it to the adapter.
    fn draw_link(&mut self, key: ConnectionKey) {
        self.paths
            .refresh_link(self.store.active(), self.layout.as_ref(), key);
        self.paint_link(key);
    }

    fn paint_link(&mut self, key: ConnectionKey) {
        match self.paths.get(&key) {
            Some(path) => {
                let style = self.store.connection(key).and_then(|c| c.style.as_deref());
                self.adapter
                    .update_link(key, path, self.config.path_mode(), style);
            }
            None => self.adapter.remove_link(key),
        }
    }

    fn forget_link(&mut self, key: ConnectionKey) {
        if self.paths.remove(&key).is_some() {
            self.adapter.remove_link(key);
        }
        self.settle_gesture();
        if self.selection == Selection::Link(key) {
            self.set_selection(Selection::None);
            self.hide_delete_button();
        }
    }

    /// After a slot change on `id`: drop links that no longer exist (their
    /// keys may have been renumbered) and redraw the rest.
    fn redraw_links_of(&mut self, id: NodeId, before: Vec<ConnectionKey>) {
        if !self.is_visible(id) {
            return;
        }
        let after = self.incident(id);
        for key in before {
            if !after.contains(&key) {
                self.forget_link(key);
            }
        }
        for key in after {
            self.draw_link(key);
        }
    }

    fn show_transient(&mut self, node: NodeId, slot: usize, to: Option<Point>) {
        let Some(source) = self.store.active().nodes.get(&node) else {
            return;
        };
        let start = self.layout.slot_anchor(source, SlotDirection::Output, slot);
        let end = to.unwrap_or(start);
        let path = LinkPath {
            segments: vec![compute_segment(
                start,
                end,
                self.config.curvature,
                CurveKind::OpenClose,
            )],
        };
        self.adapter.transient_link(Some(&path));
        self.transient = Some(path);
    }

    fn clear_transient(&mut self) {
        if self.transient.take().is_some() {
            self.adapter.transient_link(None);
        }
    }

    /// Drop all interaction state and draw the active module from scratch.
    fn reload(&mut self) {
        self.abandon_gesture();
        self.clear_transient();
        self.hide_delete_button();
        self.set_selection(Selection::None);
        self.redraw();
    }

    fn redraw(&mut self) {
        self.paths
            .rebuild(self.store.active(), self.layout.as_ref());
        mount_module(
            self.adapter.as_mut(),
            self.store.active(),
            self.store.renderers(),
            &self.paths,
            self.config.path_mode(),
        );
        self.adapter.set_viewport(&self.viewport);
    }
}
