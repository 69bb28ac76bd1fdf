//! WASM bridge for the flow editor: exposes the Rust editor core to JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. The host page owns the DOM:
//! it forwards pointer and keyboard events here, then replays the drawing
//! commands and notifications it drains after each call.

use flow_core::{
    ConnectionKey, FlowEvent, LinkPath, NodeId, NodeRecord, NodeSpec, Point, RenderDescriptor,
    RendererRegistration, SlotDirection,
};
use flow_editor::{
    Editor, EditorConfig, EditorMode, InputEvent, Modifiers, PointerButton, PointerKind,
    Selection,
};
use flow_render::{HitTarget, RecordingAdapter, to_screen};
use serde::Serialize;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

/// The WASM-facing editor controller.
///
/// Every mutation and input call leaves its drawing commands and events
/// queued until the host drains them.
#[wasm_bindgen]
pub struct FlowCanvas {
    editor: Editor,
    recorder: Rc<RefCell<RecordingAdapter>>,
    events: Rc<RefCell<Vec<FlowEvent>>>,
}

#[wasm_bindgen]
impl FlowCanvas {
    /// Create an editor from a JSON config. Unknown or missing fields take
    /// their defaults; an unparsable config falls back to all defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Self {
        console_hooks_setup();

        let config = if config_json.trim().is_empty() {
            EditorConfig::default()
        } else {
            EditorConfig::from_json(config_json).unwrap_or_else(|e| {
                log::warn!("invalid editor config, using defaults: {e}");
                EditorConfig::default()
            })
        };
        let recorder = Rc::new(RefCell::new(RecordingAdapter::default()));
        let mut editor = Editor::with_adapter(config, Box::new(recorder.clone()));

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        editor.on_any(move |_, event| sink.borrow_mut().push(event.clone()));

        Self {
            editor,
            recorder,
            events,
        }
    }

    // ─── Drain API ───────────────────────────────────────────────────────

    /// Notifications raised since the last call, as a JSON array.
    pub fn drain_events(&mut self) -> String {
        let events = std::mem::take(&mut *self.events.borrow_mut());
        serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string())
    }

    /// Drawing commands issued since the last call, as a JSON array.
    pub fn drain_render_commands(&mut self) -> String {
        let commands = self.recorder.borrow_mut().drain();
        serde_json::to_string(&commands).unwrap_or_else(|_| "[]".to_string())
    }

    /// Every link of the active module with its path data, in graph space
    /// or, with `screen`, already mapped through the viewport.
    pub fn link_paths(&self, screen: bool) -> String {
        let mode = self.editor.config().path_mode();
        let viewport = self.editor.viewport();
        let links: Vec<LinkView<'_>> = self
            .editor
            .paths()
            .iter()
            .map(|(key, path)| {
                let path = if screen {
                    to_screen(path, viewport)
                } else {
                    path.clone()
                };
                LinkView {
                    key,
                    paths: path.path_data(mode),
                    waypoints: waypoints_of(&path),
                }
            })
            .collect();
        serde_json::to_string(&links).unwrap_or_else(|_| "[]".to_string())
    }

    // ─── Nodes ───────────────────────────────────────────────────────────

    /// Add a node to the active module. `typenode` is `""` for inline
    /// markup in `html`, `"registered"` or `"component"` to draw it with
    /// the renderer named by `html`.
    ///
    /// Returns JSON `{"ok":true,"id":"..."}` or `{"ok":false,"error":"..."}`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_node(
        &mut self,
        name: &str,
        inputs: usize,
        outputs: usize,
        x: f64,
        y: f64,
        class_names: &str,
        data_json: &str,
        html: &str,
        typenode: &str,
    ) -> String {
        let payload = match parse_payload(data_json) {
            Ok(payload) => payload,
            Err(e) => return error_json(e),
        };
        let render = match typenode {
            "registered" => RenderDescriptor::Registered(html.to_string()),
            "component" => RenderDescriptor::Component(html.to_string()),
            _ => RenderDescriptor::Inline(html.to_string()),
        };
        let spec = NodeSpec::new(name, inputs, outputs)
            .at(x, y)
            .class_names(class_names)
            .payload(payload)
            .render(render);
        match self.editor.add_node(spec) {
            Ok(id) => json!({ "ok": true, "id": id }).to_string(),
            Err(e) => error_json(e),
        }
    }

    /// Remove a node and every link touching it. Returns true on success.
    pub fn remove_node(&mut self, id: &str) -> bool {
        report(self.editor.remove_node(NodeId::intern(id)))
    }

    /// The node as it would appear in an export, or `""` if unknown.
    pub fn get_node(&self, id: &str) -> String {
        self.editor
            .node(NodeId::intern(id))
            .and_then(|node| serde_json::to_string(&NodeRecord::from_node(node)).ok())
            .unwrap_or_default()
    }

    /// Ids of every node with this name, across modules, as a JSON array.
    pub fn nodes_by_name(&self, name: &str) -> String {
        serde_json::to_string(&self.editor.nodes_by_name(name)).unwrap_or_else(|_| "[]".into())
    }

    /// Name of the module holding the node, or `""` if unknown.
    pub fn module_of(&self, id: &str) -> String {
        self.editor
            .module_of(NodeId::intern(id))
            .map(str::to_string)
            .unwrap_or_default()
    }

    pub fn set_node_position(&mut self, id: &str, x: f64, y: f64) -> bool {
        report(self.editor.set_node_position(NodeId::intern(id), x, y))
    }

    /// Replace a node's payload with the given JSON value.
    pub fn set_node_data(&mut self, id: &str, data_json: &str) -> bool {
        match parse_payload(data_json) {
            Ok(payload) => report(self.editor.set_node_payload(NodeId::intern(id), payload)),
            Err(e) => {
                log::warn!("set_node_data: {e}");
                false
            }
        }
    }

    /// Register a named renderer. `props_json` may be empty.
    pub fn register_renderer(&mut self, name: &str, template: &str, props_json: &str) -> bool {
        let mut registration = RendererRegistration::new(template);
        if !props_json.trim().is_empty() {
            match serde_json::from_str(props_json) {
                Ok(props) => registration = registration.with_props(props),
                Err(e) => {
                    log::warn!("renderer `{name}` props: {e}");
                    return false;
                }
            }
        }
        self.editor.register_renderer(name, registration);
        true
    }

    // ─── Connections and slots ───────────────────────────────────────────

    /// Connect `output` of `source` to `input` of `target`, by slot label
    /// (`"output_1"`, `"input_2"`). Returns true if a new link was created.
    pub fn connect(&mut self, source: &str, output: &str, target: &str, input: &str) -> bool {
        self.editor
            .connect(NodeId::intern(source), output, NodeId::intern(target), input)
            .map(|outcome| outcome.is_created())
            .unwrap_or_else(|e| {
                log::warn!("connect: {e}");
                false
            })
    }

    /// Returns true if a link was removed.
    pub fn disconnect(&mut self, source: &str, output: &str, target: &str, input: &str) -> bool {
        self.editor
            .disconnect(NodeId::intern(source), output, NodeId::intern(target), input)
            .unwrap_or_else(|e| {
                log::warn!("disconnect: {e}");
                false
            })
    }

    /// Append a slot (`"input"` or `"output"`). Returns the new slot's
    /// label, or `""` on failure.
    pub fn add_slot(&mut self, id: &str, direction: &str) -> String {
        let Some(direction) = parse_direction(direction) else {
            return String::new();
        };
        match self.editor.add_slot(NodeId::intern(id), direction) {
            Ok(index) => flow_core::slot_name(direction, index),
            Err(e) => {
                log::warn!("add_slot: {e}");
                String::new()
            }
        }
    }

    /// Remove a slot by label. Later slots are renumbered.
    pub fn remove_slot(&mut self, id: &str, direction: &str, slot: &str) -> bool {
        let Some(direction) = parse_direction(direction) else {
            return false;
        };
        report(
            self.editor
                .remove_slot_named(NodeId::intern(id), direction, slot),
        )
    }

    /// Drop every link on a slot, keeping the slot.
    pub fn remove_slot_connections(&mut self, id: &str, direction: &str, slot: &str) -> bool {
        let Some(direction) = parse_direction(direction) else {
            return false;
        };
        let id = NodeId::intern(id);
        let result = self
            .editor
            .store()
            .slot_index(id, direction, slot)
            .and_then(|index| self.editor.remove_slot_connections(id, direction, index));
        report(result)
    }

    // ─── Modules ─────────────────────────────────────────────────────────

    pub fn add_module(&mut self, name: &str) -> bool {
        report(self.editor.add_module(name))
    }

    pub fn change_module(&mut self, name: &str) -> bool {
        report(self.editor.change_module(name))
    }

    pub fn remove_module(&mut self, name: &str) -> bool {
        report(self.editor.remove_module(name))
    }

    pub fn active_module(&self) -> String {
        self.editor.store().active_module().to_string()
    }

    /// Remove every node of the active module.
    pub fn clear_module(&mut self) {
        self.editor.clear_module();
    }

    /// Start over with a single empty module.
    pub fn clear(&mut self) {
        self.editor.clear();
    }

    // ─── Snapshot ────────────────────────────────────────────────────────

    /// The whole graph, every module, as JSON. `""` on failure.
    pub fn export_json(&mut self) -> String {
        self.editor.export_json().unwrap_or_else(|e| {
            log::warn!("export: {e}");
            String::new()
        })
    }

    /// Replace the graph. Returns JSON `{"ok":true}` or
    /// `{"ok":false,"error":"..."}`; a rejected snapshot leaves the graph
    /// untouched.
    pub fn import_json(&mut self, json: &str) -> String {
        match self.editor.import_json(json) {
            Ok(()) => json!({ "ok": true }).to_string(),
            Err(e) => error_json(e),
        }
    }

    // ─── Viewport, mode, selection ───────────────────────────────────────

    pub fn zoom_in(&mut self) {
        self.editor.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.editor.zoom_out();
    }

    pub fn zoom_reset(&mut self) {
        self.editor.zoom_reset();
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.editor.set_zoom(zoom);
    }

    pub fn set_pan(&mut self, x: f64, y: f64) {
        self.editor.set_pan(x, y);
    }

    /// JSON `{"x":..,"y":..,"zoom":..}`.
    pub fn get_viewport(&self) -> String {
        let viewport = self.editor.viewport();
        json!({ "x": viewport.pan.x, "y": viewport.pan.y, "zoom": viewport.zoom }).to_string()
    }

    /// `"edit"`, `"fixed"` or `"view"`. Returns false for anything else.
    pub fn set_mode(&mut self, mode: &str) -> bool {
        let mode = match mode {
            "edit" => EditorMode::Edit,
            "fixed" => EditorMode::Fixed,
            "view" => EditorMode::View,
            _ => return false,
        };
        self.editor.set_mode(mode);
        true
    }

    /// JSON `{"kind":"node","target":"<id>"}`, a link target object, or
    /// `{"kind":"none"}`.
    pub fn get_selection(&self) -> String {
        serde_json::to_string(&self.editor.selection()).unwrap_or_default()
    }

    pub fn select_node(&mut self, id: &str) -> bool {
        let id = NodeId::intern(id);
        if self.editor.node(id).is_none() {
            return false;
        }
        self.editor.select(Selection::Node(id));
        true
    }

    pub fn clear_selection(&mut self) {
        self.editor.select(Selection::None);
    }

    /// Delete the selected node or link, unless it is protected.
    pub fn delete_selected(&mut self) {
        self.editor.delete_selection();
    }

    /// Name of the current interaction state, e.g. `"DraggingNode"`.
    pub fn get_state(&self) -> String {
        let state = format!("{:?}", self.editor.state());
        state
            .split([' ', '{'])
            .next()
            .unwrap_or_default()
            .to_string()
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// `pointer_type` is the DOM `pointerType`, `button` the DOM `button`.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_down(
        &mut self,
        pointer_id: i32,
        x: f64,
        y: f64,
        pointer_type: &str,
        button: i16,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) {
        let event = pointer_down(
            pointer_id,
            x,
            y,
            pointer_type,
            button,
            Modifiers {
                ctrl,
                shift,
                alt,
                meta,
            },
        );
        self.editor.handle(&event);
    }

    /// A press the host saw land on a text-editing control inside a node.
    pub fn handle_pointer_down_on_control(
        &mut self,
        node_id: &str,
        pointer_id: i32,
        x: f64,
        y: f64,
        pointer_type: &str,
        button: i16,
    ) {
        let event = pointer_down(
            pointer_id,
            x,
            y,
            pointer_type,
            button,
            Modifiers::default(),
        );
        self.editor
            .handle_at(&event, HitTarget::TextControl(NodeId::intern(node_id)));
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_move(
        &mut self,
        pointer_id: i32,
        x: f64,
        y: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) {
        self.editor.handle(&InputEvent::PointerMove {
            pointer_id,
            x,
            y,
            modifiers: Modifiers {
                ctrl,
                shift,
                alt,
                meta,
            },
        });
    }

    pub fn handle_pointer_up(&mut self, pointer_id: i32, x: f64, y: f64) {
        self.editor
            .handle(&InputEvent::PointerUp { pointer_id, x, y });
    }

    pub fn handle_pointer_cancel(&mut self, pointer_id: i32) {
        self.editor
            .handle(&InputEvent::PointerCancel { pointer_id });
    }

    pub fn handle_double_click(&mut self, x: f64, y: f64) {
        self.editor.handle(&InputEvent::DoubleClick { x, y });
    }

    pub fn handle_wheel(&mut self, x: f64, y: f64, delta_y: f64, ctrl: bool) {
        self.editor.handle(&InputEvent::Wheel {
            x,
            y,
            delta_y,
            modifiers: Modifiers {
                ctrl,
                ..Default::default()
            },
        });
    }

    /// Returns true if the editor wants the native menu suppressed, i.e. it
    /// is in edit mode.
    pub fn handle_context_menu(&mut self, x: f64, y: f64) -> bool {
        self.editor.handle(&InputEvent::ContextMenu { x, y });
        self.editor.mode() == EditorMode::Edit
    }

    pub fn handle_key(&mut self, key: &str, ctrl: bool, shift: bool, alt: bool, meta: bool) {
        self.editor.handle(&InputEvent::Key {
            key: key.to_string(),
            modifiers: Modifiers {
                ctrl,
                shift,
                alt,
                meta,
            },
        });
    }

    pub fn handle_blur(&mut self) {
        self.editor.handle(&InputEvent::Blur);
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────

/// One link as handed to the host by [`FlowCanvas::link_paths`].
#[derive(Serialize)]
struct LinkView<'a> {
    #[serde(flatten)]
    key: &'a ConnectionKey,
    paths: Vec<String>,
    waypoints: Vec<Point>,
}

fn waypoints_of(path: &LinkPath) -> Vec<Point> {
    path.segments.iter().skip(1).map(|s| s.start).collect()
}

fn pointer_down(
    pointer_id: i32,
    x: f64,
    y: f64,
    pointer_type: &str,
    button: i16,
    modifiers: Modifiers,
) -> InputEvent {
    let kind = match pointer_type {
        "touch" => PointerKind::Touch,
        "pen" => PointerKind::Pen,
        _ => PointerKind::Mouse,
    };
    let button = match button {
        1 => PointerButton::Middle,
        2 => PointerButton::Secondary,
        _ => PointerButton::Primary,
    };
    InputEvent::PointerDown {
        pointer_id,
        x,
        y,
        kind,
        button,
        modifiers,
    }
}

fn parse_direction(direction: &str) -> Option<SlotDirection> {
    match direction {
        "input" => Some(SlotDirection::Input),
        "output" => Some(SlotDirection::Output),
        other => {
            log::warn!("unknown slot direction `{other}`");
            None
        }
    }
}

fn parse_payload(data_json: &str) -> serde_json::Result<serde_json::Value> {
    if data_json.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(data_json)
}

fn error_json(e: impl std::fmt::Display) -> String {
    json!({ "ok": false, "error": e.to_string() }).to_string()
}

/// Log a failed call and collapse it to a bool for JS.
fn report(result: flow_core::Result<()>) -> bool {
    result
        .inspect_err(|e| log::warn!("{e}"))
        .is_ok()
}

fn console_hooks_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("flow WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
            let _ = console_log::init_with_level(log::Level::Info);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    fn canvas() -> FlowCanvas {
        FlowCanvas::new(r#"{"id_strategy": "counter"}"#)
    }

    fn add(canvas: &mut FlowCanvas, name: &str, x: f64) -> String {
        let reply: Value =
            serde_json::from_str(&canvas.add_node(name, 1, 1, x, 0.0, "", "", "", "")).unwrap();
        assert_eq!(reply["ok"], true);
        reply["id"].as_str().unwrap().to_string()
    }

    #[test]
    fn events_and_commands_drain_as_json() {
        let mut canvas = canvas();
        let a = add(&mut canvas, "a", 0.0);
        let b = add(&mut canvas, "b", 400.0);
        assert!(canvas.connect(&a, "output_1", &b, "input_1"));

        let events: Value = serde_json::from_str(&canvas.drain_events()).unwrap();
        let types: Vec<_> = events
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["type"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            types,
            vec!["nodeCreated", "nodeCreated", "connectionCreated"]
        );
        assert_eq!(events[2]["sourceSlot"], "output_1");
        assert_eq!(canvas.drain_events(), "[]");

        let commands: Value = serde_json::from_str(&canvas.drain_render_commands()).unwrap();
        assert_eq!(commands.as_array().unwrap().last().unwrap()["op"], "updateLink");
    }

    #[test]
    fn pointer_drag_draws_a_link() {
        let mut canvas = canvas();
        let a = add(&mut canvas, "a", 0.0);
        let b = add(&mut canvas, "b", 400.0);

        canvas.handle_pointer_down(1, 160.0, 44.0, "mouse", 0, false, false, false, false);
        assert_eq!(canvas.get_state(), "DraggingLink");
        canvas.handle_pointer_move(1, 300.0, 44.0, false, false, false, false);
        canvas.handle_pointer_up(1, 400.0, 44.0);

        let links: Value = serde_json::from_str(&canvas.link_paths(false)).unwrap();
        assert_eq!(links[0]["sourceNodeId"], a.as_str());
        assert_eq!(links[0]["targetNodeId"], b.as_str());
        assert_eq!(canvas.get_state(), "Idle");
    }

    #[test]
    fn bad_input_is_reported_not_fatal() {
        let mut canvas = canvas();
        let reply: Value =
            serde_json::from_str(&canvas.add_node("x", 0, 0, 0.0, 0.0, "", "{oops", "", ""))
                .unwrap();
        assert_eq!(reply["ok"], false);
        assert!(!canvas.remove_node("missing"));
        assert_eq!(canvas.add_slot("missing", "input"), "");
        assert!(!canvas.set_mode("sideways"));

        let reply: Value = serde_json::from_str(&canvas.import_json("[1, 2]")).unwrap();
        assert_eq!(reply["ok"], false);
    }

    #[test]
    fn slots_and_modules_by_label() {
        let mut canvas = canvas();
        let a = add(&mut canvas, "a", 0.0);
        assert_eq!(canvas.add_slot(&a, "input"), "input_2");
        assert!(canvas.remove_slot(&a, "input", "input_1"));
        assert!(canvas.add_module("Other"));
        assert!(canvas.change_module("Other"));
        assert_eq!(canvas.active_module(), "Other");
        assert_eq!(canvas.module_of(&a), "Home");

        let node: Value = serde_json::from_str(&canvas.get_node(&a)).unwrap();
        assert_eq!(node["inputs"].as_object().unwrap().len(), 1);
    }

    #[test]
    fn config_falls_back_to_defaults() {
        let canvas = FlowCanvas::new("not json");
        let viewport: Value = serde_json::from_str(&canvas.get_viewport()).unwrap();
        assert_eq!(viewport["zoom"], 1.0);
    }
}
