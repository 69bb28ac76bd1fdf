//! Pointer and keyboard interaction state machine.
//!
//! The machine classifies each [`InputEvent`] against the hit target under
//! the pointer and returns [`EditorAction`]s. It never touches the graph:
//! the [`Editor`](crate::Editor) applies the actions, which keeps every
//! transition testable without a renderer.
//!
//! | Press on          | Edit mode             | Fixed mode | View mode |
//! |-------------------|-----------------------|------------|-----------|
//! | background        | deselect, pan         | pan        | pan       |
//! | node body         | select, drag node     | ignored    | pan       |
//! | output slot       | start a link          | ignored    | pan       |
//! | link              | select link           | ignored    | pan       |
//! | waypoint          | drag waypoint         | ignored    | pan       |

use crate::config::{EditorConfig, EditorMode};
use crate::input::{InputEvent, Modifiers, PinchStep, PinchTracker, PointerButton};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use flow_core::{ConnectionKey, Module, NodeId, Point, SlotDirection, Viewport};
use flow_render::HitTarget;
use serde::Serialize;

/// At most one node or one link is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "camelCase")]
pub enum Selection {
    #[default]
    None,
    Node(NodeId),
    Link(ConnectionKey),
}

impl Selection {
    pub fn node(&self) -> Option<NodeId> {
        match *self {
            Self::Node(id) => Some(id),
            _ => None,
        }
    }

    pub fn link(&self) -> Option<ConnectionKey> {
        match *self {
            Self::Link(key) => Some(key),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        *self == Self::None
    }
}

/// What the primary pointer is doing. Points are in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    DraggingNode {
        id: NodeId,
        start: Point,
        last: Point,
    },
    DraggingLink {
        node: NodeId,
        slot: usize,
    },
    DraggingReroutePoint {
        key: ConnectionKey,
        index: usize,
        start: Point,
    },
    /// Each move adds its delta to the viewport's current pan, so a zoom
    /// in mid-gesture keeps its rescaled pan.
    PanningCanvas {
        last: Point,
    },
}

impl InteractionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Whether the node, slot or waypoint being dragged still exists.
    pub fn is_live_in(&self, module: &Module) -> bool {
        match *self {
            Self::Idle | Self::PanningCanvas { .. } => true,
            Self::DraggingNode { id, .. } => module.nodes.contains_key(&id),
            Self::DraggingLink { node, slot } => module
                .nodes
                .get(&node)
                .is_some_and(|n| slot < n.outputs.len()),
            Self::DraggingReroutePoint { key, index, .. } => module
                .nodes
                .get(&key.source)
                .and_then(|n| n.slot(SlotDirection::Output, key.source_slot))
                .and_then(|slot| {
                    slot.find(key.target, key.target_slot)
                        .map(|i| index < slot.connections[i].waypoints.len())
                })
                .unwrap_or(false),
        }
    }
}

/// A change the editor should make in response to input.
///
/// Positions named `to`/`at` are graph space; pointer notifications carry
/// screen coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorAction {
    Select(Selection),
    /// Move a node by a graph-space offset.
    TranslateNode { id: NodeId, dx: f64, dy: f64 },
    /// A node drag ended away from where it started.
    NodeMoved(NodeId),

    StartLink { node: NodeId, slot: usize },
    UpdateTransientLink { node: NodeId, slot: usize, to: Point },
    CommitLink(ConnectionKey),
    CancelLink { node: NodeId, slot: usize },

    MoveWaypoint { key: ConnectionKey, index: usize, to: Point },
    WaypointMoved { key: ConnectionKey, index: usize },
    InsertWaypoint { key: ConnectionKey, at: Point },
    RemoveWaypoint { key: ConnectionKey, index: usize },

    SetPan(Point),
    ZoomIn,
    ZoomOut,
    ZoomReset,

    DeleteSelection,
    /// Offer the delete affordance near the pointer (graph space).
    ShowDeleteButton { pointer: Point },
    HideDeleteButton,

    PointerMoved(Point),
    Clicked(Point),
    ContextMenu(Point),
}

/// What the machine may read while classifying an event.
pub struct MachineContext<'a> {
    pub module: &'a Module,
    pub viewport: &'a Viewport,
    pub config: &'a EditorConfig,
    pub selection: Selection,
}

impl MachineContext<'_> {
    fn prevent_remove(&self, id: NodeId) -> bool {
        self.module.nodes.get(&id).is_some_and(|n| n.prevent_remove)
    }
}

#[derive(Debug, Default)]
pub struct InteractionMachine {
    state: InteractionState,
    /// Pointer driving the current gesture.
    primary: Option<i32>,
    press_at: Point,
    /// The last primary press landed on a text control.
    pressed_text_control: bool,
    pinch: PinchTracker,
}

impl InteractionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn is_pinching(&self) -> bool {
        self.pinch.is_pinching()
    }

    /// Handle an input event, returning zero or more actions.
    pub fn handle(
        &mut self,
        event: &InputEvent,
        hit: HitTarget,
        ctx: &MachineContext<'_>,
    ) -> Vec<EditorAction> {
        match event {
            InputEvent::PointerDown {
                pointer_id,
                x,
                y,
                button,
                ..
            } => self.pointer_down(*pointer_id, Point::new(*x, *y), *button, hit, ctx),
            InputEvent::PointerMove {
                pointer_id, x, y, ..
            } => self.pointer_move(*pointer_id, Point::new(*x, *y), ctx),
            InputEvent::PointerUp { pointer_id, x, y } => {
                self.pointer_up(*pointer_id, Point::new(*x, *y), hit, ctx)
            }
            InputEvent::PointerCancel { pointer_id } => {
                self.pinch.up(*pointer_id);
                if self.primary == Some(*pointer_id) {
                    self.reset()
                } else {
                    Vec::new()
                }
            }
            InputEvent::Blur => {
                self.pinch.reset();
                self.reset()
            }
            InputEvent::DoubleClick { x, y } => Self::double_click(Point::new(*x, *y), hit, ctx),
            InputEvent::Wheel {
                delta_y, modifiers, ..
            } => Self::wheel(*delta_y, modifiers),
            InputEvent::ContextMenu { x, y } => Self::context_menu(Point::new(*x, *y), ctx),
            InputEvent::Key { key, modifiers } => self.key(key, modifiers, ctx),
        }
    }

    /// Abandon any gesture in progress and return to `Idle`.
    ///
    /// A half-drawn link is cancelled; everything else has already been
    /// applied move by move, so there is nothing to roll back.
    pub fn reset(&mut self) -> Vec<EditorAction> {
        self.primary = None;
        let state = std::mem::take(&mut self.state);
        if !state.is_idle() {
            log::debug!("abandon {state:?}");
        }
        match state {
            InteractionState::DraggingLink { node, slot } => {
                vec![EditorAction::CancelLink { node, slot }]
            }
            _ => Vec::new(),
        }
    }

    fn begin(&mut self, state: InteractionState) {
        log::debug!("interaction: {state:?}");
        self.state = state;
    }

    // ─── Pointer ─────────────────────────────────────────────────────────

    fn pointer_down(
        &mut self,
        pointer_id: i32,
        p: Point,
        button: PointerButton,
        hit: HitTarget,
        ctx: &MachineContext<'_>,
    ) -> Vec<EditorAction> {
        self.pinch.down(pointer_id, p.x);
        if self.pinch.is_pinching() {
            // A second finger turns the gesture into a pinch.
            return self.reset();
        }
        if !self.state.is_idle() {
            return Vec::new();
        }
        self.primary = Some(pointer_id);
        self.press_at = p;

        let pan = InteractionState::PanningCanvas { last: p };
        match ctx.config.mode {
            EditorMode::Fixed => {
                if hit == HitTarget::Canvas {
                    self.begin(pan);
                }
                return Vec::new();
            }
            EditorMode::View => {
                if hit != HitTarget::DeleteButton {
                    self.begin(pan);
                }
                return Vec::new();
            }
            EditorMode::Edit => {}
        }

        if button != PointerButton::Primary {
            // Select only, so a following context menu acts on the target.
            return match hit {
                HitTarget::Node(id) | HitTarget::TextControl(id) => {
                    vec![EditorAction::Select(Selection::Node(id))]
                }
                HitTarget::Link { key, .. } => vec![EditorAction::Select(Selection::Link(key))],
                HitTarget::Canvas => vec![EditorAction::Select(Selection::None)],
                _ => Vec::new(),
            };
        }

        let mut actions = Vec::new();
        if hit != HitTarget::DeleteButton {
            actions.push(EditorAction::HideDeleteButton);
        }
        self.pressed_text_control = matches!(hit, HitTarget::TextControl(_));

        match hit {
            HitTarget::DeleteButton => {
                actions.push(EditorAction::DeleteSelection);
                actions.push(EditorAction::HideDeleteButton);
            }
            HitTarget::Node(id) | HitTarget::TextControl(id) => {
                actions.push(EditorAction::Select(Selection::Node(id)));
                let draggable = ctx.config.draggable_inputs || !self.pressed_text_control;
                if !ctx.config.block_position && draggable {
                    self.begin(InteractionState::DraggingNode {
                        id,
                        start: p,
                        last: p,
                    });
                }
            }
            HitTarget::OutputSlot { node, index } => {
                actions.push(EditorAction::Select(Selection::None));
                actions.push(EditorAction::StartLink { node, slot: index });
                self.begin(InteractionState::DraggingLink { node, slot: index });
            }
            HitTarget::InputSlot { .. } => {}
            HitTarget::Canvas => {
                actions.push(EditorAction::Select(Selection::None));
                self.begin(pan);
            }
            HitTarget::Link { key, .. } => {
                actions.push(EditorAction::Select(Selection::Link(key)));
            }
            HitTarget::Waypoint { key, index } => {
                self.begin(InteractionState::DraggingReroutePoint {
                    key,
                    index,
                    start: p,
                });
            }
        }
        actions
    }

    fn pointer_move(
        &mut self,
        pointer_id: i32,
        p: Point,
        ctx: &MachineContext<'_>,
    ) -> Vec<EditorAction> {
        let mut actions = vec![EditorAction::PointerMoved(p)];
        match self.pinch.update(pointer_id, p.x) {
            Some(PinchStep::ZoomIn) => actions.push(EditorAction::ZoomIn),
            Some(PinchStep::ZoomOut) => actions.push(EditorAction::ZoomOut),
            None => {}
        }
        if self.primary != Some(pointer_id) {
            return actions;
        }

        match &mut self.state {
            InteractionState::Idle => {}
            InteractionState::DraggingNode { id, last, .. } => {
                let dx = ctx.viewport.scale_to_graph(p.x - last.x);
                let dy = ctx.viewport.scale_to_graph(p.y - last.y);
                *last = p;
                if dx != 0.0 || dy != 0.0 {
                    actions.push(EditorAction::TranslateNode { id: *id, dx, dy });
                }
            }
            InteractionState::DraggingLink { node, slot } => {
                actions.push(EditorAction::UpdateTransientLink {
                    node: *node,
                    slot: *slot,
                    to: ctx.viewport.to_graph(p),
                });
            }
            InteractionState::DraggingReroutePoint { key, index, .. } => {
                actions.push(EditorAction::MoveWaypoint {
                    key: *key,
                    index: *index,
                    to: ctx.viewport.to_graph(p),
                });
            }
            InteractionState::PanningCanvas { last } => {
                let pan = ctx.viewport.pan;
                if p != *last {
                    actions.push(EditorAction::SetPan(Point::new(
                        pan.x + (p.x - last.x),
                        pan.y + (p.y - last.y),
                    )));
                }
                *last = p;
            }
        }
        actions
    }

    fn pointer_up(
        &mut self,
        pointer_id: i32,
        p: Point,
        hit: HitTarget,
        ctx: &MachineContext<'_>,
    ) -> Vec<EditorAction> {
        self.pinch.up(pointer_id);
        if self.primary != Some(pointer_id) {
            return Vec::new();
        }
        self.primary = None;

        let mut actions = Vec::new();
        match std::mem::take(&mut self.state) {
            InteractionState::DraggingNode { id, start, .. } if start != p => {
                actions.push(EditorAction::NodeMoved(id));
            }
            InteractionState::DraggingReroutePoint { key, index, start } if start != p => {
                actions.push(EditorAction::WaypointMoved { key, index });
            }
            InteractionState::DraggingLink { node, slot } => {
                actions.push(Self::drop_link(node, slot, hit, ctx));
            }
            _ => {}
        }
        if p == self.press_at {
            actions.push(EditorAction::Clicked(p));
        }
        actions
    }

    /// Decide what releasing a link drag over `hit` means.
    fn drop_link(
        node: NodeId,
        slot: usize,
        hit: HitTarget,
        ctx: &MachineContext<'_>,
    ) -> EditorAction {
        let input = match hit {
            HitTarget::InputSlot { node, index } => Some((node, index)),
            HitTarget::Node(target) | HitTarget::TextControl(target)
                if ctx.config.force_first_input =>
            {
                ctx.module
                    .nodes
                    .get(&target)
                    .filter(|n| !n.inputs.is_empty())
                    .map(|_| (target, 0))
            }
            _ => None,
        };
        match input {
            Some((target, index)) if target != node => {
                EditorAction::CommitLink(ConnectionKey::new(node, slot, target, index))
            }
            _ => EditorAction::CancelLink { node, slot },
        }
    }

    // ─── Other gestures ──────────────────────────────────────────────────

    fn double_click(
        p: Point,
        hit: HitTarget,
        ctx: &MachineContext<'_>,
    ) -> Vec<EditorAction> {
        if !ctx.config.mode.can_edit() {
            return Vec::new();
        }
        if let HitTarget::Waypoint { key, index } = hit {
            return vec![EditorAction::RemoveWaypoint { key, index }];
        }
        match ctx.selection {
            Selection::Link(key) if ctx.config.reroute => vec![
                EditorAction::InsertWaypoint {
                    key,
                    at: ctx.viewport.to_graph(p),
                },
                EditorAction::Select(Selection::None),
            ],
            _ => Vec::new(),
        }
    }

    fn wheel(delta_y: f64, modifiers: &Modifiers) -> Vec<EditorAction> {
        if !modifiers.ctrl {
            return Vec::new();
        }
        if delta_y > 0.0 {
            vec![EditorAction::ZoomOut]
        } else {
            vec![EditorAction::ZoomIn]
        }
    }

    fn context_menu(p: Point, ctx: &MachineContext<'_>) -> Vec<EditorAction> {
        if !ctx.config.mode.can_edit() {
            return Vec::new();
        }
        let mut actions = vec![EditorAction::HideDeleteButton];
        let offer = match ctx.selection {
            Selection::None => false,
            Selection::Node(id) => !ctx.prevent_remove(id),
            Selection::Link(_) => true,
        };
        if offer {
            actions.push(EditorAction::ContextMenu(p));
            actions.push(EditorAction::ShowDeleteButton {
                pointer: ctx.viewport.to_graph(p),
            });
        }
        actions
    }

    fn key(&self, key: &str, m: &Modifiers, ctx: &MachineContext<'_>) -> Vec<EditorAction> {
        if !ctx.config.mode.can_edit() {
            return Vec::new();
        }
        let Some(action) = ShortcutMap::resolve(key, m.ctrl, m.shift, m.alt, m.meta) else {
            return Vec::new();
        };
        match action {
            ShortcutAction::Delete => {
                let allowed = match ctx.selection {
                    Selection::None => false,
                    Selection::Node(id) => !ctx.prevent_remove(id) && !self.pressed_text_control,
                    Selection::Link(_) => true,
                };
                if allowed {
                    vec![EditorAction::DeleteSelection, EditorAction::HideDeleteButton]
                } else {
                    Vec::new()
                }
            }
            ShortcutAction::ZoomIn => vec![EditorAction::ZoomIn],
            ShortcutAction::ZoomOut => vec![EditorAction::ZoomOut],
            ShortcutAction::ZoomReset => vec![EditorAction::ZoomReset],
            ShortcutAction::Deselect => vec![
                EditorAction::Select(Selection::None),
                EditorAction::HideDeleteButton,
            ],
        }
    }
}
