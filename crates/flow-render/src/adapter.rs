//! Contract between the editor and whatever draws it.
//!
//! The editor never draws. It tells a [`RenderAdapter`] what changed: node
//! mounted/moved/unmounted, link geometry updated, selection and viewport.
//! Node bodies are opaque to the editor; the adapter receives the node's
//! render descriptor and, for registered renderers, their registration.

use crate::paths::LinkPaths;
use flow_core::{
    ConnectionKey, LinkPath, Module, Node, NodeId, PathMode, Point, RenderDescriptor,
    RendererRegistration, RendererRegistry, Viewport,
};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

pub trait RenderAdapter {
    fn mount_node(&mut self, node: &Node, registration: Option<&RendererRegistration>);
    fn move_node(&mut self, id: NodeId, position: Point);
    fn unmount_node(&mut self, id: NodeId);

    /// Draw (or redraw) a committed link from graph-space geometry.
    fn update_link(
        &mut self,
        key: ConnectionKey,
        path: &LinkPath,
        mode: PathMode,
        style: Option<&str>,
    );
    fn remove_link(&mut self, key: ConnectionKey);

    /// The uncommitted link following the pointer; `None` removes it.
    fn transient_link(&mut self, path: Option<&LinkPath>);

    fn set_selection(&mut self, node: Option<NodeId>, link: Option<ConnectionKey>);
    fn show_delete_button(&mut self, at: Option<Point>);
    fn set_viewport(&mut self, viewport: &Viewport);

    /// Remove everything drawn so far.
    fn clear(&mut self);
}

/// Redraw a whole module from scratch: after import or a module switch.
pub fn mount_module(
    adapter: &mut dyn RenderAdapter,
    module: &Module,
    registry: &RendererRegistry,
    paths: &LinkPaths,
    mode: PathMode,
) {
    adapter.clear();
    for node in module.nodes.values() {
        let registration = match &node.render {
            RenderDescriptor::Inline(_) => None,
            RenderDescriptor::Registered(name) | RenderDescriptor::Component(name) => {
                registry.get(name)
            }
        };
        adapter.mount_node(node, registration);
    }
    for (key, path) in paths.iter() {
        let style = module
            .nodes
            .get(&key.source)
            .and_then(|n| n.outputs.get(key.source_slot))
            .and_then(|s| s.find(key.target, key.target_slot).map(|i| &s.connections[i]))
            .and_then(|c| c.style.as_deref());
        adapter.update_link(*key, path, mode, style);
    }
}

// ─── Adapters ────────────────────────────────────────────────────────────

/// Ignores everything. For headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAdapter;

impl RenderAdapter for NullAdapter {
    fn mount_node(&mut self, _: &Node, _: Option<&RendererRegistration>) {}
    fn move_node(&mut self, _: NodeId, _: Point) {}
    fn unmount_node(&mut self, _: NodeId) {}
    fn update_link(&mut self, _: ConnectionKey, _: &LinkPath, _: PathMode, _: Option<&str>) {}
    fn remove_link(&mut self, _: ConnectionKey) {}
    fn transient_link(&mut self, _: Option<&LinkPath>) {}
    fn set_selection(&mut self, _: Option<NodeId>, _: Option<ConnectionKey>) {}
    fn show_delete_button(&mut self, _: Option<Point>) {}
    fn set_viewport(&mut self, _: &Viewport) {}
    fn clear(&mut self) {}
}

/// Lets a host keep a handle on an adapter it gave to the editor.
impl<A: RenderAdapter> RenderAdapter for Rc<RefCell<A>> {
    fn mount_node(&mut self, node: &Node, registration: Option<&RendererRegistration>) {
        self.borrow_mut().mount_node(node, registration);
    }
    fn move_node(&mut self, id: NodeId, position: Point) {
        self.borrow_mut().move_node(id, position);
    }
    fn unmount_node(&mut self, id: NodeId) {
        self.borrow_mut().unmount_node(id);
    }
    fn update_link(
        &mut self,
        key: ConnectionKey,
        path: &LinkPath,
        mode: PathMode,
        style: Option<&str>,
    ) {
        self.borrow_mut().update_link(key, path, mode, style);
    }
    fn remove_link(&mut self, key: ConnectionKey) {
        self.borrow_mut().remove_link(key);
    }
    fn transient_link(&mut self, path: Option<&LinkPath>) {
        self.borrow_mut().transient_link(path);
    }
    fn set_selection(&mut self, node: Option<NodeId>, link: Option<ConnectionKey>) {
        self.borrow_mut().set_selection(node, link);
    }
    fn show_delete_button(&mut self, at: Option<Point>) {
        self.borrow_mut().show_delete_button(at);
    }
    fn set_viewport(&mut self, viewport: &Viewport) {
        self.borrow_mut().set_viewport(viewport);
    }
    fn clear(&mut self) {
        self.borrow_mut().clear();
    }
}

/// One drawing instruction, as recorded by [`RecordingAdapter`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum RenderCommand {
    MountNode {
        id: NodeId,
        name: String,
        x: f64,
        y: f64,
        template: String,
        class_names: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        props: Option<serde_json::Value>,
    },
    MoveNode {
        id: NodeId,
        x: f64,
        y: f64,
    },
    UnmountNode {
        id: NodeId,
    },
    UpdateLink {
        #[serde(flatten)]
        key: ConnectionKey,
        paths: Vec<String>,
        waypoints: Vec<Point>,
        #[serde(skip_serializing_if = "Option::is_none")]
        style: Option<String>,
    },
    RemoveLink {
        #[serde(flatten)]
        key: ConnectionKey,
    },
    TransientLink {
        path: Option<String>,
    },
    Selection {
        node: Option<NodeId>,
        link: Option<ConnectionKey>,
    },
    DeleteButton {
        at: Option<Point>,
    },
    Viewport {
        x: f64,
        y: f64,
        zoom: f64,
    },
    Clear,
}

/// Records commands so a host can replay them, e.g. across a JS bridge.
#[derive(Debug, Default, Clone)]
pub struct RecordingAdapter {
    commands: Vec<RenderCommand>,
}

impl RecordingAdapter {
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    pub fn drain(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl RenderAdapter for RecordingAdapter {
    fn mount_node(&mut self, node: &Node, registration: Option<&RendererRegistration>) {
        let template = registration
            .map(|r| r.template.clone())
            .unwrap_or_else(|| node.render.template().to_string());
        self.commands.push(RenderCommand::MountNode {
            id: node.id,
            name: node.name.clone(),
            x: node.position.x,
            y: node.position.y,
            template,
            class_names: node.class_names.clone(),
            props: registration.and_then(|r| r.props.clone()),
        });
    }

    fn move_node(&mut self, id: NodeId, position: Point) {
        self.commands.push(RenderCommand::MoveNode {
            id,
            x: position.x,
            y: position.y,
        });
    }

    fn unmount_node(&mut self, id: NodeId) {
        self.commands.push(RenderCommand::UnmountNode { id });
    }

    fn update_link(
        &mut self,
        key: ConnectionKey,
        path: &LinkPath,
        mode: PathMode,
        style: Option<&str>,
    ) {
        let waypoints = path
            .segments
            .iter()
            .skip(1)
            .map(|s| s.start)
            .collect();
        self.commands.push(RenderCommand::UpdateLink {
            key,
            paths: path.path_data(mode),
            waypoints,
            style: style.map(str::to_string),
        });
    }

    fn remove_link(&mut self, key: ConnectionKey) {
        self.commands.push(RenderCommand::RemoveLink { key });
    }

    fn transient_link(&mut self, path: Option<&LinkPath>) {
        self.commands.push(RenderCommand::TransientLink {
            path: path.map(|p| p.path_data(PathMode::Combined).join(" ")),
        });
    }

    fn set_selection(&mut self, node: Option<NodeId>, link: Option<ConnectionKey>) {
        self.commands.push(RenderCommand::Selection { node, link });
    }

    fn show_delete_button(&mut self, at: Option<Point>) {
        self.commands.push(RenderCommand::DeleteButton { at });
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        self.commands.push(RenderCommand::Viewport {
            x: viewport.pan.x,
            y: viewport.pan.y,
            zoom: viewport.zoom,
        });
    }

    fn clear(&mut self) {
        self.commands.push(RenderCommand::Clear);
    }
}
