//! Cache of rendered link paths for the active module.
//!
//! Dragging a node only invalidates the links incident on it, so a pointer
//! move costs O(incident links) regardless of graph size.

use crate::layout::NodeLayout;
use flow_core::{
    ConnectionKey, CurveSettings, LinkPath, Module, NodeId, Point, SlotDirection, Viewport,
    stitch_link,
};
use indexmap::IndexMap;

/// Compute the path of one link in graph space. `None` if either endpoint
/// or the edge itself is missing from `module`.
pub fn link_path(
    module: &Module,
    layout: &dyn NodeLayout,
    key: ConnectionKey,
    settings: &CurveSettings,
) -> Option<LinkPath> {
    let source = module.nodes.get(&key.source)?;
    let target = module.nodes.get(&key.target)?;
    let slot = source.outputs.get(key.source_slot)?;
    let record = &slot.connections[slot.find(key.target, key.target_slot)?];

    let start = layout.slot_anchor(source, SlotDirection::Output, key.source_slot);
    let end = layout.slot_anchor(target, SlotDirection::Input, key.target_slot);
    Some(stitch_link(start, &record.waypoints, end, settings))
}

/// Map a graph-space path into screen space.
///
/// Control-point offsets scale linearly with `|dx|`, so transforming the
/// finished curve gives the same result as building it from transformed
/// endpoints.
pub fn to_screen(path: &LinkPath, viewport: &Viewport) -> LinkPath {
    let map = |p: Point| viewport.to_screen(p);
    LinkPath {
        segments: path
            .segments
            .iter()
            .map(|s| flow_core::CubicSegment {
                start: map(s.start),
                c1: map(s.c1),
                c2: map(s.c2),
                end: map(s.end),
            })
            .collect(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct LinkPaths {
    paths: IndexMap<ConnectionKey, LinkPath>,
    settings: CurveSettings,
}

impl LinkPaths {
    pub fn new(settings: CurveSettings) -> Self {
        Self {
            paths: IndexMap::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &CurveSettings {
        &self.settings
    }

    pub fn get(&self, key: &ConnectionKey) -> Option<&LinkPath> {
        self.paths.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConnectionKey, &LinkPath)> {
        self.paths.iter()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Recompute every link in `module`. Used after import or a module switch.
    pub fn rebuild(&mut self, module: &Module, layout: &dyn NodeLayout) {
        self.paths.clear();
        for node in module.nodes.values() {
            for key in node.outgoing() {
                if let Some(path) = link_path(module, layout, key, &self.settings) {
                    self.paths.insert(key, path);
                }
            }
        }
        log::debug!("rebuilt {} link paths", self.paths.len());
    }

    /// Recompute the links incident on `id`, returning the keys touched.
    pub fn refresh_node(
        &mut self,
        module: &Module,
        layout: &dyn NodeLayout,
        id: NodeId,
    ) -> Vec<ConnectionKey> {
        let Some(node) = module.nodes.get(&id) else {
            return Vec::new();
        };
        let keys = node.incident();
        for key in &keys {
            self.refresh_link(module, layout, *key);
        }
        log::trace!("refreshed {} links of {id:?}", keys.len());
        keys
    }

    /// Recompute one link; drops it from the cache if it no longer exists.
    pub fn refresh_link(&mut self, module: &Module, layout: &dyn NodeLayout, key: ConnectionKey) {
        match link_path(module, layout, key, &self.settings) {
            Some(path) => {
                self.paths.insert(key, path);
            }
            None => {
                self.paths.shift_remove(&key);
            }
        }
    }

    pub fn remove(&mut self, key: &ConnectionKey) -> Option<LinkPath> {
        self.paths.shift_remove(key)
    }

    /// Drop every cached link touching `id`.
    pub fn remove_node(&mut self, id: NodeId) -> Vec<ConnectionKey> {
        let keys: Vec<_> = self.paths.keys().filter(|k| k.touches(id)).copied().collect();
        for key in &keys {
            self.paths.shift_remove(key);
        }
        keys
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }
}
