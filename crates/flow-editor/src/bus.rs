//! Typed pub-sub over [`FlowEvent`]s.
//!
//! Listeners receive the editor mutably and may call back into it. Delivery
//! is driven by [`Editor::flush`](crate::Editor): while a listener runs, its
//! own listener list is detached from the bus, so registrations and removals
//! made from inside a listener are recorded and applied before the next
//! event is delivered.

use crate::editor::Editor;
use flow_core::{EventKind, FlowEvent};

pub type Listener = Box<dyn FnMut(&mut Editor, &FlowEvent)>;

/// Handle returned by [`EventBus::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Entry {
    id: ListenerId,
    /// `None` listens to every kind.
    kind: Option<EventKind>,
    listener: Listener,
}

#[derive(Default)]
pub struct EventBus {
    next: u64,
    entries: Vec<Entry>,
    /// Removals requested while the entries were detached.
    removed: Vec<ListenerId>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.entries.len())
            .finish()
    }
}

impl EventBus {
    pub fn on(&mut self, kind: EventKind, listener: Listener) -> ListenerId {
        self.insert(Some(kind), listener)
    }

    pub fn on_any(&mut self, listener: Listener) -> ListenerId {
        self.insert(None, listener)
    }

    fn insert(&mut self, kind: Option<EventKind>, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next);
        self.next += 1;
        self.entries.push(Entry { id, kind, listener });
        id
    }

    /// Unsubscribe. Takes effect before the next event is delivered, even
    /// when called from inside a listener.
    pub fn remove(&mut self, id: ListenerId) {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        if self.entries.len() == before {
            self.removed.push(id);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn detach(&mut self) -> Vec<Entry> {
        std::mem::take(&mut self.entries)
    }

    /// Put detached entries back in front of any added meanwhile, dropping
    /// the ones removed meanwhile.
    fn reattach(&mut self, mut detached: Vec<Entry>) {
        let removed = std::mem::take(&mut self.removed);
        detached.retain(|e| !removed.contains(&e.id));
        detached.append(&mut self.entries);
        self.entries = detached;
    }

    fn is_removed(&self, id: ListenerId) -> bool {
        self.removed.contains(&id)
    }
}

/// Deliver one event to every matching listener, in registration order.
pub(crate) fn dispatch(editor: &mut Editor, event: &FlowEvent) {
    let kind = event.kind();
    let mut entries = editor.bus_mut().detach();
    for entry in &mut entries {
        if entry.kind.is_some_and(|k| k != kind) || editor.bus_mut().is_removed(entry.id) {
            continue;
        }
        (entry.listener)(editor, event);
    }
    editor.bus_mut().reattach(entries);
}
