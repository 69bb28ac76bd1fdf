//! Input abstraction layer.
//!
//! Normalizes mouse, touch, and pen events into a unified `InputEvent`
//! stream in screen coordinates. Touch sequences arrive as pointer events
//! with their own `pointer_id`, which is what pinch tracking keys on.

use smallvec::SmallVec;

/// Modifier keys held during an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, ⌘ on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PointerKind {
    #[default]
    Mouse,
    Touch,
    Pen,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PointerButton {
    /// Left mouse button, touch contact, pen tip.
    #[default]
    Primary,
    Middle,
    /// Right mouse button.
    Secondary,
}

/// A normalized input event from any pointing device or the keyboard.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed (mouse down, touch start, pen contact).
    PointerDown {
        pointer_id: i32,
        x: f64,
        y: f64,
        kind: PointerKind,
        button: PointerButton,
        modifiers: Modifiers,
    },

    /// Pointer moved, pressed or not.
    PointerMove {
        pointer_id: i32,
        x: f64,
        y: f64,
        modifiers: Modifiers,
    },

    /// Pointer released.
    PointerUp { pointer_id: i32, x: f64, y: f64 },

    /// The platform took the pointer away (touch cancel, lost capture).
    PointerCancel { pointer_id: i32 },

    DoubleClick { x: f64, y: f64 },

    /// Wheel or trackpad scroll. Zooms only with ctrl held.
    Wheel {
        x: f64,
        y: f64,
        delta_y: f64,
        modifiers: Modifiers,
    },

    /// Secondary-click / long-press menu request.
    ContextMenu { x: f64, y: f64 },

    /// Key press. `key` is the `KeyboardEvent.key` value.
    Key { key: String, modifiers: Modifiers },

    /// The editor lost focus. Any gesture in progress is abandoned.
    Blur,
}

impl InputEvent {
    /// A primary-button mouse press with no modifiers.
    pub fn press(x: f64, y: f64) -> Self {
        Self::PointerDown {
            pointer_id: 1,
            x,
            y,
            kind: PointerKind::Mouse,
            button: PointerButton::Primary,
            modifiers: Modifiers::default(),
        }
    }

    pub fn drag_to(x: f64, y: f64) -> Self {
        Self::PointerMove {
            pointer_id: 1,
            x,
            y,
            modifiers: Modifiers::default(),
        }
    }

    pub fn release(x: f64, y: f64) -> Self {
        Self::PointerUp {
            pointer_id: 1,
            x,
            y,
        }
    }

    pub fn key(key: impl Into<String>) -> Self {
        Self::Key {
            key: key.into(),
            modifiers: Modifiers::default(),
        }
    }

    /// Screen position, if the event has one.
    pub fn position(&self) -> Option<(f64, f64)> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y, .. }
            | Self::DoubleClick { x, y }
            | Self::Wheel { x, y, .. }
            | Self::ContextMenu { x, y } => Some((*x, *y)),
            Self::PointerCancel { .. } | Self::Key { .. } | Self::Blur => None,
        }
    }
}

// ─── Pinch ───────────────────────────────────────────────────────────────

/// Horizontal distance the two pointers must exceed before pinching zooms.
pub const PINCH_THRESHOLD: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinchStep {
    ZoomIn,
    ZoomOut,
}

/// Tracks pressed pointers and turns a two-finger spread into zoom steps.
///
/// Only the horizontal distance between the two pointers is measured. Each
/// move that widens it past [`PINCH_THRESHOLD`] zooms in one step, each move
/// that narrows it zooms out one step.
#[derive(Debug, Clone)]
pub struct PinchTracker {
    pointers: SmallVec<[(i32, f64); 2]>,
    previous: f64,
}

impl Default for PinchTracker {
    fn default() -> Self {
        Self {
            pointers: SmallVec::new(),
            previous: -1.0,
        }
    }
}

impl PinchTracker {
    pub fn down(&mut self, pointer_id: i32, x: f64) {
        if let Some(entry) = self.pointers.iter_mut().find(|(id, _)| *id == pointer_id) {
            entry.1 = x;
        } else {
            self.pointers.push((pointer_id, x));
        }
    }

    pub fn update(&mut self, pointer_id: i32, x: f64) -> Option<PinchStep> {
        let entry = self.pointers.iter_mut().find(|(id, _)| *id == pointer_id)?;
        entry.1 = x;

        if self.pointers.len() != 2 {
            return None;
        }
        let current = (self.pointers[0].1 - self.pointers[1].1).abs();
        let step = if self.previous > PINCH_THRESHOLD {
            if current > self.previous {
                Some(PinchStep::ZoomIn)
            } else if current < self.previous {
                Some(PinchStep::ZoomOut)
            } else {
                None
            }
        } else {
            None
        };
        self.previous = current;
        step
    }

    pub fn up(&mut self, pointer_id: i32) {
        if let Some(i) = self.pointers.iter().position(|(id, _)| *id == pointer_id) {
            self.pointers.remove(i);
        }
        if self.pointers.len() < 2 {
            self.previous = -1.0;
        }
    }

    /// Number of pointers currently pressed.
    pub fn active(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_pinching(&self) -> bool {
        self.pointers.len() >= 2
    }

    pub fn reset(&mut self) {
        self.pointers.clear();
        self.previous = -1.0;
    }
}
