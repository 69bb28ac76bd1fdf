pub mod bus;
pub mod config;
pub mod editor;
pub mod input;
pub mod interaction;
pub mod shortcuts;

pub use bus::{Listener, ListenerId};
pub use config::{EditorConfig, EditorMode};
pub use editor::Editor;
pub use input::{InputEvent, Modifiers, PinchStep, PinchTracker, PointerButton, PointerKind};
pub use interaction::{EditorAction, InteractionMachine, InteractionState, Selection};
pub use shortcuts::{ShortcutAction, ShortcutMap};
