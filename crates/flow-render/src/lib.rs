pub mod adapter;
pub mod hit;
pub mod layout;
pub mod paths;

pub use adapter::{NullAdapter, RecordingAdapter, RenderAdapter, RenderCommand, mount_module};
pub use hit::{HitScene, HitTarget, hit_test};
pub use layout::{BoxLayout, NodeLayout};
pub use paths::{LinkPaths, link_path, to_screen};
