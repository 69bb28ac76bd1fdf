//! Registry of external node renderers.
//!
//! The store only needs to know that a name was registered; the template and
//! its props/options are opaque and handed back to the render adapter.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RendererRegistration {
    pub template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}

impl RendererRegistration {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            props: None,
            options: None,
        }
    }

    pub fn with_props(mut self, props: serde_json::Value) -> Self {
        self.props = Some(props);
        self
    }

    pub fn with_options(mut self, options: serde_json::Value) -> Self {
        self.options = Some(options);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct RendererRegistry {
    entries: HashMap<String, RendererRegistration>,
}

impl RendererRegistry {
    /// Register (or replace) a renderer under `name`.
    pub fn register(&mut self, name: impl Into<String>, registration: RendererRegistration) {
        let name = name.into();
        log::debug!("register renderer `{name}`");
        self.entries.insert(name, registration);
    }

    pub fn get(&self, name: &str) -> Option<&RendererRegistration> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}
