//! Model registry with public lookup API.

use crate::Model;

/// Base URL of the generative-language REST API
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when nothing else is configured
pub const DEFAULT_MODEL_ID: &str = "gemini-1.5-flash";

struct ModelEntry {
    id: &'static str,
    name: &'static str,
    context_window: u32,
    max_tokens: u32,
}

const MODEL_ENTRIES: &[ModelEntry] = &[
    ModelEntry {
        id: "gemini-1.5-flash",
        name: "Gemini 1.5 Flash",
        context_window: 1_048_576,
        max_tokens: 8192,
    },
    ModelEntry {
        id: "gemini-1.5-pro",
        name: "Gemini 1.5 Pro",
        context_window: 2_097_152,
        max_tokens: 8192,
    },
    ModelEntry {
        id: "gemini-2.0-flash",
        name: "Gemini 2.0 Flash",
        context_window: 1_048_576,
        max_tokens: 8192,
    },
    ModelEntry {
        id: "gemini-2.5-flash",
        name: "Gemini 2.5 Flash",
        context_window: 1_048_576,
        max_tokens: 65_536,
    },
];

impl ModelEntry {
    fn to_model(&self) -> Model {
        Model {
            id: self.id.to_string(),
            name: self.name.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            context_window: self.context_window,
            max_tokens: self.max_tokens,
        }
    }
}

/// Look up a registered model by ID.
pub fn get_model(id: &str) -> Option<Model> {
    MODEL_ENTRIES
        .iter()
        .find(|e| e.id == id)
        .map(|e| e.to_model())
}

/// Resolve a model ID, constructing a default entry for unregistered IDs.
pub fn resolve_model(id: &str) -> Model {
    get_model(id).unwrap_or_else(|| Model {
        id: id.to_string(),
        name: id.to_string(),
        base_url: DEFAULT_BASE_URL.to_string(),
        context_window: 1_048_576,
        max_tokens: 8192,
    })
}

/// The default chat model.
pub fn default_model() -> Model {
    resolve_model(DEFAULT_MODEL_ID)
}
