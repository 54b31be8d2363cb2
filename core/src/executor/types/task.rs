use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One translatable unit inside a task, addressed by a stable index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub item_index: u32,
    pub source_text: String,
}

impl WorkItem {
    pub fn new(item_index: u32, source_text: impl Into<String>) -> Self {
        Self {
            item_index,
            source_text: source_text.into(),
        }
    }
}

/// One conversation turn sent to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Provider endpoint configuration, opaque to the engine and forwarded to
/// the adapter. Unrecognized keys ride along in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub api_url: String,

    #[serde(default)]
    pub api_key: String,

    pub model: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Attempt prompt caching; flipped off by the engine when the hub or the
    /// provider fingerprint says the provider rejects it.
    #[serde(default = "default_true")]
    pub enable_cache: bool,

    /// Attempt streaming; the adapter negotiates and remembers per model.
    #[serde(default = "default_true")]
    pub enable_stream: bool,

    #[serde(default)]
    pub extra: HashMap<String, serde_json::Value>,
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_temperature() -> f32 {
    1.0
}

fn default_top_p() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

impl PlatformConfig {
    pub fn new(api_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: String::new(),
            model: model.into(),
            request_timeout_secs: default_request_timeout_secs(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            enable_cache: true,
            enable_stream: true,
            extra: HashMap::new(),
        }
    }
}

/// A complete unit of dispatchable work. Immutable once submitted; the
/// executor holds a read-only reference for the duration of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub task_id: String,
    pub items: Vec<WorkItem>,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub system_prompt: String,
    pub platform: PlatformConfig,
}

impl TaskDescriptor {
    pub fn new(task_id: impl Into<String>, platform: PlatformConfig) -> Self {
        Self {
            task_id: task_id.into(),
            items: Vec::new(),
            messages: Vec::new(),
            system_prompt: String::new(),
            platform,
        }
    }
}
