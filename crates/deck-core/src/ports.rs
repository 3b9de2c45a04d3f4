//! Port traits — the hexagonal architecture boundary.
//!
//! These traits are defined here in `deck-core` (pure Rust).
//! Implementations live in `deck-platform` (browser adapters).
//! The core never imports platform code; it only depends on these traits.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;

use deck_types::{config::ApiConfig, template::Template, Result};

// ─── Backend Port ────────────────────────────────────────────

/// Body POSTed to `/api/chat`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatPayload {
    pub template_name: String,
    pub input_texts: Vec<String>,
    pub config_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// One event of a chat response. A buffered `{response}` body is presented
/// as a single `Delta` followed by `Done`, so consumers handle exactly one
/// shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatStreamEvent {
    /// A chunk of response text, in arrival order.
    Delta(String),
    /// The `[DONE]` frame, or end of body.
    Done,
    /// An `ERROR: ` frame; the message is already stripped of the prefix.
    Error(String),
}

#[async_trait(?Send)]
pub trait BackendPort {
    /// `GET /api/configs` — reference data, fetched once per page load.
    async fn list_configs(&self) -> Result<Vec<ApiConfig>>;

    /// `GET /api/templates` — ordered template names; empty is valid.
    async fn list_templates(&self) -> Result<Vec<String>>;

    /// `GET /api/templates/{name}`.
    async fn fetch_template(&self, name: &str) -> Result<Template>;

    /// `POST /api/chat`. A non-success response resolves to an error with
    /// the display message already extracted; a success resolves to a
    /// stream of [`ChatStreamEvent`]s covering both wire shapes.
    async fn chat(&self, payload: &ChatPayload)
        -> Result<Pin<Box<dyn Stream<Item = ChatStreamEvent>>>>;
}

// ─── Storage Port ────────────────────────────────────────────

/// String-keyed, string-valued persistence — the shape of browser
/// `localStorage`, which the primary adapter wraps.
#[async_trait(?Send)]
pub trait StoragePort {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;

    /// Name of this backend (for logging/debug)
    fn backend_name(&self) -> &str;
}
