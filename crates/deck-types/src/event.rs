use serde::{Deserialize, Serialize};

use crate::config::ApiConfig;
use crate::history::HistoryEntry;
use crate::template::Template;

/// Events published by async work (boot fetches, submissions) and drained by
/// the UI once per frame. `session_id` refers to the tab that initiated the
/// work; reference-data events carry no session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UiEvent {
    /// `/api/configs` arrived.
    ConfigsLoaded { configs: Vec<ApiConfig> },

    /// `/api/configs` failed; the app keeps running with no configs.
    ConfigsFailed { message: String },

    /// `/api/templates` arrived. An empty list is valid.
    TemplatesLoaded { names: Vec<String> },

    TemplatesFailed { message: String },

    /// A session's template body arrived.
    TemplateLoaded { session_id: u64, template: Template },

    /// Template fetch failed; the session's template becomes unselected.
    TemplateFailed { session_id: u64, message: String },

    /// A validated submission left for the backend.
    SubmitStarted { session_id: u64 },

    /// One streamed chunk of the response, in arrival order.
    ResponseDelta { session_id: u64, chunk: String },

    /// Submission finished; the entry has already been appended to history.
    ResponseComplete { session_id: u64, entry: HistoryEntry },

    /// Submission failed; nothing was written to history.
    SubmitFailed { session_id: u64, message: String },
}
