//! UI-level state and the event reducer.
//!
//! Async work never touches widgets directly: it publishes [`UiEvent`]s,
//! and `process_events` folds them into the session manager and this
//! view-state once per frame.

use deck_core::history::HistoryStore;
use deck_core::session::{SessionId, SessionManager};
use deck_types::config::ApiConfig;
use deck_types::event::UiEvent;

/// State that belongs to the page, not to any one tab.
pub struct UiState {
    /// Reference data from `/api/configs`, fetched once per page load.
    pub configs: Vec<ApiConfig>,
    /// Template names from `/api/templates`, in server order.
    pub template_names: Vec<String>,
    /// Blocking message (validation prompts, refused tab operations).
    /// Rendered as a modal; nothing else reacts until dismissed.
    pub notice: Option<String>,
    /// A history delete waiting for confirmation: (session, local index).
    pub pending_delete: Option<(SessionId, usize)>,
    /// Status line text
    pub status_text: String,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            configs: Vec::new(),
            template_names: Vec::new(),
            notice: None,
            pending_delete: None,
            status_text: "Loading...".to_string(),
        }
    }

    /// Fold pending events into the tab set and the view state.
    pub fn process_events(
        &mut self,
        sessions: &mut SessionManager,
        history: &HistoryStore,
        events: Vec<UiEvent>,
    ) {
        for event in events {
            match event {
                UiEvent::ConfigsLoaded { configs } => {
                    self.configs = configs;
                    // Tabs opened before the configs arrived get the first
                    // config preselected, like a fresh <select> element.
                    if let Some(first) = self.configs.first().cloned() {
                        for session in sessions.sessions_mut() {
                            if session.config_id.is_none() {
                                session.select_config(&first);
                            }
                        }
                    }
                }
                UiEvent::ConfigsFailed { message } => {
                    self.status_text = format!("Configs unavailable: {}", message);
                }
                UiEvent::TemplatesLoaded { names } => {
                    if names.is_empty() {
                        self.status_text = "no templates available".to_string();
                    } else {
                        self.status_text = "Ready".to_string();
                    }
                    self.template_names = names;
                }
                UiEvent::TemplatesFailed { message } => {
                    self.status_text = format!("Templates unavailable: {}", message);
                }
                UiEvent::TemplateLoaded { session_id, template } => {
                    if let Some(session) = sessions.get_mut(session_id) {
                        session.template = Some(template);
                        session.error = None;
                    }
                }
                UiEvent::TemplateFailed { session_id, message } => {
                    // The tab survives, but with no placeholder fields
                    // active: the template counts as unselected.
                    if let Some(session) = sessions.get_mut(session_id) {
                        session.template = None;
                        session.error = Some(message);
                    }
                }
                UiEvent::SubmitStarted { session_id } => {
                    if let Some(session) = sessions.get_mut(session_id) {
                        session.in_flight = true;
                        session.response.clear();
                        session.error = None;
                    }
                }
                UiEvent::ResponseDelta { session_id, chunk } => {
                    if let Some(session) = sessions.get_mut(session_id) {
                        session.response.push_str(&chunk);
                    }
                }
                UiEvent::ResponseComplete { session_id, entry } => {
                    if let Some(session) = sessions.get_mut(session_id) {
                        session.in_flight = false;
                        session.response = entry.response.clone();
                    }
                    sessions.refresh_history_views(history);
                }
                UiEvent::SubmitFailed { session_id, message } => {
                    if let Some(session) = sessions.get_mut(session_id) {
                        session.in_flight = false;
                        session.response.clear();
                        session.error = Some(message);
                    }
                }
            }
        }
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}
