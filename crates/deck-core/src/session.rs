//! Tabs: one independent working-set per template.
//!
//! The manager enforces the tab invariants — at most one session per
//! template, exactly one active session, never zero sessions once booted —
//! and leaves rendering entirely to the UI layer.

use deck_types::{
    config::ApiConfig, history::HistoryEntry, template::Template, DeckError, Result,
};

use crate::history::HistoryStore;

pub type SessionId = u64;

/// Focus state, derived from the manager. A session leaves the set entirely
/// when closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Active,
    Background,
}

/// One open tab. Owns its template selection, its input fields, its
/// in-flight flag, and a filtered copy of the shared history.
pub struct Session {
    pub id: SessionId,
    /// The tab identity. Always known, even before the body arrives.
    pub template_name: String,
    /// Fetched body; `None` until loaded, and again after a failed fetch
    /// (an unloaded template counts as unselected for validation).
    pub template: Option<Template>,
    /// Field values in placeholder index order.
    pub inputs: [String; 3],
    pub config_id: Option<String>,
    /// Slider value; only sent for configs that support temperature.
    pub temperature: Option<f32>,
    /// Response text visible so far (grows chunk by chunk while streaming).
    pub response: String,
    pub error: Option<String>,
    /// True while this tab's request is in flight; the submit control is
    /// disabled exactly as long as this holds.
    pub in_flight: bool,
    /// View of the shared store, filtered to this template.
    pub history: Vec<HistoryEntry>,
}

impl Session {
    fn new(id: SessionId, template_name: &str) -> Self {
        Self {
            id,
            template_name: template_name.to_string(),
            template: None,
            inputs: Default::default(),
            config_id: None,
            temperature: None,
            response: String::new(),
            error: None,
            in_flight: false,
            history: Vec::new(),
        }
    }

    /// Select a config, adopting its default temperature when it has one.
    pub fn select_config(&mut self, config: &ApiConfig) {
        self.config_id = Some(config.id.clone());
        self.temperature = config.default_temperature;
    }
}

#[derive(Default)]
pub struct SessionManager {
    sessions: Vec<Session>,
    active: Option<SessionId>,
    next_id: SessionId,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or focus) the tab for a template. At most one session per
    /// template name exists at any time; opening an existing one focuses it.
    pub fn open(&mut self, template_name: &str) -> SessionId {
        if let Some(existing) = self.sessions.iter().find(|s| s.template_name == template_name) {
            let id = existing.id;
            self.active = Some(id);
            return id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.sessions.push(Session::new(id, template_name));
        self.active = Some(id);
        id
    }

    /// Focus a tab. In-flight work elsewhere keeps running.
    pub fn switch(&mut self, id: SessionId) -> bool {
        if self.sessions.iter().any(|s| s.id == id) {
            self.active = Some(id);
            true
        } else {
            false
        }
    }

    /// Close a tab. Refused (state unchanged) for the only open session.
    /// If the closed tab was active, the first remaining one — creation
    /// order, not recency — takes focus.
    pub fn close(&mut self, id: SessionId) -> Result<()> {
        if self.sessions.len() <= 1 {
            return Err(DeckError::LastSession);
        }
        let index = self
            .sessions
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| DeckError::NotFound(format!("tab {}", id)))?;
        self.sessions.remove(index);
        if self.active == Some(id) {
            self.active = self.sessions.first().map(|s| s.id);
        }
        Ok(())
    }

    /// Page-load tab set: one session per template group present in history
    /// (most recent first), or the first available template when history is
    /// empty. The leftmost tab ends up focused. Returns the ids opened.
    pub fn bootstrap(&mut self, history: &HistoryStore, available: &[String]) -> Vec<SessionId> {
        let mut opened = Vec::new();
        for name in history.template_names() {
            opened.push(self.open(&name));
        }
        if self.sessions.is_empty() {
            if let Some(first) = available.first() {
                opened.push(self.open(first));
            }
        }
        if let Some(first) = self.sessions.first() {
            let id = first.id;
            self.switch(id);
        }
        opened
    }

    pub fn phase(&self, id: SessionId) -> Option<SessionPhase> {
        self.sessions.iter().find(|s| s.id == id).map(|s| {
            if self.active == Some(s.id) {
                SessionPhase::Active
            } else {
                SessionPhase::Background
            }
        })
    }

    pub fn active_id(&self) -> Option<SessionId> {
        self.active
    }

    pub fn active(&self) -> Option<&Session> {
        let id = self.active?;
        self.get(id)
    }

    pub fn active_mut(&mut self) -> Option<&mut Session> {
        let id = self.active?;
        self.get_mut(id)
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn sessions_mut(&mut self) -> impl Iterator<Item = &mut Session> {
        self.sessions.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Refresh every session's history view from the shared store.
    pub fn refresh_history_views(&mut self, history: &HistoryStore) {
        for session in &mut self.sessions {
            session.history = history.for_template(&session.template_name);
        }
    }
}
