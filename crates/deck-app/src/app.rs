//! Main egui application — composes the panels and drives async work.

use std::cell::RefCell;
use std::rc::Rc;

use egui::{self, Align2, CentralPanel, RichText, SidePanel, TopBottomPanel, Vec2};

use deck_core::event_bus::EventBus;
use deck_core::history::{HistoryStore, HISTORY_KEY};
use deck_core::ports::{BackendPort, StoragePort};
use deck_core::session::{SessionId, SessionManager};
use deck_core::submit::{validate, SubmitController};
use deck_platform::backend::HttpBackend;
use deck_platform::storage::auto_detect_storage;
use deck_types::event::UiEvent;
use deck_ui::panels::{compose, history as history_panel, tabs};
use deck_ui::state::UiState;
use deck_ui::theme;

/// The main application state
pub struct DeckApp {
    ui_state: UiState,
    sessions: Rc<RefCell<SessionManager>>,
    history: Rc<RefCell<HistoryStore>>,
    event_bus: EventBus,
    controller: SubmitController,
    backend: Rc<dyn BackendPort>,
    storage: Rc<dyn StoragePort>,
    first_frame: bool,
}

impl DeckApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let event_bus = EventBus::new();
        let backend: Rc<dyn BackendPort> = Rc::new(HttpBackend::same_origin());
        let storage = auto_detect_storage();

        Self {
            ui_state: UiState::new(),
            sessions: Rc::new(RefCell::new(SessionManager::new())),
            history: Rc::new(RefCell::new(HistoryStore::new())),
            controller: SubmitController::new(event_bus.clone()),
            event_bus,
            backend,
            storage,
            first_frame: true,
        }
    }

    /// Page-load sequence: configs, template list, history, then the
    /// bootstrap tab set with one template fetch per tab.
    fn boot(
        backend: Rc<dyn BackendPort>,
        storage: Rc<dyn StoragePort>,
        sessions: Rc<RefCell<SessionManager>>,
        history: Rc<RefCell<HistoryStore>>,
        bus: EventBus,
        ctx: egui::Context,
    ) {
        wasm_bindgen_futures::spawn_local(async move {
            let configs = match backend.list_configs().await {
                Ok(configs) => {
                    bus.emit(UiEvent::ConfigsLoaded {
                        configs: configs.clone(),
                    });
                    configs
                }
                Err(e) => {
                    log::warn!("configs unavailable: {}", e);
                    bus.emit(UiEvent::ConfigsFailed {
                        message: e.to_string(),
                    });
                    Vec::new()
                }
            };

            let templates = match backend.list_templates().await {
                Ok(names) => {
                    bus.emit(UiEvent::TemplatesLoaded {
                        names: names.clone(),
                    });
                    names
                }
                Err(e) => {
                    log::warn!("templates unavailable: {}", e);
                    bus.emit(UiEvent::TemplatesFailed {
                        message: e.to_string(),
                    });
                    Vec::new()
                }
            };

            // History needs the configs for legacy-record matching.
            let loaded = HistoryStore::load(storage.as_ref(), &configs).await;
            *history.borrow_mut() = loaded;

            let mut to_fetch = Vec::new();
            {
                let h = history.borrow();
                let mut mgr = sessions.borrow_mut();
                for id in mgr.bootstrap(&h, &templates) {
                    if let Some(session) = mgr.get_mut(id) {
                        session.history = h.for_template(&session.template_name);
                        if let Some(first) = configs.first() {
                            session.select_config(first);
                        }
                        to_fetch.push((id, session.template_name.clone()));
                    }
                }
                log::info!(
                    "booted with {} tab(s), {} config(s), storage: {}",
                    mgr.len(),
                    configs.len(),
                    storage.backend_name()
                );
            }
            ctx.request_repaint();

            for (id, name) in to_fetch {
                Self::fetch_template(backend.clone(), bus.clone(), id, name, ctx.clone());
            }
        });
    }

    /// Fetch one session's template body (async, fire-and-forget).
    fn fetch_template(
        backend: Rc<dyn BackendPort>,
        bus: EventBus,
        session_id: SessionId,
        name: String,
        ctx: egui::Context,
    ) {
        wasm_bindgen_futures::spawn_local(async move {
            match backend.fetch_template(&name).await {
                Ok(template) => bus.emit(UiEvent::TemplateLoaded {
                    session_id,
                    template,
                }),
                Err(e) => bus.emit(UiEvent::TemplateFailed {
                    session_id,
                    message: e.to_string(),
                }),
            }
            ctx.request_repaint();
        });
    }

    /// Write the current store to the persistent key (fire-and-forget).
    /// The in-memory store stays authoritative either way.
    fn persist_history(&self) {
        let json = match self.history.borrow().to_json() {
            Ok(json) => json,
            Err(e) => {
                log::warn!("history not serializable: {}", e);
                return;
            }
        };
        let storage = self.storage.clone();
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = storage.set(HISTORY_KEY, &json).await {
                log::warn!("history not persisted: {}", e);
            }
        });
    }

    fn handle_tab_action(&mut self, action: tabs::TabAction, ctx: &egui::Context) {
        match action {
            tabs::TabAction::Switch(id) => {
                self.sessions.borrow_mut().switch(id);
            }
            tabs::TabAction::Close(id) => {
                let result = self.sessions.borrow_mut().close(id);
                match result {
                    // The closed tab's entries live in the shared store;
                    // persisting it is all the "saving" a tab needs.
                    Ok(()) => self.persist_history(),
                    Err(e) => self.ui_state.notice = Some(e.to_string()),
                }
            }
            tabs::TabAction::Open(name) => self.open_template(&name, ctx),
        }
    }

    /// Open (or focus) a tab and re-fetch its template.
    fn open_template(&mut self, name: &str, ctx: &egui::Context) {
        let id = {
            let mut mgr = self.sessions.borrow_mut();
            let h = self.history.borrow();
            let id = mgr.open(name);
            if let Some(session) = mgr.get_mut(id) {
                session.history = h.for_template(name);
                if session.config_id.is_none() {
                    if let Some(first) = self.ui_state.configs.first() {
                        session.select_config(first);
                    }
                }
            }
            id
        };
        Self::fetch_template(
            self.backend.clone(),
            self.event_bus.clone(),
            id,
            name.to_string(),
            ctx.clone(),
        );
    }

    /// Validate the active session and, if clean, dispatch the request.
    /// A validation failure becomes a blocking notice and nothing is sent.
    fn dispatch_submit(&mut self, ctx: &egui::Context) {
        let validated = {
            let sessions = self.sessions.borrow();
            match sessions.active() {
                Some(session) => match validate(session, &self.ui_state.configs) {
                    Ok(payload) => Some((session.id, payload)),
                    Err(e) => {
                        self.ui_state.notice = Some(e.to_string());
                        None
                    }
                },
                None => None,
            }
        };

        let Some((session_id, payload)) = validated else {
            return;
        };

        let controller = self.controller.clone();
        let backend = self.backend.clone();
        let history = self.history.clone();
        let storage = self.storage.clone();
        let ctx = ctx.clone();

        wasm_bindgen_futures::spawn_local(async move {
            // Failures are already on the bus; nothing else to do here.
            let _ = controller
                .submit(session_id, payload, backend.as_ref(), &*history, storage.as_ref())
                .await;
            ctx.request_repaint();
        });
    }

    fn show_notice(&mut self, ctx: &egui::Context) {
        let Some(message) = self.ui_state.notice.clone() else {
            return;
        };
        let mut dismissed = false;
        egui::Window::new("Notice")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(RichText::new(message).color(theme::TEXT_PRIMARY));
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.ui_state.notice = None;
        }
    }

    fn show_delete_confirm(&mut self, ctx: &egui::Context) {
        let Some((session_id, index)) = self.ui_state.pending_delete else {
            return;
        };
        let mut decision: Option<bool> = None;
        egui::Window::new("Delete entry?")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(
                    RichText::new("Remove this entry from history? This cannot be undone.")
                        .color(theme::TEXT_PRIMARY),
                );
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui
                        .add(
                            egui::Button::new(RichText::new("Delete").color(theme::TEXT_PRIMARY))
                                .fill(theme::ERROR),
                        )
                        .clicked()
                    {
                        decision = Some(true);
                    }
                    if ui.button("Cancel").clicked() {
                        decision = Some(false);
                    }
                });
            });

        match decision {
            Some(true) => {
                let removed = {
                    let name = self
                        .sessions
                        .borrow()
                        .get(session_id)
                        .map(|s| s.template_name.clone());
                    match name {
                        Some(name) => self
                            .history
                            .borrow_mut()
                            .delete_for_template(&name, index)
                            .is_some(),
                        None => false,
                    }
                };
                if removed {
                    {
                        let h = self.history.borrow();
                        self.sessions.borrow_mut().refresh_history_views(&h);
                    }
                    self.persist_history();
                }
                self.ui_state.pending_delete = None;
            }
            Some(false) => self.ui_state.pending_delete = None,
            None => {}
        }
    }
}

impl eframe::App for DeckApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.first_frame {
            theme::apply_theme(ctx);
            Self::boot(
                self.backend.clone(),
                self.storage.clone(),
                self.sessions.clone(),
                self.history.clone(),
                self.event_bus.clone(),
                ctx.clone(),
            );
            self.first_frame = false;
        }

        // Drain events from async work
        let events = self.event_bus.drain();
        if !events.is_empty() {
            {
                let mut sessions = self.sessions.borrow_mut();
                let history = self.history.borrow();
                self.ui_state.process_events(&mut sessions, &history, events);
            }
            ctx.request_repaint();
        }

        // Keep painting while any tab is streaming
        if self.sessions.borrow().sessions().iter().any(|s| s.in_flight) {
            ctx.request_repaint();
        }

        // ── Top bar ──────────────────────────────────────────
        TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(
                    RichText::new("Prompt Deck")
                        .strong()
                        .color(theme::ACCENT)
                        .size(16.0),
                );
                ui.separator();
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(
                        RichText::new(&self.ui_state.status_text)
                            .color(theme::TEXT_SECONDARY)
                            .small(),
                    );
                });
            });
        });

        // ── Tab strip ────────────────────────────────────────
        let tab_action = TopBottomPanel::top("tab_strip")
            .show(ctx, |ui| {
                tabs::tab_strip(ui, &self.sessions.borrow(), &self.ui_state.template_names)
            })
            .inner;
        if let Some(action) = tab_action {
            self.handle_tab_action(action, ctx);
        }

        // ── Active session: history side panel + compose ─────
        let mut delete_request: Option<(SessionId, usize)> = None;
        let mut submit_clicked = false;
        {
            let mut sessions = self.sessions.borrow_mut();
            match sessions.active_mut() {
                Some(session) => {
                    SidePanel::right("history_panel")
                        .min_width(280.0)
                        .max_width(420.0)
                        .show(ctx, |ui| {
                            if let Some(index) =
                                history_panel::history_panel(ui, session, &self.ui_state.configs)
                            {
                                delete_request = Some((session.id, index));
                            }
                        });
                    CentralPanel::default().show(ctx, |ui| {
                        if compose::compose_panel(ui, session, &self.ui_state.configs) {
                            submit_clicked = true;
                        }
                    });
                }
                None => {
                    CentralPanel::default().show(ctx, |ui| {
                        ui.centered_and_justified(|ui| {
                            ui.label(
                                RichText::new(&self.ui_state.status_text)
                                    .color(theme::TEXT_SECONDARY),
                            );
                        });
                    });
                }
            }
        }

        if let Some(request) = delete_request {
            self.ui_state.pending_delete = Some(request);
        }
        if submit_clicked {
            self.dispatch_submit(ctx);
        }

        // ── Modals ───────────────────────────────────────────
        self.show_notice(ctx);
        self.show_delete_confirm(ctx);
    }
}
