//! Tab strip — one tab per open template, plus an opener for the rest.

use egui::{self, RichText};

use deck_core::session::{SessionId, SessionManager};

use crate::theme::*;

/// What the caller should do after rendering the tab strip.
#[derive(Debug, Clone, PartialEq)]
pub enum TabAction {
    Switch(SessionId),
    Close(SessionId),
    Open(String),
}

/// Render the tab strip. Returns at most one action per frame.
pub fn tab_strip(
    ui: &mut egui::Ui,
    sessions: &SessionManager,
    template_names: &[String],
) -> Option<TabAction> {
    let mut action = None;

    ui.horizontal_wrapped(|ui| {
        for session in sessions.sessions() {
            let active = sessions.active_id() == Some(session.id);
            let title = if session.in_flight {
                format!("{} …", session.template_name)
            } else {
                session.template_name.clone()
            };
            let color = if active { TEXT_PRIMARY } else { TEXT_SECONDARY };
            if ui
                .selectable_label(active, RichText::new(title).color(color))
                .clicked()
            {
                action = Some(TabAction::Switch(session.id));
            }
            if ui
                .small_button(RichText::new("×").color(TEXT_SECONDARY))
                .on_hover_text("Close tab")
                .clicked()
            {
                action = Some(TabAction::Close(session.id));
            }
            ui.add_space(4.0);
        }

        // Opener lists every template; picking one that is already open
        // just focuses its tab.
        let mut picked: Option<String> = None;
        egui::ComboBox::from_id_salt("template_opener")
            .selected_text(RichText::new("+ open").color(ACCENT))
            .show_ui(ui, |ui| {
                if template_names.is_empty() {
                    ui.label(RichText::new("no templates available").color(TEXT_SECONDARY));
                }
                for name in template_names {
                    ui.selectable_value(&mut picked, Some(name.clone()), name);
                }
            });
        if let Some(name) = picked {
            action = Some(TabAction::Open(name));
        }
    });

    action
}
