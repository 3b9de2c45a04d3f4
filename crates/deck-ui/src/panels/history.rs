//! History panel — the active session's slice of past submissions.

use egui::{self, Align, Layout, RichText, ScrollArea};

use deck_core::session::Session;
use deck_types::config::ApiConfig;

use crate::theme::*;

/// Render the history list. Returns the session-local index of an entry
/// the user asked to delete; the caller confirms before anything is
/// removed.
pub fn history_panel(ui: &mut egui::Ui, session: &Session, configs: &[ApiConfig]) -> Option<usize> {
    let mut delete = None;

    egui::Frame::default()
        .fill(BG_SECONDARY)
        .inner_margin(PANEL_PADDING)
        .corner_radius(PANEL_ROUNDING)
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.heading(RichText::new("History").color(TEXT_PRIMARY));
                ui.label(
                    RichText::new(format!("({})", session.history.len()))
                        .color(TEXT_SECONDARY)
                        .small(),
                );
            });
            ui.separator();

            if session.history.is_empty() {
                ui.label(
                    RichText::new("No history for this template yet.")
                        .color(TEXT_SECONDARY)
                        .italics(),
                );
                return;
            }

            ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
                for (index, entry) in session.history.iter().enumerate() {
                    egui::Frame::default()
                        .fill(BG_SURFACE)
                        .corner_radius(PANEL_ROUNDING)
                        .inner_margin(8.0)
                        .show(ui, |ui| {
                            ui.horizontal(|ui| {
                                ui.label(
                                    RichText::new(&entry.timestamp)
                                        .color(TEXT_SECONDARY)
                                        .small(),
                                );
                                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                                    if ui
                                        .small_button(RichText::new("Delete").color(ERROR))
                                        .clicked()
                                    {
                                        delete = Some(index);
                                    }
                                });
                            });
                            ui.label(
                                RichText::new(describe_config(entry.config_id.as_deref(), configs))
                                    .color(TEXT_SECONDARY)
                                    .small(),
                            );
                            ui.label(
                                RichText::new(preview(entry.first_input(), 120))
                                    .color(ACCENT)
                                    .small(),
                            );
                            ui.label(
                                RichText::new(preview(&entry.response, 240)).color(TEXT_PRIMARY),
                            );
                        });
                    ui.add_space(4.0);
                }
            });
        });

    delete
}

fn describe_config(config_id: Option<&str>, configs: &[ApiConfig]) -> String {
    match config_id {
        Some(id) => configs
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("config {}", id)),
        None => "—".to_string(),
    }
}

/// Char-safe truncation for list rows.
fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(max_chars).collect();
        short.push('…');
        short
    }
}
