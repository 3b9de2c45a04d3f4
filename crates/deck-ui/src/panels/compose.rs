//! Compose panel — the active tab's form plus its response and error
//! regions.

use egui::{self, Align, Layout, RichText, ScrollArea, Vec2};

use deck_core::session::Session;
use deck_types::config::ApiConfig;

use crate::theme::*;

/// Render the form for the active session. Returns true when the user
/// submits; validation belongs to the caller.
pub fn compose_panel(ui: &mut egui::Ui, session: &mut Session, configs: &[ApiConfig]) -> bool {
    let mut submitted = false;

    egui::Frame::default()
        .fill(BG_PRIMARY)
        .inner_margin(PANEL_PADDING)
        .show(ui, |ui| {
            ui.vertical(|ui| {
                ui.horizontal(|ui| {
                    ui.heading(
                        RichText::new(&session.template_name)
                            .color(TEXT_PRIMARY)
                            .strong(),
                    );
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let (status, color) = if session.in_flight {
                            ("Waiting for response…", WARNING)
                        } else {
                            ("Ready", SUCCESS)
                        };
                        ui.label(RichText::new(status).color(color).small());
                    });
                });

                ui.separator();

                match session.template.clone() {
                    Some(template) => {
                        input_field(ui, "Input", &mut session.inputs[0]);
                        if template.has_input2() {
                            input_field(ui, "Input 2", &mut session.inputs[1]);
                        }
                        if template.has_input3() {
                            input_field(ui, "Input 3", &mut session.inputs[2]);
                        }
                    }
                    None => {
                        // Fetch failed or still in flight: no placeholder
                        // fields are active until a body arrives.
                        ui.label(
                            RichText::new("Template not loaded.")
                                .color(TEXT_SECONDARY)
                                .italics(),
                        );
                    }
                }

                ui.add_space(4.0);

                // Config selection + temperature, when the config has one.
                ui.horizontal(|ui| {
                    ui.label(RichText::new("API configuration").color(TEXT_SECONDARY).small());
                    let selected_name = selected_config(session, configs)
                        .map(|c| c.name.clone())
                        .unwrap_or_else(|| "select…".to_string());
                    egui::ComboBox::from_id_salt(("api_config", session.id))
                        .selected_text(selected_name)
                        .show_ui(ui, |ui| {
                            for config in configs {
                                let checked = session.config_id.as_deref() == Some(config.id.as_str());
                                if ui.selectable_label(checked, &config.name).clicked() {
                                    session.select_config(config);
                                }
                            }
                        });
                });

                if let Some(config) = selected_config(session, configs) {
                    if config.supports_temperature() {
                        let default = config.default_temperature.unwrap_or(0.7);
                        let mut value = session.temperature.unwrap_or(default);
                        ui.horizontal(|ui| {
                            ui.label(RichText::new("Temperature").color(TEXT_SECONDARY).small());
                            // Backend range; out-of-range values are rejected server-side.
                            if ui.add(egui::Slider::new(&mut value, 0.0..=2.0)).changed() {
                                session.temperature = Some(value);
                            }
                        });
                    }
                }

                ui.add_space(4.0);

                let send_enabled = !session.in_flight;
                let send_btn = ui.add_enabled(
                    send_enabled,
                    egui::Button::new(RichText::new("Send").color(TEXT_PRIMARY))
                        .fill(if send_enabled { ACCENT } else { BG_SURFACE })
                        .corner_radius(PANEL_ROUNDING)
                        .min_size(Vec2::new(80.0, 0.0)),
                );
                if send_btn.clicked() {
                    submitted = true;
                }

                ui.add_space(8.0);

                if let Some(error) = &session.error {
                    egui::Frame::default()
                        .fill(ERROR_BG)
                        .corner_radius(PANEL_ROUNDING)
                        .inner_margin(8.0)
                        .show(ui, |ui| {
                            ui.label(RichText::new("Error").color(ERROR).strong().small());
                            ui.label(RichText::new(error).color(TEXT_PRIMARY));
                        });
                }

                if !session.response.is_empty() || session.in_flight {
                    ui.label(RichText::new("Response").color(TEXT_SECONDARY).small());
                    ScrollArea::vertical()
                        .auto_shrink([false, true])
                        .stick_to_bottom(true)
                        .show(ui, |ui| {
                            egui::Frame::default()
                                .fill(BG_SECONDARY)
                                .corner_radius(PANEL_ROUNDING)
                                .inner_margin(8.0)
                                .show(ui, |ui| {
                                    ui.label(
                                        RichText::new(&session.response).color(TEXT_PRIMARY),
                                    );
                                    if session.in_flight {
                                        ui.label(RichText::new("▌").color(ACCENT).strong());
                                    }
                                });
                        });
                }
            });
        });

    submitted
}

fn input_field(ui: &mut egui::Ui, label: &str, value: &mut String) {
    ui.label(RichText::new(label).color(TEXT_SECONDARY).small());
    ui.add(
        egui::TextEdit::multiline(value)
            .desired_rows(3)
            .desired_width(f32::INFINITY)
            .hint_text("Type here..."),
    );
}

fn selected_config<'a>(session: &Session, configs: &'a [ApiConfig]) -> Option<&'a ApiConfig> {
    let id = session.config_id.as_deref()?;
    configs.iter().find(|c| c.id == id)
}
