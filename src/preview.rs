//! Right-hand preview pane: inspect the selected game version, edit its
//! HTML source, export it for the browser.

use crate::export;
use crate::session::{GameFiles, GameVersion};
use crate::theme::Theme;
use eframe::egui::{self, RichText, ScrollArea};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PreviewTab {
    Overview,
    Source,
}

/// State changes the pane wants; versions are owned by the conversation
/// controller, so mutations are routed back through the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewAction {
    SelectVersion(usize),
    ApplySource { version_id: usize, files: GameFiles },
}

pub struct PreviewPane {
    tab: PreviewTab,
    source_draft: String,
    seeded_for: Option<usize>,
    last_export: Option<PathBuf>,
    export_error: Option<String>,
}

impl PreviewPane {
    pub fn new() -> Self {
        Self {
            tab: PreviewTab::Overview,
            source_draft: String::new(),
            seeded_for: None,
            last_export: None,
            export_error: None,
        }
    }

    /// Drop per-version state; called when the version list is replaced
    /// wholesale (reset, conversation load).
    pub fn clear(&mut self) {
        self.source_draft.clear();
        self.seeded_for = None;
        self.last_export = None;
        self.export_error = None;
    }

    pub fn render(
        &mut self,
        ui: &mut egui::Ui,
        theme: &Theme,
        versions: &[GameVersion],
        selected: Option<usize>,
    ) -> Option<PreviewAction> {
        ui.heading("Game Preview");
        ui.separator();

        if versions.is_empty() {
            ui.label(
                RichText::new("No game yet. Describe one in the chat to get a first version.")
                    .color(theme.text_muted),
            );
            return None;
        }

        let mut action = None;

        ui.horizontal_wrapped(|ui| {
            for version in versions {
                let is_selected = selected == Some(version.id);
                let response = ui
                    .selectable_label(is_selected, format!("v{}", version.id + 1))
                    .on_hover_text(&version.title);
                if response.clicked() && !is_selected {
                    action = Some(PreviewAction::SelectVersion(version.id));
                }
            }
        });

        let Some(version) = selected.and_then(|index| versions.get(index)) else {
            return action;
        };

        ui.add_space(theme.spacing_4);
        ui.label(RichText::new(&version.title).strong().size(15.0));
        if !version.game_type.is_empty() {
            ui.label(RichText::new(&version.game_type).color(theme.text_muted).small());
        }
        ui.add_space(theme.spacing_4);

        ui.horizontal(|ui| {
            if ui
                .selectable_label(self.tab == PreviewTab::Overview, "Overview")
                .clicked()
            {
                self.tab = PreviewTab::Overview;
            }
            if ui
                .selectable_label(self.tab == PreviewTab::Source, "Source")
                .clicked()
            {
                self.tab = PreviewTab::Source;
            }
        });
        ui.separator();

        match self.tab {
            PreviewTab::Overview => self.render_overview(ui, theme, version),
            PreviewTab::Source => {
                if let Some(apply) = self.render_source(ui, theme, version) {
                    action = Some(apply);
                }
            }
        }

        action
    }

    fn render_overview(&mut self, ui: &mut egui::Ui, theme: &Theme, version: &GameVersion) {
        ScrollArea::vertical()
            .id_salt("preview_overview")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                if !version.description.is_empty() {
                    theme.card_frame().show(ui, |ui| {
                        ui.label(&version.description);
                    });
                    ui.add_space(theme.spacing_8);
                }

                ui.label(RichText::new("Prompt").strong().small());
                ui.label(RichText::new(&version.user_prompt).color(theme.text_muted));
                ui.add_space(theme.spacing_8);

                if !version.image_resources.is_empty() {
                    ui.label(RichText::new("Image resources").strong().small());
                    for resource in &version.image_resources {
                        ui.label(RichText::new(resource).color(theme.text_muted).small());
                    }
                    ui.add_space(theme.spacing_8);
                }
                if !version.audio_resources.is_empty() {
                    ui.label(RichText::new("Audio resources").strong().small());
                    for resource in &version.audio_resources {
                        ui.label(RichText::new(resource).color(theme.text_muted).small());
                    }
                    ui.add_space(theme.spacing_8);
                }
                if !version.agent_chain.is_empty() {
                    ui.label(RichText::new("Agent chain").strong().small());
                    ui.label(
                        RichText::new(version.agent_chain.join(" > "))
                            .color(theme.text_muted)
                            .small(),
                    );
                    ui.add_space(theme.spacing_8);
                }

                if !version.timestamp.is_empty() {
                    ui.label(
                        RichText::new(format!("Generated {}", version.timestamp))
                            .color(theme.text_muted)
                            .small(),
                    );
                }
            });
    }

    fn render_source(
        &mut self,
        ui: &mut egui::Ui,
        theme: &Theme,
        version: &GameVersion,
    ) -> Option<PreviewAction> {
        if self.seeded_for != Some(version.id) {
            self.source_draft = version.files.html.clone();
            self.seeded_for = Some(version.id);
        }

        let dirty = self.source_draft != version.files.html;
        let mut action = None;

        ui.horizontal(|ui| {
            if ui
                .add_enabled(dirty, egui::Button::new("Apply edits"))
                .clicked()
            {
                action = Some(PreviewAction::ApplySource {
                    version_id: version.id,
                    files: GameFiles {
                        html: self.source_draft.clone(),
                    },
                });
            }
            if ui.add_enabled(dirty, egui::Button::new("Revert")).clicked() {
                self.source_draft = version.files.html.clone();
            }
            if ui.button("Export HTML").clicked() {
                match export::export_version(version) {
                    Ok(path) => {
                        self.last_export = Some(path);
                        self.export_error = None;
                    }
                    Err(err) => {
                        self.export_error = Some(err.to_string());
                        self.last_export = None;
                    }
                }
            }
        });

        if let Some(path) = &self.last_export {
            ui.label(
                RichText::new(format!("Saved to {} — open it in a browser to play.", path.display()))
                    .color(theme.success)
                    .small(),
            );
        }
        if let Some(error) = &self.export_error {
            ui.label(
                RichText::new(format!("Export failed: {error}"))
                    .color(theme.danger)
                    .small(),
            );
        }

        ScrollArea::vertical()
            .id_salt("preview_source")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.add(
                    egui::TextEdit::multiline(&mut self.source_draft)
                        .code_editor()
                        .desired_width(f32::INFINITY)
                        .desired_rows(24),
                );
            });

        action
    }
}
