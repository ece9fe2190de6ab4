use crate::backend::types::{ConversationSummary, ModelInfo};
use crate::backend::{BackendClient, BackendStatus};
use crate::config::AppConfig;
use crate::event::AppEvent;
use crate::preview::{PreviewAction, PreviewPane};
use crate::session::state::{ConversationState, SubmitError};
use crate::session::{MessageRole, MessageStatus};
use crate::theme::Theme;
use eframe::egui::{self, Color32, RichText, ScrollArea};
use std::sync::mpsc::{Receiver, TryRecvError};
use tracing::warn;

pub struct PlayforgeApp {
    rx: Receiver<AppEvent>,
    backend: BackendClient,
    state: ConversationState,
    preview: PreviewPane,
    theme: Theme,
    backend_status: BackendStatus,
    models: Vec<ModelInfo>,
    selected_model: Option<String>,
    preferred_model: Option<String>,
    conversations: Vec<ConversationSummary>,
    conversations_error: Option<String>,
    load_error: Option<String>,
    loading_conversation: bool,
    input_buffer: String,
    diagnostics_log: Vec<String>,
    scroll_to_bottom: bool,
}

impl PlayforgeApp {
    pub fn new(rx: Receiver<AppEvent>, backend: BackendClient, config: &AppConfig) -> Self {
        Self {
            rx,
            backend,
            state: ConversationState::new(),
            preview: PreviewPane::new(),
            theme: Theme::default(),
            backend_status: BackendStatus::Unknown,
            models: Vec::new(),
            selected_model: config.preferred_model.clone(),
            preferred_model: config.preferred_model.clone(),
            conversations: Vec::new(),
            conversations_error: None,
            load_error: None,
            loading_conversation: false,
            input_buffer: String::new(),
            diagnostics_log: Vec::new(),
            scroll_to_bottom: false,
        }
    }

    pub fn apply_theme(&self, ctx: &egui::Context) {
        self.theme.apply_visuals(ctx);
    }

    fn timestamp() -> String {
        chrono::Local::now().format("%H:%M:%S").to_string()
    }

    fn log_diagnostic(&mut self, message: impl Into<String>) {
        self.diagnostics_log
            .push(format!("[{}] {}", Self::timestamp(), message.into()));
    }

    fn status_chip(&self) -> (&'static str, Color32) {
        let color = match self.backend_status {
            BackendStatus::Online => self.theme.success,
            BackendStatus::Offline => self.theme.danger,
            BackendStatus::Checking => self.theme.warning,
            BackendStatus::Unknown => self.theme.text_muted,
        };
        (self.backend_status.label(), color)
    }

    fn drain_events(&mut self, ctx: &egui::Context) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.apply_event(event, Some(ctx)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.log_diagnostic("event channel disconnected");
                    break;
                }
            }
        }
    }

    fn apply_event(&mut self, event: AppEvent, ctx: Option<&egui::Context>) {
        match event {
            AppEvent::BackendStatus(status) => {
                self.backend_status = status;
                self.log_diagnostic(format!("backend status: {}", status.label()));
            }
            AppEvent::ModelsLoaded(catalog) => {
                self.log_diagnostic(format!("{} models available", catalog.models.len()));
                self.models = catalog.models;
                self.selected_model = self.pick_model(catalog.default_model);
            }
            AppEvent::ModelsFailed(message) => {
                self.log_diagnostic(format!(
                    "model listing failed ({message}); the backend default will be used"
                ));
            }
            AppEvent::ConversationsLoaded(summaries) => {
                self.conversations = summaries;
                self.conversations_error = None;
            }
            AppEvent::ConversationsFailed(message) => {
                self.conversations_error = Some(message);
            }
            AppEvent::ConversationLoaded(full) => {
                self.loading_conversation = false;
                self.load_error = None;
                self.state.load_conversation(&full);
                self.preview.clear();
                self.scroll_to_bottom = true;
                self.log_diagnostic(format!(
                    "loaded conversation {} ({} turns)",
                    full.conversation_id,
                    full.messages.len()
                ));
            }
            AppEvent::ConversationLoadFailed {
                conversation_id,
                message,
                not_found,
            } => {
                self.loading_conversation = false;
                self.load_error = Some(if not_found {
                    format!("Conversation {conversation_id} no longer exists on the backend.")
                } else {
                    format!("Could not load conversation: {message}")
                });
                self.log_diagnostic(format!("conversation load failed: {message}"));
            }
            AppEvent::GenerationSucceeded(reply) => {
                if let Some(usage) = reply.usage {
                    self.log_diagnostic(format!(
                        "generation used {} tokens",
                        usage.total_tokens.unwrap_or_default()
                    ));
                }
                self.state.complete_submit(&reply);
                self.scroll_to_bottom = true;
            }
            AppEvent::GenerationFailed(message) => {
                self.state.fail_submit(&message);
                self.scroll_to_bottom = true;
                self.log_diagnostic(format!("generation failed: {message}"));
            }
        }

        if let Some(ctx) = ctx {
            ctx.request_repaint();
        }
    }

    /// Preference order: configured model, backend default, first listed.
    fn pick_model(&self, backend_default: Option<String>) -> Option<String> {
        if let Some(preferred) = &self.preferred_model {
            if self.models.iter().any(|m| &m.id == preferred) {
                return Some(preferred.clone());
            }
        }
        backend_default
            .filter(|id| self.models.iter().any(|m| &m.id == id))
            .or_else(|| self.models.first().map(|m| m.id.clone()))
    }

    fn submit_prompt(&mut self, ctx: &egui::Context) {
        let prompt = self.input_buffer.trim().to_string();
        let model = self.selected_model.clone();

        match self.state.begin_submit(&prompt, model.as_deref()) {
            Ok(request) => {
                self.backend.submit(request);
                self.input_buffer.clear();
                self.scroll_to_bottom = true;
                ctx.request_repaint();
            }
            Err(SubmitError::BlankPrompt) => {}
            Err(SubmitError::RequestInFlight) => {
                // The composer is disabled while generating; reaching this
                // means a race slipped through, so record it.
                warn!("prompt dropped: request already in flight");
                self.log_diagnostic("prompt dropped: a generation is already running");
            }
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        let (status_label, status_color) = self.status_chip();
        let generating = self.state.is_in_flight();

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("Playforge");
                ui.separator();
                ui.label(RichText::new(status_label).color(status_color));
                ui.separator();

                ui.add_enabled_ui(!generating, |ui| {
                    let selected_text = self
                        .selected_model
                        .as_deref()
                        .and_then(|id| {
                            self.models
                                .iter()
                                .find(|m| m.id == id)
                                .map(|m| m.name.clone())
                        })
                        .or_else(|| self.selected_model.clone())
                        .unwrap_or_else(|| "Backend default".to_string());

                    egui::ComboBox::from_id_salt("model_picker")
                        .selected_text(selected_text)
                        .show_ui(ui, |ui| {
                            for model in &self.models {
                                let label = if model.provider.is_empty() {
                                    model.name.clone()
                                } else {
                                    format!("{} ({})", model.name, model.provider)
                                };
                                ui.selectable_value(
                                    &mut self.selected_model,
                                    Some(model.id.clone()),
                                    label,
                                );
                            }
                        });

                    if ui.button("New Game").clicked() {
                        self.state.reset();
                        self.preview.clear();
                        self.load_error = None;
                        self.log_diagnostic("started a new game thread");
                    }
                });
            });
        });
    }

    fn render_history_panel(&mut self, ctx: &egui::Context) {
        let theme = self.theme.clone();
        let generating = self.state.is_in_flight();

        egui::SidePanel::left("history_panel")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("Conversations");
                    if ui.small_button("Refresh").clicked() {
                        self.backend.refresh_conversations();
                    }
                });
                ui.separator();

                if let Some(error) = &self.conversations_error {
                    ui.label(
                        RichText::new(format!("History unavailable: {error}"))
                            .color(theme.danger)
                            .small(),
                    );
                }
                if let Some(error) = &self.load_error {
                    ui.label(RichText::new(error.clone()).color(theme.danger).small());
                }
                if self.loading_conversation {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(RichText::new("Loading...").color(theme.text_muted));
                    });
                }

                let mut clicked_conversation: Option<String> = None;
                ui.add_enabled_ui(!generating && !self.loading_conversation, |ui| {
                    ScrollArea::vertical()
                        .id_salt("conversation_list")
                        .auto_shrink([false, false])
                        .show(ui, |ui| {
                            for summary in &self.conversations {
                                let title = if summary.intro.is_empty() {
                                    summary.conversation_id.clone()
                                } else {
                                    truncate_intro(&summary.intro)
                                };
                                if ui.button(title).clicked() {
                                    clicked_conversation = Some(summary.conversation_id.clone());
                                }
                                let mut meta = format!("{} turns", summary.messages);
                                if let Some(timestamp) = &summary.timestamp {
                                    meta = format!("{meta} · {timestamp}");
                                }
                                ui.label(RichText::new(meta).color(theme.text_muted).small());
                                ui.add_space(theme.spacing_4);
                            }
                        });
                });

                if let Some(conversation_id) = clicked_conversation {
                    self.loading_conversation = true;
                    self.load_error = None;
                    self.log_diagnostic(format!("loading conversation {conversation_id}"));
                    self.backend.load_conversation(conversation_id);
                }
            });
    }

    fn render_preview_panel(&mut self, ctx: &egui::Context) {
        let theme = self.theme.clone();

        egui::SidePanel::right("preview_panel")
            .resizable(true)
            .default_width(430.0)
            .show(ctx, |ui| {
                let action =
                    self.preview
                        .render(ui, &theme, self.state.versions(), self.state.selected_index());

                match action {
                    Some(PreviewAction::SelectVersion(index)) => {
                        if let Err(err) = self.state.select_version(index) {
                            warn!("version selection rejected: {err}");
                            self.log_diagnostic(format!("version selection rejected: {err}"));
                        }
                    }
                    Some(PreviewAction::ApplySource { version_id, files }) => {
                        match self.state.update_version_files(version_id, files) {
                            Ok(()) => {
                                self.log_diagnostic(format!(
                                    "applied source edits to v{}",
                                    version_id + 1
                                ));
                            }
                            Err(err) => {
                                self.log_diagnostic(format!("source edit rejected: {err}"));
                            }
                        }
                    }
                    None => {}
                }
            });
    }

    fn render_chat_panel(&mut self, ctx: &egui::Context) {
        let theme = self.theme.clone();
        let generating = self.state.is_in_flight();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Chat");
            ui.separator();

            let transcript_height = (ui.available_height() - 170.0).max(120.0);
            ScrollArea::vertical()
                .id_salt("chat_transcript")
                .max_height(transcript_height)
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    if self.state.messages().is_empty() && !generating {
                        ui.label(
                            RichText::new(
                                "Describe a game below and the backend will build a playable version.",
                            )
                            .color(theme.text_muted),
                        );
                    }

                    for message in self.state.messages() {
                        let prefix = match message.role {
                            MessageRole::User => "You",
                            MessageRole::Assistant => "Playforge",
                        };
                        let mut text = RichText::new(format!("[{prefix}] {}", message.content));
                        text = match message.status {
                            MessageStatus::Pending => text.color(theme.text_muted).italics(),
                            MessageStatus::Failed => text.color(theme.danger),
                            MessageStatus::Confirmed => match message.role {
                                MessageRole::User => text.color(theme.accent),
                                MessageRole::Assistant => text.color(theme.text_primary),
                            },
                        };
                        ui.label(text);
                    }

                    if generating {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label(
                                RichText::new("Generating your game...").color(theme.text_muted),
                            );
                        });
                    }

                    if self.scroll_to_bottom {
                        ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
                    }
                });
            self.scroll_to_bottom = false;

            ui.separator();
            egui::CollapsingHeader::new("Diagnostics")
                .default_open(false)
                .show(ui, |ui| {
                    ScrollArea::vertical()
                        .id_salt("diagnostics_log")
                        .max_height(90.0)
                        .stick_to_bottom(true)
                        .show(ui, |ui| {
                            for entry in &self.diagnostics_log {
                                ui.label(RichText::new(entry).small());
                            }
                        });
                });

            ui.separator();
            let hint = if generating {
                "Waiting for the backend..."
            } else {
                "Describe the game you want..."
            };

            let mut send_now = false;
            theme.composer_frame().show(ui, |ui| {
                ui.horizontal(|ui| {
                    let response = ui.add_enabled(
                        !generating,
                        egui::TextEdit::singleline(&mut self.input_buffer)
                            .desired_width(f32::INFINITY)
                            .hint_text(hint),
                    );
                    if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        send_now = true;
                    }

                    let clicked = ui
                        .add_enabled(
                            !generating && !self.input_buffer.trim().is_empty(),
                            egui::Button::new("Send"),
                        )
                        .clicked();
                    send_now |= clicked;
                });
            });

            if send_now && !generating {
                self.submit_prompt(ctx);
            }
        });
    }
}

impl eframe::App for PlayforgeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events(ctx);
        self.render_top_bar(ctx);
        self.render_history_panel(ctx);
        self.render_preview_panel(ctx);
        self.render_chat_panel(ctx);

        // Keep frames coming while work is outstanding so completion events
        // are drained promptly even without user input.
        if self.state.is_in_flight() || self.loading_conversation {
            ctx.request_repaint_after(std::time::Duration::from_millis(200));
        }
    }
}

fn truncate_intro(intro: &str) -> String {
    const MAX_CHARS: usize = 42;
    let mut out: String = intro.chars().take(MAX_CHARS).collect();
    if intro.chars().count() > MAX_CHARS {
        out.push('…');
    }
    out
}
