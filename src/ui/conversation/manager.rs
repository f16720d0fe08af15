use crate::api::ChatService;
use crate::conversation::{CLEAR_PROMPT, Completion, ConversationStore, PendingRequest, Rejection};
use crate::events::AppEvent;
use crate::ui::conversation::{
    ComposerAction, ConfirmAnswer, ConfirmDialog, ConversationComposer, ConversationHistory, ParsedCommand,
    SlashCommand, Submission, get_help_text,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    widgets::Widget,
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Lines moved per PageUp/PageDown
const SCROLL_STEP: usize = 5;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// Ties the store, the composer and the chat service together for the UI loop
pub struct ConversationManager {
    store: ConversationStore,
    composer: ConversationComposer,
    service: Arc<dyn ChatService>,
    events: mpsc::UnboundedSender<AppEvent>,
    confirm: Option<ConfirmDialog>,
    notice: Option<String>,
    scroll_offset: usize,
}

impl ConversationManager {
    pub fn new(
        store: ConversationStore,
        service: Arc<dyn ChatService>,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            store,
            composer: ConversationComposer::new("Escribe tu pregunta aquí... (máx. 500 caracteres)"),
            service,
            events,
            confirm: None,
            notice: None,
            scroll_offset: 0,
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn composer(&self) -> &ConversationComposer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut ConversationComposer {
        &mut self.composer
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn is_confirming(&self) -> bool {
        self.confirm.is_some()
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        if let Some(dialog) = &self.confirm {
            match dialog.handle_key(key) {
                ConfirmAnswer::Pending => {}
                answer => self.finish_clear(answer == ConfirmAnswer::Yes),
            }
            return ConversationAction::None;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => return ConversationAction::Exit,
            KeyCode::Esc if self.composer.content().is_empty() => return ConversationAction::Exit,
            KeyCode::Esc => {
                self.composer.clear();
                return ConversationAction::None;
            }
            KeyCode::Char('n') if ctrl => {
                self.request_clear();
                return ConversationAction::None;
            }
            KeyCode::Char('r') if ctrl => {
                self.regenerate_latest();
                return ConversationAction::None;
            }
            KeyCode::PageUp => {
                self.scroll_offset = self.scroll_offset.saturating_add(SCROLL_STEP);
                return ConversationAction::None;
            }
            KeyCode::PageDown => {
                self.scroll_offset = self.scroll_offset.saturating_sub(SCROLL_STEP);
                return ConversationAction::None;
            }
            _ => {}
        }

        match self.composer.handle_key(key) {
            ComposerAction::Submit => self.submit(),
            ComposerAction::None => ConversationAction::None,
        }
    }

    /// Handle pasted text
    pub fn handle_paste(&mut self, text: &str) {
        if self.confirm.is_none() {
            self.composer.handle_paste(text);
        }
    }

    /// Apply an event coming back from a background task
    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::ReplyReady(completed) => {
                if let Completion::Replied(_) = self.store.complete(completed) {
                    self.scroll_offset = 0;
                }
                self.sync_composer();
            }
            AppEvent::HealthChecked(_) => {}
        }
    }

    /// Submit the composer's draft
    pub fn submit(&mut self) -> ConversationAction {
        match self.composer.submit(&mut self.store) {
            Submission::Sent(pending) => {
                self.notice = None;
                self.dispatch(pending);
                ConversationAction::None
            }
            Submission::Command(command) => self.handle_slash_command(command),
            Submission::Ignored => ConversationAction::None,
        }
    }

    /// Open the confirmation dialog for a new topic
    pub fn request_clear(&mut self) {
        self.confirm = Some(ConfirmDialog::new(CLEAR_PROMPT));
        self.composer.set_focus(false);
    }

    fn finish_clear(&mut self, confirmed: bool) {
        self.confirm = None;
        self.composer.set_focus(true);
        if self.store.clear_conversation(|_| confirmed) {
            self.notice = None;
            self.scroll_offset = 0;
        }
        self.sync_composer();
    }

    /// Regenerate the newest answer, or retry the question whose request failed
    pub fn regenerate_latest(&mut self) {
        let result = match self.store.regenerable_answer().map(|m| m.id().clone()) {
            Some(id) => self.store.regenerate(&id),
            None if self.store.unanswered_question().is_some() => self.store.retry_unanswered(),
            None => {
                self.notice = Some("Todavía no hay ninguna respuesta que regenerar.".to_string());
                return;
            }
        };

        match result {
            Ok(pending) => {
                self.notice = None;
                self.dispatch(pending);
            }
            Err(Rejection::RequestInFlight) => {}
            Err(other) => {
                tracing::warn!(reason = %other, "regenerate refused");
                self.notice = Some("No se pudo regenerar la respuesta.".to_string());
            }
        }
    }

    /// Run a pending request in the background and report back through the event channel
    fn dispatch(&mut self, pending: PendingRequest) {
        self.scroll_offset = 0;
        self.sync_composer();

        let service = Arc::clone(&self.service);
        let events = self.events.clone();
        tokio::spawn(async move {
            let completed = pending.execute(service.as_ref()).await;
            if events.send(AppEvent::ReplyReady(completed)).is_err() {
                tracing::debug!("UI loop gone, dropping reply");
            }
        });
    }

    /// Handle slash commands
    fn handle_slash_command(&mut self, command: ParsedCommand) -> ConversationAction {
        if self.store.is_awaiting_response() && !command.command.available_while_awaiting() {
            self.notice = Some(format!(
                "/{} no está disponible mientras EduBot responde.",
                command.command.command()
            ));
            return ConversationAction::None;
        }

        let ignored = command
            .argument()
            .map(|arg| format!("/{} no admite argumentos; se ignoró \"{}\".", command.command.command(), arg));

        let action = match command.command {
            SlashCommand::Nuevo => {
                self.request_clear();
                ConversationAction::None
            }
            SlashCommand::Regenerar => {
                self.regenerate_latest();
                ConversationAction::None
            }
            SlashCommand::Ayuda => {
                self.notice = Some(get_help_text());
                self.scroll_offset = 0;
                ConversationAction::None
            }
            SlashCommand::Salir => ConversationAction::Exit,
        };

        if let Some(ignored) = ignored {
            self.notice = Some(match self.notice.take() {
                Some(notice) => format!("{}\n{}", ignored, notice),
                None => ignored,
            });
        }
        action
    }

    fn sync_composer(&mut self) {
        self.composer.set_disabled(self.store.is_awaiting_response());
    }

    /// Render the conversation UI components
    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),    // History area
                Constraint::Length(5), // Composer area
            ])
            .split(area);

        ConversationHistory::new(self.store.messages())
            .awaiting(self.store.is_awaiting_response())
            .error(self.store.error())
            .notice(self.notice.as_deref())
            .scroll_offset(self.scroll_offset)
            .render(chunks[0], buf);

        self.composer.render(chunks[1], buf);

        if let Some(dialog) = &self.confirm {
            dialog.render(area, buf);
        }
    }
}
