use crate::conversation::{ConversationStore, PendingRequest, Rejection};
use crate::ui::conversation::commands::{ParsedCommand, parse_slash_command};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Maximum draft length in Unicode code points
pub const MAX_DRAFT_CHARS: usize = 500;

/// What a key press asks the owner of the composer to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerAction {
    /// The commit keystroke was pressed
    Submit,
    /// Nothing beyond a draft edit
    None,
}

/// Result of submitting the draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The draft was handed to the store and a request is pending
    Sent(PendingRequest),
    /// The draft was a slash command
    Command(ParsedCommand),
    /// Nothing happened (empty draft, or an answer is still pending)
    Ignored,
}

/// State for the text area within the composer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextAreaState {
    pub content: String,
    /// Cursor position in characters, not bytes
    pub cursor_position: usize,
}

impl TextAreaState {
    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map(|(offset, _)| offset)
            .unwrap_or(self.content.len())
    }
}

/// Draft buffer for the next question
#[derive(Debug, Clone)]
pub struct ConversationComposer {
    state: TextAreaState,
    placeholder: String,
    has_focus: bool,
    disabled: bool,
    show_counter: bool,
}

impl ConversationComposer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            state: TextAreaState::default(),
            placeholder: placeholder.into(),
            has_focus: true,
            disabled: false,
            show_counter: true,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerAction {
        if key.kind != KeyEventKind::Press {
            return ComposerAction::None;
        }

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) {
                    self.insert_char('\n');
                } else if key.modifiers.is_empty() {
                    return ComposerAction::Submit;
                }
            }
            KeyCode::Char(c) => {
                if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
                    self.insert_char(c);
                }
            }
            KeyCode::Backspace => {
                self.backspace();
            }
            KeyCode::Delete => {
                self.delete();
            }
            KeyCode::Left => {
                self.state.cursor_position = self.state.cursor_position.saturating_sub(1);
            }
            KeyCode::Right => {
                if self.state.cursor_position < self.state.char_count() {
                    self.state.cursor_position += 1;
                }
            }
            KeyCode::Home => {
                self.state.cursor_position = 0;
            }
            KeyCode::End => {
                self.state.cursor_position = self.state.char_count();
            }
            _ => {}
        }

        ComposerAction::None
    }

    /// Insert pasted text, keeping only the prefix that fits the limit
    ///
    /// Returns the number of characters accepted.
    pub fn handle_paste(&mut self, text: &str) -> usize {
        let room = MAX_DRAFT_CHARS.saturating_sub(self.state.char_count());
        let accepted: String = text.chars().filter(|c| *c != '\r').take(room).collect();
        let count = accepted.chars().count();

        if count > 0 {
            let offset = self.state.byte_offset(self.state.cursor_position);
            self.state.content.insert_str(offset, &accepted);
            self.state.cursor_position += count;
        }
        if count < text.chars().filter(|c| *c != '\r').count() {
            tracing::debug!(accepted = count, "paste truncated at draft limit");
        }

        count
    }

    /// Hand the draft to the store
    ///
    /// The draft is cleared only when it was actually sent or run as a command.
    pub fn submit(&mut self, store: &mut ConversationStore) -> Submission {
        if self.state.content.trim().is_empty() {
            return Submission::Ignored;
        }

        if let Some(command) = parse_slash_command(&self.state.content) {
            self.clear();
            return Submission::Command(command);
        }

        if store.is_awaiting_response() {
            return Submission::Ignored;
        }

        match store.send_user_message(&self.state.content) {
            Ok(pending) => {
                self.clear();
                Submission::Sent(pending)
            }
            Err(Rejection::EmptyMessage | Rejection::RequestInFlight) => Submission::Ignored,
            Err(other) => {
                tracing::warn!(reason = %other, "unexpected rejection of draft");
                Submission::Ignored
            }
        }
    }

    /// Insert a character at the cursor position, unless the draft is full
    fn insert_char(&mut self, c: char) -> bool {
        if self.state.char_count() >= MAX_DRAFT_CHARS {
            return false;
        }
        let offset = self.state.byte_offset(self.state.cursor_position);
        self.state.content.insert(offset, c);
        self.state.cursor_position += 1;
        true
    }

    /// Delete character before cursor
    fn backspace(&mut self) -> bool {
        if self.state.cursor_position > 0 {
            self.state.cursor_position -= 1;
            let offset = self.state.byte_offset(self.state.cursor_position);
            self.state.content.remove(offset);
            true
        } else {
            false
        }
    }

    /// Delete character at cursor
    fn delete(&mut self) -> bool {
        if self.state.cursor_position < self.state.char_count() {
            let offset = self.state.byte_offset(self.state.cursor_position);
            self.state.content.remove(offset);
            true
        } else {
            false
        }
    }

    /// Set focus state
    pub fn set_focus(&mut self, has_focus: bool) {
        self.has_focus = has_focus;
    }

    /// Reflect whether submission is currently possible
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn set_show_counter(&mut self, show: bool) {
        self.show_counter = show;
    }

    /// Get current content
    pub fn content(&self) -> &str {
        &self.state.content
    }

    /// Draft length in code points, for the `n/500` counter
    pub fn char_count(&self) -> usize {
        self.state.char_count()
    }

    pub fn cursor_position(&self) -> usize {
        self.state.cursor_position
    }

    /// Whether the commit keystroke would currently do anything
    pub fn can_submit(&self) -> bool {
        !self.disabled && !self.state.content.trim().is_empty()
    }

    /// Clear content
    pub fn clear(&mut self) {
        self.state = TextAreaState::default();
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let state = &self.state;

        let border_style = if self.disabled {
            Style::default().fg(Color::DarkGray)
        } else if self.has_focus {
            Style::default().fg(Color::Blue)
        } else {
            Style::default().fg(Color::Gray)
        };

        let title = if self.disabled {
            " ⏳ Esperando respuesta... "
        } else if self.can_submit() {
            " ➤ Tu pregunta (Enter para enviar) "
        } else {
            " ➤ Tu pregunta "
        };

        let mut block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(border_style);

        if self.show_counter && !state.content.is_empty() {
            let counter_style = if state.char_count() >= MAX_DRAFT_CHARS {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            block = block.title(
                ratatui::widgets::block::Title::from(Span::styled(
                    format!(" {}/{} ", state.char_count(), MAX_DRAFT_CHARS),
                    counter_style,
                ))
                .alignment(Alignment::Right)
                .position(ratatui::widgets::block::Position::Bottom),
            );
        }

        let inner_area = block.inner(area);
        block.render(area, buf);

        if inner_area.height == 0 {
            return;
        }

        // Render content or placeholder
        if state.content.is_empty() {
            let placeholder_line = Line::from(vec![Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
            return;
        }

        let mut content = state.content.clone();
        if self.has_focus {
            content.insert(state.byte_offset(state.cursor_position), '▌');
        }

        let lines: Vec<&str> = content.split('\n').collect();
        let height = inner_area.height as usize;
        let start = lines.len().saturating_sub(height);
        let text_style = if self.disabled {
            Style::default().fg(Color::Gray)
        } else {
            Style::default()
        };

        for (i, line_text) in lines[start..].iter().enumerate() {
            let line = Line::from(vec![Span::styled(*line_text, text_style)]);
            buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
        }
    }
}
