//! Conversation history display component

use crate::conversation::{ErrorNotice, Message, Sender, regenerable_answer};
use crate::ui::conversation::status::{error_banner, info_line, typing_indicator};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget, Widget},
};

/// Read-only view of the conversation for one frame
pub struct ConversationHistory<'a> {
    messages: &'a [Message],
    awaiting: bool,
    error: Option<&'a ErrorNotice>,
    notice: Option<&'a str>,
    /// Lines scrolled up from the bottom
    scroll_offset: usize,
}

impl<'a> ConversationHistory<'a> {
    pub fn new(messages: &'a [Message]) -> Self {
        Self {
            messages,
            awaiting: false,
            error: None,
            notice: None,
            scroll_offset: 0,
        }
    }

    pub fn awaiting(mut self, awaiting: bool) -> Self {
        self.awaiting = awaiting;
        self
    }

    pub fn error(mut self, error: Option<&'a ErrorNotice>) -> Self {
        self.error = error;
        self
    }

    pub fn notice(mut self, notice: Option<&'a str>) -> Self {
        self.notice = notice;
        self
    }

    pub fn scroll_offset(mut self, offset: usize) -> Self {
        self.scroll_offset = offset;
        self
    }

    /// All lines of the log, oldest first
    pub fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let mut all_lines: Vec<Line<'static>> = Vec::new();
        let hinted = regenerable_answer(self.messages)
            .filter(|_| !self.awaiting)
            .map(|m| m.id());

        for message in self.messages {
            let can_regenerate = hinted == Some(message.id());
            all_lines.extend(render_message(message, width, can_regenerate));
            // spacing between messages
            all_lines.push(Line::from(""));
        }

        if self.awaiting {
            all_lines.push(typing_indicator());
            all_lines.push(Line::from(""));
        }

        if let Some(error) = self.error {
            all_lines.extend(error_banner(error));
            all_lines.push(Line::from(""));
        }

        if let Some(notice) = self.notice {
            for line in notice.lines() {
                all_lines.push(info_line(line));
            }
        }

        all_lines
    }
}

impl Widget for ConversationHistory<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" 💬 Conversación ");

        let inner_area = block.inner(area);
        block.render(area, buf);

        let all_lines = self.lines(inner_area.width);

        // Determine the range of lines to display, anchored at the bottom
        let height = inner_area.height as usize;
        let total = all_lines.len();
        let max_offset = total.saturating_sub(height);
        let offset = self.scroll_offset.min(max_offset);
        let start = max_offset - offset;
        let end = (start + height).min(total);

        for (i, line) in all_lines[start..end].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }

        if max_offset > 0 {
            let mut scroll_state = ScrollbarState::new(max_offset).position(start);
            Scrollbar::default()
                .orientation(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .render(area, buf, &mut scroll_state);
        }
    }
}

/// Render a single message into lines
fn render_message(message: &Message, width: u16, can_regenerate: bool) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let (author, header_style) = match message.sender() {
        Sender::Bot => ("🤖 EduBot", Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD)),
        Sender::User => ("👤 Tú", Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)),
    };

    let mut header = vec![
        Span::styled(author, header_style),
        Span::styled(format!(" · {}", message.time_label()), Style::default().fg(Color::DarkGray)),
    ];
    if can_regenerate {
        header.push(Span::styled(
            "  [Ctrl+R Regenerar]",
            Style::default().fg(Color::DarkGray),
        ));
    }
    lines.push(Line::from(header));

    let content_style = match message.sender() {
        Sender::Bot => Style::default(),
        Sender::User => Style::default().fg(Color::Magenta),
    };
    for content_line in wrap_text(message.content(), width.saturating_sub(2) as usize) {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(content_line, content_style),
        ]));
    }

    lines
}

/// Columns a tab expands to
const TAB_WIDTH: usize = 4;

/// Wrap text to fit within the given width, keeping the author's line breaks
///
/// Leading indentation survives and is repeated on continuation lines (capped
/// at half the width). Words longer than a line are split by characters.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return text.lines().map(str::to_string).collect();
    }

    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r').replace('\t', &" ".repeat(TAB_WIDTH));
        let body = paragraph.trim_start();
        let indent_width = (paragraph.chars().count() - body.chars().count()).min(width / 2);
        let indent = " ".repeat(indent_width);

        let mut current_line = indent.clone();
        let mut current_width = indent_width;

        for word in body.split_whitespace() {
            let word_width = word.chars().count();
            if current_width > indent_width && current_width + 1 + word_width > width {
                lines.push(std::mem::replace(&mut current_line, indent.clone()));
                current_width = indent_width;
            }
            if current_width > indent_width {
                current_line.push(' ');
                current_width += 1;
            }

            let mut rest: Vec<char> = word.chars().collect();
            while current_width + rest.len() > width {
                let room = width - current_width;
                current_line.extend(rest.drain(..room));
                lines.push(std::mem::replace(&mut current_line, indent.clone()));
                current_width = indent_width;
            }
            current_width += rest.len();
            current_line.extend(rest);
        }

        lines.push(current_line);
    }

    lines
}
