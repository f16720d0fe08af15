use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};

/// Answer to a yes/no prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAnswer {
    Yes,
    No,
    /// Key did not answer the prompt
    Pending,
}

/// Modal yes/no prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmDialog {
    prompt: String,
}

impl ConfirmDialog {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }

    pub fn handle_key(&self, key: KeyEvent) -> ConfirmAnswer {
        if key.kind != KeyEventKind::Press {
            return ConfirmAnswer::Pending;
        }
        match key.code {
            KeyCode::Char('s' | 'S' | 'y' | 'Y') | KeyCode::Enter => ConfirmAnswer::Yes,
            KeyCode::Char('n' | 'N') | KeyCode::Esc => ConfirmAnswer::No,
            _ => ConfirmAnswer::Pending,
        }
    }
}

impl Widget for &ConfirmDialog {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let width = area.width.min(50);
        let height = area.height.min(6);
        let popup = Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + (area.height - height) / 2,
            width,
            height,
        };

        Clear.render(popup, buf);

        let text = vec![
            Line::from(Span::styled(
                self.prompt.as_str(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(vec![
                Span::styled("[S]í", Style::default().fg(Color::Green)),
                Span::raw("   "),
                Span::styled("[N]o", Style::default().fg(Color::Red)),
            ]),
        ];

        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" ✨ Nuevo tema ")
                    .border_style(Style::default().fg(Color::Yellow)),
            )
            .render(popup, buf);
    }
}
