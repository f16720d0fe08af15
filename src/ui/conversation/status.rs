//! Typing indicator and error banner shown below the message log

use crate::api::ApiErrorKind;
use crate::conversation::ErrorNotice;
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use std::time::{SystemTime, UNIX_EPOCH};

/// Animated "EduBot is writing" line
pub fn typing_indicator() -> Line<'static> {
    let dots = match (SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        / 300)
        % 4
    {
        0 => ".",
        1 => "..",
        2 => "...",
        _ => "   ",
    };

    Line::from(vec![
        Span::styled("🤖 ", Style::default().fg(Color::Blue)),
        Span::styled("EduBot está escribiendo", Style::default().fg(Color::Blue)),
        Span::styled(dots, Style::default().fg(Color::Yellow)),
    ])
}

/// Banner lines for the most recent error
pub fn error_banner(notice: &ErrorNotice) -> Vec<Line<'static>> {
    let (icon, color) = banner_style(notice.kind);
    vec![
        Line::from(vec![
            Span::styled("▌ ", Style::default().fg(color)),
            Span::styled(
                format!("{} {}", icon, notice.message),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("▌ ", Style::default().fg(color)),
            Span::styled(
                "Pulsa Ctrl+R para reintentar o escribe otra pregunta.",
                Style::default().fg(Color::Gray),
            ),
        ]),
    ]
}

/// Icon and colour per error class
fn banner_style(kind: ApiErrorKind) -> (&'static str, Color) {
    match kind {
        ApiErrorKind::RateLimited => ("⏱", Color::Yellow),
        ApiErrorKind::ConnectivityFailure | ApiErrorKind::ServiceUnavailable => ("📡", Color::Magenta),
        ApiErrorKind::InternalServiceError
        | ApiErrorKind::RequestRejected
        | ApiErrorKind::ConfigurationFailure => ("❌", Color::Red),
    }
}

/// One-line informational notice (help output, refused actions)
pub fn info_line(message: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled("ℹ ", Style::default().fg(Color::Cyan)),
        Span::styled(message.to_string(), Style::default().fg(Color::Gray)),
    ])
}
