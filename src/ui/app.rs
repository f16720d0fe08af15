//! Interactive terminal client
//!
//! Owns the terminal, multiplexes keyboard input with replies arriving from
//! background tasks, and redraws after every change. All conversation state
//! lives in the [`ConversationManager`] and is only touched from this loop.

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{
    DisableBracketedPaste, EnableBracketedPaste, Event, EventStream, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::{Frame, Terminal};
use tokio::sync::mpsc;

use crate::api::ApiClient;
use crate::config::Config;
use crate::conversation::ConversationStore;
use crate::events::{AppEvent, ServiceState};
use crate::ui::conversation::{ConversationAction, ConversationManager};

/// Redraw interval so the typing indicator animates
const TICK: Duration = Duration::from_millis(300);

/// Main application state
pub struct App {
    running: bool,
    manager: ConversationManager,
    client: ApiClient,
    service_state: ServiceState,
    health_check_on_start: bool,
    events: mpsc::UnboundedSender<AppEvent>,
    event_rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl App {
    pub fn new(config: &Config, client: ApiClient) -> Self {
        let (events, event_rx) = mpsc::unbounded_channel();
        let mut manager = ConversationManager::new(
            ConversationStore::with_system_clock(),
            Arc::new(client.clone()),
            events.clone(),
        );
        manager.composer_mut().set_show_counter(config.ui.show_char_counter);

        Self {
            running: true,
            manager,
            client,
            service_state: ServiceState::Unknown,
            health_check_on_start: config.ui.health_check_on_start,
            events,
            event_rx,
        }
    }

    /// Take over the terminal, run until the user quits, then restore it
    pub async fn run_in_terminal(mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let _guard = TerminalGuard;
        self.run(&mut terminal).await
    }

    pub async fn run(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut event_stream = EventStream::new();
        let mut ticker = tokio::time::interval(TICK);

        if self.health_check_on_start {
            self.spawn_health_check();
        }

        tracing::info!(base_url = self.client.base_url(), "interactive session started");

        while self.running {
            terminal.draw(|frame| self.draw(frame)).context("Failed to draw frame")?;

            tokio::select! {
                maybe_event = event_stream.next() => {
                    match maybe_event {
                        Some(Ok(event)) => self.handle_terminal_event(event),
                        Some(Err(e)) => {
                            tracing::error!(error = %e, "terminal event stream failed");
                            return Err(e).context("Failed to read terminal events");
                        }
                        None => self.running = false,
                    }
                }
                Some(event) = self.event_rx.recv() => {
                    self.handle_app_event(event);
                }
                _ = ticker.tick() => {}
            }
        }

        tracing::info!("interactive session ended");
        Ok(())
    }

    fn handle_terminal_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if self.manager.handle_key(key) == ConversationAction::Exit {
                    self.running = false;
                }
            }
            Event::Paste(text) => self.manager.handle_paste(&text),
            _ => {}
        }
    }

    fn handle_app_event(&mut self, event: AppEvent) {
        if let AppEvent::HealthChecked(result) = &event {
            self.service_state = ServiceState::from_health(result);
            tracing::info!(state = self.service_state.display_name(), "health probe finished");
        }
        self.manager.handle_event(event);
    }

    fn spawn_health_check(&self) {
        let client = self.client.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = client.health().await;
            let _ = events.send(AppEvent::HealthChecked(result));
        });
    }

    fn draw(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(8)])
            .split(frame.size());

        self.draw_header(frame, chunks[0]);
        self.manager.render(chunks[1], frame.buffer_mut());
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let state_color = match self.service_state {
            ServiceState::Online => Color::Green,
            ServiceState::Degraded => Color::Yellow,
            ServiceState::Offline => Color::Red,
            ServiceState::Unknown => Color::DarkGray,
        };

        let header = Line::from(vec![
            Span::styled(
                " E ",
                Style::default().fg(Color::White).bg(Color::Blue).add_modifier(Modifier::BOLD),
            ),
            Span::styled(" EduBot", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(" · Tu Asistente de Estudio", Style::default().fg(Color::Gray)),
            Span::raw("   "),
            Span::styled(
                format!("● {}", self.service_state.display_name()),
                Style::default().fg(state_color),
            ),
        ]);

        frame.render_widget(
            Paragraph::new(header).block(Block::default().borders(Borders::BOTTOM)),
            area,
        );
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
        .context("Failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")
}

/// Restores the terminal on every exit path, including panics
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableBracketedPaste);
    }
}
