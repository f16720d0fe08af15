use crate::api::{ApiError, HealthStatus};
use crate::conversation::CompletedRequest;

/// Internal application events delivered to the UI loop from background tasks
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A chat request finished (successfully or not)
    ReplyReady(CompletedRequest),

    /// Result of the start-up `/health` probe
    HealthChecked(Result<HealthStatus, ApiError>),
}

/// Reachability of the answering service as shown in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// No probe has completed yet
    Unknown,
    /// `/health` answered and the assistant is initialized
    Online,
    /// `/health` answered but the assistant is not initialized
    Degraded,
    /// `/health` could not be reached
    Offline,
}

impl ServiceState {
    pub fn from_health(result: &Result<HealthStatus, ApiError>) -> Self {
        match result {
            Ok(health) if health.is_ready() => ServiceState::Online,
            Ok(_) => ServiceState::Degraded,
            Err(_) => ServiceState::Offline,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceState::Unknown => "comprobando...",
            ServiceState::Online => "conectado",
            ServiceState::Degraded => "servicio no inicializado",
            ServiceState::Offline => "sin conexión",
        }
    }
}
