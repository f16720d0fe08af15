//! Classified failures of the chat API

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a call to the answering service, with its classification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

/// Taxonomy bucket assigned to a failed remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiErrorKind {
    /// 429 from the service
    RateLimited,
    /// 503 from the service
    ServiceUnavailable,
    /// 500 from the service
    InternalServiceError,
    /// Any other non-2xx, or a 2xx body that is not a chat reply
    RequestRejected,
    /// No response received (connect failure, timeout, dropped body)
    ConnectivityFailure,
    /// The request could not be built
    ConfigurationFailure,
}

impl ApiErrorKind {
    /// User-facing message used when the service supplies nothing better
    pub fn default_message(self) -> &'static str {
        match self {
            ApiErrorKind::RateLimited => "Demasiadas solicitudes. Por favor, espera un momento.",
            ApiErrorKind::ServiceUnavailable => "Servicio no disponible temporalmente.",
            ApiErrorKind::InternalServiceError => "Error interno del servidor.",
            ApiErrorKind::RequestRejected => "Error en la solicitud.",
            ApiErrorKind::ConnectivityFailure => {
                "No se pudo conectar con el servidor. Verifica tu conexión."
            }
            ApiErrorKind::ConfigurationFailure => "Error al configurar la solicitud.",
        }
    }

    /// Short label for logs and the status bar
    pub fn label(self) -> &'static str {
        match self {
            ApiErrorKind::RateLimited => "rate-limited",
            ApiErrorKind::ServiceUnavailable => "service-unavailable",
            ApiErrorKind::InternalServiceError => "internal-error",
            ApiErrorKind::RequestRejected => "request-rejected",
            ApiErrorKind::ConnectivityFailure => "connectivity",
            ApiErrorKind::ConfigurationFailure => "configuration",
        }
    }
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Error carrying the kind's standard message
    pub fn of_kind(kind: ApiErrorKind) -> Self {
        Self::new(kind, kind.default_message())
    }

    pub fn connectivity() -> Self {
        Self::of_kind(ApiErrorKind::ConnectivityFailure)
    }

    pub fn configuration() -> Self {
        Self::of_kind(ApiErrorKind::ConfigurationFailure)
    }

    /// Response body that could not be read as a chat reply
    pub fn invalid_reply() -> Self {
        Self::new(
            ApiErrorKind::RequestRejected,
            "Respuesta inválida del servidor.",
        )
    }

    /// Classify a non-2xx response from its status and raw body
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        match status.as_u16() {
            429 => Self::of_kind(ApiErrorKind::RateLimited),
            503 => Self::of_kind(ApiErrorKind::ServiceUnavailable),
            500 => Self::of_kind(ApiErrorKind::InternalServiceError),
            _ => match server_detail(body) {
                Some(detail) => Self::new(ApiErrorKind::RequestRejected, detail),
                None => Self::of_kind(ApiErrorKind::RequestRejected),
            },
        }
    }

    /// Classify a transport-level failure where no usable response arrived
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_builder() {
            Self::configuration()
        } else {
            Self::connectivity()
        }
    }
}

/// Extract a string `detail` field from an error body, if the service sent one
fn server_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let detail = value.get("detail")?.as_str()?.trim();
    if detail.is_empty() {
        None
    } else {
        Some(detail.to_string())
    }
}
