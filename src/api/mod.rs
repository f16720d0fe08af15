//! Client side of the EduBot answering service

pub mod client;
pub mod error;

pub use client::{ApiClient, ChatRequest, ChatResponse, ChatService, HealthStatus, Reply};
pub use error::{ApiError, ApiErrorKind};
