//! Conversation state store
//!
//! Owns the ordered message log, the session status and the most recent
//! error. All mutation happens through the operations below, on a single
//! logical thread. Remote calls are described by a [`PendingRequest`] that the
//! caller executes elsewhere and feeds back through [`ConversationStore::complete`].

use std::sync::Arc;

use thiserror::Error;

use crate::api::{ApiError, ApiErrorKind, ChatService, Reply};
use crate::conversation::clock::{Clock, SystemClock};
use crate::conversation::message::{Message, MessageId, Sender};

/// Turn-taking state of the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    Idle,
    AwaitingResponse,
    Errored,
}

impl SessionStatus {
    pub fn is_awaiting(self) -> bool {
        self == SessionStatus::AwaitingResponse
    }
}

/// Most recent failure, kept for display until the next attempt or clear
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNotice {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl From<&ApiError> for ErrorNotice {
    fn from(err: &ApiError) -> Self {
        Self {
            kind: err.kind,
            message: err.message.clone(),
        }
    }
}

/// Identity of an issued request
///
/// `generation` changes on every confirmed clear, so results of requests
/// issued before a reset never land in the new conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket {
    generation: u64,
    sequence: u64,
}

/// Why a request was issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOrigin {
    /// A new user turn
    Send,
    /// A resend of the user turn that produced this bot message
    Regenerate(MessageId),
    /// A resend of this user turn, whose earlier attempt got no answer
    Retry(MessageId),
}

/// A request the store has accepted and is waiting on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub ticket: RequestTicket,
    pub text: String,
    pub origin: RequestOrigin,
}

/// Outcome of executing a [`PendingRequest`]
#[derive(Debug, Clone)]
pub struct CompletedRequest {
    pub ticket: RequestTicket,
    pub result: Result<Reply, ApiError>,
}

impl PendingRequest {
    /// Run the request against a chat service
    pub async fn execute(self, service: &dyn ChatService) -> CompletedRequest {
        let result = service.send(&self.text).await;
        CompletedRequest {
            ticket: self.ticket,
            result,
        }
    }
}

/// Reasons a send or regenerate is refused without touching state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("message is empty")]
    EmptyMessage,
    #[error("a response is still pending")]
    RequestInFlight,
    #[error("no message with id {0}")]
    UnknownMessage(MessageId),
    #[error("message {0} was not written by the bot")]
    NotABotMessage(MessageId),
    #[error("no user question precedes message {0}")]
    NoPrecedingUserTurn(MessageId),
    #[error("a later question follows message {0}")]
    LaterTurnExists(MessageId),
    #[error("the last question already has an answer")]
    NothingToRetry,
}

/// What applying a completed request did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// A bot message was appended
    Replied(MessageId),
    /// The request failed and the error notice was recorded
    Failed(ErrorNotice),
    /// The result belonged to a request the store no longer waits on
    Discarded,
}

pub struct ConversationStore {
    messages: Vec<Message>,
    status: SessionStatus,
    error: Option<ErrorNotice>,
    generation: u64,
    next_sequence: u64,
    in_flight: Option<RequestTicket>,
    clock: Arc<dyn Clock>,
}

impl ConversationStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let mut store = Self {
            messages: Vec::new(),
            status: SessionStatus::Idle,
            error: None,
            generation: 0,
            next_sequence: 0,
            in_flight: None,
            clock,
        };
        store.initialize();
        store
    }

    /// Store backed by the wall clock
    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    /// Reset to the bootstrap state: `[welcome]`, idle, no error
    pub fn initialize(&mut self) {
        self.messages.clear();
        self.messages.push(Message::welcome(self.clock.now()));
        self.status = SessionStatus::Idle;
        self.error = None;
        self.in_flight = None;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn error(&self) -> Option<&ErrorNotice> {
        self.error.as_ref()
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.status.is_awaiting()
    }

    /// Answer that `regenerate` would currently accept, if any
    pub fn regenerable_answer(&self) -> Option<&Message> {
        regenerable_answer(&self.messages)
    }

    /// User turn left without an answer by a failed request
    pub fn unanswered_question(&self) -> Option<&Message> {
        self.messages.last().filter(|m| m.sender() == Sender::User)
    }

    /// Append a user turn and issue a request for its answer
    pub fn send_user_message(&mut self, text: &str) -> Result<PendingRequest, Rejection> {
        if text.trim().is_empty() {
            return Err(Rejection::EmptyMessage);
        }
        if self.status.is_awaiting() {
            tracing::debug!("send rejected: response pending");
            return Err(Rejection::RequestInFlight);
        }

        self.messages.push(Message::user(text, self.clock.now()));
        let pending = self.begin_request(text.to_string(), RequestOrigin::Send);
        tracing::info!(
            sequence = pending.ticket.sequence,
            chars = text.chars().count(),
            "user message sent"
        );
        Ok(pending)
    }

    /// Ask again for the answer to the user turn behind a bot message
    ///
    /// The question is the nearest user message before `message_id`; earlier
    /// regenerated answers in between are skipped. Only answers in the trailing
    /// run of bot messages qualify, so the new answer always lands right after
    /// its question. The welcome message has no question and cannot be
    /// regenerated.
    pub fn regenerate(&mut self, message_id: &MessageId) -> Result<PendingRequest, Rejection> {
        if self.status.is_awaiting() {
            tracing::debug!("regenerate rejected: response pending");
            return Err(Rejection::RequestInFlight);
        }

        let index = self
            .messages
            .iter()
            .position(|m| m.id() == message_id)
            .ok_or_else(|| Rejection::UnknownMessage(message_id.clone()))?;

        if self.messages[index].sender() != Sender::Bot {
            return Err(Rejection::NotABotMessage(message_id.clone()));
        }
        if self.messages[index + 1..].iter().any(|m| m.sender() == Sender::User) {
            tracing::debug!(message_id = %message_id, "regenerate rejected: later question exists");
            return Err(Rejection::LaterTurnExists(message_id.clone()));
        }

        let question = self.messages[..index]
            .iter()
            .rev()
            .find(|m| !m.is_bot() || m.is_welcome())
            .filter(|m| m.sender() == Sender::User)
            .map(|m| m.content().to_string())
            .ok_or_else(|| Rejection::NoPrecedingUserTurn(message_id.clone()))?;

        if question.trim().is_empty() {
            return Err(Rejection::EmptyMessage);
        }

        let pending = self.begin_request(question, RequestOrigin::Regenerate(message_id.clone()));
        tracing::info!(
            sequence = pending.ticket.sequence,
            message_id = %message_id,
            "regenerating answer"
        );
        Ok(pending)
    }

    /// Resend the last user turn after its request failed, without appending it again
    pub fn retry_unanswered(&mut self) -> Result<PendingRequest, Rejection> {
        if self.status.is_awaiting() {
            return Err(Rejection::RequestInFlight);
        }

        let (id, question) = self
            .unanswered_question()
            .map(|m| (m.id().clone(), m.content().to_string()))
            .ok_or(Rejection::NothingToRetry)?;

        let pending = self.begin_request(question, RequestOrigin::Retry(id.clone()));
        tracing::info!(sequence = pending.ticket.sequence, message_id = %id, "retrying unanswered question");
        Ok(pending)
    }

    /// Apply the outcome of a request issued by this store
    pub fn complete(&mut self, completed: CompletedRequest) -> Completion {
        if self.in_flight != Some(completed.ticket) {
            tracing::debug!(
                generation = completed.ticket.generation,
                current_generation = self.generation,
                sequence = completed.ticket.sequence,
                "discarding stale response"
            );
            return Completion::Discarded;
        }
        self.in_flight = None;

        match completed.result {
            Ok(reply) => {
                let message = Message::bot(reply.text, self.clock.now());
                let id = message.id().clone();
                self.messages.push(message);
                self.status = SessionStatus::Idle;
                tracing::info!(sequence = completed.ticket.sequence, "bot reply appended");
                Completion::Replied(id)
            }
            Err(err) => {
                let notice = ErrorNotice::from(&err);
                self.status = SessionStatus::Errored;
                self.error = Some(notice.clone());
                tracing::warn!(
                    sequence = completed.ticket.sequence,
                    kind = err.kind.label(),
                    "request failed: {}",
                    err.message
                );
                Completion::Failed(notice)
            }
        }
    }

    /// Discard the conversation and reseed the welcome message, if `confirm` agrees
    ///
    /// Returns whether the conversation was cleared. A declined confirmation
    /// leaves every piece of state untouched.
    pub fn clear_conversation<F>(&mut self, confirm: F) -> bool
    where
        F: FnOnce(&str) -> bool,
    {
        if !confirm(CLEAR_PROMPT) {
            tracing::debug!("clear declined");
            return false;
        }

        let discarded = self.messages.len();
        self.generation += 1;
        self.initialize();
        tracing::info!(discarded, generation = self.generation, "conversation cleared");
        true
    }

    fn begin_request(&mut self, text: String, origin: RequestOrigin) -> PendingRequest {
        let ticket = RequestTicket {
            generation: self.generation,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        self.in_flight = Some(ticket);
        self.status = SessionStatus::AwaitingResponse;
        self.error = None;

        PendingRequest {
            ticket,
            text,
            origin,
        }
    }
}

/// Newest message, when it is a non-welcome bot answer
///
/// Any earlier answer is followed by a user turn or is itself superseded, so
/// this is the only one worth offering for regeneration.
pub fn regenerable_answer(messages: &[Message]) -> Option<&Message> {
    messages.last().filter(|m| m.is_bot() && !m.is_welcome())
}

/// Question put to the user before a clear
pub const CLEAR_PROMPT: &str = "Quieres empezar una nueva conversacion?";
