//! Conversation state: messages, turn-taking and request lifecycle

pub mod clock;
pub mod message;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use message::{Message, MessageId, Sender, WELCOME_TEXT};
pub use store::{
    CLEAR_PROMPT, CompletedRequest, Completion, ConversationStore, ErrorNotice, PendingRequest,
    Rejection, RequestOrigin, RequestTicket, SessionStatus, regenerable_answer,
};
