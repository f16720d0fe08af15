//! Conversation UI components for chat interface

pub mod commands;
pub mod composer;
pub mod confirm;
pub mod history;
pub mod manager;
pub mod status;

pub use commands::{ParsedCommand, SlashCommand, get_help_text, parse_slash_command};
pub use composer::{ComposerAction, ConversationComposer, MAX_DRAFT_CHARS, Submission};
pub use confirm::{ConfirmAnswer, ConfirmDialog};
pub use history::ConversationHistory;
pub use manager::{ConversationAction, ConversationManager};
