use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Fixed welcome text seeded at start-up and after every clear
pub const WELCOME_TEXT: &str = "Hola! Soy tu Asistente de Estudio\n\nEstoy aqui para ayudarte a comprender mejor el material del curso. Tengo acceso a todos los apuntes y documentos academicos.\n\nPuedo ayudarte a:\n- Explicar conceptos del temario\n- Aclarar dudas especificas\n- Repasar temas antes del examen\n- Relacionar ideas entre diferentes temas\n\nRecuerda: aprenderas mejor si razonamos juntos. No estoy aqui para hacer tu tarea, sino para guiarte.\n\nQue tema quieres explorar hoy?";

/// Opaque identifier of a message, unique within a session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Reserved id of the bootstrap message
    pub const WELCOME: &'static str = "welcome";

    pub fn welcome() -> Self {
        Self(Self::WELCOME.to_string())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn is_welcome(&self) -> bool {
        self.0 == Self::WELCOME
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Author of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// A single turn in the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: MessageId,
    content: String,
    sender: Sender,
    timestamp: DateTime<Local>,
}

impl Message {
    pub fn user(content: impl Into<String>, timestamp: DateTime<Local>) -> Self {
        Self {
            id: MessageId::generate(),
            content: content.into(),
            sender: Sender::User,
            timestamp,
        }
    }

    pub fn bot(content: impl Into<String>, timestamp: DateTime<Local>) -> Self {
        Self {
            id: MessageId::generate(),
            content: content.into(),
            sender: Sender::Bot,
            timestamp,
        }
    }

    /// The bootstrap message
    pub fn welcome(timestamp: DateTime<Local>) -> Self {
        Self {
            id: MessageId::welcome(),
            content: WELCOME_TEXT.to_string(),
            sender: Sender::Bot,
            timestamp,
        }
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn is_bot(&self) -> bool {
        self.sender == Sender::Bot
    }

    pub fn is_welcome(&self) -> bool {
        self.id.is_welcome()
    }

    /// `HH:MM` label shown next to the message
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }
}
