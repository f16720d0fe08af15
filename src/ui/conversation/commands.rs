use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Start a new topic (clears the conversation after confirmation)
    Nuevo,
    /// Ask again for the latest answer
    Regenerar,
    /// Show help
    Ayuda,
    /// Exit the application
    Salir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

impl ParsedCommand {
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Nuevo => "empezar un tema nuevo (borra la conversación)",
            SlashCommand::Regenerar => "pedir otra respuesta a la última pregunta",
            SlashCommand::Ayuda => "mostrar los comandos disponibles",
            SlashCommand::Salir => "cerrar EduBot",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }

    /// Whether this command can be run while an answer is pending.
    pub fn available_while_awaiting(self) -> bool {
        match self {
            SlashCommand::Nuevo | SlashCommand::Ayuda | SlashCommand::Salir => true,
            SlashCommand::Regenerar => false,
        }
    }
}

/// Parse a slash command from user input
///
/// Unknown commands return `None`, so the text is sent as an ordinary question.
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.split_whitespace();
    let head = parts.next()?.to_lowercase();
    let tail: Vec<&str> = parts.collect();

    let command = SlashCommand::from_str(&head).ok().or_else(|| match head.as_str() {
        "new" | "clear" => Some(SlashCommand::Nuevo),
        "regenerate" | "retry" => Some(SlashCommand::Regenerar),
        "help" | "h" | "?" => Some(SlashCommand::Ayuda),
        "bye" | "quit" | "q" | "exit" => Some(SlashCommand::Salir),
        _ => None,
    })?;

    let argument = if tail.is_empty() {
        None
    } else {
        Some(tail.join(" "))
    };

    Some(ParsedCommand { command, argument })
}

/// Get help text for all available commands and shortcuts
pub fn get_help_text() -> String {
    let mut help = String::from("Comandos disponibles:\n\n");
    for command in SlashCommand::iter() {
        help.push_str(&format!("/{} - {}\n", command.command(), command.description()));
    }

    help.push_str("\nAtajos: Enter envía, Shift+Enter o Alt+Enter inserta salto de línea,");
    help.push_str(" Ctrl+N tema nuevo, Ctrl+R regenerar, RePág/AvPág desplazar, Esc borra el borrador (o sale si está vacío), Ctrl+C salir.");

    help
}
