mod command_parser;
mod command_registry;
pub mod irc;
mod message;

pub use command_parser::{parse_command, ParsedCommand};
pub use command_registry::{help_text, CommandSpec, COMMANDS, COMMAND_PREFIX};
pub use message::ChatMessage;
