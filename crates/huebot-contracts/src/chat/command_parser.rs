use super::command_registry::{CommandSpec, COLOR_COMMAND, HELP_COMMAND, IMAGE_COMMAND};
use crate::color::Rgb;
use crate::error::{HueError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    /// Blank input, or input that does not start with a command token.
    Noop,
    Help,
    SetColor { color: Rgb, region: u32 },
    ActivateImage { image: String },
    /// A known command whose argument list did not match its pattern.
    Malformed { command: String, args: String },
    Unknown { command: String, args: String },
}

fn is_command(command: &str, spec: CommandSpec) -> bool {
    command == spec.command
}

/// Base-10 digits only: no sign, no whitespace, no radix prefix.
fn parse_region(raw: &str) -> Result<u32> {
    if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(HueError::InvalidRegion(raw.to_string()));
    }
    raw.parse::<u32>()
        .map_err(|_| HueError::InvalidRegion(raw.to_string()))
}

/// Parses one command line with its `!` prefix already removed.
///
/// Tokens are matched case-sensitively. Bad color or region literals are errors; a wrong
/// argument count is reported as [`ParsedCommand::Malformed`] so callers can log and move on.
pub fn parse_command(text: &str) -> Result<ParsedCommand> {
    let text = text.trim_end_matches(['\r', '\n']);
    let command_len = text
        .char_indices()
        .find(|(_, ch)| ch.is_whitespace())
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    if command_len == 0 {
        return Ok(ParsedCommand::Noop);
    }
    let command = &text[..command_len];
    let rest = &text[command_len..];
    let args: Vec<&str> = rest.split_whitespace().collect();

    if is_command(command, HELP_COMMAND) {
        return Ok(ParsedCommand::Help);
    }

    if is_command(command, COLOR_COMMAND) {
        let [color, region, ..] = args.as_slice() else {
            return Ok(ParsedCommand::Malformed {
                command: command.to_string(),
                args: rest.trim().to_string(),
            });
        };
        let color = Rgb::parse_hex(color)?;
        let region = parse_region(region)?;
        return Ok(ParsedCommand::SetColor { color, region });
    }

    if is_command(command, IMAGE_COMMAND) {
        let Some(image) = args.first() else {
            return Ok(ParsedCommand::Malformed {
                command: command.to_string(),
                args: String::new(),
            });
        };
        return Ok(ParsedCommand::ActivateImage {
            image: (*image).to_string(),
        });
    }

    Ok(ParsedCommand::Unknown {
        command: command.to_string(),
        args: rest.trim().to_string(),
    })
}
