/// Chat messages are only treated as commands when they start with this prefix.
pub const COMMAND_PREFIX: char = '!';

#[derive(Clone, Copy, Debug)]
pub struct CommandSpec {
    pub command: &'static str,
    pub usage: &'static str,
}

pub(crate) const HELP_COMMAND: CommandSpec = CommandSpec {
    command: "colorhelp",
    usage: "!colorhelp",
};

pub(crate) const COLOR_COMMAND: CommandSpec = CommandSpec {
    command: "c",
    usage: "!c #RRGGBB X",
};

pub(crate) const IMAGE_COMMAND: CommandSpec = CommandSpec {
    command: "img",
    usage: "!img XYZ.png",
};

pub const COMMANDS: &[CommandSpec] = &[HELP_COMMAND, COLOR_COMMAND, IMAGE_COMMAND];

/// Reply sent for `colorhelp`.
pub fn help_text() -> String {
    format!("Commands: {}, {}", COLOR_COMMAND.usage, IMAGE_COMMAND.usage)
}

#[cfg(test)]
mod tests {
    use super::{help_text, COMMANDS};

    #[test]
    fn help_lists_user_commands() {
        assert_eq!(help_text(), "Commands: !c #RRGGBB X, !img XYZ.png");
    }

    #[test]
    fn command_tokens_are_unique() {
        for (idx, spec) in COMMANDS.iter().enumerate() {
            assert!(COMMANDS[idx + 1..]
                .iter()
                .all(|other| other.command != spec.command));
        }
    }
}
