//! Minimal IRC line codec for Twitch-style chat.
//!
//! Only what the bot needs: keep-alive pings, channel messages, and the handful of lines it
//! sends. IRCv3 tag prefixes (`@key=value;... `) are skipped.

use super::command_registry::COMMAND_PREFIX;
use super::message::ChatMessage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrcEvent {
    Ping { token: String },
    Privmsg {
        sender: String,
        channel: String,
        text: String,
    },
    Other(String),
}

impl IrcEvent {
    /// Channel messages that carry a `!command` become a [`ChatMessage`] with the prefix
    /// removed. Everything else is chatter.
    pub fn into_command(self) -> Option<ChatMessage> {
        match self {
            IrcEvent::Privmsg {
                sender,
                channel,
                text,
            } => text
                .strip_prefix(COMMAND_PREFIX)
                .map(|command| ChatMessage::new(sender, channel, command)),
            _ => None,
        }
    }
}

/// `verb` as a whole word: `PING` matches `PING` and `PING :x`, never `PINGX`.
fn strip_verb<'a>(line: &'a str, verb: &str) -> Option<&'a str> {
    let tail = line.strip_prefix(verb)?;
    (tail.is_empty() || tail.starts_with(' ')).then_some(tail)
}

pub fn parse_line(line: &str) -> IrcEvent {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut rest = line;
    if rest.starts_with('@') {
        rest = match rest.split_once(' ') {
            Some((_, tail)) => tail,
            None => return IrcEvent::Other(line.to_string()),
        };
    }

    if let Some(token) = strip_verb(rest, "PING") {
        let token = token.trim_start();
        return IrcEvent::Ping {
            token: token.strip_prefix(':').unwrap_or(token).to_string(),
        };
    }

    let Some(prefixed) = rest.strip_prefix(':') else {
        return IrcEvent::Other(line.to_string());
    };
    let Some((source, tail)) = prefixed.split_once(' ') else {
        return IrcEvent::Other(line.to_string());
    };
    let Some(tail) = strip_verb(tail.trim_start(), "PRIVMSG") else {
        return IrcEvent::Other(line.to_string());
    };
    let Some((target, text)) = tail.trim_start().split_once(' ') else {
        return IrcEvent::Other(line.to_string());
    };
    let Some(text) = text.trim_start().strip_prefix(':') else {
        return IrcEvent::Other(line.to_string());
    };
    let sender = source.split('!').next().unwrap_or(source);
    IrcEvent::Privmsg {
        sender: sender.to_string(),
        channel: target.to_string(),
        text: text.to_string(),
    }
}

pub fn pass(oauth_token: &str) -> String {
    let token = oauth_token.trim();
    if token.starts_with("oauth:") {
        format!("PASS {token}")
    } else {
        format!("PASS oauth:{token}")
    }
}

pub fn nick(user: &str) -> String {
    format!("NICK {}", user.trim())
}

pub fn join(channel: &str) -> String {
    format!("JOIN {}", channel.trim())
}

pub fn pong(token: &str) -> String {
    format!("PONG :{token}")
}

pub fn privmsg(channel: &str, text: &str) -> String {
    // A newline inside the text would start a second IRC command.
    let text = text.replace(['\r', '\n'], " ");
    format!("PRIVMSG {channel} :{text}")
}

#[cfg(test)]
mod tests {
    use super::{parse_line, pass, pong, privmsg, IrcEvent};
    use crate::chat::ChatMessage;

    #[test]
    fn parse_ping() {
        assert_eq!(
            parse_line("PING :tmi.twitch.tv\r\n"),
            IrcEvent::Ping {
                token: "tmi.twitch.tv".to_string()
            }
        );
        assert_eq!(pong("tmi.twitch.tv"), "PONG :tmi.twitch.tv");
    }

    #[test]
    fn verbs_must_be_whole_words() {
        assert_eq!(
            parse_line("PING"),
            IrcEvent::Ping {
                token: String::new()
            }
        );
        assert_eq!(
            parse_line("PINGX :tmi.twitch.tv"),
            IrcEvent::Other("PINGX :tmi.twitch.tv".to_string())
        );
        assert!(matches!(
            parse_line(":bob!bob@bob.tmi.twitch.tv PRIVMSGX #art :!c #112233 4"),
            IrcEvent::Other(_)
        ));
    }

    #[test]
    fn parse_privmsg_command() {
        let event = parse_line(":alice!alice@alice.tmi.twitch.tv PRIVMSG #art :!c #112233 4\r\n");
        assert_eq!(
            event.clone().into_command(),
            Some(ChatMessage::new("alice", "#art", "c #112233 4"))
        );
        assert!(matches!(event, IrcEvent::Privmsg { .. }));
    }

    #[test]
    fn parse_privmsg_with_tags() {
        let event = parse_line(
            "@badge-info=;color=#FF0000;display-name=Bob :bob!bob@bob.tmi.twitch.tv PRIVMSG #art :!img cat.png",
        );
        assert_eq!(
            event.into_command(),
            Some(ChatMessage::new("bob", "#art", "img cat.png"))
        );
    }

    #[test]
    fn plain_chatter_is_not_a_command() {
        let event = parse_line(":carol!carol@carol.tmi.twitch.tv PRIVMSG #art :nice picture");
        assert_eq!(event.into_command(), None);
    }

    #[test]
    fn other_lines_pass_through() {
        let line = ":tmi.twitch.tv 001 huebot :Welcome, GLHF!";
        assert_eq!(parse_line(line), IrcEvent::Other(line.to_string()));
        assert_eq!(parse_line("garbage"), IrcEvent::Other("garbage".to_string()));
    }

    #[test]
    fn outbound_lines() {
        assert_eq!(pass("abc"), "PASS oauth:abc");
        assert_eq!(pass("oauth:abc"), "PASS oauth:abc");
        assert_eq!(
            privmsg("#art", "line one\nline two"),
            "PRIVMSG #art :line one line two"
        );
    }
}
