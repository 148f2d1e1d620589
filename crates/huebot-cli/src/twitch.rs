//! Twitch chat over its IRC-on-WebSocket endpoint.

use std::io;
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use huebot_contracts::chat::irc::{self, IrcEvent};
use huebot_engine::{CommandInterpreter, Outcome};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{connect as websocket_connect, Message as WsMessage, WebSocket};

pub const DEFAULT_SERVER: &str = "wss://irc-ws.chat.twitch.tv:443";
const RECONNECT_BACKOFF_MS: u64 = 1_000;
const RECONNECT_BACKOFF_MAX_MS: u64 = 30_000;
const GREETING: &str = "Color-bot is awaiting commands! Try !colorhelp";

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub server: String,
    pub user: String,
    pub oauth_token: String,
    pub channel: String,
    pub max_reconnects: usize,
}

/// Keeps a chat session alive, reconnecting with linear backoff after transport failures.
/// Gives up once `max_reconnects` consecutive attempts have failed.
pub fn run_bot(config: &ChatConfig, interpreter: &CommandInterpreter) -> Result<()> {
    let mut failures = 0usize;
    loop {
        match run_session(config, interpreter) {
            Ok(()) => {
                tracing::warn!("chat server closed the connection, reconnecting");
                failures = 0;
            }
            Err(err) => {
                failures += 1;
                if failures > config.max_reconnects {
                    return Err(err.context(format!(
                        "giving up after {failures} failed chat connections"
                    )));
                }
                tracing::warn!(error = %format!("{err:#}"), attempt = failures, "chat session failed");
            }
        }
        thread::sleep(reconnect_backoff(failures));
    }
}

fn reconnect_backoff(attempt: usize) -> Duration {
    let multiplier = u64::try_from(attempt.max(1)).unwrap_or(u64::MAX);
    Duration::from_millis(
        RECONNECT_BACKOFF_MS
            .saturating_mul(multiplier)
            .min(RECONNECT_BACKOFF_MAX_MS),
    )
}

fn run_session(config: &ChatConfig, interpreter: &CommandInterpreter) -> Result<()> {
    let (mut ws, _) = websocket_connect(config.server.as_str())
        .with_context(|| format!("failed to connect to {}", config.server))?;
    tracing::info!(server = %config.server, "connected to chat");

    send_line(&mut ws, &irc::pass(&config.oauth_token))?;
    send_line(&mut ws, &irc::nick(&config.user))?;
    send_line(&mut ws, &irc::join(&config.channel))?;
    send_line(&mut ws, &irc::privmsg(&config.channel, GREETING))?;
    tracing::info!(channel = %config.channel, "joined channel");

    loop {
        let frame = match ws.read() {
            Ok(frame) => frame,
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                return Ok(());
            }
            Err(tungstenite::Error::Io(err)) if err.kind() == io::ErrorKind::Interrupted => {
                continue;
            }
            Err(err) => return Err(err).context("chat read failed"),
        };
        let text = match frame {
            WsMessage::Text(text) => text.as_str().to_string(),
            WsMessage::Close(_) => return Ok(()),
            _ => continue,
        };
        for line in text.split("\r\n").filter(|line| !line.is_empty()) {
            handle_line(&mut ws, config, interpreter, line)?;
        }
    }
}

fn handle_line(
    ws: &mut Socket,
    config: &ChatConfig,
    interpreter: &CommandInterpreter,
    line: &str,
) -> Result<()> {
    match irc::parse_line(line) {
        IrcEvent::Ping { token } => {
            send_line(ws, &irc::pong(&token))?;
            tracing::debug!("ponged");
        }
        IrcEvent::Other(raw) => {
            if raw.contains("Login authentication failed") {
                bail!("chat login rejected: {raw}");
            }
            tracing::trace!(line = %raw, "ignoring server line");
        }
        event @ IrcEvent::Privmsg { .. } => {
            let Some(message) = event.into_command() else {
                return Ok(());
            };
            let outcome = interpreter.handle(&message);
            if let Some(reply) = outcome.reply() {
                send_line(ws, &irc::privmsg(&config.channel, reply))?;
            }
            if let Outcome::Rejected(err) = &outcome {
                tracing::debug!(kind = err.kind(), "rejected command answered with silence");
            }
        }
    }
    Ok(())
}

fn send_line(ws: &mut Socket, line: &str) -> Result<()> {
    ws.send(WsMessage::Text(line.to_string().into()))
        .context("failed to send chat line")
}
