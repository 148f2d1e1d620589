use std::sync::Arc;

use huebot_contracts::chat::{help_text, parse_command, ChatMessage, ParsedCommand};
use huebot_contracts::events::{Event, EventLog};
use huebot_contracts::store::ColorStore;
use huebot_contracts::{HueError, Result, Rgb};

use crate::blob::BlobStore;
use crate::segment::{decode_template, segment};

/// How `c` commands treat region indices the active template may not have.
#[derive(Clone, Default)]
pub enum RegionCheck {
    /// Store any index; out-of-range entries are skipped at render time.
    #[default]
    Lazy,
    /// Segment the active template per command and reject indices past its region count.
    Eager(Arc<dyn BlobStore>),
}

impl std::fmt::Debug for RegionCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionCheck::Lazy => f.write_str("Lazy"),
            RegionCheck::Eager(_) => f.write_str("Eager"),
        }
    }
}

/// What happened to one inbound message.
#[derive(Debug)]
pub enum Outcome {
    /// Addressed to a channel other than the configured one; never parsed.
    OffChannel,
    /// Blank, unknown, or malformed. Logged only.
    Ignored,
    Help(String),
    ColorSet { image: String, region: u32, color: Rgb },
    ImageActivated { image: String },
    Rejected(HueError),
}

impl Outcome {
    /// Text to send back to the channel, if any.
    pub fn reply(&self) -> Option<&str> {
        match self {
            Outcome::Help(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Outcome::ColorSet { .. } | Outcome::ImageActivated { .. }
        )
    }
}

/// Applies chat commands from one channel to the color store.
///
/// `handle` never fails: every error is logged and folded into an [`Outcome`], so a bad
/// message can not take down the chat loop.
pub struct CommandInterpreter {
    channel: String,
    store: Arc<dyn ColorStore>,
    region_check: RegionCheck,
    events: Option<EventLog>,
}

impl CommandInterpreter {
    pub fn new(channel: impl Into<String>, store: Arc<dyn ColorStore>) -> Self {
        Self {
            channel: channel.into(),
            store,
            region_check: RegionCheck::Lazy,
            events: None,
        }
    }

    pub fn with_region_check(mut self, region_check: RegionCheck) -> Self {
        self.region_check = region_check;
        self
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = Some(events);
        self
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn handle(&self, message: &ChatMessage) -> Outcome {
        if message.channel != self.channel {
            tracing::trace!(channel = %message.channel, "dropping message from other channel");
            return Outcome::OffChannel;
        }

        match self.apply(message) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::info!(
                    sender = %message.sender,
                    text = %message.text,
                    error = %err,
                    "command rejected"
                );
                self.record(Event::CommandRejected {
                    sender: message.sender.clone(),
                    text: message.text.clone(),
                    error: err.kind().to_string(),
                    detail: err.to_string(),
                });
                Outcome::Rejected(err)
            }
        }
    }

    fn apply(&self, message: &ChatMessage) -> Result<Outcome> {
        match parse_command(&message.text)? {
            ParsedCommand::Noop => Ok(Outcome::Ignored),
            ParsedCommand::Help => Ok(Outcome::Help(help_text())),
            ParsedCommand::SetColor { color, region } => {
                let image = self.store.get_active_image()?;
                self.check_region(&image, region)?;
                self.store.set_color(&image, region, color)?;
                tracing::info!(sender = %message.sender, image = %image, region, color = %color, "color set");
                self.record(Event::ColorSet {
                    sender: message.sender.clone(),
                    image: image.clone(),
                    region,
                    color,
                });
                Ok(Outcome::ColorSet {
                    image,
                    region,
                    color,
                })
            }
            ParsedCommand::ActivateImage { image } => {
                self.store.activate(&image)?;
                tracing::info!(sender = %message.sender, image = %image, "image activated");
                self.record(Event::ImageActivated {
                    sender: message.sender.clone(),
                    image: image.clone(),
                });
                Ok(Outcome::ImageActivated { image })
            }
            ParsedCommand::Malformed { command, args } => {
                tracing::info!(sender = %message.sender, command = %command, args = %args, "bad arguments");
                Ok(Outcome::Ignored)
            }
            ParsedCommand::Unknown { command, .. } => {
                tracing::info!(sender = %message.sender, command = %command, "unknown command");
                Ok(Outcome::Ignored)
            }
        }
    }

    fn check_region(&self, image: &str, region: u32) -> Result<()> {
        let RegionCheck::Eager(blobs) = &self.region_check else {
            return Ok(());
        };
        let template = decode_template(image, &blobs.read_template(image)?)?;
        let region_count = segment(&template).region_count();
        if region as usize >= region_count {
            return Err(HueError::InvalidRegion(format!(
                "{region} (template has {region_count} regions)"
            )));
        }
        Ok(())
    }

    fn record(&self, event: Event) {
        if let Some(events) = &self.events {
            events.record_quiet(event);
        }
    }
}
