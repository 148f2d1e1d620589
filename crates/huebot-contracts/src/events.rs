//! Audit trail of everything chat changed and every render published.
//!
//! One [`EventRecord`] per line in a JSONL file. The `type`, `session_id` and `ts` fields are
//! always set by the log itself.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::error::{HueError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    ImageActivated {
        sender: String,
        image: String,
    },
    ColorSet {
        sender: String,
        image: String,
        region: u32,
        color: Rgb,
    },
    CommandRejected {
        sender: String,
        text: String,
        error: String,
        detail: String,
    },
    RenderFinished {
        render_id: String,
        image: String,
        region_count: usize,
        colored_regions: usize,
        skipped_regions: Vec<u32>,
        output_sha256: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub session_id: String,
    pub ts: String,
    #[serde(flatten)]
    pub event: Event,
}

/// Shared handle to one `events.jsonl`. Clones append through the same lock, so the chat
/// loop and the render thread can both record.
#[derive(Debug, Clone)]
pub struct EventLog {
    inner: Arc<EventLogInner>,
}

#[derive(Debug)]
struct EventLogInner {
    path: PathBuf,
    session_id: String,
    lock: Mutex<()>,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EventLogInner {
                path: path.into(),
                session_id: session_id.into(),
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn record(&self, event: Event) -> Result<EventRecord> {
        let record = EventRecord {
            session_id: self.inner.session_id.clone(),
            ts: now_utc_iso(),
            event,
        };
        let mut line = serde_json::to_string(&record).map_err(HueError::event_log)?;
        line.push('\n');

        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent).map_err(HueError::event_log)?;
        }
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| HueError::event_log("event log lock poisoned"))?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .map_err(HueError::event_log)?;
        Ok(record)
    }

    /// Audit logging must not block a command or a render; failures are only traced.
    pub fn record_quiet(&self, event: Event) {
        if let Err(err) = self.record(event) {
            tracing::warn!(error = %err, "failed to append event");
        }
    }
}

/// Reads a log back, skipping lines that are not event records.
pub fn read_events(path: &Path) -> Result<Vec<EventRecord>> {
    let raw = std::fs::read_to_string(path).map_err(HueError::event_log)?;
    Ok(raw
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

pub(crate) fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
