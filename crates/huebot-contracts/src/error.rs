use thiserror::Error;

/// Failure taxonomy shared by every huebot crate.
///
/// Command-level variants (`InvalidColor`, `InvalidRegion`, `NotConfigured`) are caught by the
/// command interpreter; the rest propagate to whoever drives a render.
#[derive(Error, Debug)]
pub enum HueError {
    #[error("invalid color literal {0:?}, expected #RRGGBB")]
    InvalidColor(String),

    #[error("invalid region {0:?}")]
    InvalidRegion(String),

    #[error("no active image has been configured")]
    NotConfigured,

    #[error("color store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("event log unavailable: {0}")]
    EventLogUnavailable(String),

    #[error("failed to segment template {image}: {reason}")]
    SegmentationFailure { image: String, reason: String },

    #[error("blob {id} unavailable: {reason}")]
    BlobUnavailable { id: String, reason: String },
}

impl HueError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::StoreUnavailable(err.to_string())
    }

    pub fn event_log(err: impl std::fmt::Display) -> Self {
        Self::EventLogUnavailable(err.to_string())
    }

    pub fn segmentation(image: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::SegmentationFailure {
            image: image.into(),
            reason: reason.to_string(),
        }
    }

    pub fn blob(id: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::BlobUnavailable {
            id: id.into(),
            reason: reason.to_string(),
        }
    }

    /// Stable snake_case name, used in event payloads and chat replies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidColor(_) => "invalid_color",
            Self::InvalidRegion(_) => "invalid_region",
            Self::NotConfigured => "not_configured",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::EventLogUnavailable(_) => "event_log_unavailable",
            Self::SegmentationFailure { .. } => "segmentation_failure",
            Self::BlobUnavailable { .. } => "blob_unavailable",
        }
    }
}

pub type Result<T> = std::result::Result<T, HueError>;
