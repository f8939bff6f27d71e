//! Error types shared across Clipforge crates.

use std::path::PathBuf;

/// Top-level error type for Clipforge operations.
#[derive(Debug, thiserror::Error)]
pub enum ClipforgeError {
    #[error("Parsing error `{path}`: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Composition error: {message}")]
    Schema { message: String },

    #[error("Unable to read asset {location}: {message}")]
    AssetResolution { location: String, message: String },

    #[error("Timeline error: {message}")]
    Timeline { message: String },

    #[error("Unable to save project to {location}: {message}")]
    Persistence { location: String, message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ClipforgeError.
pub type ClipforgeResult<T> = Result<T, ClipforgeError>;

impl ClipforgeError {
    pub fn parse(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema {
            message: msg.into(),
        }
    }

    pub fn asset(location: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::AssetResolution {
            location: location.into(),
            message: msg.into(),
        }
    }

    pub fn timeline(msg: impl Into<String>) -> Self {
        Self::Timeline {
            message: msg.into(),
        }
    }

    pub fn persistence(location: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Persistence {
            location: location.into(),
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error belongs to the compile phase (parse, schema,
    /// asset, timeline, persistence) and must stop the run.
    pub fn is_compile_phase(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. }
                | Self::Schema { .. }
                | Self::AssetResolution { .. }
                | Self::Timeline { .. }
                | Self::Persistence { .. }
        )
    }
}
