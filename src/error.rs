//! Error types for cloudblock.

use thiserror::Error;

/// Error type for cloudblock operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The persisted range collection could not be decoded
    #[error("corrupt range collection under key {key}: {reason}")]
    CorruptCollection { key: String, reason: String },

    /// A range feed could not be downloaded
    #[error("download error ({source_name}): {message}")]
    Download {
        source_name: String,
        message: String,
    },

    /// A range feed document could not be understood
    #[error("feed parse error ({source_name}): {message}")]
    FeedParse {
        source_name: String,
        message: String,
    },

    /// Unknown range source name
    #[error("unknown range source: {0}")]
    UnknownSource(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn download(source_name: &str, message: impl std::fmt::Display) -> Self {
        Error::Download {
            source_name: source_name.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn feed_parse(source_name: &str, message: impl std::fmt::Display) -> Self {
        Error::FeedParse {
            source_name: source_name.to_string(),
            message: message.to_string(),
        }
    }
}

/// Result type alias for cloudblock operations.
pub type Result<T> = std::result::Result<T, Error>;
