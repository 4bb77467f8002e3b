//! Core types used throughout the relay.
//!
//! This module defines the source/sink configuration values, the
//! recognition result, and the error taxonomy.

use std::path::PathBuf;
use std::time::Duration;

/// Unique identifier for a live subscriber connection
pub type SubscriberId = u64;

/// Where input images are read from, fixed for the process lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMode {
    /// Poll the system clipboard for image snapshots
    Clipboard,
    /// Poll a directory for files appearing after startup
    Directory(PathBuf),
}

impl SourceMode {
    /// Parse the configured source string.
    ///
    /// `"clipboard"` selects clipboard polling; anything else must be a
    /// path to an existing directory.
    pub fn parse(value: &str) -> Result<Self, RelayError> {
        if value == "clipboard" {
            return Ok(SourceMode::Clipboard);
        }

        let path = PathBuf::from(value);
        if path.is_dir() {
            Ok(SourceMode::Directory(path))
        } else {
            Err(RelayError::InvalidSource(format!(
                "source must be \"clipboard\" or a path to a directory, got {value:?}"
            )))
        }
    }
}

/// Where recognized text is written, fixed for the process lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
    /// Overwrite the system clipboard
    Clipboard,
    /// Push to every connected live subscriber
    Broadcast,
    /// Append to a text file, one result per line
    File(PathBuf),
}

impl SinkTarget {
    /// Parse the configured sink string.
    ///
    /// Reserved keywords are `"clipboard"` and `"live-broadcast"`; a path
    /// ending in `.txt` selects the file sink. Anything else is a
    /// configuration error, reported before the first write.
    pub fn parse(value: &str) -> Result<Self, RelayError> {
        match value {
            "clipboard" => Ok(SinkTarget::Clipboard),
            "live-broadcast" => Ok(SinkTarget::Broadcast),
            path if path.ends_with(".txt") => Ok(SinkTarget::File(PathBuf::from(path))),
            other => Err(RelayError::InvalidSink(format!(
                "sink must be \"clipboard\", \"live-broadcast\" or a .txt path, got {other:?}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SinkTarget::Clipboard => "clipboard",
            SinkTarget::Broadcast => "live-broadcast",
            SinkTarget::File(_) => "file",
        }
    }
}

/// One recognized text plus how long the OCR call took
#[derive(Debug, Clone)]
pub struct RecognitionResult {
    /// Recognized text
    pub text: String,
    /// Wall-clock duration of the OCR call
    pub elapsed: Duration,
}

/// Errors that can occur in the relay
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("invalid source: {0}")]
    InvalidSource(String),

    #[error("invalid sink: {0}")]
    InvalidSink(String),

    #[error("clipboard error: {0}")]
    Clipboard(String),

    #[error("recognition failed: {0}")]
    Recognition(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
