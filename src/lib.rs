//! OCR Relay - background text recognition orchestrator
//!
//! This crate watches an input source for new images and relays recognized
//! text to a configured destination:
//!
//! - **Clipboard source**: polls the system clipboard for a new image
//! - **Directory source**: polls a directory for files that appear after startup
//!
//! Recognized text goes to exactly one sink: the system clipboard, an
//! append-only text file, or every subscriber connected to a local TCP
//! push channel.
//!
//! # Architecture
//!
//! The poll loop, the subscriber accept loop, and per-subscriber send paths
//! run as independent tokio tasks. The only shared state is the subscriber
//! registry, which is owned explicitly and injected where needed. The OCR
//! engine itself is an external collaborator behind the [`Recognizer`] trait.

pub mod broadcast;
pub mod change_detector;
pub mod clipboard;
pub mod config;
pub mod ocr;
pub mod pipeline;
pub mod sink;
pub mod types;
pub mod watcher;

// Re-export commonly used types
pub use broadcast::{BroadcastServer, SubscriberRegistry};
pub use change_detector::{file_key, images_identical, FileKey, SeenFiles};
pub use clipboard::SystemClipboard;
pub use config::Config;
pub use ocr::{CommandRecognizer, Recognizer};
pub use pipeline::Pipeline;
pub use sink::ResultSink;
pub use types::{RecognitionResult, RelayError, SinkTarget, SourceMode, SubscriberId};
pub use watcher::Watcher;
