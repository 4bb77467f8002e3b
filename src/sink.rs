//! Result sink dispatch.
//!
//! Each recognized text is written to exactly one destination, chosen by
//! the validated [`SinkTarget`]. The file sink opens in append mode per
//! write and drops the handle immediately; no handle is retained between
//! results.

use crate::broadcast::SubscriberRegistry;
use crate::clipboard::SystemClipboard;
use crate::types::{RelayError, SinkTarget};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Writes recognized text to the configured destination
pub struct ResultSink {
    target: SinkTarget,
    clipboard: SystemClipboard,
    registry: Arc<SubscriberRegistry>,
}

impl ResultSink {
    pub fn new(target: SinkTarget, registry: Arc<SubscriberRegistry>) -> Self {
        Self {
            target,
            clipboard: SystemClipboard::new(),
            registry,
        }
    }

    pub fn target(&self) -> &SinkTarget {
        &self.target
    }

    /// Write one recognized text to the sink
    pub async fn write(&self, text: &str) -> Result<(), RelayError> {
        match &self.target {
            SinkTarget::Clipboard => self
                .clipboard
                .write_text(text)
                .map_err(|e| RelayError::Clipboard(e.to_string())),

            SinkTarget::File(path) => {
                let mut file = tokio::fs::OpenOptions::new()
                    .append(true)
                    .create(true)
                    .open(path)
                    .await?;
                file.write_all(text.as_bytes()).await?;
                file.write_all(b"\n").await?;
                file.flush().await?;
                Ok(())
            }

            SinkTarget::Broadcast => {
                let delivered = self.registry.broadcast(text).await;
                debug!("broadcast delivered to {} subscriber(s)", delivered);
                Ok(())
            }
        }
    }
}
