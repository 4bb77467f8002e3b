//! System clipboard adapter.
//!
//! Wraps arboard for cross-platform clipboard access and classifies its
//! failures: a clipboard holding no image is simply `None`, expected
//! platform hiccups (content in a format we cannot convert, clipboard
//! briefly held by another process) are transient, and everything else is
//! unexpected. The poller decides how loudly each class is logged; none
//! of them stop polling.

use image::{DynamicImage, RgbaImage};

/// Errors from clipboard access
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    /// Expected, recoverable failure; quiet unless verbose logging is on
    #[error("transient clipboard error: {0}")]
    Transient(String),

    /// Unexpected platform failure; always logged as a warning
    #[error("clipboard platform error: {0}")]
    Platform(String),
}

impl ClipboardError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ClipboardError::Transient(_))
    }
}

/// Handle to the system clipboard.
///
/// arboard contexts are created per call rather than held across await
/// points, matching how the underlying platform handles behave.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }

    /// Fetch the current clipboard snapshot as an image.
    ///
    /// Returns `Ok(None)` when the clipboard holds no image at all.
    pub fn read_image(&self) -> Result<Option<DynamicImage>, ClipboardError> {
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|e| ClipboardError::Platform(e.to_string()))?;

        let data = match clipboard.get_image() {
            Ok(data) => data,
            Err(arboard::Error::ContentNotAvailable) => return Ok(None),
            Err(e @ arboard::Error::ConversionFailure)
            | Err(e @ arboard::Error::ClipboardOccupied) => {
                return Err(ClipboardError::Transient(e.to_string()));
            }
            Err(e) => return Err(ClipboardError::Platform(e.to_string())),
        };

        let (width, height) = (data.width as u32, data.height as u32);
        match RgbaImage::from_raw(width, height, data.bytes.into_owned()) {
            Some(buffer) => Ok(Some(DynamicImage::ImageRgba8(buffer))),
            None => Err(ClipboardError::Transient(format!(
                "clipboard image data does not match {width}x{height}"
            ))),
        }
    }

    /// Overwrite the clipboard with `text`
    pub fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|e| ClipboardError::Platform(e.to_string()))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| ClipboardError::Platform(e.to_string()))
    }
}
