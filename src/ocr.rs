//! OCR engine integration.
//!
//! The recognition model is an external collaborator: a black-box
//! `recognize(image) -> text` capability behind the [`Recognizer`] trait.
//! [`CommandRecognizer`] shells out to an OCR binary that takes an image
//! path and prints a JSON result; anything implementing the trait works,
//! which is what the tests rely on.

use crate::types::RelayError;
use async_trait::async_trait;
use image::DynamicImage;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::process::Command;
use tracing::{debug, error};

/// A black-box text recognition capability
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Recognize text in an image. May be slow (seconds); errors abort the
    /// current image's handling only, never the poll loop.
    async fn recognize(&self, image: &DynamicImage) -> Result<String, RelayError>;
}

/// OCR engine that runs an external binary per image.
///
/// The image is written to a temporary PNG, the binary is invoked as
/// `<binary> --image <path> --json`, and its stdout is expected to be a
/// JSON object with a `text` field (or an `error` field on failure).
pub struct CommandRecognizer {
    /// Path to the OCR engine binary
    binary_path: PathBuf,
    /// Distinguishes concurrent temp files
    sequence: AtomicU64,
}

impl CommandRecognizer {
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            sequence: AtomicU64::new(0),
        }
    }

    /// Search common locations for the OCR engine binary
    pub fn default_binary_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));

        let paths = [
            exe_dir.join("ocr-engine"),
            PathBuf::from("/usr/local/bin/ocr-engine"),
        ];

        for path in paths {
            if path.exists() {
                return path;
            }
        }

        // Fallback; fails with a clear error at first use
        PathBuf::from("ocr-engine")
    }

    /// Check if the binary is available
    pub fn is_available(&self) -> bool {
        let exists = self.binary_path.exists();
        if !exists {
            debug!(
                "OCR engine binary not found at: {}",
                self.binary_path.display()
            );
        }
        exists
    }

    fn temp_image_path(&self) -> PathBuf {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("ocr_relay_{}_{}.png", std::process::id(), seq))
    }
}

#[async_trait]
impl Recognizer for CommandRecognizer {
    async fn recognize(&self, image: &DynamicImage) -> Result<String, RelayError> {
        if !self.is_available() {
            return Err(RelayError::Recognition(format!(
                "OCR engine binary not found at {}",
                self.binary_path.display()
            )));
        }

        let temp_path = self.temp_image_path();
        image.save(&temp_path)?;

        let output = Command::new(&self.binary_path)
            .arg("--image")
            .arg(&temp_path)
            .arg("--json")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        // Remove the temp file before inspecting the result
        let _ = std::fs::remove_file(&temp_path);
        let output = output?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("OCR engine failed: {}", stderr);
            return Err(RelayError::Recognition(stderr.to_string()));
        }

        parse_response(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse the OCR engine's JSON stdout into recognized text
fn parse_response(stdout: &str) -> Result<String, RelayError> {
    let result: serde_json::Value = serde_json::from_str(stdout).map_err(|e| {
        RelayError::Recognition(format!("failed to parse OCR output: {e} - raw: {stdout}"))
    })?;

    if let Some(error) = result["error"].as_str() {
        return Err(RelayError::Recognition(error.to_string()));
    }

    Ok(result["text"].as_str().unwrap_or("").to_string())
}
