//! Source polling loops.
//!
//! One watcher runs for the process lifetime, sampling its source on a
//! fixed interval and handing new images to the pipeline. A single bad
//! read never stops polling; only configuration problems caught before
//! the loop starts are fatal.

use crate::change_detector::{file_key, images_identical, SeenFiles};
use crate::clipboard::SystemClipboard;
use crate::pipeline::Pipeline;
use crate::types::{RelayError, SourceMode};
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Polls the configured source and feeds new images to the pipeline
pub struct Watcher {
    mode: SourceMode,
    delay: Duration,
    verbose: bool,
    pipeline: Arc<Pipeline>,
}

impl Watcher {
    pub fn new(mode: SourceMode, delay: Duration, verbose: bool, pipeline: Arc<Pipeline>) -> Self {
        Self {
            mode,
            delay,
            verbose,
            pipeline,
        }
    }

    /// Run the poll loop. Does not return under normal operation.
    pub async fn run(self) -> Result<(), RelayError> {
        match self.mode.clone() {
            SourceMode::Clipboard => self.watch_clipboard().await,
            SourceMode::Directory(dir) => self.watch_directory(&dir).await,
        }
    }

    async fn watch_clipboard(self) -> Result<(), RelayError> {
        info!("reading from clipboard");

        let clipboard = SystemClipboard::new();
        let mut previous: Option<DynamicImage> = None;
        let mut ticker = tokio::time::interval(self.delay);

        loop {
            ticker.tick().await;

            let fetched = match clipboard.read_image() {
                Ok(image) => image,
                Err(e) if e.is_transient() => {
                    if self.verbose {
                        warn!("error while reading from clipboard ({})", e);
                    } else {
                        debug!("transient clipboard error: {}", e);
                    }
                    None
                }
                Err(e) => {
                    warn!("error while reading from clipboard ({})", e);
                    None
                }
            };

            if let Some(image) = fetched.as_ref() {
                if !images_identical(Some(image), previous.as_ref()) {
                    self.pipeline.handle(image).await;
                }
            }

            // The previous snapshot tracks the latest fetch outcome even
            // on failure paths, so repeated failed reads do not re-trigger.
            previous = fetched;
        }
    }

    async fn watch_directory(self, dir: &Path) -> Result<(), RelayError> {
        let mut seen = SeenFiles::new();
        let preexisting = seen.record_existing(dir)?;
        info!(
            "reading from directory {:?} ({} existing entries ignored)",
            dir, preexisting
        );

        let mut ticker = tokio::time::interval(self.delay);

        loop {
            ticker.tick().await;
            self.scan_directory(dir, &mut seen).await;
        }
    }

    /// One directory poll tick: process every entry not seen before, in
    /// discovery order. Entries that fail to decode stay recorded so they
    /// are not retried.
    pub async fn scan_directory(&self, dir: &Path, seen: &mut SeenFiles) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("failed to list directory {:?}: {}", dir, e);
                return;
            }
        };

        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!("failed to read directory entry: {}", e);
                    continue;
                }
            };

            let key = match file_key(&path) {
                Ok(key) => key,
                Err(e) => {
                    warn!("failed to stat {:?}: {}", path, e);
                    continue;
                }
            };

            if !seen.record(key) {
                continue;
            }

            match image::open(&path) {
                Ok(image) => self.pipeline.handle(&image).await,
                Err(e) => {
                    warn!("error while reading file {:?}: {}", path, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::SubscriberRegistry;
    use crate::ocr::Recognizer;
    use crate::sink::ResultSink;
    use crate::types::SinkTarget;
    use async_trait::async_trait;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::path::PathBuf;

    struct FixedRecognizer(&'static str);

    #[async_trait]
    impl Recognizer for FixedRecognizer {
        async fn recognize(&self, _image: &DynamicImage) -> Result<String, RelayError> {
            Ok(self.0.to_string())
        }
    }

    fn sample_image() -> DynamicImage {
        let mut img = RgbImage::new(8, 8);
        for pixel in img.pixels_mut() {
            *pixel = Rgb([10, 20, 30]);
        }
        DynamicImage::ImageRgb8(img)
    }

    fn file_sink_watcher(dir: PathBuf, out: PathBuf, text: &'static str) -> Watcher {
        let sink = ResultSink::new(SinkTarget::File(out), Arc::new(SubscriberRegistry::new()));
        let pipeline = Arc::new(Pipeline::new(Arc::new(FixedRecognizer(text)), sink));
        Watcher::new(
            SourceMode::Directory(dir),
            Duration::from_millis(10),
            false,
            pipeline,
        )
    }

    #[tokio::test]
    async fn test_startup_files_are_never_processed() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        sample_image().save(dir.path().join("existing.png")).unwrap();

        let watcher = file_sink_watcher(dir.path().to_path_buf(), out.clone(), "text");
        let mut seen = SeenFiles::new();
        seen.record_existing(dir.path()).unwrap();

        watcher.scan_directory(dir.path(), &mut seen).await;

        assert!(!out.exists(), "pre-existing file must not be processed");
    }

    #[tokio::test]
    async fn test_new_file_is_processed_once() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");

        let watcher = file_sink_watcher(dir.path().to_path_buf(), out.clone(), "found");
        let mut seen = SeenFiles::new();
        seen.record_existing(dir.path()).unwrap();

        sample_image().save(dir.path().join("new.png")).unwrap();

        watcher.scan_directory(dir.path(), &mut seen).await;
        watcher.scan_directory(dir.path(), &mut seen).await;

        // The output file itself becomes a directory entry after the first
        // scan, but it fails to decode and is recorded without processing
        let contents = std::fs::read_to_string(&out).unwrap();
        assert_eq!(contents, "found\n");
    }

    #[tokio::test]
    async fn test_corrupt_file_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");

        let watcher = file_sink_watcher(dir.path().to_path_buf(), out.clone(), "text");
        let mut seen = SeenFiles::new();
        seen.record_existing(dir.path()).unwrap();

        std::fs::write(dir.path().join("corrupt.png"), b"not an image").unwrap();

        watcher.scan_directory(dir.path(), &mut seen).await;
        let recorded = seen.len();
        watcher.scan_directory(dir.path(), &mut seen).await;

        assert!(!out.exists());
        assert_eq!(seen.len(), recorded, "corrupt file must stay recorded");
    }

    #[tokio::test]
    async fn test_touched_file_is_processed_again() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");

        let watcher = file_sink_watcher(dir.path().to_path_buf(), out.clone(), "again");
        let mut seen = SeenFiles::new();
        seen.record_existing(dir.path()).unwrap();

        let image_path = dir.path().join("shot.png");
        sample_image().save(&image_path).unwrap();
        watcher.scan_directory(dir.path(), &mut seen).await;

        // Bump the modification time well past filesystem granularity
        let future = std::time::SystemTime::now() + Duration::from_secs(5);
        let file = std::fs::File::options().append(true).open(&image_path).unwrap();
        file.set_modified(future).unwrap();
        drop(file);

        watcher.scan_directory(dir.path(), &mut seen).await;

        let contents = std::fs::read_to_string(&out).unwrap();
        assert_eq!(contents, "again\nagain\n");
    }
}
