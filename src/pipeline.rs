//! Recognition pipeline: OCR call timing, logging, sink dispatch.
//!
//! One accepted image produces at most one OCR call and at most one sink
//! write. A recognition failure aborts that image's handling only; the
//! poll loop keeps running.

use crate::ocr::Recognizer;
use crate::sink::ResultSink;
use crate::types::{RecognitionResult, RelayError};
use image::DynamicImage;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Orchestrates the OCR call and result delivery for one image at a time
pub struct Pipeline {
    recognizer: Arc<dyn Recognizer>,
    sink: ResultSink,
}

impl Pipeline {
    pub fn new(recognizer: Arc<dyn Recognizer>, sink: ResultSink) -> Self {
        Self { recognizer, sink }
    }

    /// Recognize one image and deliver the text to the sink.
    ///
    /// Failures are logged and isolated to this image.
    pub async fn handle(&self, image: &DynamicImage) {
        let result = match self.recognize(image).await {
            Ok(result) => result,
            Err(e) => {
                error!("recognition failed: {}", e);
                return;
            }
        };

        if let Err(e) = self.sink.write(&result.text).await {
            warn!("sink write failed: {}", e);
        }
    }

    /// Run the timed OCR call and log the outcome
    async fn recognize(&self, image: &DynamicImage) -> Result<RecognitionResult, RelayError> {
        let start = Instant::now();
        let text = self.recognizer.recognize(image).await?;
        let elapsed = start.elapsed();

        info!("text recognized in {:.3} s: {}", elapsed.as_secs_f64(), text);

        Ok(RecognitionResult { text, elapsed })
    }
}
