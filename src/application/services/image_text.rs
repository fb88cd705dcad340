use std::path::Path;
use tracing::{instrument, warn};

use crate::domain::ports::OcrEngine;

/// Runs OCR over a local image and joins the recognized blocks with newlines.
///
/// Never fails: any decoding or recognition error is logged and yields an
/// empty string.
#[instrument(skip(ocr), fields(image = %image.display()))]
pub async fn extract_text_from_image(ocr: &dyn OcrEngine, image: &Path) -> String {
    match ocr.recognize(image).await {
        Ok(blocks) => blocks.join("\n"),
        Err(e) => {
            warn!(error = %e, "Error extracting text from image");
            String::new()
        }
    }
}
