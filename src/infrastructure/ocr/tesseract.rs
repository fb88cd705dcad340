use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::domain::{ports::OcrEngine, DomainError};

/// Runs the `tesseract` executable on an image and splits its output into
/// text blocks.
pub struct TesseractOcr {
    binary: PathBuf,
    languages: String,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<PathBuf>, languages: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            languages: languages.into(),
        }
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("tesseract", "rus+eng")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Tiff,
    Webp,
}

fn sniff_format(header: &[u8]) -> Option<ImageFormat> {
    match header {
        [0xFF, 0xD8, 0xFF, ..] => Some(ImageFormat::Jpeg),
        [0x89, b'P', b'N', b'G', ..] => Some(ImageFormat::Png),
        [b'G', b'I', b'F', b'8', ..] => Some(ImageFormat::Gif),
        [b'B', b'M', ..] => Some(ImageFormat::Bmp),
        [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => Some(ImageFormat::Tiff),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(ImageFormat::Webp),
        _ => None,
    }
}

/// Tesseract separates blocks with blank lines and ends the page with a form feed.
fn split_blocks(output: &str) -> Vec<String> {
    output
        .split("\n\n")
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    #[instrument(skip(self), fields(image = %image.display()))]
    async fn recognize(&self, image: &Path) -> Result<Vec<String>, DomainError> {
        let bytes = tokio::fs::read(image)
            .await
            .map_err(|e| DomainError::not_found(format!("{}: {e}", image.display())))?;
        let format = sniff_format(&bytes)
            .ok_or_else(|| DomainError::validation("unsupported image format"))?;
        debug!(?format, bytes = bytes.len(), "running tesseract");

        let output = Command::new(&self.binary)
            .arg(image)
            .arg("stdout")
            .args(["-l", &self.languages])
            .output()
            .await
            .map_err(|e| {
                DomainError::external(format!(
                    "Failed to execute '{}'. Is tesseract installed? {e}",
                    self.binary.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DomainError::external(format!(
                "tesseract failed: {}",
                stderr.trim()
            )));
        }

        Ok(split_blocks(&String::from_utf8_lossy(&output.stdout)))
    }
}
