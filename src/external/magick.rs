//! ImageMagick thumbnail resizer
//!
//! `magick - -thumbnail NxN> <fmt>:-` reads the image on stdin and writes the
//! downscaled image to stdout. The `>` geometry flag only ever shrinks and
//! keeps the aspect ratio. The output format is picked from the input's magic
//! bytes so the thumbnail stays in the source format.

use std::time::Duration;

use super::command::run_with_timeout;
use super::{Resizer, ToolError};
use crate::config::IndexerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    WebP,
    Bmp,
}

impl ImageFormat {
    /// ImageMagick coder name
    pub fn coder(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
            ImageFormat::Bmp => "bmp",
        }
    }
}

/// Detect the image format from its header
pub fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(ImageFormat::Png)
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageFormat::Jpeg)
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some(ImageFormat::Gif)
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some(ImageFormat::WebP)
    } else if bytes.starts_with(b"BM") {
        Some(ImageFormat::Bmp)
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub struct Magick {
    program: String,
    timeout: Duration,
}

impl Magick {
    pub fn new(config: &IndexerConfig) -> Self {
        Magick {
            program: config.commands.magick.clone(),
            timeout: config.timeouts.resize(),
        }
    }
}

impl Resizer for Magick {
    fn resize(&self, bytes: &[u8], max_edge: u32) -> Result<Vec<u8>, ToolError> {
        let format = sniff_format(bytes).unwrap_or(ImageFormat::Png);
        let geometry = format!("{}x{}>", max_edge, max_edge);
        let output = format!("{}:-", format.coder());
        let resized = run_with_timeout(
            &self.program,
            &["-", "-thumbnail", &geometry, &output],
            Some(bytes),
            self.timeout,
        )?;
        if resized.is_empty() {
            return Err(ToolError::Failed {
                program: self.program.clone(),
                code: Some(0),
                stderr: "no image written".to_string(),
            });
        }
        Ok(resized)
    }
}
