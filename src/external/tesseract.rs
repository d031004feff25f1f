//! `tesseract` OCR engine

use std::time::Duration;
use tracing::debug;

use super::command::run_with_timeout;
use super::{OcrEngine, ToolError};
use crate::config::IndexerConfig;

#[derive(Debug, Clone)]
pub struct Tesseract {
    program: String,
    psm: u32,
    ocr_timeout: Duration,
    languages_timeout: Duration,
}

impl Tesseract {
    pub fn new(config: &IndexerConfig) -> Self {
        Tesseract {
            program: config.commands.tesseract.clone(),
            psm: config.ocr_psm,
            ocr_timeout: config.timeouts.ocr(),
            languages_timeout: config.timeouts.languages(),
        }
    }
}

/// `--list-langs` output: a header line, then one language per line
pub(crate) fn parse_language_list(output: &str) -> Vec<String> {
    output
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
        .collect()
}

impl OcrEngine for Tesseract {
    fn languages(&self) -> Result<Vec<String>, ToolError> {
        let stdout = run_with_timeout(
            &self.program,
            &["--list-langs"],
            None,
            self.languages_timeout,
        )?;
        let languages = parse_language_list(&String::from_utf8_lossy(&stdout));
        debug!(?languages, "Installed OCR languages");
        Ok(languages)
    }

    fn recognize(&self, bytes: &[u8], languages: &str) -> Result<String, ToolError> {
        let psm = self.psm.to_string();
        let stdout = run_with_timeout(
            &self.program,
            &["stdin", "stdout", "-l", languages, "--psm", &psm],
            Some(bytes),
            self.ocr_timeout,
        )?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}
