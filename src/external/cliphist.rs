//! `cliphist` as history source and decoder
//!
//! Listing lines are `<id>\t<content>`, newest first. Decode and delete take
//! a raw listing line on stdin.

use std::time::Duration;
use tracing::debug;

use super::command::run_with_timeout;
use super::{Decoder, HistorySource, ToolError};
use crate::clipboard_history::{parse_listing, Entry};
use crate::config::IndexerConfig;

#[derive(Debug, Clone)]
pub struct Cliphist {
    program: String,
    list_timeout: Duration,
    decode_timeout: Duration,
}

impl Cliphist {
    pub fn new(config: &IndexerConfig) -> Self {
        Cliphist {
            program: config.commands.cliphist.clone(),
            list_timeout: config.timeouts.list(),
            decode_timeout: config.timeouts.decode(),
        }
    }

    fn run(
        &self,
        args: &[&str],
        stdin: Option<&[u8]>,
        timeout: Duration,
    ) -> Result<Vec<u8>, ToolError> {
        run_with_timeout(&self.program, args, stdin, timeout)
    }
}

impl HistorySource for Cliphist {
    fn list(&self) -> Result<Vec<Entry>, ToolError> {
        let stdout = self.run(&["list"], None, self.list_timeout)?;
        let entries = parse_listing(&String::from_utf8_lossy(&stdout));
        debug!(count = entries.len(), "Listed clipboard history");
        Ok(entries)
    }

    fn delete(&self, raw_line: &str) -> Result<(), ToolError> {
        self.run(&["delete"], Some(raw_line.as_bytes()), self.list_timeout)?;
        Ok(())
    }

    fn wipe(&self) -> Result<(), ToolError> {
        self.run(&["wipe"], None, self.list_timeout)?;
        Ok(())
    }
}

impl Decoder for Cliphist {
    fn decode(&self, raw_line: &str) -> Result<Vec<u8>, ToolError> {
        let bytes = self.run(&["decode"], Some(raw_line.as_bytes()), self.decode_timeout)?;
        if bytes.is_empty() {
            // Entry vanished between listing and decode
            return Err(ToolError::Failed {
                program: self.program.clone(),
                code: Some(0),
                stderr: "decoded to nothing".to_string(),
            });
        }
        Ok(bytes)
    }
}
