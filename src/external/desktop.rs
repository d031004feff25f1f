//! Desktop integration: `notify-send` and `wl-copy`

use std::time::Duration;
use tracing::debug;

use super::command::{run_handing_off, run_with_timeout};
use super::{ClipboardSink, Notifier, ToolError};
use crate::config::IndexerConfig;

#[derive(Debug, Clone)]
pub struct NotifySend {
    program: String,
    app_name: String,
    display_ms: u64,
    enabled: bool,
    timeout: Duration,
}

impl NotifySend {
    pub fn new(config: &IndexerConfig) -> Self {
        NotifySend {
            program: config.commands.notify_send.clone(),
            app_name: config.notify.app_name.clone(),
            display_ms: config.notify.display_ms,
            enabled: config.notify.enabled,
            timeout: config.timeouts.notify(),
        }
    }
}

impl Notifier for NotifySend {
    fn notify(&self, title: &str, body: &str) {
        if !self.enabled {
            return;
        }
        let display_ms = self.display_ms.to_string();
        let result = run_with_timeout(
            &self.program,
            &[title, body, "-a", &self.app_name, "-t", &display_ms],
            None,
            self.timeout,
        );
        if let Err(e) = result {
            debug!(error = %e, "Notification not delivered");
        }
    }
}

#[derive(Debug, Clone)]
pub struct WlCopy {
    program: String,
    timeout: Duration,
}

impl WlCopy {
    pub fn new(config: &IndexerConfig) -> Self {
        WlCopy {
            program: config.commands.copy.clone(),
            timeout: config.timeouts.decode(),
        }
    }
}

impl ClipboardSink for WlCopy {
    fn copy(&self, bytes: &[u8]) -> Result<(), ToolError> {
        // wl-copy forks a process that keeps serving the clipboard
        run_handing_off(&self.program, &[], Some(bytes), self.timeout)
    }
}
