//! In-memory stand-ins for the external tools, shared by unit tests
//!
//! One `Fake` implements every tool trait over shared state, so a test can
//! script the history and OCR outcomes and then count what was called.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use crate::clipboard_history::{parse, Entry, OcrIndex};
use crate::external::{
    ClipboardSink, Decoder, HistorySource, Notifier, OcrEngine, Resizer, ToolError, Toolbox,
};

/// A PID that can't belong to a running process
pub(crate) const DEAD_PID: u32 = u32::MAX - 1;

#[derive(Debug, Clone)]
pub(crate) enum OcrBehavior {
    Text(String),
    Timeout,
    Fail,
}

pub(crate) struct FakeState {
    pub history: RefCell<Vec<Entry>>,
    pub list_fails: Cell<bool>,
    pub list_calls: Cell<usize>,
    pub deleted: RefCell<Vec<String>>,
    pub decode_calls: Cell<usize>,
    /// Raw lines whose decode fails
    pub decode_fails_for: RefCell<HashSet<String>>,
    pub resize_calls: RefCell<Vec<u32>>,
    pub resize_fails: Cell<bool>,
    pub recognize_calls: RefCell<Vec<String>>,
    pub language_calls: Cell<usize>,
    pub languages: RefCell<Result<Vec<String>, ()>>,
    pub ocr: RefCell<OcrBehavior>,
    pub notifications: RefCell<Vec<(String, String)>>,
    pub copied: RefCell<Vec<Vec<u8>>>,
    /// When set, every OCR call records how many entries the index file holds
    pub watch_index: RefCell<Option<PathBuf>>,
    pub index_sizes_seen: RefCell<Vec<usize>>,
}

#[derive(Clone)]
pub(crate) struct Fake(pub Rc<FakeState>);

impl Fake {
    pub fn new() -> Self {
        Fake(Rc::new(FakeState {
            history: RefCell::new(Vec::new()),
            list_fails: Cell::new(false),
            list_calls: Cell::new(0),
            deleted: RefCell::new(Vec::new()),
            decode_calls: Cell::new(0),
            decode_fails_for: RefCell::new(HashSet::new()),
            resize_calls: RefCell::new(Vec::new()),
            resize_fails: Cell::new(false),
            recognize_calls: RefCell::new(Vec::new()),
            language_calls: Cell::new(0),
            languages: RefCell::new(Ok(vec!["eng".to_string(), "deu".to_string()])),
            ocr: RefCell::new(OcrBehavior::Text("invoice total 42".to_string())),
            notifications: RefCell::new(Vec::new()),
            copied: RefCell::new(Vec::new()),
            watch_index: RefCell::new(None),
            index_sizes_seen: RefCell::new(Vec::new()),
        }))
    }

    pub fn set_history(&self, entries: Vec<Entry>) {
        *self.0.history.borrow_mut() = entries;
    }

    pub fn set_ocr(&self, behavior: OcrBehavior) {
        *self.0.ocr.borrow_mut() = behavior;
    }

    pub fn toolbox(&self) -> Toolbox {
        Toolbox {
            history: Box::new(self.clone()),
            decoder: Box::new(self.clone()),
            resizer: Box::new(self.clone()),
            ocr: Box::new(self.clone()),
            notifier: Box::new(self.clone()),
            clipboard: Box::new(self.clone()),
        }
    }

    pub fn decode_calls(&self) -> usize {
        self.0.decode_calls.get()
    }

    pub fn resize_calls(&self) -> usize {
        self.0.resize_calls.borrow().len()
    }

    pub fn recognize_calls(&self) -> usize {
        self.0.recognize_calls.borrow().len()
    }

    /// Notification bodies, in order
    pub fn notifications(&self) -> Vec<String> {
        self.0
            .notifications
            .borrow()
            .iter()
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn reset_counters(&self) {
        self.0.list_calls.set(0);
        self.0.decode_calls.set(0);
        self.0.resize_calls.borrow_mut().clear();
        self.0.recognize_calls.borrow_mut().clear();
        self.0.language_calls.set(0);
        self.0.notifications.borrow_mut().clear();
    }
}

fn unavailable(program: &str) -> ToolError {
    ToolError::NotFound {
        program: program.to_string(),
    }
}

impl HistorySource for Fake {
    fn list(&self) -> Result<Vec<Entry>, ToolError> {
        self.0.list_calls.set(self.0.list_calls.get() + 1);
        if self.0.list_fails.get() {
            return Err(unavailable("cliphist"));
        }
        Ok(self.0.history.borrow().clone())
    }

    fn delete(&self, raw_line: &str) -> Result<(), ToolError> {
        self.0.deleted.borrow_mut().push(raw_line.to_string());
        self.0.history.borrow_mut().retain(|e| e.raw_line != raw_line);
        Ok(())
    }

    fn wipe(&self) -> Result<(), ToolError> {
        self.0.history.borrow_mut().clear();
        Ok(())
    }
}

impl Decoder for Fake {
    fn decode(&self, raw_line: &str) -> Result<Vec<u8>, ToolError> {
        self.0.decode_calls.set(self.0.decode_calls.get() + 1);
        if self.0.decode_fails_for.borrow().contains(raw_line) {
            return Err(ToolError::Failed {
                program: "cliphist".to_string(),
                code: Some(1),
                stderr: "input not found".to_string(),
            });
        }
        Ok(format!("decoded:{}", raw_line).into_bytes())
    }
}

impl Resizer for Fake {
    fn resize(&self, _bytes: &[u8], max_edge: u32) -> Result<Vec<u8>, ToolError> {
        self.0.resize_calls.borrow_mut().push(max_edge);
        if self.0.resize_fails.get() {
            return Err(ToolError::Failed {
                program: "magick".to_string(),
                code: Some(1),
                stderr: "no decode delegate".to_string(),
            });
        }
        Ok(b"resized".to_vec())
    }
}

impl OcrEngine for Fake {
    fn languages(&self) -> Result<Vec<String>, ToolError> {
        self.0.language_calls.set(self.0.language_calls.get() + 1);
        self.0
            .languages
            .borrow()
            .clone()
            .map_err(|_| unavailable("tesseract"))
    }

    fn recognize(&self, _bytes: &[u8], languages: &str) -> Result<String, ToolError> {
        self.0
            .recognize_calls
            .borrow_mut()
            .push(languages.to_string());
        if let Some(path) = self.0.watch_index.borrow().as_ref() {
            self.0
                .index_sizes_seen
                .borrow_mut()
                .push(OcrIndex::load(path).len());
        }
        match self.0.ocr.borrow().clone() {
            OcrBehavior::Text(text) => Ok(text),
            OcrBehavior::Timeout => Err(ToolError::Timeout {
                program: "tesseract".to_string(),
                timeout: Duration::from_secs(15),
            }),
            OcrBehavior::Fail => Err(ToolError::Failed {
                program: "tesseract".to_string(),
                code: Some(1),
                stderr: "Error in pixReadMem".to_string(),
            }),
        }
    }
}

impl Notifier for Fake {
    fn notify(&self, title: &str, body: &str) {
        self.0
            .notifications
            .borrow_mut()
            .push((title.to_string(), body.to_string()));
    }
}

impl ClipboardSink for Fake {
    fn copy(&self, bytes: &[u8]) -> Result<(), ToolError> {
        self.0.copied.borrow_mut().push(bytes.to_vec());
        Ok(())
    }
}

/// `<id>\t[[ binary data <id> KiB png WxH ]]`; the id keeps contents distinct
pub(crate) fn image(id: usize, width: u32, height: u32) -> Entry {
    parse(&format!(
        "{}\t[[ binary data {} KiB png {}x{} ]]",
        id, id, width, height
    ))
    .unwrap()
}

pub(crate) fn text(id: usize, content: &str) -> Entry {
    parse(&format!("{}\t{}", id, content)).unwrap()
}
