//! clipindex - thumbnail and OCR enrichment for clipboard history
//!
//! The interactive path (`browse`) answers each query from the current
//! history plus whatever the caches hold right now. The background indexer
//! (`indexer`) fills those caches incrementally under a single-flight lock.

pub mod browse;
pub mod clipboard_history;
pub mod config;
pub mod error;
pub mod external;
pub mod indexer;
pub mod lock;
pub mod logging;
pub mod search;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;
