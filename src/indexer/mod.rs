//! Background enrichment
//!
//! - `plan`: what a run still has to do, from history and caches
//! - `coordinator`: the single-flight run itself

mod coordinator;
mod plan;

pub use coordinator::{IndexCoordinator, IndexReport};
