//! Signature database, pattern matching automaton, and scan engine.

mod engine;
mod matcher;
mod store;

pub use engine::{SignatureEngine, DEFAULT_SCAN_TIMEOUT};
pub use matcher::{AhoCorasickMatcher, MatchOutcome};
pub use store::SignatureStore;
