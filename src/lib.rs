//! # Caninana
//!
//! A signature-based file scanning engine with streaming multi-pattern
//! matching, quarantine support, and audit logging.
//!
//! ## Overview
//!
//! Caninana provides the core of an antivirus-style scanner as an
//! embeddable library, allowing you to:
//!
//! - Identify a file's type and fingerprint its content in bounded memory
//! - Match file contents against a curated signature database using a
//!   streaming Aho-Corasick automaton with a per-scan deadline
//! - Neutralise detected files into an isolated, ledgered quarantine and
//!   restore them later
//! - Keep the signature database current from a remote endpoint with
//!   atomic, validated swaps
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use caninana::analyzer::FileAnalyzer;
//! use caninana::quarantine::QuarantineManager;
//! use caninana::signatures::{SignatureEngine, SignatureStore};
//! use std::fs::File;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load the signature database once; it is immutable until reloaded.
//!     let mut store = SignatureStore::new();
//!     store.load("signatures.json")?;
//!
//!     // Fingerprint the file, then stream it through the engine.
//!     let info = FileAnalyzer::new().analyze("download.bin")?;
//!     let report = SignatureEngine::new(&store)
//!         .scan(File::open("download.bin")?, &info)?;
//!
//!     if report.threat_detected {
//!         let manager = QuarantineManager::new()?;
//!         let entry = manager.quarantine("download.bin", &report)?;
//!         println!("isolated as {}", entry.quarantine_id);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `default` - Includes the `http` feature
//! - `http` - HTTP-backed signature updates via a blocking reqwest client
//!
//! ## Architecture
//!
//! The library is organized into several layers:
//!
//! - **Core**: Fundamental types, errors, and deadline tracking
//! - **Audit**: The process-wide, append-only security log
//! - **Analyzer**: File type identification and SHA-256 fingerprinting
//! - **Signatures**: Database loading, the matching automaton, and the
//!   scan engine
//! - **Quarantine**: Reversible isolation of detected files with a
//!   journaled ledger
//! - **Updater**: Remote database version checks and atomic swaps
//!
//! ## Concurrency
//!
//! All operations are synchronous and caller-threaded; nothing spawns
//! background tasks. A loaded [`SignatureStore`] may be shared across
//! threads, and scans over distinct streams are safe to run concurrently.
//! A [`QuarantineManager`] requires exclusive ownership of its directory.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod analyzer;
pub mod audit;
pub mod core;
pub mod quarantine;
pub mod signatures;
pub mod updater;

// Re-export commonly used types at the crate root
pub use crate::core::{
    EngineError, EngineResult, FileInfo, FileType, PerformanceMonitor, ScanReport, ScanStatus,
    Signature,
};

pub use crate::analyzer::{FileAnalyzer, TypeClassifier};
pub use crate::audit::{LogLevel, SecurityLog};
pub use crate::quarantine::{QuarantineEntry, QuarantineManager};
pub use crate::signatures::{SignatureEngine, SignatureStore};
pub use crate::updater::SignatureUpdater;

/// Prelude module for convenient imports.
///
/// ```rust
/// use caninana::prelude::*;
/// ```
pub mod prelude {
    pub use crate::analyzer::{FileAnalyzer, TypeClassifier};
    pub use crate::audit::{LogLevel, SecurityLog};
    pub use crate::core::{
        EngineError, EngineResult, FileInfo, FileType, PerformanceMonitor, ScanReport,
        ScanStatus, Signature,
    };
    pub use crate::quarantine::{QuarantineEntry, QuarantineManager};
    pub use crate::signatures::{SignatureEngine, SignatureStore};
    pub use crate::updater::{Fetcher, SignatureUpdater};
}
