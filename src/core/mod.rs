//! Fundamental types, errors, and timing primitives.

mod error;
mod monitor;
mod types;

pub use error::{EngineError, EngineResult};
pub use monitor::PerformanceMonitor;
pub use types::{
    FileInfo, FileType, ScanReport, ScanStatus, Signature, TIMEOUT_SEVERITY,
    TIMEOUT_SIGNATURE_NAME,
};
