//! Scan orchestration: candidate selection, matching, and aggregation.

use crate::audit::{self, LogLevel};
use crate::core::{
    EngineError, EngineResult, FileInfo, FileType, PerformanceMonitor, ScanReport, ScanStatus,
    Signature,
};
use crate::signatures::matcher::{AhoCorasickMatcher, MatchOutcome};
use crate::signatures::store::SignatureStore;

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::time::Duration;

/// Default wall-clock limit for a single scan.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(30);

const COMPONENT: &str = "SignatureEngine";

/// Drives one stream through the signatures relevant to its file type.
///
/// The engine borrows a loaded [`SignatureStore`] read-only, so scans on
/// distinct streams may run concurrently on different threads over the
/// same store.
///
/// # Examples
///
/// ```rust,no_run
/// use caninana::analyzer::FileAnalyzer;
/// use caninana::signatures::{SignatureEngine, SignatureStore};
/// use std::fs::File;
///
/// let mut store = SignatureStore::new();
/// store.load("signatures.json")?;
///
/// let info = FileAnalyzer::new().analyze("suspect.bin")?;
/// let report = SignatureEngine::new(&store)
///     .scan(File::open("suspect.bin")?, &info)?;
/// if report.threat_detected {
///     println!("threats: {:?}", report.detected_signatures);
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct SignatureEngine<'s> {
    store: &'s SignatureStore,
    scan_timeout: Duration,
}

impl<'s> SignatureEngine<'s> {
    /// Creates an engine over a loaded store with the default 30 s scan
    /// timeout.
    pub fn new(store: &'s SignatureStore) -> Self {
        Self {
            store,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }

    /// Overrides the scan timeout.
    ///
    /// The deadline is checked once per sixteen read chunks, so very
    /// short streams complete even under an already-expired deadline.
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Scans `reader` against the signatures applicable to `file_info`.
    ///
    /// Candidates are the signatures targeting exactly
    /// `file_info.file_type` followed by the `Unknown`-targeted ("any")
    /// signatures, deduplicated by store position. A timeout is not an
    /// error: it is reported as a [`ScanReport`] with
    /// [`ScanStatus::TimeoutError`](crate::ScanStatus::TimeoutError).
    ///
    /// # Errors
    ///
    /// [`EngineError::FileAccess`] when the stream fails mid-read.
    pub fn scan<R: Read>(&self, reader: R, file_info: &FileInfo) -> EngineResult<ScanReport> {
        let candidates = self.candidates_for(file_info.file_type);
        if candidates.is_empty() {
            audit::log(
                LogLevel::Info,
                COMPONENT,
                "Scan completed (no relevant signatures).",
            );
            return Ok(ScanReport::clean());
        }

        let matcher = AhoCorasickMatcher::build(&candidates);
        let mut monitor = PerformanceMonitor::new();
        monitor.start();

        let outcome = matcher
            .scan(reader, &monitor, self.scan_timeout)
            .map_err(|e| EngineError::file_access("scan stream", e))?;

        let report = match outcome {
            MatchOutcome::TimedOut => {
                audit::log(LogLevel::Error, COMPONENT, "Scan timed out.");
                ScanReport::timed_out()
            }
            MatchOutcome::Complete(matched) if !matched.is_empty() => {
                let report = aggregate(&candidates, matched);
                audit::log(
                    LogLevel::Critical,
                    COMPONENT,
                    &format!(
                        "Threat detected. Signatures: [{}]",
                        report.detected_signatures.join(", ")
                    ),
                );
                report
            }
            MatchOutcome::Complete(_) => {
                audit::log(LogLevel::Info, COMPONENT, "Scan completed (clean).");
                ScanReport::clean()
            }
        };
        Ok(report)
    }

    /// Signatures for the exact file type, then the "any" signatures,
    /// deduplicated by store position.
    fn candidates_for(&self, file_type: FileType) -> Vec<&'s Signature> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for &index in self
            .store
            .indices_for(file_type)
            .iter()
            .chain(self.store.indices_for(FileType::Unknown))
        {
            if seen.insert(index) {
                if let Some(signature) = self.store.get(index) {
                    candidates.push(signature);
                }
            }
        }
        candidates
    }
}

/// Builds the threat report from matched signatures: names in candidate
/// order, deduplicated by name, with the maximum severity over every
/// matched signature.
fn aggregate(candidates: &[&Signature], mut matched: Vec<&Signature>) -> ScanReport {
    let order: HashMap<*const Signature, usize> = candidates
        .iter()
        .enumerate()
        .map(|(position, &signature)| (signature as *const Signature, position))
        .collect();
    matched.sort_by_key(|&signature| {
        order
            .get(&(signature as *const Signature))
            .copied()
            .unwrap_or(usize::MAX)
    });

    let mut names = Vec::new();
    let mut seen_names = HashSet::new();
    let mut max_severity = 0;
    for signature in matched {
        max_severity = max_severity.max(signature.severity);
        if seen_names.insert(signature.name.as_str()) {
            names.push(signature.name.clone());
        }
    }

    ScanReport {
        status: ScanStatus::Complete,
        threat_detected: true,
        detected_signatures: names,
        max_severity,
    }
}
