//! Core types for the caninana engine.
//!
//! This module defines the fundamental data structures shared by the
//! analyzer, the signature subsystem, and the quarantine manager: file
//! classifications, file fingerprints, threat signatures, and scan reports.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a file's content, derived from magic-number sniffing.
///
/// Signatures target one of these classes; `Unknown` doubles as the
/// "applies to any file" target for signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Native executables: ELF, PE, PIE binaries.
    Executable,
    /// Archives: zip, rar, 7z, tar.
    Archive,
    /// Documents: PDF, word-processor formats, RTF.
    Document,
    /// Raster and vector images.
    Image,
    /// Interpreted scripts: shell, Python.
    Script,
    /// Unclassifiable content. As a signature target this means "any".
    Unknown,
    /// Reserved classification for content flagged by future heuristics.
    Suspicious,
}

impl FileType {
    /// Maps a signature-database `file_type` label to a `FileType`.
    ///
    /// Only the five concrete labels match exactly; anything else,
    /// including the conventional `"any"`, maps to `Unknown`.
    pub fn from_db_label(label: &str) -> Self {
        match label {
            "executable" => Self::Executable,
            "archive" => Self::Archive,
            "document" => Self::Document,
            "image" => Self::Image,
            "script" => Self::Script,
            _ => Self::Unknown,
        }
    }

    /// Maps a MIME-like classifier string to a `FileType`.
    ///
    /// Matching is by substring, checked in a fixed precedence order, so
    /// e.g. `application/x-pie-executable` resolves to `Executable` before
    /// any weaker rule can apply. Only the `image/` rule anchors at the
    /// start of the string.
    pub fn from_mime(mime: &str) -> Self {
        const EXECUTABLE_HINTS: [&str; 4] =
            ["executable", "x-dosexec", "x-pie-executable", "x-elf"];
        const SCRIPT_HINTS: [&str; 2] = ["x-python", "x-shellscript"];
        const DOCUMENT_HINTS: [&str; 3] = ["pdf", "word", "rtf"];
        const ARCHIVE_HINTS: [&str; 4] = ["zip", "rar", "x-7z-compressed", "x-tar"];

        if EXECUTABLE_HINTS.iter().any(|h| mime.contains(h)) {
            Self::Executable
        } else if SCRIPT_HINTS.iter().any(|h| mime.contains(h)) {
            Self::Script
        } else if DOCUMENT_HINTS.iter().any(|h| mime.contains(h)) {
            Self::Document
        } else if ARCHIVE_HINTS.iter().any(|h| mime.contains(h)) {
            Self::Archive
        } else if mime.starts_with("image/") {
            Self::Image
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Executable => "executable",
            Self::Archive => "archive",
            Self::Document => "document",
            Self::Image => "image",
            Self::Script => "script",
            Self::Unknown => "unknown",
            Self::Suspicious => "suspicious",
        };
        write!(f, "{name}")
    }
}

/// Fingerprint of an analyzed file.
///
/// Produced once by [`FileAnalyzer`](crate::analyzer::FileAnalyzer) and
/// never mutated afterwards; the signature engine reads it to select
/// candidate signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Content classification from magic-number sniffing.
    pub file_type: FileType,

    /// Filename extension, without the leading dot; empty when absent.
    pub extension: String,

    /// File size in bytes.
    pub size: u64,

    /// Lowercase hex SHA-256 digest of the full content.
    pub sha256: String,
}

/// A named byte pattern with a target file type and severity.
///
/// Signature identity is the `name`; duplicate names are permitted
/// (aliases of one pattern) and deduplicated in scan reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Human-readable signature name, e.g. `"Eicar.Test.Pattern"`.
    pub name: String,

    /// Byte pattern to search for. Never empty after load.
    pub pattern: String,

    /// File type this signature applies to. `Unknown` means "any".
    pub target_type: FileType,

    /// Threat severity, 0 (informational) through 10 (critical).
    pub severity: u8,
}

/// Terminal status of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// The entire stream was examined.
    Complete,
    /// The scan deadline fired before the stream was exhausted.
    TimeoutError,
}

/// Signature name reported when a scan exceeds its deadline.
pub const TIMEOUT_SIGNATURE_NAME: &str = "Error.ScanTimeoutExceeded";

/// Severity assigned to a timed-out scan.
pub const TIMEOUT_SEVERITY: u8 = 8;

/// The outcome of scanning one stream against a signature store.
///
/// Invariants:
/// - `threat_detected` holds exactly when `detected_signatures` is
///   non-empty or `status` is [`ScanStatus::TimeoutError`].
/// - `max_severity` is the maximum severity among matched signatures, `8`
///   on timeout, and `0` when clean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Whether the scan ran to completion or timed out.
    pub status: ScanStatus,

    /// Whether any threat was detected (including the timeout pseudo-threat).
    pub threat_detected: bool,

    /// Names of matched signatures in candidate order, deduplicated by name.
    pub detected_signatures: Vec<String>,

    /// Highest severity among the matched signatures.
    pub max_severity: u8,
}

impl ScanReport {
    /// A clean, completed scan.
    pub fn clean() -> Self {
        Self {
            status: ScanStatus::Complete,
            threat_detected: false,
            detected_signatures: Vec::new(),
            max_severity: 0,
        }
    }

    /// The report produced when the scan deadline fires.
    pub fn timed_out() -> Self {
        Self {
            status: ScanStatus::TimeoutError,
            threat_detected: true,
            detected_signatures: vec![TIMEOUT_SIGNATURE_NAME.to_string()],
            max_severity: TIMEOUT_SEVERITY,
        }
    }

    /// Returns `true` when nothing was detected and the scan completed.
    pub fn is_clean(&self) -> bool {
        !self.threat_detected && self.status == ScanStatus::Complete
    }

    /// Returns the first detected signature name, if any.
    ///
    /// The quarantine manager uses this as the recorded threat name.
    pub fn primary_threat(&self) -> Option<&str> {
        self.detected_signatures.first().map(String::as_str)
    }
}

impl Default for ScanReport {
    fn default() -> Self {
        Self::clean()
    }
}
