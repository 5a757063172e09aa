//! Quarantine ledger records.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// One row of the quarantine ledger.
///
/// Identity is `quarantine_id`, a UUIDv4 that also names the obfuscated
/// content file inside the quarantine directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineEntry {
    /// Globally unique identifier of the quarantined file.
    pub quarantine_id: String,

    /// Absolute path the file was taken from, used for restoration.
    pub original_path: PathBuf,

    /// RFC 3339 UTC timestamp of the quarantine operation.
    pub quarantine_date: String,

    /// Name of the first detected signature, or `"UnknownThreat"`.
    pub threat_name: String,
}

impl QuarantineEntry {
    /// Creates an entry with a fresh id and the current UTC timestamp.
    pub(crate) fn new(original_path: PathBuf, threat_name: impl Into<String>) -> Self {
        Self {
            quarantine_id: Uuid::new_v4().to_string(),
            original_path,
            quarantine_date: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            threat_name: threat_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = QuarantineEntry::new(PathBuf::from("/tmp/a"), "T");
        let b = QuarantineEntry::new(PathBuf::from("/tmp/b"), "T");
        assert_ne!(a.quarantine_id, b.quarantine_id);
    }

    #[test]
    fn test_date_is_rfc3339_utc() {
        let entry = QuarantineEntry::new(PathBuf::from("/tmp/a"), "T");
        assert!(entry.quarantine_date.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&entry.quarantine_date).is_ok());
    }

    #[test]
    fn test_serde_field_names() {
        let entry = QuarantineEntry::new(PathBuf::from("/tmp/victim"), "Sig1");
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("quarantine_id").is_some());
        assert!(json.get("original_path").is_some());
        assert!(json.get("quarantine_date").is_some());
        assert_eq!(json["threat_name"], "Sig1");

        let back: QuarantineEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}
