//! Signature database loading and indexing.

use crate::core::{EngineError, EngineResult, FileType, Signature};

use std::collections::HashMap;
use std::path::Path;

/// An immutable, indexed collection of threat signatures.
///
/// [`load`](Self::load) parses a JSON signature database and rebuilds the
/// store from scratch; between loads the store never changes, so a loaded
/// store can be shared freely across scanning threads.
///
/// # Database format
///
/// ```json
/// {
///   "version": "1.0",
///   "signatures": [
///     { "name": "Eicar.Test", "pattern": "X5O!", "file_type": "any", "severity": 10 }
///   ]
/// }
/// ```
///
/// Unknown top-level keys are ignored. Array elements that are not
/// objects, and signatures with empty patterns, are skipped. `file_type`
/// labels other than the five concrete classes (including `"any"`) map to
/// [`FileType::Unknown`], which every scan treats as "applies to any".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStore {
    signatures: Vec<Signature>,
    by_type: HashMap<FileType, Vec<usize>>,
    version: String,
}

impl SignatureStore {
    /// Creates an empty store reporting version `"0"`.
    pub fn new() -> Self {
        Self {
            signatures: Vec::new(),
            by_type: HashMap::new(),
            version: "0".to_string(),
        }
    }

    /// Loads a signature database, replacing the current contents.
    ///
    /// On error the store is left unchanged.
    ///
    /// # Errors
    ///
    /// - [`EngineError::FileAccess`] when the database file cannot be read.
    /// - [`EngineError::DatabaseParse`] when the content is not valid JSON
    ///   or the top level is not an object containing a `"signatures"`
    ///   array.
    pub fn load(&mut self, path: impl AsRef<Path>) -> EngineResult<()> {
        let path = path.as_ref();
        let raw =
            std::fs::read_to_string(path).map_err(|e| EngineError::file_access(path, e))?;

        let document: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| EngineError::database_parse(format!("invalid JSON: {e}")))?;

        let entries = document
            .get("signatures")
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| {
                EngineError::database_parse("missing 'signatures' array at top level")
            })?;

        let version = document
            .get("version")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("0")
            .to_string();

        let mut signatures = Vec::with_capacity(entries.len());
        let mut by_type: HashMap<FileType, Vec<usize>> = HashMap::new();
        for entry in entries {
            let Some(object) = entry.as_object() else {
                continue;
            };
            let pattern = object
                .get("pattern")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default();
            if pattern.is_empty() {
                continue;
            }

            let signature = Signature {
                name: object
                    .get("name")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("Unnamed Signature")
                    .to_string(),
                pattern: pattern.to_string(),
                target_type: FileType::from_db_label(
                    object
                        .get("file_type")
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or("any"),
                ),
                severity: object
                    .get("severity")
                    .and_then(serde_json::Value::as_u64)
                    .unwrap_or(0)
                    .min(10) as u8,
            };

            by_type
                .entry(signature.target_type)
                .or_default()
                .push(signatures.len());
            signatures.push(signature);
        }

        tracing::debug!(
            count = signatures.len(),
            version = %version,
            "signature database loaded"
        );

        self.signatures = signatures;
        self.by_type = by_type;
        self.version = version;
        Ok(())
    }

    /// All loaded signatures, in database order.
    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// Positions of the signatures targeting exactly `file_type`.
    pub fn indices_for(&self, file_type: FileType) -> &[usize] {
        self.by_type.get(&file_type).map_or(&[], Vec::as_slice)
    }

    /// The signature at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<&Signature> {
        self.signatures.get(index)
    }

    /// The database version string; `"0"` when absent or never loaded.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Number of loaded signatures.
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    /// Returns `true` when no signatures are loaded.
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

impl Default for SignatureStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_db(dir: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("signatures.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_valid_database() {
        let dir = TempDir::new().unwrap();
        let path = write_db(
            &dir,
            r#"{
                "version": "1.2",
                "signatures": [
                    {"name": "Exe.Threat", "pattern": "MZ!", "file_type": "executable", "severity": 9},
                    {"name": "Any.Threat", "pattern": "EVIL", "file_type": "any", "severity": 4}
                ]
            }"#,
        );

        let mut store = SignatureStore::new();
        store.load(&path).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.version(), "1.2");
        assert_eq!(store.indices_for(FileType::Executable), &[0]);
        assert_eq!(store.indices_for(FileType::Unknown), &[1]);
        assert!(store.indices_for(FileType::Image).is_empty());

        let sig = store.get(0).unwrap();
        assert_eq!(sig.name, "Exe.Threat");
        assert_eq!(sig.severity, 9);
    }

    #[test]
    fn test_defaults_and_skips() {
        let dir = TempDir::new().unwrap();
        let path = write_db(
            &dir,
            r#"{
                "signatures": [
                    {"pattern": "abc"},
                    {"name": "Empty.Pattern", "pattern": ""},
                    "not an object",
                    42,
                    {"name": "Odd.Type", "pattern": "x", "file_type": "firmware", "severity": 99}
                ]
            }"#,
        );

        let mut store = SignatureStore::new();
        store.load(&path).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.version(), "0");

        let defaulted = store.get(0).unwrap();
        assert_eq!(defaulted.name, "Unnamed Signature");
        assert_eq!(defaulted.target_type, FileType::Unknown);
        assert_eq!(defaulted.severity, 0);

        let odd = store.get(1).unwrap();
        assert_eq!(odd.target_type, FileType::Unknown);
        assert_eq!(odd.severity, 10); // clamped
    }

    #[test]
    fn test_rejects_wrong_shapes() {
        let dir = TempDir::new().unwrap();

        let no_key = write_db(&dir, r#"{"version": "1"}"#);
        let mut store = SignatureStore::new();
        assert!(matches!(
            store.load(&no_key).unwrap_err(),
            EngineError::DatabaseParse { .. }
        ));

        let top_array = write_db(&dir, r#"[{"pattern": "x"}]"#);
        assert!(matches!(
            store.load(&top_array).unwrap_err(),
            EngineError::DatabaseParse { .. }
        ));

        let garbage = write_db(&dir, "{ not json");
        assert!(matches!(
            store.load(&garbage).unwrap_err(),
            EngineError::DatabaseParse { .. }
        ));
    }

    #[test]
    fn test_missing_file_is_file_access() {
        let dir = TempDir::new().unwrap();
        let mut store = SignatureStore::new();
        let err = store.load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, EngineError::FileAccess { .. }));
    }

    #[test]
    fn test_failed_load_leaves_store_unchanged() {
        let dir = TempDir::new().unwrap();
        let good = write_db(&dir, r#"{"signatures": [{"pattern": "keepme"}]}"#);

        let mut store = SignatureStore::new();
        store.load(&good).unwrap();
        assert_eq!(store.len(), 1);

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "not json").unwrap();
        assert!(store.load(&bad).is_err());
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(0).unwrap().pattern, "keepme");
    }

    #[test]
    fn test_reload_yields_equal_state() {
        let dir = TempDir::new().unwrap();
        let path = write_db(
            &dir,
            r#"{"version": "3", "signatures": [
                {"name": "A", "pattern": "aa", "file_type": "script", "severity": 2}
            ]}"#,
        );

        let mut first = SignatureStore::new();
        first.load(&path).unwrap();
        let mut second = SignatureStore::new();
        second.load(&path).unwrap();

        assert_eq!(first, second);
    }
}
