//! Quarantine lifecycle: isolate, neutralise, ledger, restore.

use crate::audit::{self, LogLevel};
use crate::core::{EngineError, EngineResult, ScanReport};
use crate::quarantine::entry::QuarantineEntry;

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const LEDGER_FILE: &str = "ledger.json";
const COMPONENT: &str = "QuarantineManager";

/// Repeating key XORed over quarantined content. XOR is involutive, so
/// the same pass neutralises and recovers.
const XOR_KEY: &[u8; 8] = b"CANINANA";

/// Chunk size for the in-place obfuscation rewrite.
const XOR_CHUNK: usize = 4096;

/// Owns a quarantine directory and its ledger.
///
/// Detected files are renamed into the quarantine directory under a fresh
/// UUID, neutralised by XOR obfuscation, and recorded in a JSON-array
/// ledger. Every mutation step has a compensating action, so a failure
/// mid-operation leaves the filesystem as it was.
///
/// A single manager must own a given root at a time; concurrent managers
/// over one directory corrupt the ledger.
///
/// # Storage layout
///
/// ```text
/// <root>/quarantine/
///   ledger.json
///   <quarantine_id>     (obfuscated contents)
/// ```
#[derive(Debug)]
pub struct QuarantineManager {
    quarantine_dir: PathBuf,
    ledger_path: PathBuf,
}

impl QuarantineManager {
    /// Creates a manager over the default root: `<home>/.caninana`, or
    /// `./caninana_quarantine` without a resolvable home directory.
    ///
    /// # Errors
    ///
    /// [`EngineError::Initialization`] when the quarantine directory or
    /// ledger cannot be created.
    pub fn new() -> EngineResult<Self> {
        let root = match dirs::home_dir() {
            Some(home) => home.join(".caninana"),
            None => PathBuf::from("caninana_quarantine"),
        };
        Self::with_root(root)
    }

    /// Creates a manager with an explicit root directory.
    ///
    /// # Errors
    ///
    /// [`EngineError::Initialization`] when the quarantine directory or
    /// ledger cannot be created.
    pub fn with_root(root: impl AsRef<Path>) -> EngineResult<Self> {
        let quarantine_dir = root.as_ref().join("quarantine");
        let ledger_path = quarantine_dir.join(LEDGER_FILE);
        let manager = Self {
            quarantine_dir,
            ledger_path,
        };
        manager.initialize()?;
        Ok(manager)
    }

    fn initialize(&self) -> EngineResult<()> {
        std::fs::create_dir_all(&self.quarantine_dir).map_err(|e| {
            EngineError::initialization(format!(
                "could not create quarantine directory '{}': {e}",
                self.quarantine_dir.display()
            ))
        })?;
        if !self.ledger_path.exists() {
            std::fs::write(&self.ledger_path, "[]").map_err(|e| {
                EngineError::initialization(format!(
                    "could not create empty ledger at '{}': {e}",
                    self.ledger_path.display()
                ))
            })?;
        }
        Ok(())
    }

    /// The directory holding the ledger and the obfuscated content files.
    pub fn quarantine_dir(&self) -> &Path {
        &self.quarantine_dir
    }

    /// Moves `path` into quarantine, neutralises it, and records it.
    ///
    /// The recorded threat name is the report's first detected signature,
    /// or `"UnknownThreat"`. The ledger rewrite is the commit point: any
    /// earlier failure undoes the steps already taken (move back,
    /// de-obfuscate) before returning an error.
    ///
    /// # Errors
    ///
    /// - [`EngineError::FileAccess`] when the source file does not exist.
    /// - [`EngineError::Quarantine`] when the move, the obfuscation, or
    ///   the ledger rewrite fails.
    pub fn quarantine(
        &self,
        path: impl AsRef<Path>,
        report: &ScanReport,
    ) -> EngineResult<QuarantineEntry> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EngineError::file_access(path, "file does not exist"));
        }

        let original_path = std::path::absolute(path)
            .map_err(|e| EngineError::file_access(path, e))?;
        let entry = QuarantineEntry::new(
            original_path,
            report.primary_threat().unwrap_or("UnknownThreat"),
        );
        let content_path = self.quarantine_dir.join(&entry.quarantine_id);

        std::fs::rename(path, &content_path).map_err(|e| {
            EngineError::quarantine(format!(
                "could not move '{}' to '{}': {e}",
                path.display(),
                content_path.display()
            ))
        })?;

        if let Err(e) = xor_in_place(&content_path) {
            // Undo the move; the file was not neutralised.
            if std::fs::rename(&content_path, path).is_err() {
                audit::log(
                    LogLevel::Critical,
                    COMPONENT,
                    &format!(
                        "Could not return '{}' after failed neutralisation.",
                        path.display()
                    ),
                );
            }
            return Err(EngineError::quarantine(format!(
                "could not neutralise content for ID {}: {e}",
                entry.quarantine_id
            )));
        }

        let mut entries = self.list();
        entries.push(entry.clone());
        if let Err(e) = self.write_ledger(&entries) {
            // File is isolated but untracked: recover it best-effort.
            let recovered = xor_in_place(&content_path).is_ok()
                && std::fs::rename(&content_path, path).is_ok();
            if !recovered {
                audit::log(
                    LogLevel::Critical,
                    COMPONENT,
                    &format!(
                        "Could not recover '{}' after ledger failure; content remains at '{}'.",
                        path.display(),
                        content_path.display()
                    ),
                );
            }
            return Err(EngineError::quarantine(format!(
                "could not record ledger entry for ID {}: {e}",
                entry.quarantine_id
            )));
        }

        audit::log(
            LogLevel::Warning,
            COMPONENT,
            &format!(
                "File quarantined. Original path: {}, ID: {}",
                entry.original_path.display(),
                entry.quarantine_id
            ),
        );
        Ok(entry)
    }

    /// Restores a quarantined file to its original location.
    ///
    /// Once the file is back in place the restore counts as successful; a
    /// ledger rewrite failure after that point is logged CRITICAL but not
    /// returned as an error.
    ///
    /// # Errors
    ///
    /// [`EngineError::Quarantine`] when the id is not in the ledger, the
    /// content file is missing, or de-obfuscation or the move back fails.
    pub fn restore(&self, quarantine_id: &str) -> EngineResult<PathBuf> {
        let entries = self.list();
        let index = entries
            .iter()
            .position(|entry| entry.quarantine_id == quarantine_id)
            .ok_or_else(|| {
                EngineError::quarantine(format!("ID not found in ledger: {quarantine_id}"))
            })?;
        let entry = entries[index].clone();

        let content_path = self.quarantine_dir.join(&entry.quarantine_id);
        if !content_path.exists() {
            return Err(EngineError::quarantine(format!(
                "content file missing from storage for ID {quarantine_id}"
            )));
        }

        xor_in_place(&content_path).map_err(|e| {
            EngineError::quarantine(format!(
                "could not recover content for ID {quarantine_id}: {e}"
            ))
        })?;

        if let Some(parent) = entry.original_path.parent() {
            if !parent.as_os_str().is_empty() {
                let _ = std::fs::create_dir_all(parent);
            }
        }
        if let Err(e) = std::fs::rename(&content_path, &entry.original_path) {
            // Keep the stored copy neutralised.
            if xor_in_place(&content_path).is_err() {
                audit::log(
                    LogLevel::Critical,
                    COMPONENT,
                    &format!("Could not re-neutralise content for ID {quarantine_id}."),
                );
            }
            return Err(EngineError::quarantine(format!(
                "could not move file back to '{}': {e}",
                entry.original_path.display()
            )));
        }

        let mut entries = entries;
        entries.remove(index);
        if self.write_ledger(&entries).is_err() {
            audit::log(
                LogLevel::Critical,
                COMPONENT,
                &format!("Restore succeeded, but the ledger update failed for ID {quarantine_id}."),
            );
        }

        audit::log(
            LogLevel::Info,
            COMPONENT,
            &format!(
                "File restored. ID: {quarantine_id}, Path: {}",
                entry.original_path.display()
            ),
        );
        Ok(entry.original_path)
    }

    /// All current ledger entries.
    ///
    /// Read-only queries tolerate a missing or corrupt ledger by
    /// returning an empty list.
    pub fn list(&self) -> Vec<QuarantineEntry> {
        let Ok(raw) = std::fs::read_to_string(&self.ledger_path) else {
            return Vec::new();
        };
        serde_json::from_str(&raw).unwrap_or_default()
    }

    fn write_ledger(&self, entries: &[QuarantineEntry]) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&self.ledger_path, json)
    }
}

/// XORs the file against the repeating key, rewriting it in place in
/// 4 KiB chunks. The keystream starts at offset zero and advances one
/// position per byte, so applying this twice restores the original
/// content for any file length.
fn xor_in_place(path: &Path) -> std::io::Result<()> {
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    let mut buffer = [0u8; XOR_CHUNK];
    let mut position: u64 = 0;
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        for (offset, byte) in buffer[..bytes_read].iter_mut().enumerate() {
            *byte ^= XOR_KEY[(position as usize + offset) % XOR_KEY.len()];
        }
        file.seek(SeekFrom::Start(position))?;
        file.write_all(&buffer[..bytes_read])?;
        position += bytes_read as u64;
    }
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ScanStatus, TIMEOUT_SEVERITY};
    use tempfile::TempDir;

    fn infected_report(name: &str) -> ScanReport {
        ScanReport {
            status: ScanStatus::Complete,
            threat_detected: true,
            detected_signatures: vec![name.to_string()],
            max_severity: TIMEOUT_SEVERITY,
        }
    }

    #[test]
    fn test_init_creates_directory_and_empty_ledger() {
        let root = TempDir::new().unwrap();
        let manager = QuarantineManager::with_root(root.path()).unwrap();

        assert!(manager.quarantine_dir().is_dir());
        let ledger = std::fs::read_to_string(manager.quarantine_dir().join(LEDGER_FILE)).unwrap();
        assert_eq!(ledger.trim(), "[]");
        assert!(manager.list().is_empty());
    }

    #[test]
    fn test_quarantine_and_restore_roundtrip() {
        let root = TempDir::new().unwrap();
        let victim_dir = TempDir::new().unwrap();
        let victim = victim_dir.path().join("victim");
        std::fs::write(&victim, b"payload").unwrap();

        let manager = QuarantineManager::with_root(root.path()).unwrap();
        let entry = manager.quarantine(&victim, &infected_report("Sig1")).unwrap();

        // Source is gone; content file exists and is neutralised.
        assert!(!victim.exists());
        let content_path = manager.quarantine_dir().join(&entry.quarantine_id);
        let stored = std::fs::read(&content_path).unwrap();
        assert_ne!(stored, b"payload");
        assert_eq!(entry.threat_name, "Sig1");
        assert_eq!(manager.list().len(), 1);

        let restored_to = manager.restore(&entry.quarantine_id).unwrap();
        assert_eq!(std::fs::read(&restored_to).unwrap(), b"payload");
        assert!(!content_path.exists());
        assert!(manager.list().is_empty());
    }

    #[test]
    fn test_quarantine_missing_source_is_file_access() {
        let root = TempDir::new().unwrap();
        let manager = QuarantineManager::with_root(root.path()).unwrap();

        let err = manager
            .quarantine("/nonexistent/victim", &infected_report("Sig1"))
            .unwrap_err();
        assert!(matches!(err, EngineError::FileAccess { .. }));
        assert!(manager.list().is_empty());
    }

    #[test]
    fn test_clean_report_records_unknown_threat() {
        let root = TempDir::new().unwrap();
        let victim_dir = TempDir::new().unwrap();
        let victim = victim_dir.path().join("victim");
        std::fs::write(&victim, b"data").unwrap();

        let manager = QuarantineManager::with_root(root.path()).unwrap();
        let entry = manager.quarantine(&victim, &ScanReport::clean()).unwrap();
        assert_eq!(entry.threat_name, "UnknownThreat");
    }

    #[test]
    fn test_restore_unknown_id_fails() {
        let root = TempDir::new().unwrap();
        let manager = QuarantineManager::with_root(root.path()).unwrap();

        let err = manager.restore("no-such-id").unwrap_err();
        assert!(matches!(err, EngineError::Quarantine { .. }));
    }

    #[test]
    fn test_restore_with_missing_content_file_fails() {
        let root = TempDir::new().unwrap();
        let victim_dir = TempDir::new().unwrap();
        let victim = victim_dir.path().join("victim");
        std::fs::write(&victim, b"data").unwrap();

        let manager = QuarantineManager::with_root(root.path()).unwrap();
        let entry = manager.quarantine(&victim, &infected_report("Sig1")).unwrap();
        std::fs::remove_file(manager.quarantine_dir().join(&entry.quarantine_id)).unwrap();

        let err = manager.restore(&entry.quarantine_id).unwrap_err();
        assert!(matches!(err, EngineError::Quarantine { .. }));
        // The dangling entry remains until recovery handles it.
        assert_eq!(manager.list().len(), 1);
    }

    #[test]
    fn test_restore_recreates_missing_parent_directories() {
        let root = TempDir::new().unwrap();
        let victim_dir = TempDir::new().unwrap();
        let nested = victim_dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        let victim = nested.join("victim");
        std::fs::write(&victim, b"nested payload").unwrap();

        let manager = QuarantineManager::with_root(root.path()).unwrap();
        let entry = manager.quarantine(&victim, &infected_report("Sig1")).unwrap();
        std::fs::remove_dir_all(victim_dir.path().join("a")).unwrap();

        let restored_to = manager.restore(&entry.quarantine_id).unwrap();
        assert_eq!(std::fs::read(&restored_to).unwrap(), b"nested payload");
    }

    #[test]
    fn test_ledger_survives_manager_reopen() {
        let root = TempDir::new().unwrap();
        let victim_dir = TempDir::new().unwrap();
        let victim = victim_dir.path().join("victim");
        std::fs::write(&victim, b"data").unwrap();

        let entry = {
            let manager = QuarantineManager::with_root(root.path()).unwrap();
            manager.quarantine(&victim, &infected_report("Sig1")).unwrap()
        };

        let reopened = QuarantineManager::with_root(root.path()).unwrap();
        let entries = reopened.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0], entry);

        reopened.restore(&entry.quarantine_id).unwrap();
        assert_eq!(std::fs::read(&victim).unwrap(), b"data");
    }

    #[test]
    fn test_corrupt_ledger_lists_empty() {
        let root = TempDir::new().unwrap();
        let manager = QuarantineManager::with_root(root.path()).unwrap();
        std::fs::write(manager.quarantine_dir().join(LEDGER_FILE), "{ not json").unwrap();

        assert!(manager.list().is_empty());
    }

    #[test]
    fn test_xor_involution_at_varied_lengths() {
        let dir = TempDir::new().unwrap();
        for len in [0usize, 1, 7, 8, 9, 4095, 4096, 4097, 2 * 4096 + 13] {
            let path = dir.path().join(format!("f{len}"));
            let original: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            std::fs::write(&path, &original).unwrap();

            xor_in_place(&path).unwrap();
            if len > 0 {
                assert_ne!(std::fs::read(&path).unwrap(), original, "len {len}");
            }
            xor_in_place(&path).unwrap();
            assert_eq!(std::fs::read(&path).unwrap(), original, "len {len}");
        }
    }

    #[test]
    fn test_xor_keystream_resets_at_file_start() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, [0u8; 12]).unwrap();

        xor_in_place(&path).unwrap();
        let obfuscated = std::fs::read(&path).unwrap();
        // Zero input exposes the keystream directly.
        assert_eq!(&obfuscated[..8], b"CANINANA");
        assert_eq!(&obfuscated[8..], b"CANI");
    }
}
