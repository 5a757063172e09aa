//! File analysis: type identification and content fingerprinting.
//!
//! [`FileAnalyzer`] streams a file once for classification and once for
//! hashing, producing a [`FileInfo`] in O(chunk) memory regardless of file
//! size. Type identification is delegated to a pluggable
//! [`TypeClassifier`]; the default implementation sniffs magic numbers
//! with the `infer` crate.

use crate::core::{EngineError, EngineResult, FileInfo, FileType};

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Read granularity for both the classification head and the hash stream.
const CHUNK_SIZE: usize = 8192;

/// SHA-256 of the empty input.
const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Magic-number based content classification.
///
/// Implementations inspect the first bytes of a file and return a
/// MIME-like string (`application/pdf`, `application/x-dosexec`, ...), or
/// `None` when the content is unidentifiable.
pub trait TypeClassifier: Send + Sync {
    /// Classifies the given head bytes of a file.
    fn classify(&self, head: &[u8]) -> Option<String>;
}

/// Default classifier backed by the `infer` magic-number database.
#[derive(Debug, Clone, Default)]
pub struct MagicClassifier;

impl TypeClassifier for MagicClassifier {
    fn classify(&self, head: &[u8]) -> Option<String> {
        infer::get(head).map(|kind| kind.mime_type().to_string())
    }
}

/// Streams files to produce their [`FileInfo`] fingerprint.
///
/// # Examples
///
/// ```rust,no_run
/// use caninana::analyzer::FileAnalyzer;
///
/// let analyzer = FileAnalyzer::new();
/// let info = analyzer.analyze("/bin/ls")?;
/// println!("{} bytes, type {}", info.size, info.file_type);
/// # Ok::<(), caninana::EngineError>(())
/// ```
pub struct FileAnalyzer {
    classifier: Box<dyn TypeClassifier>,
}

impl FileAnalyzer {
    /// Creates an analyzer with the default [`MagicClassifier`].
    pub fn new() -> Self {
        Self::with_classifier(MagicClassifier)
    }

    /// Creates an analyzer with a custom classifier.
    pub fn with_classifier(classifier: impl TypeClassifier + 'static) -> Self {
        Self {
            classifier: Box::new(classifier),
        }
    }

    /// Analyzes the file at `path`.
    ///
    /// Reads the file twice: up to the first 8 KiB for type
    /// identification, then the whole content in 8 KiB chunks for the
    /// SHA-256 digest. The empty file short-circuits to
    /// [`FileType::Unknown`] and the canonical empty-input digest.
    ///
    /// # Errors
    ///
    /// [`EngineError::FileAccess`] when the metadata cannot be read or the
    /// file cannot be opened or streamed.
    pub fn analyze(&self, path: impl AsRef<Path>) -> EngineResult<FileInfo> {
        let path = path.as_ref();

        let metadata =
            std::fs::metadata(path).map_err(|e| EngineError::file_access(path, e))?;
        let size = metadata.len();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_string();

        if size == 0 {
            return Ok(FileInfo {
                file_type: self.identify(&[]),
                extension,
                size,
                sha256: EMPTY_SHA256.to_string(),
            });
        }

        let mut file = File::open(path).map_err(|e| EngineError::file_access(path, e))?;

        let mut head = Vec::with_capacity(CHUNK_SIZE);
        (&mut file)
            .take(CHUNK_SIZE as u64)
            .read_to_end(&mut head)
            .map_err(|e| EngineError::file_access(path, e))?;
        let file_type = self.identify(&head);

        file.seek(SeekFrom::Start(0))
            .map_err(|e| EngineError::file_access(path, e))?;
        let sha256 = hash_stream(&mut file).map_err(|e| EngineError::file_access(path, e))?;

        tracing::debug!(path = %path.display(), %file_type, size, "file analyzed");

        Ok(FileInfo {
            file_type,
            extension,
            size,
            sha256,
        })
    }

    fn identify(&self, head: &[u8]) -> FileType {
        if head.is_empty() {
            return FileType::Unknown;
        }
        match self.classifier.classify(head) {
            Some(mime) => FileType::from_mime(&mime),
            None => FileType::Unknown,
        }
    }
}

impl Default for FileAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FileAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileAnalyzer").finish_non_exhaustive()
    }
}

/// Streams a reader through SHA-256 in fixed-size chunks, returning the
/// lowercase hex digest.
fn hash_stream<R: Read>(reader: &mut R) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; CHUNK_SIZE];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    /// Classifier returning a fixed MIME string.
    struct FixedClassifier(&'static str);

    impl TypeClassifier for FixedClassifier {
        fn classify(&self, _head: &[u8]) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[test]
    fn test_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "empty.bin", b"");

        let info = FileAnalyzer::new().analyze(&path).unwrap();
        assert_eq!(info.size, 0);
        assert_eq!(info.file_type, FileType::Unknown);
        assert_eq!(info.sha256, EMPTY_SHA256);
        assert_eq!(info.extension, "bin");
    }

    #[test]
    fn test_known_digest() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "hello.txt", b"hello world");

        let info = FileAnalyzer::new().analyze(&path).unwrap();
        assert_eq!(
            info.sha256,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(info.size, 11);
    }

    #[test]
    fn test_digest_spans_multiple_chunks() {
        let dir = TempDir::new().unwrap();
        // 3 chunks plus a partial tail.
        let contents = vec![0xABu8; CHUNK_SIZE * 3 + 17];
        let path = write_file(&dir, "large.bin", &contents);

        let info = FileAnalyzer::new().analyze(&path).unwrap();

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        assert_eq!(info.sha256, format!("{:x}", hasher.finalize()));
    }

    #[test]
    fn test_magic_classifier_detects_png() {
        let dir = TempDir::new().unwrap();
        let png_header = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        let path = write_file(&dir, "pic.png", &png_header);

        let info = FileAnalyzer::new().analyze(&path).unwrap();
        assert_eq!(info.file_type, FileType::Image);
    }

    #[test]
    fn test_magic_classifier_detects_pdf() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "doc.pdf", b"%PDF-1.7 minimal");

        let info = FileAnalyzer::new().analyze(&path).unwrap();
        assert_eq!(info.file_type, FileType::Document);
    }

    #[test]
    fn test_injected_classifier_mapping() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "tool", b"#!/bin/sh\necho hi\n");

        let analyzer =
            FileAnalyzer::with_classifier(FixedClassifier("text/x-shellscript"));
        let info = analyzer.analyze(&path).unwrap();
        assert_eq!(info.file_type, FileType::Script);
        assert_eq!(info.extension, "");
    }

    #[test]
    fn test_analyze_is_repeatable() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "stable.bin", b"unchanging content");

        let analyzer = FileAnalyzer::new();
        let first = analyzer.analyze(&path).unwrap();
        let second = analyzer.analyze(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_file_is_file_access_error() {
        let dir = TempDir::new().unwrap();
        let err = FileAnalyzer::new()
            .analyze(dir.path().join("absent"))
            .unwrap_err();
        assert!(matches!(err, EngineError::FileAccess { .. }));
    }
}
