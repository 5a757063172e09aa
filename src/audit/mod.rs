//! Append-only security audit log.
//!
//! Every component writes its audit trail through [`SecurityLog`]: a
//! process-wide, mutex-guarded sink producing one line per record so that
//! concurrent writers never interleave within a line. The sink is an
//! append-mode file under the user data directory; when that file cannot
//! be opened the log degrades to standard error rather than failing.

use chrono::Local;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

/// Severity of an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Routine operational events.
    Info,
    /// Notable events: quarantines, database swaps.
    Warning,
    /// Failed operations.
    Error,
    /// Threat detections and unrecoverable inconsistencies.
    Critical,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        };
        write!(f, "{name}")
    }
}

enum LogSink {
    File(File),
    Stderr,
}

/// A serialized, append-only line log.
///
/// Records have the shape
/// `[<local timestamp>] [<LEVEL>] [<component>] <message>` and are flushed
/// as they are written.
pub struct SecurityLog {
    sink: Mutex<LogSink>,
}

static GLOBAL_LOG: OnceLock<SecurityLog> = OnceLock::new();

impl SecurityLog {
    /// Opens (or creates) an append-mode log file at `path`.
    ///
    /// Falls back to standard error if the parent directory or the file
    /// cannot be created; opening never fails outward.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let sink = match Self::open_file(path) {
            Ok(file) => LogSink::File(file),
            Err(err) => {
                eprintln!(
                    "caninana: could not open log file '{}': {err}; logging to stderr",
                    path.display()
                );
                LogSink::Stderr
            }
        };
        Self {
            sink: Mutex::new(sink),
        }
    }

    /// Opens the default sink: `<home>/.caninana/caninana.log`, co-located
    /// with the quarantine data. Without a resolvable home directory the
    /// file lands in the current directory.
    pub fn open_default() -> Self {
        Self::open(default_log_path())
    }

    /// The process-wide log used by all engine components.
    pub fn global() -> &'static SecurityLog {
        GLOBAL_LOG.get_or_init(SecurityLog::open_default)
    }

    fn open_file(path: &Path) -> io::Result<File> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        OpenOptions::new().create(true).append(true).open(path)
    }

    /// Appends one record. Write failures are swallowed; an audit log must
    /// never take the scanning path down with it.
    pub fn log(&self, level: LogLevel, component: &str, message: &str) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let line = format!("[{timestamp}] [{level}] [{component}] {message}");

        let mut sink = match self.sink.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match &mut *sink {
            LogSink::File(file) => {
                let _ = writeln!(file, "{line}");
                let _ = file.flush();
            }
            LogSink::Stderr => {
                let _ = writeln!(io::stderr(), "{line}");
            }
        }
    }
}

impl fmt::Debug for SecurityLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityLog").finish_non_exhaustive()
    }
}

/// Writes one record through the process-wide log.
pub fn log(level: LogLevel, component: &str, message: &str) {
    SecurityLog::global().log(level, component, message);
}

fn default_log_path() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".caninana").join("caninana.log"),
        None => PathBuf::from("caninana.log"),
    }
}
