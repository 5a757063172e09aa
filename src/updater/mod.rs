//! Signature database updates.
//!
//! [`SignatureUpdater`] compares the local database version against a
//! remote endpoint, downloads a newer database to a temporary file,
//! validates it by loading it into a fresh store, and atomically swaps
//! it over the current file. Every failure path deletes the temporary
//! file and leaves the current database untouched.
//!
//! Network access goes through the pluggable [`Fetcher`] capability. The
//! default [`HttpFetcher`] (cargo feature `http`, enabled by default)
//! uses a blocking `reqwest` client; [`StaticFetcher`] serves canned
//! responses for tests and offline use.

use crate::audit::{self, LogLevel};
use crate::core::{EngineError, EngineResult};
use crate::signatures::SignatureStore;

use std::io::Write;
use std::path::{Path, PathBuf};

const COMPONENT: &str = "SignatureUpdater";

/// Remote endpoint names relative to the updater's base URL.
const VERSION_ENDPOINT: &str = "latest_version.txt";
const DATABASE_ENDPOINT: &str = "signatures.json";

/// Blocking HTTP fetch capability.
///
/// Implementations must treat any non-success HTTP status as an error.
/// Timeouts are the fetcher's responsibility.
pub trait Fetcher: Send + Sync {
    /// Fetches a small text resource.
    fn fetch_text(&self, url: &str) -> EngineResult<String>;

    /// Streams a resource into `sink`.
    fn fetch_to(&self, url: &str, sink: &mut dyn Write) -> EngineResult<()>;
}

/// Default fetcher backed by a blocking `reqwest` client.
#[cfg(feature = "http")]
#[derive(Debug)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    /// Creates a fetcher with a 60 second request timeout.
    ///
    /// # Errors
    ///
    /// [`EngineError::Update`] when the HTTP client cannot be built.
    pub fn new() -> EngineResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| EngineError::update(format!("could not build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn get(&self, url: &str) -> EngineResult<reqwest::blocking::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| EngineError::update(format!("request to '{url}' failed: {e}")))?;
        if !response.status().is_success() {
            return Err(EngineError::update(format!(
                "request to '{url}' returned status {}",
                response.status()
            )));
        }
        Ok(response)
    }
}

#[cfg(feature = "http")]
impl Fetcher for HttpFetcher {
    fn fetch_text(&self, url: &str) -> EngineResult<String> {
        self.get(url)?
            .text()
            .map_err(|e| EngineError::update(format!("could not read body from '{url}': {e}")))
    }

    fn fetch_to(&self, url: &str, sink: &mut dyn Write) -> EngineResult<()> {
        self.get(url)?
            .copy_to(sink)
            .map_err(|e| EngineError::update(format!("could not stream body from '{url}': {e}")))?;
        Ok(())
    }
}

/// In-memory fetcher serving canned responses, keyed by full URL.
///
/// Unregistered URLs fail the way a missing remote resource would, which
/// makes this useful for exercising updater failure paths.
///
/// # Examples
///
/// ```rust
/// use caninana::updater::{Fetcher, StaticFetcher};
///
/// let fetcher = StaticFetcher::new()
///     .with_response("https://sigs.example/latest_version.txt", "1.1\n");
/// assert!(fetcher.fetch_text("https://sigs.example/latest_version.txt").is_ok());
/// assert!(fetcher.fetch_text("https://sigs.example/other").is_err());
/// ```
#[derive(Debug, Default)]
pub struct StaticFetcher {
    responses: std::collections::HashMap<String, Vec<u8>>,
}

impl StaticFetcher {
    /// Creates a fetcher with no registered responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the body served for `url`.
    pub fn with_response(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(url.into(), body.into());
        self
    }

    fn lookup(&self, url: &str) -> EngineResult<&[u8]> {
        self.responses
            .get(url)
            .map(Vec::as_slice)
            .ok_or_else(|| EngineError::update(format!("request to '{url}' returned status 404")))
    }
}

impl Fetcher for StaticFetcher {
    fn fetch_text(&self, url: &str) -> EngineResult<String> {
        let body = self.lookup(url)?;
        String::from_utf8(body.to_vec())
            .map_err(|e| EngineError::update(format!("body from '{url}' is not UTF-8: {e}")))
    }

    fn fetch_to(&self, url: &str, sink: &mut dyn Write) -> EngineResult<()> {
        let body = self.lookup(url)?;
        sink.write_all(body)
            .map_err(|e| EngineError::update(format!("could not write body of '{url}': {e}")))
    }
}

/// Keeps a signature database current against a remote base URL.
pub struct SignatureUpdater {
    version_url: String,
    database_url: String,
    fetcher: Box<dyn Fetcher>,
}

impl SignatureUpdater {
    /// Creates an updater using the default [`HttpFetcher`].
    ///
    /// # Errors
    ///
    /// [`EngineError::Update`] when the HTTP client cannot be built.
    #[cfg(feature = "http")]
    pub fn new(base_url: impl Into<String>) -> EngineResult<Self> {
        Ok(Self::with_fetcher(base_url, HttpFetcher::new()?))
    }

    /// Creates an updater with a custom fetcher.
    pub fn with_fetcher(base_url: impl Into<String>, fetcher: impl Fetcher + 'static) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            version_url: format!("{base_url}{VERSION_ENDPOINT}"),
            database_url: format!("{base_url}{DATABASE_ENDPOINT}"),
            fetcher: Box::new(fetcher),
        }
    }

    /// Checks the remote version and swaps in a newer database when one
    /// exists.
    ///
    /// Returns `true` when the database was replaced, `false` when it was
    /// already current. Versions compare lexicographically as strings.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Update`] on fetch failures and when the
    ///   downloaded database fails validation.
    /// - [`EngineError::FileAccess`] when the temporary file cannot be
    ///   created or the final rename fails.
    ///
    /// In every error case the current database file is left untouched
    /// and the temporary file is removed.
    pub fn check_for_updates(&self, current_db_path: impl AsRef<Path>) -> EngineResult<bool> {
        let current_db_path = current_db_path.as_ref();
        audit::log(LogLevel::Info, COMPONENT, "Checking for updates...");

        let local_version = local_version(current_db_path);
        audit::log(
            LogLevel::Info,
            COMPONENT,
            &format!("Local database version: {local_version}"),
        );

        let remote_version = self.fetcher.fetch_text(&self.version_url)?;
        let remote_version = remote_version.trim_end().to_string();
        audit::log(
            LogLevel::Info,
            COMPONENT,
            &format!("Remote database version: {remote_version}"),
        );

        if remote_version.as_str() <= local_version.as_str() {
            audit::log(
                LogLevel::Info,
                COMPONENT,
                "Signature database is already up to date.",
            );
            return Ok(false);
        }

        audit::log(
            LogLevel::Warning,
            COMPONENT,
            &format!("New version available. Downloading from {}", self.database_url),
        );

        let tmp_path = tmp_path_for(current_db_path);
        let download = |tmp_path: &Path| -> EngineResult<()> {
            let mut tmp_file = std::fs::File::create(tmp_path)
                .map_err(|e| EngineError::file_access(tmp_path, e))?;
            self.fetcher.fetch_to(&self.database_url, &mut tmp_file)?;
            tmp_file
                .flush()
                .map_err(|e| EngineError::file_access(tmp_path, e))
        };
        if let Err(e) = download(&tmp_path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e);
        }

        audit::log(
            LogLevel::Info,
            COMPONENT,
            "Download complete. Validating new database...",
        );
        let mut validator = SignatureStore::new();
        if let Err(e) = validator.load(&tmp_path) {
            let _ = std::fs::remove_file(&tmp_path);
            audit::log(
                LogLevel::Error,
                COMPONENT,
                &format!("Downloaded database failed validation: {e}"),
            );
            return Err(EngineError::update("downloaded database is corrupt or invalid"));
        }

        if let Err(e) = std::fs::rename(&tmp_path, current_db_path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(EngineError::file_access(current_db_path, e));
        }
        audit::log(
            LogLevel::Warning,
            COMPONENT,
            &format!("Successfully updated signature database to version {remote_version}"),
        );
        Ok(true)
    }
}

impl std::fmt::Debug for SignatureUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureUpdater")
            .field("version_url", &self.version_url)
            .field("database_url", &self.database_url)
            .finish_non_exhaustive()
    }
}

/// Reads the local database version; any I/O or parse failure, or a
/// missing field, reports `"0"`.
fn local_version(db_path: &Path) -> String {
    let Ok(raw) = std::fs::read_to_string(db_path) else {
        return "0".to_string();
    };
    serde_json::from_str::<serde_json::Value>(&raw)
        .ok()
        .and_then(|document| {
            document
                .get("version")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| "0".to_string())
}

fn tmp_path_for(db_path: &Path) -> PathBuf {
    let mut os = db_path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}
