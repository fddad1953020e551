//! Error log file
//!
//! Fatal errors are appended to a plain-text log with a local timestamp and
//! the full `source()` chain, so failures in unattended runs can be read
//! back later.

use std::error::Error;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Append-only error log
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an error and its causes
    pub fn append(&self, error: &(dyn Error + 'static)) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut entry = chrono::Local::now().format("[%Y-%m-%d %H:%M:%S]\n").to_string();
        entry.push_str(&error.to_string());
        entry.push('\n');
        let mut source = error.source();
        while let Some(cause) = source {
            entry.push_str("Caused by: ");
            entry.push_str(&cause.to_string());
            entry.push('\n');
            source = cause.source();
        }
        entry.push('\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(entry.as_bytes())
    }

    /// Remove the log file if it exists
    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Run `f`, appending any error it returns to `error_log`
///
/// The error is returned unchanged. A failure to write the log itself is
/// only logged.
pub fn run_logged<T, E, F>(error_log: &ErrorLog, f: F) -> Result<T, E>
where
    E: Error + 'static,
    F: FnOnce() -> Result<T, E>,
{
    f().inspect_err(|e| {
        if let Err(write_err) = error_log.append(e) {
            log::warn!("Failed to write error log {:?}: {}", error_log.path(), write_err);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::ProvisionError;

    #[test]
    fn test_append_writes_timestamp_and_chain() {
        let dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new(dir.path().join("logs").join("error_log.txt"));

        let err = ProvisionError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "read-only volume"));
        log.append(&err).unwrap();

        let contents = fs::read_to_string(log.path()).unwrap();
        assert!(contents.starts_with('['));
        assert!(contents.contains("IO error: read-only volume"));
        assert!(contents.contains("Caused by: read-only volume"));
        assert!(contents.ends_with("\n\n"));
    }

    #[test]
    fn test_append_keeps_previous_entries() {
        let dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new(dir.path().join("error_log.txt"));

        log.append(&ProvisionError::Network("timed out".into())).unwrap();
        log.append(&ProvisionError::Extract("bad header".into())).unwrap();

        let contents = fs::read_to_string(log.path()).unwrap();
        assert!(contents.contains("timed out"));
        assert!(contents.contains("bad header"));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new(dir.path().join("error_log.txt"));

        log.append(&ProvisionError::Network("down".into())).unwrap();
        log.clear().unwrap();
        assert!(!log.path().exists());
        log.clear().unwrap();
    }

    #[test]
    fn test_run_logged_records_and_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new(dir.path().join("error_log.txt"));

        let ok: Result<u32, ProvisionError> = run_logged(&log, || Ok(7));
        assert_eq!(ok.unwrap(), 7);
        assert!(!log.path().exists());

        let err = run_logged(&log, || -> Result<(), _> {
            Err(ProvisionError::Network("unreachable".into()))
        });
        assert!(matches!(err, Err(ProvisionError::Network(_))));
        assert!(fs::read_to_string(log.path()).unwrap().contains("unreachable"));
    }
}
