//! Append-only log of per-file failures.

use std::fmt;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::digest::DigestError;

/// One failed job.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: DigestError,
}

impl FileFailure {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl From<DigestError> for FileFailure {
    fn from(error: DigestError) -> Self {
        Self {
            path: error.path().to_path_buf(),
            error,
        }
    }
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

/// Failures in encounter order, guarded by a single mutex.
#[derive(Debug, Default)]
pub struct ErrorLog {
    entries: Mutex<Vec<FileFailure>>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, failure: FileFailure) {
        self.entries.lock().push(failure);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Take every recorded failure, leaving the log empty.
    pub fn drain(&self) -> Vec<FileFailure> {
        std::mem::take(&mut *self.entries.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_failure(path: &str) -> FileFailure {
        DigestError::Open {
            path: PathBuf::from(path),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        }
        .into()
    }

    #[test]
    fn test_push_preserves_order() {
        let log = ErrorLog::new();
        assert!(log.is_empty());

        log.push(open_failure("/a"));
        log.push(open_failure("/b"));
        assert_eq!(log.len(), 2);

        let drained = log.drain();
        let paths: Vec<_> = drained.iter().map(|f| f.path()).collect();
        assert_eq!(paths, vec![Path::new("/a"), Path::new("/b")]);
        assert!(log.is_empty());
    }

    #[test]
    fn test_failure_display_uses_cause() {
        let failure = open_failure("/locked");
        assert!(failure.to_string().starts_with("open /locked: "));
    }
}
