use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::digest::{DigestError, FileDigest};

/// Initialize tracing for tests with appropriate settings
#[inline]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer() // Write to test output
        .try_init();
}

/// Digest stub: fails for any path whose file name starts with `bad`,
/// otherwise returns the file name. Records every path it sees.
#[derive(Debug, Default)]
pub struct StubDigest {
    pub delay: Duration,
    pub seen: Mutex<Vec<PathBuf>>,
}

impl StubDigest {
    pub fn arc() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Default::default()
        })
    }

    pub fn seen(&self) -> Vec<PathBuf> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl FileDigest for StubDigest {
    fn name(&self) -> &'static str {
        "STUB"
    }

    async fn digest(&self, path: &Path) -> Result<String, DigestError> {
        self.seen.lock().push(path.to_path_buf());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if name.starts_with("bad") {
            return Err(DigestError::Open {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            });
        }
        Ok(name)
    }
}
