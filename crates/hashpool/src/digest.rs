//! File digest collaborators.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

const READ_CHUNK: usize = 64 * 1024;

/// Per-file failure while computing a digest.
#[derive(Error, Debug)]
pub enum DigestError {
    #[error("open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("hash {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DigestError {
    pub fn path(&self) -> &Path {
        match self {
            Self::Open { path, .. } | Self::Read { path, .. } => path,
        }
    }
}

/// Computes a hex digest of a file's contents.
#[async_trait]
pub trait FileDigest: Send + Sync {
    /// Short algorithm name used in log lines.
    fn name(&self) -> &'static str;

    async fn digest(&self, path: &Path) -> Result<String, DigestError>;
}

/// Streaming SHA-256 over the file contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Digest;

#[async_trait]
impl FileDigest for Sha256Digest {
    fn name(&self) -> &'static str {
        "SHA256"
    }

    async fn digest(&self, path: &Path) -> Result<String, DigestError> {
        let mut file = File::open(path).await.map_err(|source| DigestError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let n = file.read(&mut buf).await.map_err(|source| DigestError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }

        Ok(hex::encode(hasher.finalize()))
    }
}
