//! Request-scoped body artifact.
//!
//! Every dispatched request persists its serialized wire body to its own file. The
//! transport sends the bytes read back from that file, and the file is what remains
//! for inspection when the retention policy keeps it.

use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::RequestStatus;
use crate::config::LogLevel;
use crate::Result;

#[derive(Debug)]
pub struct Artifact {
    path: PathBuf,
}

impl Artifact {
    /// Write `body` to a fresh file under `dir`, creating the directory if needed.
    pub async fn persist(dir: &Path, body: &str) -> Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("request-{}.json", Uuid::new_v4().simple()));

        let mut file = tokio::fs::File::create(&path).await?;
        for (i, line) in body.split('\n').enumerate() {
            if i > 0 {
                file.write_all(b"\n").await?;
            }
            file.write_all(line.as_bytes()).await?;
        }
        file.flush().await?;

        debug!(path = %path.display(), bytes = body.len(), "persisted request body");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(&self.path).await?)
    }

    /// Delete the file. Deleting an already removed artifact is not an error.
    pub async fn remove(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Whether a finished request keeps its artifact.
///
/// Errored requests always keep it. Other requests keep it only when logging is
/// more verbose than the restrictive tiers.
pub fn should_retain(level: LogLevel, status: RequestStatus) -> bool {
    status == RequestStatus::Error || !level.is_restrictive()
}

/// Apply the retention policy; returns `true` when the artifact was deleted.
pub async fn cleanup(artifact: &Artifact, level: LogLevel, status: RequestStatus) -> bool {
    if should_retain(level, status) {
        debug!(
            path = %artifact.path().display(),
            status = status.as_str(),
            level = level.as_str(),
            "retaining request artifact"
        );
        return false;
    }
    match artifact.remove().await {
        Ok(()) => true,
        Err(e) => {
            warn!(%e, path = %artifact.path().display(), "failed to remove request artifact");
            false
        }
    }
}
