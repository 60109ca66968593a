// src/notify/file.rs
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::Mailer;
use crate::errors::SendError;
use crate::render::RenderedDigest;

/// Writes the digest to `<dir>/digest-<timestamp>.html`.
/// Used for dry runs and to keep a digest the SMTP server refused.
#[derive(Debug, Clone)]
pub struct FileMailer {
    dir: PathBuf,
}

impl FileMailer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write and return the file path.
    pub fn write(&self, digest: &RenderedDigest) -> Result<PathBuf, SendError> {
        std::fs::create_dir_all(&self.dir)?;
        let name = format!("digest-{}.html", Utc::now().format("%Y%m%dT%H%M%S%.3fZ"));
        let path = self.dir.join(name);
        std::fs::write(&path, &digest.html)?;
        Ok(path)
    }
}

#[async_trait::async_trait]
impl Mailer for FileMailer {
    async fn send(&self, digest: &RenderedDigest) -> Result<(), SendError> {
        let path = self.write(digest)?;
        tracing::info!(path = %path.display(), "digest written to file");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
