//! Local file backend for [`StateRepository`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{State, StateRepository};

/// State stored as a JSON document on the local filesystem
///
/// Writes go to a sibling temp file that is then renamed over the target, so
/// a crash mid-write leaves the previous state intact.
#[derive(Debug, Clone)]
pub struct FileStateRepository {
    path: PathBuf,
}

impl FileStateRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StateRepository for FileStateRepository {
    async fn get_state(&self) -> Result<Option<State>> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No state file yet");
                return Ok(None);
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read state file {}", self.path.display()))
            }
        };

        let state = serde_json::from_slice(&content)
            .with_context(|| format!("Failed to parse state file {}", self.path.display()))?;
        Ok(Some(state))
    }

    async fn set_state(&self, state: &State) -> Result<()> {
        let content =
            serde_json::to_vec_pretty(state).context("Failed to serialize sync state")?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create state directory {}", parent.display()))?;
        }

        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, &content)
            .await
            .with_context(|| format!("Failed to write state file {}", temp_path.display()))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace state file {}", self.path.display()))?;

        debug!(path = %self.path.display(), bytes = content.len(), "Stored sync state");
        Ok(())
    }
}
