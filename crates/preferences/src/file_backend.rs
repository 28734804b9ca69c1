//! File-based preferences: one JSON object per principal.
//!
//! Storage location: `~/.portico/preferences/<principal>.json`
//!
//! Files are read on every lookup, so edits made on disk show up on the
//! next page load without a restart. Principal names are percent-encoded into
//! file stems, so a name can never contain a path separator.

use async_trait::async_trait;
use portico_core::{Preferences, PreferencesError, PreferencesSource, Principal};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A directory of per-principal JSON preference files.
pub struct FilePreferences {
    dir: PathBuf,
}

impl FilePreferences {
    /// Open (and create if needed) the preferences directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, PreferencesError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            PreferencesError::Storage(format!(
                "Failed to create preferences directory {}: {e}",
                dir.display()
            ))
        })?;
        debug!(dir = %dir.display(), "File preferences backend opened");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The file holding a principal's preferences.
    pub fn path_for(&self, principal: &Principal) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(principal.name())))
    }

    /// Replace all preferences for a principal.
    pub async fn set(
        &self,
        principal: &Principal,
        prefs: &Preferences,
    ) -> Result<(), PreferencesError> {
        let path = self.path_for(principal);
        let content = serde_json::to_vec_pretty(prefs).map_err(|e| {
            PreferencesError::Storage(format!("Failed to serialize preferences: {e}"))
        })?;

        // Write to a sibling file first so readers never see a partial object.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &content)
            .await
            .map_err(|e| PreferencesError::Storage(format!("Failed to write preferences: {e}")))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| PreferencesError::Storage(format!("Failed to write preferences: {e}")))?;
        Ok(())
    }

    /// Delete a principal's preferences. Returns whether a file existed.
    pub async fn remove(&self, principal: &Principal) -> Result<bool, PreferencesError> {
        match tokio::fs::remove_file(self.path_for(principal)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PreferencesError::Storage(format!(
                "Failed to remove preferences: {e}"
            ))),
        }
    }
}

#[async_trait]
impl PreferencesSource for FilePreferences {
    fn name(&self) -> &str {
        "file"
    }

    async fn preferences(&self, principal: &Principal) -> Result<Preferences, PreferencesError> {
        let path = self.path_for(principal);
        let content = match tokio::fs::read(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Preferences::new()),
            Err(e) => {
                return Err(PreferencesError::Storage(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        serde_json::from_slice::<Preferences>(&content).map_err(|e| PreferencesError::Corrupt {
            principal: principal.to_string(),
            reason: e.to_string(),
        })
    }
}

fn file_stem(name: &str) -> String {
    urlencoding::encode(name).into_owned()
}
