//! Flat-directory artifact store.
//!
//! One directory is the whole database: each file's name encodes its state
//! per [`crate::codec`], and `rename(2)` is the only mutation primitive, so
//! every transition commits atomically. A crash between computing a new
//! state and committing it leaves the artifact under its last-committed
//! name, never in two states at once.

use crate::codec::ArtifactState;
use crate::id::ArtifactId;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot persist new artifact `{name}`: {source}")]
    Write { name: String, source: io::Error },
    #[error("cannot transition `{from}` to `{to}`: {reason}")]
    Transition {
        from: String,
        to: String,
        reason: String,
    },
    #[error("artifact `{0}` not found")]
    NotFound(String),
    #[error("`{0}` is not a valid store entry name")]
    InvalidName(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Handle on the artifact directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Opens the store, creating the directory if it does not exist yet.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes a new Pending artifact. Fails if the id is already taken.
    pub fn put_new(&self, id: &ArtifactId, bytes: &[u8]) -> Result<(), StoreError> {
        let name = id.as_str();
        let path = self.entry_path(name)?;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| StoreError::Write {
                name: name.to_string(),
                source,
            })?;
        if let Err(source) = file.write_all(bytes) {
            drop(file);
            // A truncated file would burn the id and strand an artifact
            // that can never be classified; a failed write leaves nothing.
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("cannot remove partial artifact `{name}`: {e}");
            }
            return Err(StoreError::Write {
                name: name.to_string(),
                source,
            });
        }
        Ok(())
    }

    /// Atomically renames `from` to `to`.
    ///
    /// The source must exist and the target must not; a rename is never
    /// allowed to overwrite a committed state. This is the guard that turns
    /// a duplicate transition attempt into a visible failure.
    pub fn transition(&self, from: &str, to: &str) -> Result<(), StoreError> {
        let from_path = self.entry_path(from)?;
        let to_path = self.entry_path(to)?;
        if !from_path.is_file() {
            return Err(StoreError::Transition {
                from: from.to_string(),
                to: to.to_string(),
                reason: "source does not exist".to_string(),
            });
        }
        if to_path.exists() {
            return Err(StoreError::Transition {
                from: from.to_string(),
                to: to.to_string(),
                reason: "target already exists".to_string(),
            });
        }
        fs::rename(&from_path, &to_path).map_err(|e| StoreError::Transition {
            from: from.to_string(),
            to: to.to_string(),
            reason: e.to_string(),
        })?;
        tracing::debug!("transitioned `{from}` -> `{to}`");
        Ok(())
    }

    /// Loads the raw bytes stored under `name`.
    pub fn read(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.entry_path(name)?;
        fs::read(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StoreError::NotFound(name.to_string())
            } else {
                StoreError::Io(e)
            }
        })
    }

    pub fn exists(&self, name: &str) -> bool {
        self.entry_path(name)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }

    /// Decodes every entry in the directory into its artifact state.
    ///
    /// Entries that do not match the name grammar are skipped with a
    /// warning; one foreign file must not make the whole store unreadable.
    pub fn list(&self) -> Result<Vec<ArtifactState>, StoreError> {
        let mut states = Vec::new();
        for entry in WalkDir::new(&self.dir).max_depth(1) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("walkdir error: {e}");
                    continue;
                }
            };
            if !entry.path().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                tracing::warn!("skipping non-UTF8 entry {:?}", entry.file_name());
                continue;
            };
            match ArtifactState::decode(name) {
                Ok(state) => states.push(state),
                Err(e) => tracing::warn!("skipping undecodable entry `{name}`: {e}"),
            }
        }
        states.sort_by_key(|s| s.encode());
        Ok(states)
    }

    /// Number of entries in the directory, foreign files included.
    pub fn entry_count(&self) -> Result<usize, StoreError> {
        Ok(fs::read_dir(&self.dir)?.count())
    }

    fn entry_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
        {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(name))
    }
}
