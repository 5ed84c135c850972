//! Save snapshot storage: the key-value adapters and the load/save contract.
use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::SaveStorage;
use crate::migration::{MigrationReport, SchemaVersion, migrate_value};
use crate::state::SaveState;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error on save record {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// In-process storage. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    records: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw record text, for inspection in tests and tooling.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.records.borrow().get(key).cloned()
    }
}

impl SaveStorage for MemoryStorage {
    type Error = StorageError;

    fn read(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.raw(key))
    }

    fn write(&self, key: &str, json: &str) -> Result<(), Self::Error> {
        self.records
            .borrow_mut()
            .insert(key.to_string(), json.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), Self::Error> {
        self.records.borrow_mut().remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a directory.
///
/// Writes land in a sibling temp file that is renamed over the record, so a
/// concurrent or later `read` sees either the old or the new snapshot.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl SaveStorage for FileStorage {
    type Error = StorageError;

    fn read(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let path = self.record_path(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn write(&self, key: &str, json: &str) -> Result<(), Self::Error> {
        let path = self.record_path(key)?;
        let io_err = |source: io::Error| StorageError::Io {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)?;
        debug!("wrote save record {}", path.display());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), Self::Error> {
        let path = self.record_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// Where a loaded state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    /// No usable snapshot; the first-run state was seeded.
    Seeded,
    Restored {
        schema: SchemaVersion,
        repairs: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedState {
    pub state: SaveState,
    pub origin: LoadOrigin,
}

/// Load the snapshot under `key`, migrating it to the current shape.
///
/// Missing, unreadable or unparsable snapshots yield the seeded default state;
/// this never fails.
pub fn load_state<S: SaveStorage>(storage: &S, key: &str, now: DateTime<Utc>) -> LoadedState {
    let seeded = || LoadedState {
        state: SaveState::seeded(now),
        origin: LoadOrigin::Seeded,
    };
    let raw = match storage.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return seeded(),
        Err(err) => {
            warn!("could not read save {key}: {err}");
            return seeded();
        }
    };
    let value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            warn!("save {key} is not valid JSON: {err}");
            return seeded();
        }
    };
    match migrate_value(value) {
        Some(MigrationReport {
            state,
            schema,
            repairs,
        }) => {
            if repairs > 0 {
                warn!("save {key} repaired {repairs} field(s) during migration");
            }
            LoadedState {
                state,
                origin: LoadOrigin::Restored { schema, repairs },
            }
        }
        None => seeded(),
    }
}

/// Persist `state` under `key` as a single JSON record.
///
/// # Errors
///
/// Returns an error if the state cannot be serialized or written.
pub fn save_state<S: SaveStorage>(storage: &S, key: &str, state: &SaveState) -> Result<(), S::Error> {
    let json = serde_json::to_string(state)?;
    storage.write(key, &json)
}
