//! services/mentoring_api/src/adapters/file_store.rs
//!
//! This module contains the on-disk store adapter, the concrete implementation of
//! the `LocalStore` port from the core crate. Each record key is kept in its own
//! JSON file inside the data directory.
//!
//! Every write goes to a temporary file in the same directory and is then renamed
//! over the target, so a reader never sees a half-written record.

use async_trait::async_trait;
use mentoring_core::ports::{LocalStore, PortError, PortResult, RecordKey, StoreOp};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{error, warn};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A store adapter that implements the `LocalStore` port on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens the store at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> PortResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            PortError::Storage(format!("cannot create data directory {}: {}", root.display(), e))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file backing `key`.
    pub fn path_for(&self, key: RecordKey) -> PathBuf {
        record_path(&self.root, key)
    }

    async fn blocking<T, F>(&self, work: F) -> PortResult<T>
    where
        F: FnOnce(&Path) -> PortResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || work(&root))
            .await
            .map_err(|e| PortError::Unexpected(format!("store task failed: {}", e)))?
    }
}

//=========================================================================================
// Port Implementation
//=========================================================================================

#[async_trait]
impl LocalStore for FileStore {
    async fn get(&self, key: RecordKey) -> Option<Value> {
        let path = self.path_for(key);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(key = key.storage_key(), error = %e, "Stored record could not be read");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = key.storage_key(), error = %e, "Stored record is not valid JSON");
                None
            }
        }
    }

    async fn set(&self, key: RecordKey, value: Value) -> PortResult<()> {
        let contents = encode(key, &value)?;
        self.blocking(move |root| {
            let staged = stage(root, key, &contents)?;
            commit(root, key, staged)
        })
        .await
    }

    async fn remove(&self, key: RecordKey) -> PortResult<()> {
        self.blocking(move |root| delete(root, key)).await
    }

    /// Stages every write before touching any record.
    ///
    /// Ops are first collapsed to the final state of each key. All new contents are
    /// written to temporary files; if any of that fails, nothing has changed. Only
    /// then are the temporary files renamed into place and removed keys deleted.
    async fn apply_batch(&self, ops: Vec<StoreOp>) -> PortResult<()> {
        let mut finals: BTreeMap<RecordKey, Option<Value>> = BTreeMap::new();
        for op in ops {
            match op {
                StoreOp::Set(key, value) => finals.insert(key, Some(value)),
                StoreOp::Remove(key) => finals.insert(key, None),
            };
        }

        let mut plan = Vec::with_capacity(finals.len());
        for (key, value) in finals {
            let contents = value.map(|v| encode(key, &v)).transpose()?;
            plan.push((key, contents));
        }

        self.blocking(move |root| write_plan(root, root, plan)).await
    }
}

//=========================================================================================
// Filesystem Helpers
//=========================================================================================

/// Stages every write in `staging`, then moves the staged files into `root` and
/// deletes the removed keys. `staging` must be on the same filesystem as `root`.
fn write_plan(root: &Path, staging: &Path, plan: Vec<(RecordKey, Option<String>)>) -> PortResult<()> {
    let mut staged = Vec::new();
    let mut removals = Vec::new();
    for (key, contents) in plan {
        match contents {
            Some(contents) => staged.push((key, stage(staging, key, &contents)?)),
            None => removals.push(key),
        }
    }

    for (key, file) in staged {
        commit(root, key, file).inspect_err(|e| {
            error!(key = key.storage_key(), error = %e, "Batch write stopped part way");
        })?;
    }
    for key in removals {
        delete(root, key).inspect_err(|e| {
            error!(key = key.storage_key(), error = %e, "Batch write stopped part way");
        })?;
    }
    Ok(())
}

fn record_path(root: &Path, key: RecordKey) -> PathBuf {
    root.join(format!("{}.json", key.storage_key()))
}

fn encode(key: RecordKey, value: &Value) -> PortResult<String> {
    serde_json::to_string(value)
        .map_err(|e| PortError::Unexpected(format!("cannot encode {}: {}", key, e)))
}

/// Writes `contents` to a temporary file in `dir`. The file is deleted again if it
/// is dropped without being committed.
fn stage(dir: &Path, key: RecordKey, contents: &str) -> PortResult<NamedTempFile> {
    let storage_error =
        |e: std::io::Error| PortError::Storage(format!("cannot stage {}: {}", key.storage_key(), e));

    let mut file = NamedTempFile::new_in(dir).map_err(storage_error)?;
    file.write_all(contents.as_bytes()).map_err(storage_error)?;
    file.flush().map_err(storage_error)?;
    file.as_file().sync_all().map_err(storage_error)?;
    Ok(file)
}

fn commit(root: &Path, key: RecordKey, file: NamedTempFile) -> PortResult<()> {
    file.persist(record_path(root, key)).map_err(|e| {
        PortError::Storage(format!("cannot write {}: {}", key.storage_key(), e.error))
    })?;
    Ok(())
}

fn delete(root: &Path, key: RecordKey) -> PortResult<()> {
    match std::fs::remove_file(record_path(root, key)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PortError::Storage(format!(
            "cannot remove {}: {}",
            key.storage_key(),
            e
        ))),
    }
}
