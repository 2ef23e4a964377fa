//! crates/mentoring_core/src/store.rs
//!
//! Typed access to the records behind a `LocalStore`, and an in-memory store.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::warn;

use crate::domain::{generate_id, Goals, Milestone, Profile, Session};
use crate::ports::{LocalStore, PortError, PortResult, RecordKey};

//=========================================================================================
// Typed Record Accessors
//=========================================================================================

/// Typed getters and setters for every record, available on any `LocalStore`.
///
/// A singleton that does not decode into its record type is treated exactly like
/// corrupted text: the getter returns `None`. Collections decode entry by entry, so
/// one unreadable entry hides only itself.
#[async_trait]
pub trait RecordStore {
    /// The raw entries of a collection. Empty when absent or not a list.
    async fn entries(&self, key: RecordKey) -> Vec<Value>;
    async fn profile(&self) -> Option<Profile>;
    async fn set_profile(&self, profile: &Profile) -> PortResult<()>;
    async fn goals(&self) -> Option<Goals>;
    async fn set_goals(&self, goals: &Goals) -> PortResult<()>;
    async fn sessions(&self) -> Option<Vec<Session>>;
    async fn set_sessions(&self, sessions: &[Session]) -> PortResult<()>;
    async fn milestones(&self) -> Option<Vec<Milestone>>;
    async fn set_milestones(&self, milestones: &[Milestone]) -> PortResult<()>;
    async fn privacy_dismissed(&self) -> bool;
    async fn set_privacy_dismissed(&self, dismissed: bool) -> PortResult<()>;
}

#[async_trait]
impl<S: LocalStore + ?Sized> RecordStore for S {
    async fn entries(&self, key: RecordKey) -> Vec<Value> {
        read_entries(self, key).await.unwrap_or_default()
    }

    async fn profile(&self) -> Option<Profile> {
        read_record(self, RecordKey::Profile).await
    }

    async fn set_profile(&self, profile: &Profile) -> PortResult<()> {
        self.set(RecordKey::Profile, to_value(profile)?).await
    }

    async fn goals(&self) -> Option<Goals> {
        read_record(self, RecordKey::Goals).await
    }

    async fn set_goals(&self, goals: &Goals) -> PortResult<()> {
        self.set(RecordKey::Goals, to_value(goals)?).await
    }

    async fn sessions(&self) -> Option<Vec<Session>> {
        let items = read_entries(self, RecordKey::Sessions).await?;
        Some(decode_entries(RecordKey::Sessions, &items))
    }

    async fn set_sessions(&self, sessions: &[Session]) -> PortResult<()> {
        self.set(RecordKey::Sessions, to_value(sessions)?).await
    }

    async fn milestones(&self) -> Option<Vec<Milestone>> {
        let items = read_entries(self, RecordKey::Milestones).await?;
        Some(decode_entries(RecordKey::Milestones, &items))
    }

    async fn set_milestones(&self, milestones: &[Milestone]) -> PortResult<()> {
        self.set(RecordKey::Milestones, to_value(milestones)?).await
    }

    async fn privacy_dismissed(&self) -> bool {
        matches!(self.get(RecordKey::PrivacyDismissed).await, Some(Value::Bool(true)))
    }

    async fn set_privacy_dismissed(&self, dismissed: bool) -> PortResult<()> {
        self.set(RecordKey::PrivacyDismissed, Value::Bool(dismissed)).await
    }
}

async fn read_record<T, S>(store: &S, key: RecordKey) -> Option<T>
where
    T: DeserializeOwned,
    S: LocalStore + ?Sized,
{
    let value = store.get(key).await?;
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(key = key.storage_key(), "Stored record is unreadable, treating it as absent: {}", e);
            None
        }
    }
}

async fn read_entries<S>(store: &S, key: RecordKey) -> Option<Vec<Value>>
where
    S: LocalStore + ?Sized,
{
    match store.get(key).await? {
        Value::Array(items) => Some(items),
        Value::Null => None,
        _ => {
            warn!(key = key.storage_key(), "Stored collection is not a list, treating it as absent");
            None
        }
    }
}

/// Decodes every entry that fits the record type, skipping the rest.
pub(crate) fn decode_entries<T: DeserializeOwned>(key: RecordKey, items: &[Value]) -> Vec<T> {
    items
        .iter()
        .filter_map(|item| match T::deserialize(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(
                    key = key.storage_key(),
                    id = entry_id(item).as_deref().unwrap_or("-"),
                    "Skipping unreadable entry: {}",
                    e
                );
                None
            }
        })
        .collect()
}

/// The identity of a stored entry. Numeric ids from hand-edited files are read as text.
pub(crate) fn entry_id(item: &Value) -> Option<String> {
    match item.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Gives every object entry without an id a generated one. Returns how many were given.
pub(crate) fn backfill_ids(items: &mut [Value]) -> usize {
    let mut filled = 0;
    for item in items.iter_mut() {
        if entry_id(item).is_some() {
            continue;
        }
        if let Value::Object(fields) = item {
            fields.insert("id".to_string(), Value::String(generate_id()));
            filled += 1;
        }
    }
    filled
}

/// Serializes a record for the store.
pub(crate) fn to_value<T: Serialize + ?Sized>(record: &T) -> PortResult<Value> {
    serde_json::to_value(record).map_err(|e| PortError::Unexpected(e.to_string()))
}

//=========================================================================================
// In-Memory Store
//=========================================================================================

/// A `LocalStore` that keeps serialized text in memory.
///
/// Values are held as JSON text, like browser storage, so corrupted entries can be
/// simulated with [`MemoryStore::insert_raw`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<&'static str, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores raw text under a key, bypassing serialization.
    pub fn insert_raw(&self, key: RecordKey, raw: impl Into<String>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.storage_key(), raw.into());
        }
    }

    /// Makes every subsequent `set` and `remove` fail, as a full disk would.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of keys currently holding a value.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_writable(&self, key: RecordKey) -> PortResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortError::Storage(format!("quota exceeded writing {}", key.storage_key())));
        }
        Ok(())
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn get(&self, key: RecordKey) -> Option<Value> {
        let raw = self.entries.read().ok()?.get(key.storage_key()).cloned()?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = key.storage_key(), "Stored text is not valid JSON, treating it as absent: {}", e);
                None
            }
        }
    }

    async fn set(&self, key: RecordKey, value: Value) -> PortResult<()> {
        self.check_writable(key)?;
        let raw = serde_json::to_string(&value).map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.entries
            .write()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .insert(key.storage_key(), raw);
        Ok(())
    }

    async fn remove(&self, key: RecordKey) -> PortResult<()> {
        self.check_writable(key)?;
        self.entries
            .write()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .remove(key.storage_key());
        Ok(())
    }
}
