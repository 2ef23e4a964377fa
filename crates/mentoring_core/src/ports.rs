//! crates/mentoring_core/src/ports.rs
//!
//! Defines the contract of the on-device key-value store.
//!
//! The store maps a fixed set of namespaced keys to whole JSON values. Reads never
//! fail: a missing, unreadable or corrupted entry is reported as absent. Writes report
//! failure through `PortResult` instead of panicking.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all store operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Storage write failed: {0}")]
    Storage(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Record Keys
//=========================================================================================

/// The logical records the store knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKey {
    Profile,
    Goals,
    Sessions,
    Milestones,
    PrivacyDismissed,
}

impl RecordKey {
    /// Every known key, in the order `clear_all` removes them.
    pub const ALL: [RecordKey; 5] = [
        RecordKey::Profile,
        RecordKey::Goals,
        RecordKey::Sessions,
        RecordKey::Milestones,
        RecordKey::PrivacyDismissed,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RecordKey::Profile => "profile",
            RecordKey::Goals => "goals",
            RecordKey::Sessions => "sessions",
            RecordKey::Milestones => "milestones",
            RecordKey::PrivacyDismissed => "privacyDismissed",
        }
    }

    /// The namespaced key the value is stored under.
    pub fn storage_key(&self) -> &'static str {
        match self {
            RecordKey::Profile => "cmtk_profile",
            RecordKey::Goals => "cmtk_goals",
            RecordKey::Sessions => "cmtk_sessions",
            RecordKey::Milestones => "cmtk_milestones",
            RecordKey::PrivacyDismissed => "cmtk_privacy_dismissed",
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One write in a batch handed to [`LocalStore::apply_batch`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    Set(RecordKey, Value),
    Remove(RecordKey),
}

impl StoreOp {
    pub fn key(&self) -> RecordKey {
        match self {
            StoreOp::Set(key, _) | StoreOp::Remove(key) => *key,
        }
    }
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Returns the stored value, or `None` when the entry is missing or unreadable.
    async fn get(&self, key: RecordKey) -> Option<Value>;

    /// Replaces the whole value stored under `key`.
    async fn set(&self, key: RecordKey, value: Value) -> PortResult<()>;

    async fn remove(&self, key: RecordKey) -> PortResult<()>;

    /// Removes every known key. Keeps going after a failed removal and reports the
    /// first failure once all keys have been attempted.
    async fn clear_all(&self) -> PortResult<()> {
        let mut first_error = None;
        for key in RecordKey::ALL {
            if let Err(e) = self.remove(key).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Applies a sequence of writes.
    ///
    /// The default applies them one by one and stops at the first failure, leaving
    /// earlier writes in place. Adapters that can stage writes should override this.
    async fn apply_batch(&self, ops: Vec<StoreOp>) -> PortResult<()> {
        for op in ops {
            match op {
                StoreOp::Set(key, value) => self.set(key, value).await?,
                StoreOp::Remove(key) => self.remove(key).await?,
            }
        }
        Ok(())
    }
}
