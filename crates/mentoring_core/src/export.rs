//! crates/mentoring_core/src/export.rs
//!
//! Builds the versioned snapshot of every record for backup and sharing.

use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::ports::{LocalStore, RecordKey};
use crate::store::RecordStore;

/// Format version written into every export.
pub const EXPORT_VERSION: &str = "1.0";

/// A point-in-time snapshot of all records. Built fresh per export, never stored.
///
/// Records are carried as stored, so entries the record model cannot read still
/// make it into the backup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: String,
    /// ISO-8601 timestamp with millisecond precision.
    pub exported_at: String,
    /// The exporting profile's role, or `"unknown"`.
    pub exported_by: String,
    pub profile: Option<Value>,
    pub goals: Option<Value>,
    pub sessions: Vec<Value>,
    pub milestones: Vec<Value>,
}

impl ExportDocument {
    /// Serializes the document as indented JSON, ready to be offered as a download.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Reads the four records at call time and assembles an export document.
///
/// Absent records become `null` (profile, goals) or empty lists (sessions, milestones),
/// so the result is always well-formed.
pub async fn build_export_document<S: LocalStore + ?Sized>(store: &S) -> ExportDocument {
    let profile = singleton(store, RecordKey::Profile).await;
    let goals = singleton(store, RecordKey::Goals).await;
    let sessions = store.entries(RecordKey::Sessions).await;
    let milestones = store.entries(RecordKey::Milestones).await;

    let exported_by = profile
        .as_ref()
        .and_then(|p| p.get("role"))
        .and_then(Value::as_str)
        .filter(|role| !role.is_empty())
        .unwrap_or("unknown")
        .to_string();

    info!(
        sessions = sessions.len(),
        milestones = milestones.len(),
        has_profile = profile.is_some(),
        "Built export document"
    );

    ExportDocument {
        version: EXPORT_VERSION.to_string(),
        exported_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        exported_by,
        profile,
        goals,
        sessions,
        milestones,
    }
}

/// A stored singleton, when it is an object. Anything else would not import back.
async fn singleton<S: LocalStore + ?Sized>(store: &S, key: RecordKey) -> Option<Value> {
    store.get(key).await.filter(Value::is_object)
}

/// The conventional download name, dated for traceability.
pub fn export_filename(date: NaiveDate) -> String {
    format!("mentoring-toolkit-export-{}.json", date.format("%Y-%m-%d"))
}
