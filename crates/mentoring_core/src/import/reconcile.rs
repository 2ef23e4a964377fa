//! crates/mentoring_core/src/import/reconcile.rs
//!
//! Applies a validated import document to the store under a merge or replace policy.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use super::validate::validate;
use super::ImportError;
use crate::ports::{LocalStore, RecordKey, StoreOp};
use crate::store::{backfill_ids, entry_id, RecordStore};

//=========================================================================================
// Policy and Summary
//=========================================================================================

/// How an import is reconciled with what is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportPolicy {
    /// Additive. Existing profile and goals win; sessions and milestones are
    /// appended when their id is new.
    #[default]
    Merge,
    /// Destructive. Every record is cleared, then the document is written.
    Replace,
}

impl fmt::Display for ImportPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportPolicy::Merge => f.write_str("merge"),
            ImportPolicy::Replace => f.write_str("replace"),
        }
    }
}

impl FromStr for ImportPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(ImportPolicy::Merge),
            "replace" => Ok(ImportPolicy::Replace),
            other => Err(format!("'{}' is not an import policy (use merge or replace)", other)),
        }
    }
}

/// What an applied import changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub policy: ImportPolicy,
    pub profile_written: bool,
    pub goals_written: bool,
    pub sessions_added: usize,
    pub sessions_skipped: usize,
    pub milestones_added: usize,
    pub milestones_skipped: usize,
}

impl ImportSummary {
    fn new(policy: ImportPolicy) -> Self {
        Self {
            policy,
            profile_written: false,
            goals_written: false,
            sessions_added: 0,
            sessions_skipped: 0,
            milestones_added: 0,
            milestones_skipped: 0,
        }
    }
}

//=========================================================================================
// Document Members
//=========================================================================================

/// A non-null member of the document.
fn member<'a>(doc: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    doc.get(name).filter(|v| !v.is_null())
}

/// The records of an imported collection, ready to store.
///
/// Entries are taken as they are. Only the id is filled in when missing, and
/// entries that are not objects cannot be records, so they are dropped.
struct Incoming {
    records: Vec<Value>,
    dropped: usize,
}

impl Incoming {
    fn read(doc: &Map<String, Value>, name: &'static str) -> Option<Self> {
        let items = member(doc, name)?.as_array()?;
        let mut records: Vec<Value> = items.iter().filter(|item| item.is_object()).cloned().collect();
        let dropped = items.len() - records.len();
        if dropped > 0 {
            warn!(record = name, dropped, "Ignoring imported entries that are not objects");
        }
        backfill_ids(&mut records);
        Some(Self { records, dropped })
    }
}

//=========================================================================================
// Apply
//=========================================================================================

/// Validates and writes an import document.
///
/// Nothing is written when validation fails, and a document that validates is
/// always applied. Writes go through [`LocalStore::apply_batch`], so whether a
/// failed write can leave a partial result depends on the store adapter.
pub async fn apply_import<S: LocalStore + ?Sized>(
    store: &S,
    document: &Value,
    policy: ImportPolicy,
) -> Result<ImportSummary, ImportError> {
    let report = validate(document);
    if !report.valid {
        return Err(ImportError::Rejected(report.errors));
    }
    let doc = document
        .as_object()
        .ok_or_else(|| ImportError::Rejected(report.errors.clone()))?;

    let (ops, summary) = match policy {
        ImportPolicy::Replace => plan_replace(doc),
        ImportPolicy::Merge => plan_merge(store, doc).await,
    };
    store.apply_batch(ops).await?;

    info!(
        policy = %summary.policy,
        profile_written = summary.profile_written,
        goals_written = summary.goals_written,
        sessions_added = summary.sessions_added,
        sessions_skipped = summary.sessions_skipped,
        milestones_added = summary.milestones_added,
        milestones_skipped = summary.milestones_skipped,
        "Import applied"
    );
    Ok(summary)
}

fn plan_replace(doc: &Map<String, Value>) -> (Vec<StoreOp>, ImportSummary) {
    let mut summary = ImportSummary::new(ImportPolicy::Replace);
    let mut ops: Vec<StoreOp> = RecordKey::ALL.iter().map(|key| StoreOp::Remove(*key)).collect();

    if let Some(profile) = member(doc, "profile") {
        ops.push(StoreOp::Set(RecordKey::Profile, profile.clone()));
        summary.profile_written = true;
    }
    if let Some(goals) = member(doc, "goals") {
        ops.push(StoreOp::Set(RecordKey::Goals, goals.clone()));
        summary.goals_written = true;
    }

    let (sessions, added, skipped) = replacement(doc, "sessions");
    summary.sessions_added = added;
    summary.sessions_skipped = skipped;
    ops.push(StoreOp::Set(RecordKey::Sessions, sessions));

    let (milestones, added, skipped) = replacement(doc, "milestones");
    summary.milestones_added = added;
    summary.milestones_skipped = skipped;
    ops.push(StoreOp::Set(RecordKey::Milestones, milestones));

    (ops, summary)
}

/// The list a replace import stores for a collection: the document's, or empty.
fn replacement(doc: &Map<String, Value>, name: &'static str) -> (Value, usize, usize) {
    let Some(incoming) = Incoming::read(doc, name) else {
        return (Value::Array(Vec::new()), 0, 0);
    };
    let fresh = unique_by_id(incoming.records, HashSet::new());
    let added = fresh.kept.len();
    (Value::Array(fresh.kept), added, fresh.skipped + incoming.dropped)
}

async fn plan_merge<S: LocalStore + ?Sized>(
    store: &S,
    doc: &Map<String, Value>,
) -> (Vec<StoreOp>, ImportSummary) {
    let mut summary = ImportSummary::new(ImportPolicy::Merge);
    let mut ops = Vec::new();

    // Local singletons always win, so only fill them when nothing is stored.
    if let Some(profile) = member(doc, "profile") {
        if !is_stored(store, RecordKey::Profile).await {
            ops.push(StoreOp::Set(RecordKey::Profile, profile.clone()));
            summary.profile_written = true;
        }
    }
    if let Some(goals) = member(doc, "goals") {
        if !is_stored(store, RecordKey::Goals).await {
            ops.push(StoreOp::Set(RecordKey::Goals, goals.clone()));
            summary.goals_written = true;
        }
    }

    if let Some(sessions) = Incoming::read(doc, "sessions").filter(|s| !s.records.is_empty()) {
        let (merged, added, skipped) = append_new(store, RecordKey::Sessions, sessions).await;
        summary.sessions_added = added;
        summary.sessions_skipped = skipped;
        ops.push(StoreOp::Set(RecordKey::Sessions, merged));
    }
    if let Some(milestones) = Incoming::read(doc, "milestones").filter(|m| !m.records.is_empty()) {
        let (merged, added, skipped) = append_new(store, RecordKey::Milestones, milestones).await;
        summary.milestones_added = added;
        summary.milestones_skipped = skipped;
        ops.push(StoreOp::Set(RecordKey::Milestones, merged));
    }

    (ops, summary)
}

async fn is_stored<S: LocalStore + ?Sized>(store: &S, key: RecordKey) -> bool {
    store.get(key).await.is_some_and(|v| !v.is_null())
}

/// Appends the imported records whose id is not already stored under `key`.
///
/// Stored entries are kept exactly as they are, including ones the record model
/// cannot decode. Returns the merged list with the number of added and skipped records.
async fn append_new<S: LocalStore + ?Sized>(
    store: &S,
    key: RecordKey,
    incoming: Incoming,
) -> (Value, usize, usize) {
    let mut existing = store.entries(key).await;
    let known: HashSet<String> = existing.iter().filter_map(entry_id).collect();

    let fresh = unique_by_id(incoming.records, known);
    let added = fresh.kept.len();
    existing.extend(fresh.kept);
    (Value::Array(existing), added, fresh.skipped + incoming.dropped)
}

struct Deduped {
    kept: Vec<Value>,
    skipped: usize,
}

/// Keeps records in order, dropping any whose id is already in `seen` or repeats
/// an earlier record.
fn unique_by_id(records: Vec<Value>, mut seen: HashSet<String>) -> Deduped {
    let mut kept = Vec::with_capacity(records.len());
    let mut skipped = 0;
    for record in records {
        match entry_id(&record) {
            Some(id) if !seen.insert(id.clone()) => skipped += 1,
            _ => kept.push(record),
        }
    }
    Deduped { kept, skipped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Role, Session};
    use crate::ports::PortError;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_raw(RecordKey::Profile, r#"{"name":"Local","role":"mentee"}"#);
        store.insert_raw(RecordKey::Goals, r#"{"timeline":"6 weeks"}"#);
        store.insert_raw(
            RecordKey::Sessions,
            r#"[{"id":"a","sessionNumber":1,"topics":"Original"}]"#,
        );
        store.insert_raw(RecordKey::Milestones, r#"[{"id":"m1","achievement":"Local win"}]"#);
        store.insert_raw(RecordKey::PrivacyDismissed, "true");
        store
    }

    fn session_ids(sessions: &[Session]) -> Vec<&str> {
        sessions.iter().map(|s| s.id.as_str()).collect()
    }

    #[tokio::test]
    async fn merge_into_an_empty_store_takes_everything() {
        let store = MemoryStore::new();
        let doc = json!({
            "version": "1.0",
            "profile": { "name": "Ana", "role": "mentor" },
            "sessions": [{ "id": "s1", "sessionNumber": 1 }],
            "milestones": []
        });

        apply_import(&store, &doc, ImportPolicy::Merge).await.unwrap();

        assert_eq!(store.profile().await.unwrap().name, "Ana");
        assert_eq!(
            store.get(RecordKey::Sessions).await.unwrap(),
            json!([{ "id": "s1", "sessionNumber": 1 }])
        );
    }

    #[tokio::test]
    async fn merge_never_overwrites_profile_or_goals() {
        let store = seeded_store();
        let doc = json!({
            "version": "1.0",
            "profile": { "name": "Imported", "role": "mentor" },
            "goals": { "timeline": "2 weeks" }
        });

        let summary = apply_import(&store, &doc, ImportPolicy::Merge).await.unwrap();

        assert!(!summary.profile_written);
        assert!(!summary.goals_written);
        assert_eq!(store.profile().await.unwrap().name, "Local");
        assert_eq!(store.goals().await.unwrap().timeline, "6 weeks");
    }

    #[tokio::test]
    async fn merge_drops_id_collisions() {
        let store = seeded_store();
        let doc = json!({
            "version": "1.0",
            "sessions": [
                { "id": "a", "sessionNumber": 9, "topics": "Different" },
                { "id": "b", "sessionNumber": 1 }
            ]
        });

        let summary = apply_import(&store, &doc, ImportPolicy::Merge).await.unwrap();

        let sessions = store.sessions().await.unwrap();
        assert_eq!(session_ids(&sessions), vec!["a", "b"]);
        assert_eq!(sessions[0].topics.as_deref(), Some("Original"));
        // Display numbers may collide after a merge; only ids are checked.
        assert_eq!(sessions[1].session_number, 1);
        assert_eq!((summary.sessions_added, summary.sessions_skipped), (1, 1));
    }

    #[tokio::test]
    async fn merge_without_sessions_leaves_them_unchanged() {
        let store = seeded_store();
        let before = store.get(RecordKey::Sessions).await;
        let doc = json!({ "version": "1.0", "milestones": [{ "id": "m2", "achievement": "New" }] });

        apply_import(&store, &doc, ImportPolicy::Merge).await.unwrap();

        assert_eq!(store.get(RecordKey::Sessions).await, before);
        assert_eq!(store.milestones().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn merge_is_idempotent() {
        let store = seeded_store();
        let doc = json!({
            "version": "1.0",
            "sessions": [{ "id": "b", "sessionNumber": 2 }, { "id": "c", "sessionNumber": 3 }],
            "milestones": [{ "id": "m2", "achievement": "Interview landed" }]
        });

        apply_import(&store, &doc, ImportPolicy::Merge).await.unwrap();
        let sessions_once = store.get(RecordKey::Sessions).await;
        let milestones_once = store.get(RecordKey::Milestones).await;

        let second = apply_import(&store, &doc, ImportPolicy::Merge).await.unwrap();

        assert_eq!(second.sessions_added, 0);
        assert_eq!(second.milestones_added, 0);
        assert_eq!(store.get(RecordKey::Sessions).await, sessions_once);
        assert_eq!(store.get(RecordKey::Milestones).await, milestones_once);
    }

    #[tokio::test]
    async fn merge_keeps_stored_entries_it_cannot_decode() {
        let store = MemoryStore::new();
        store.insert_raw(RecordKey::Milestones, r#"[{"id":"legacy","note":"no achievement"}]"#);
        let doc = json!({ "version": "1.0", "milestones": [{ "id": "m2", "achievement": "New" }] });

        apply_import(&store, &doc, ImportPolicy::Merge).await.unwrap();

        let stored = store.get(RecordKey::Milestones).await.unwrap();
        assert_eq!(stored.as_array().unwrap().len(), 2);
        assert_eq!(stored[0]["id"], "legacy");
    }

    #[tokio::test]
    async fn replace_supersedes_everything() {
        let store = seeded_store();
        let doc = json!({
            "version": "1.0",
            "profile": { "name": "Imported", "role": "mentor" },
            "milestones": [{ "id": "m9", "achievement": "Imported win" }]
        });

        let summary = apply_import(&store, &doc, ImportPolicy::Replace).await.unwrap();

        assert_eq!(store.profile().await.unwrap().name, "Imported");
        assert!(store.goals().await.is_none());
        assert!(!store.privacy_dismissed().await);
        assert_eq!(store.sessions().await.unwrap(), Vec::<Session>::new());
        assert_eq!(store.milestones().await.unwrap()[0].id, "m9");
        assert!(summary.profile_written);
        assert!(!summary.goals_written);
    }

    #[tokio::test]
    async fn replace_without_sessions_empties_them() {
        let store = seeded_store();
        apply_import(&store, &json!({ "version": "1.0" }), ImportPolicy::Replace)
            .await
            .unwrap();
        assert_eq!(store.get(RecordKey::Sessions).await, Some(json!([])));
        assert_eq!(store.get(RecordKey::Milestones).await, Some(json!([])));
        assert!(store.profile().await.is_none());
    }

    #[tokio::test]
    async fn invalid_documents_write_nothing() {
        let store = seeded_store();
        let before = store.get(RecordKey::Sessions).await;

        let result = apply_import(&store, &json!({ "sessions": "nope" }), ImportPolicy::Replace).await;

        assert!(matches!(result, Err(ImportError::Rejected(ref errors)) if errors.len() == 2));
        assert_eq!(store.get(RecordKey::Sessions).await, before);
        assert!(store.profile().await.is_some());
    }

    #[tokio::test]
    async fn documents_that_validate_are_always_applied() {
        let documents = [
            json!({ "version": "1.0", "profile": { "role": "Mentor" } }),
            json!({ "version": "1.0", "profile": {} }),
            json!({ "version": "1.0", "sessions": [{ "id": "s1", "menteeRating": "4" }] }),
            json!({ "version": "1.0", "sessions": [{ "id": "s1", "createdAt": "2024-05-01" }] }),
            json!({ "version": "1.0", "sessions": [{ "id": "s1", "sessionNumber": "one" }] }),
        ];
        for doc in documents {
            assert!(validate(&doc).valid);
            for policy in [ImportPolicy::Merge, ImportPolicy::Replace] {
                let store = MemoryStore::new();
                let result = apply_import(&store, &doc, policy).await;
                assert!(result.is_ok(), "{} import of {} failed: {:?}", policy, doc, result);
            }
        }
    }

    #[tokio::test]
    async fn records_are_stored_as_they_arrive() {
        let store = MemoryStore::new();
        let doc = json!({
            "version": "1.0",
            "profile": { "name": "Ana", "role": "Mentor", "pronouns": "she/her" },
            "sessions": [{ "id": "s1", "sessionNumber": 1, "menteeRating": "4" }]
        });

        apply_import(&store, &doc, ImportPolicy::Replace).await.unwrap();

        assert_eq!(store.get(RecordKey::Profile).await, Some(doc["profile"].clone()));
        assert_eq!(store.get(RecordKey::Sessions).await, Some(doc["sessions"].clone()));
        assert_eq!(store.profile().await.unwrap().role, Role::Mentor);
        assert_eq!(store.sessions().await.unwrap()[0].mentee_rating, Some(4));
    }

    #[tokio::test]
    async fn entries_that_are_not_objects_are_skipped() {
        let store = MemoryStore::new();
        let doc = json!({
            "version": "1.0",
            "milestones": ["Passed Security+", { "id": "m1", "achievement": "Passed Security+" }, 3]
        });

        let summary = apply_import(&store, &doc, ImportPolicy::Replace).await.unwrap();

        assert_eq!((summary.milestones_added, summary.milestones_skipped), (1, 2));
        assert_eq!(
            store.get(RecordKey::Milestones).await,
            Some(json!([{ "id": "m1", "achievement": "Passed Security+" }]))
        );
    }

    #[tokio::test]
    async fn write_faults_surface_as_storage_errors() {
        let store = seeded_store();
        store.fail_writes(true);
        let doc = json!({ "version": "1.0", "sessions": [{ "id": "z" }] });

        let result = apply_import(&store, &doc, ImportPolicy::Merge).await;

        assert!(matches!(result, Err(ImportError::Storage(PortError::Storage(_)))));
    }

    #[tokio::test]
    async fn imported_records_without_ids_get_one() {
        let store = MemoryStore::new();
        let doc = json!({ "version": "1.0", "sessions": [{ "sessionNumber": 1 }, { "sessionNumber": 2 }] });

        apply_import(&store, &doc, ImportPolicy::Merge).await.unwrap();

        let sessions = store.sessions().await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_ne!(sessions[0].id, sessions[1].id);
    }

    #[tokio::test]
    async fn numeric_ids_collide_with_their_text_form() {
        let store = MemoryStore::new();
        store.insert_raw(RecordKey::Sessions, r#"[{"id":7,"sessionNumber":1}]"#);
        let doc = json!({ "version": "1.0", "sessions": [{ "id": "7" }, { "id": "8" }] });

        let summary = apply_import(&store, &doc, ImportPolicy::Merge).await.unwrap();

        assert_eq!((summary.sessions_added, summary.sessions_skipped), (1, 1));
    }

    #[test]
    fn policy_parses_from_text() {
        assert_eq!("Replace".parse::<ImportPolicy>(), Ok(ImportPolicy::Replace));
        assert!("overwrite".parse::<ImportPolicy>().is_err());
    }
}
