//! crates/mentoring_core/src/tracker.rs
//!
//! Record-level operations behind the setup, goals and session-log screens.
//!
//! Goals, sessions and milestones only make sense once a profile exists, so those
//! operations take a [`ProfileContext`], which can only be obtained by loading a
//! stored profile.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::domain::{
    generate_id, Goals, Milestone, MilestoneDraft, Profile, ProfileDraft, Session, SessionDraft,
};
use crate::ports::{LocalStore, PortError, RecordKey};
use crate::store::{backfill_ids, decode_entries, entry_id, to_value, RecordStore};

//=========================================================================================
// Errors and Limits
//=========================================================================================

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("A profile is required. Please set up your profile first.")]
    ProfileRequired,
    #[error("{0}")]
    Invalid(String),
    #[error("The program allows at most {max} {what}.")]
    LimitReached { what: &'static str, max: usize },
    #[error("No {what} with id {id}")]
    NotFound { what: &'static str, id: String },
    #[error(transparent)]
    Port(#[from] PortError),
}

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Capacity of the session log and milestone list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_sessions: usize,
    pub max_milestones: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_sessions: 4,
            max_milestones: 4,
        }
    }
}

//=========================================================================================
// Profile
//=========================================================================================

/// Proof that a profile exists, threaded into every profile-gated operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileContext {
    profile: Profile,
}

impl ProfileContext {
    /// Loads the stored profile, or fails with [`TrackerError::ProfileRequired`].
    pub async fn load<S: LocalStore + ?Sized>(store: &S) -> TrackerResult<Self> {
        store
            .profile()
            .await
            .map(|profile| Self { profile })
            .ok_or(TrackerError::ProfileRequired)
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }
}

/// Creates or updates the profile. `createdAt` is kept from the stored profile.
pub async fn save_profile<S: LocalStore + ?Sized>(
    store: &S,
    draft: ProfileDraft,
) -> TrackerResult<Profile> {
    let name = draft.name.trim().to_string();
    if name.is_empty() {
        return Err(TrackerError::Invalid("Name is required".to_string()));
    }
    let role = draft
        .role
        .ok_or_else(|| TrackerError::Invalid("Please select your role".to_string()))?;

    let existing = store.profile().await;
    let created_at = existing
        .as_ref()
        .and_then(|p| p.created_at)
        .unwrap_or_else(Utc::now);
    let extra = existing.map(|p| p.extra).unwrap_or_default();

    let profile = Profile {
        name,
        email: trimmed(draft.email),
        role,
        target_role: trimmed(draft.target_role),
        program_start_date: trimmed(draft.program_start_date),
        partner_name: trimmed(draft.partner_name),
        created_at: Some(created_at),
        extra,
    };
    store.set_profile(&profile).await?;
    info!(role = %profile.role, "Profile saved");
    Ok(profile)
}

//=========================================================================================
// Goals
//=========================================================================================

/// Writes the whole goals worksheet, stamping `lastUpdated`.
pub async fn save_goals<S: LocalStore + ?Sized>(
    store: &S,
    _ctx: &ProfileContext,
    mut goals: Goals,
) -> TrackerResult<Goals> {
    goals.last_updated = Some(Utc::now());
    store.set_goals(&goals).await?;
    Ok(goals)
}

//=========================================================================================
// Sessions
//=========================================================================================

/// How far through the program the session log is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub logged: usize,
    pub max: usize,
    pub remaining: usize,
    pub complete: bool,
}

pub async fn list_sessions<S: LocalStore + ?Sized>(
    store: &S,
    _ctx: &ProfileContext,
) -> TrackerResult<Vec<Session>> {
    let items = load_collection(store, RecordKey::Sessions).await?;
    Ok(decode_entries(RecordKey::Sessions, &items))
}

/// Sessions ordered by their display number.
pub fn sessions_sorted(mut sessions: Vec<Session>) -> Vec<Session> {
    sessions.sort_by_key(|s| s.session_number);
    sessions
}

/// The number the next new session will get: one past the highest in use.
///
/// Reads `sessionNumber` from the stored entries, so entries that no longer decode
/// still hold on to their number.
pub fn next_session_number(items: &[Value]) -> u32 {
    items
        .iter()
        .filter_map(|item| item.get("sessionNumber").and_then(Value::as_u64))
        .max()
        .map_or(1, |n| u32::try_from(n).unwrap_or(u32::MAX).saturating_add(1))
}

pub async fn add_session<S: LocalStore + ?Sized>(
    store: &S,
    _ctx: &ProfileContext,
    limits: Limits,
    draft: SessionDraft,
) -> TrackerResult<Session> {
    check_rating(draft.mentee_rating)?;
    let mut items = load_collection(store, RecordKey::Sessions).await?;
    if items.len() >= limits.max_sessions {
        return Err(TrackerError::LimitReached {
            what: "sessions",
            max: limits.max_sessions,
        });
    }

    let session = Session {
        id: generate_id(),
        session_number: next_session_number(&items),
        date: trimmed(draft.date),
        topics: draft.topics,
        action_items: draft.action_items,
        notes: draft.notes,
        mentee_rating: draft.mentee_rating,
        created_at: Some(Utc::now()),
        extra: Default::default(),
    };
    items.push(to_value(&session)?);
    store.set(RecordKey::Sessions, Value::Array(items)).await?;
    info!(id = %session.id, number = session.session_number, "Session logged");
    Ok(session)
}

/// Replaces the editable fields of a session, keeping its id, number and `createdAt`.
pub async fn update_session<S: LocalStore + ?Sized>(
    store: &S,
    _ctx: &ProfileContext,
    id: &str,
    draft: SessionDraft,
) -> TrackerResult<Session> {
    check_rating(draft.mentee_rating)?;
    let mut items = load_collection(store, RecordKey::Sessions).await?;
    let slot = find_entry(&mut items, "session", id)?;
    let mut session: Session = decode_stored(slot, "session", id)?;

    session.date = trimmed(draft.date);
    session.topics = draft.topics;
    session.action_items = draft.action_items;
    session.notes = draft.notes;
    session.mentee_rating = draft.mentee_rating;
    *slot = to_value(&session)?;

    store.set(RecordKey::Sessions, Value::Array(items)).await?;
    Ok(session)
}

/// Removes a session. Remaining sessions keep their numbers.
pub async fn delete_session<S: LocalStore + ?Sized>(
    store: &S,
    _ctx: &ProfileContext,
    id: &str,
) -> TrackerResult<()> {
    remove_entry(store, RecordKey::Sessions, "session", id).await?;
    info!(id, "Session deleted");
    Ok(())
}

/// Counts every stored session entry, readable or not, since each one holds a slot.
pub async fn progress<S: LocalStore + ?Sized>(
    store: &S,
    _ctx: &ProfileContext,
    limits: Limits,
) -> Progress {
    let logged = store.entries(RecordKey::Sessions).await.len();
    Progress {
        logged: logged.min(limits.max_sessions),
        max: limits.max_sessions,
        remaining: limits.max_sessions.saturating_sub(logged),
        complete: logged >= limits.max_sessions,
    }
}

fn check_rating(rating: Option<u8>) -> TrackerResult<()> {
    match rating {
        Some(r) if !(1..=5).contains(&r) => Err(TrackerError::Invalid(format!(
            "Mentee rating must be between 1 and 5, got {}",
            r
        ))),
        _ => Ok(()),
    }
}

//=========================================================================================
// Milestones
//=========================================================================================

pub async fn list_milestones<S: LocalStore + ?Sized>(
    store: &S,
    _ctx: &ProfileContext,
) -> TrackerResult<Vec<Milestone>> {
    let items = load_collection(store, RecordKey::Milestones).await?;
    Ok(decode_entries(RecordKey::Milestones, &items))
}

pub async fn add_milestone<S: LocalStore + ?Sized>(
    store: &S,
    _ctx: &ProfileContext,
    limits: Limits,
    draft: MilestoneDraft,
) -> TrackerResult<Milestone> {
    let achievement = required_achievement(&draft.achievement)?;
    let mut items = load_collection(store, RecordKey::Milestones).await?;
    if items.len() >= limits.max_milestones {
        return Err(TrackerError::LimitReached {
            what: "milestones",
            max: limits.max_milestones,
        });
    }

    let milestone = Milestone {
        id: generate_id(),
        date: trimmed(draft.date),
        achievement,
        next_step: trimmed(draft.next_step),
        extra: Default::default(),
    };
    items.push(to_value(&milestone)?);
    store.set(RecordKey::Milestones, Value::Array(items)).await?;
    info!(id = %milestone.id, "Milestone recorded");
    Ok(milestone)
}

pub async fn update_milestone<S: LocalStore + ?Sized>(
    store: &S,
    _ctx: &ProfileContext,
    id: &str,
    draft: MilestoneDraft,
) -> TrackerResult<Milestone> {
    let achievement = required_achievement(&draft.achievement)?;
    let mut items = load_collection(store, RecordKey::Milestones).await?;
    let slot = find_entry(&mut items, "milestone", id)?;
    let mut milestone: Milestone = decode_stored(slot, "milestone", id)?;

    milestone.date = trimmed(draft.date);
    milestone.achievement = achievement;
    milestone.next_step = trimmed(draft.next_step);
    *slot = to_value(&milestone)?;

    store.set(RecordKey::Milestones, Value::Array(items)).await?;
    Ok(milestone)
}

pub async fn delete_milestone<S: LocalStore + ?Sized>(
    store: &S,
    _ctx: &ProfileContext,
    id: &str,
) -> TrackerResult<()> {
    remove_entry(store, RecordKey::Milestones, "milestone", id).await?;
    info!(id, "Milestone deleted");
    Ok(())
}

fn required_achievement(raw: &str) -> TrackerResult<String> {
    let achievement = raw.trim();
    if achievement.is_empty() {
        return Err(TrackerError::Invalid("Achievement is required".to_string()));
    }
    Ok(achievement.to_string())
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Reads a collection exactly as stored. Entries without an id are given one, and
/// the ids are saved straight away so they stay the same on the next read.
async fn load_collection<S: LocalStore + ?Sized>(
    store: &S,
    key: RecordKey,
) -> TrackerResult<Vec<Value>> {
    let mut items = store.entries(key).await;
    let filled = backfill_ids(&mut items);
    if filled > 0 {
        store.set(key, Value::Array(items.clone())).await?;
        info!(key = key.storage_key(), filled, "Assigned ids to stored entries");
    }
    Ok(items)
}

fn find_entry<'a>(items: &'a mut [Value], what: &'static str, id: &str) -> TrackerResult<&'a mut Value> {
    items
        .iter_mut()
        .find(|item| entry_id(item).as_deref() == Some(id))
        .ok_or_else(|| not_found(what, id))
}

fn decode_stored<T: DeserializeOwned>(item: &Value, what: &'static str, id: &str) -> TrackerResult<T> {
    T::deserialize(item).map_err(|e| {
        TrackerError::Invalid(format!("The stored {} {} could not be read: {}", what, id, e))
    })
}

async fn remove_entry<S: LocalStore + ?Sized>(
    store: &S,
    key: RecordKey,
    what: &'static str,
    id: &str,
) -> TrackerResult<()> {
    let mut items = load_collection(store, key).await?;
    let before = items.len();
    items.retain(|item| entry_id(item).as_deref() != Some(id));
    if items.len() == before {
        return Err(not_found(what, id));
    }
    store.set(key, Value::Array(items)).await?;
    Ok(())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

fn not_found(what: &'static str, id: &str) -> TrackerError {
    TrackerError::NotFound {
        what,
        id: id.to_string(),
    }
}
