//! crates/mentoring_core/src/domain.rs
//!
//! Defines the records persisted by the local store.
//!
//! Every record round-trips through JSON using the camelCase field names of the
//! export format. Fields this model does not know about are kept in `extra` so an
//! import followed by an export does not lose data.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Profile
//=========================================================================================

/// Which side of the mentoring relationship the local user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Mentor,
    Mentee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Mentor => "mentor",
            Role::Mentee => "mentee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mentor" => Ok(Role::Mentor),
            "mentee" => Ok(Role::Mentee),
            other => Err(format!("'{}' is not a valid role", other)),
        }
    }
}

/// Hand-edited files sometimes capitalise the role, so it is read case-insensitively.
impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The singleton profile of the person using the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
    /// Key into the career-track catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_name: Option<String>,
    /// Set on first save, never overwritten afterwards.
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The editable part of a profile, as submitted by the setup form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub target_role: Option<String>,
    #[serde(default)]
    pub program_start_date: Option<String>,
    #[serde(default)]
    pub partner_name: Option<String>,
}

//=========================================================================================
// Goals
//=========================================================================================

/// The SMART breakdown of the primary goal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SmartGoal {
    pub specific: String,
    pub measurable: String,
    pub achievable: String,
    pub relevant: String,
    pub time_bound: String,
}

impl SmartGoal {
    fn fields(&self) -> [&str; 5] {
        [
            self.specific.as_str(),
            self.measurable.as_str(),
            self.achievable.as_str(),
            self.relevant.as_str(),
            self.time_bound.as_str(),
        ]
    }
}

/// The singleton goal-setting worksheet. No field is required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goals {
    #[serde(default)]
    pub target_job_title: String,
    #[serde(default)]
    pub timeline: String,
    #[serde(default)]
    pub current_skills: String,
    #[serde(default)]
    pub skills_to_learn: String,
    #[serde(default)]
    pub certs_pursuing: String,
    #[serde(default)]
    pub networking_goals: String,
    #[serde(default)]
    pub biggest_challenge: String,
    #[serde(default)]
    pub how_mentor_can_help: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub hours_per_week: String,
    #[serde(default)]
    pub smart: SmartGoal,
    /// Rewritten on every save.
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Goals {
    /// True when at least one worksheet field holds text.
    pub fn has_content(&self) -> bool {
        let worksheet = [
            &self.target_job_title,
            &self.timeline,
            &self.current_skills,
            &self.skills_to_learn,
            &self.certs_pursuing,
            &self.networking_goals,
            &self.biggest_challenge,
            &self.how_mentor_can_help,
            &self.hours_per_week,
        ];
        worksheet.iter().any(|f| !f.is_empty()) || self.smart.fields().iter().any(|f| !f.is_empty())
    }
}

//=========================================================================================
// Sessions and Milestones
//=========================================================================================

/// One logged mentoring session.
///
/// `id` is the identity; `session_number` only orders the log for display and may
/// have gaps after deletions or collide after a merge import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub session_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_items: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_rating",
        skip_serializing_if = "Option::is_none"
    )]
    pub mentee_rating: Option<u8>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The editable part of a session.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDraft {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub topics: Option<String>,
    #[serde(default)]
    pub action_items: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub mentee_rating: Option<u8>,
}

/// A recorded achievement, e.g. a passed certification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub achievement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_step: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneDraft {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub achievement: String,
    #[serde(default)]
    pub next_step: Option<String>,
}

//=========================================================================================
// Identity and Serde Helpers
//=========================================================================================

/// Generates a record id: a base-36 millisecond timestamp followed by a random suffix.
///
/// Uniqueness is probabilistic, which is enough for a single writer on one device.
pub fn generate_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}{}", to_base36(millis), &suffix[..6])
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Reads an optional RFC 3339 timestamp, treating `null` and `""` as absent.
/// A bare `YYYY-MM-DD` date reads as midnight UTC.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let text = match raw.as_deref().map(str::trim) {
        None | Some("") => return Ok(None),
        Some(text) => text,
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Some(Utc.from_utc_datetime(&midnight)))
        .ok_or_else(|| serde::de::Error::custom(format!("'{}' is not a timestamp", text)))
}

/// A 1-5 rating stored as a number or, from a form field, as text.
fn lenient_rating<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u8::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("{} is not a rating", n))),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<u8>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("'{}' is not a rating", s))),
        other => Err(serde::de::Error::custom(format!("{} is not a rating", other))),
    }
}

/// Number inputs are stored as text, but hand-edited files sometimes carry a number.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected text or a number, found {}",
            other
        ))),
    }
}
