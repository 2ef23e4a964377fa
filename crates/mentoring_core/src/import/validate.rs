//! crates/mentoring_core/src/import/validate.rs
//!
//! Structural validation of an untrusted import document.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::export::EXPORT_VERSION;

const NOT_AN_OBJECT: &str = "File does not contain valid JSON data.";
const MISSING_VERSION: &str = "Missing version field.";

/// The outcome of validating a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    /// Notes that do not block the import, such as an unfamiliar version.
    pub warnings: Vec<String>,
    /// Present whenever the input was at least a JSON object, even if invalid.
    pub preview: Option<ImportPreview>,
}

/// A summary of what a document contains, shown before the user picks a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreview {
    pub exported_at: String,
    pub exported_by: String,
    pub has_profile: bool,
    pub has_goals: bool,
    pub session_count: usize,
    pub milestone_count: usize,
}

/// Checks the shape of a parsed document without touching the store.
///
/// All applicable errors are collected rather than stopping at the first one. A
/// `null` member counts as absent, since exports write `null` for missing records.
pub fn validate(document: &Value) -> ValidationReport {
    let Some(doc) = document.as_object() else {
        return ValidationReport {
            valid: false,
            errors: vec![NOT_AN_OBJECT.to_string()],
            warnings: Vec::new(),
            preview: None,
        };
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    match member(doc, "version") {
        None => errors.push(MISSING_VERSION.to_string()),
        Some(Value::String(v)) if v.is_empty() => errors.push(MISSING_VERSION.to_string()),
        Some(Value::String(v)) if v == EXPORT_VERSION => {}
        Some(other) => warnings.push(format!(
            "File version {} differs from the current version {}; it will be imported as-is.",
            display_scalar(other),
            EXPORT_VERSION
        )),
    }

    if member(doc, "sessions").is_some_and(|v| !v.is_array()) {
        errors.push("Sessions data is not in the expected format.".to_string());
    }
    if member(doc, "milestones").is_some_and(|v| !v.is_array()) {
        errors.push("Milestones data is not in the expected format.".to_string());
    }
    if member(doc, "profile").is_some_and(|v| !v.is_object()) {
        errors.push("Profile data is not in the expected format.".to_string());
    }
    if member(doc, "goals").is_some_and(|v| !v.is_object()) {
        errors.push("Goals data is not in the expected format.".to_string());
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        warnings,
        preview: Some(build_preview(doc)),
    }
}

fn build_preview(doc: &Map<String, Value>) -> ImportPreview {
    ImportPreview {
        exported_at: text_or_unknown(member(doc, "exportedAt")),
        exported_by: text_or_unknown(member(doc, "exportedBy")),
        has_profile: member(doc, "profile").is_some(),
        has_goals: member(doc, "goals")
            .and_then(Value::as_object)
            .is_some_and(goals_have_content),
        session_count: array_len(member(doc, "sessions")),
        milestone_count: array_len(member(doc, "milestones")),
    }
}

/// A member that is present and not `null`.
fn member<'a>(doc: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    doc.get(key).filter(|v| !v.is_null())
}

fn text_or_unknown(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => "Unknown".to_string(),
    }
}

fn array_len(value: Option<&Value>) -> usize {
    value.and_then(Value::as_array).map_or(0, Vec::len)
}

// lastUpdated is bookkeeping, not worksheet content.
fn goals_have_content(goals: &Map<String, Value>) -> bool {
    goals
        .iter()
        .filter(|(key, _)| key.as_str() != "lastUpdated")
        .any(|(_, value)| has_text(value))
}

fn has_text(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.is_empty(),
        Value::Number(_) => true,
        Value::Object(fields) => fields.values().any(has_text),
        _ => false,
    }
}

fn display_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn a_full_export_is_valid() {
        let doc = json!({
            "version": "1.0",
            "exportedAt": "2024-05-01T10:00:00.000Z",
            "exportedBy": "mentee",
            "profile": { "name": "Sam", "role": "mentee" },
            "goals": null,
            "sessions": [{ "id": "s1", "sessionNumber": 1 }],
            "milestones": []
        });
        let report = validate(&doc);
        assert!(report.valid);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
        assert_eq!(
            report.preview,
            Some(ImportPreview {
                exported_at: "2024-05-01T10:00:00.000Z".to_string(),
                exported_by: "mentee".to_string(),
                has_profile: true,
                has_goals: false,
                session_count: 1,
                milestone_count: 0,
            })
        );
    }

    #[test]
    fn non_object_input_fails_without_a_preview() {
        for input in [json!(null), json!("text"), json!(42), json!([1, 2])] {
            let report = validate(&input);
            assert!(!report.valid);
            assert_eq!(report.errors, vec![NOT_AN_OBJECT.to_string()]);
            assert!(report.preview.is_none());
        }
    }

    #[test]
    fn sessions_that_are_not_a_list_are_rejected_but_previewed() {
        let report = validate(&json!({ "sessions": "not-an-array" }));
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("Sessions")));
        assert_eq!(report.preview.unwrap().session_count, 0);
    }

    #[test]
    fn errors_accumulate_instead_of_short_circuiting() {
        let report = validate(&json!({
            "sessions": {},
            "milestones": 3,
            "profile": "Ana",
            "goals": ["x"]
        }));
        assert_eq!(
            report.errors,
            vec![
                MISSING_VERSION.to_string(),
                "Sessions data is not in the expected format.".to_string(),
                "Milestones data is not in the expected format.".to_string(),
                "Profile data is not in the expected format.".to_string(),
                "Goals data is not in the expected format.".to_string(),
            ]
        );
    }

    #[test]
    fn empty_version_counts_as_missing() {
        let report = validate(&json!({ "version": "" }));
        assert_eq!(report.errors, vec![MISSING_VERSION.to_string()]);
    }

    #[test]
    fn other_versions_warn_but_stay_valid() {
        let report = validate(&json!({ "version": "2.0", "sessions": [] }));
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("\"2.0\""));
    }

    #[test]
    fn preview_defaults_to_unknown() {
        let preview = validate(&json!({ "version": "1.0" })).preview.unwrap();
        assert_eq!(preview.exported_at, "Unknown");
        assert_eq!(preview.exported_by, "Unknown");
        assert!(!preview.has_profile);
    }

    #[test]
    fn goals_with_only_blank_fields_do_not_count() {
        let doc = json!({
            "version": "1.0",
            "goals": {
                "timeline": "",
                "smart": { "specific": "" },
                "lastUpdated": "2024-05-01T10:00:00.000Z"
            }
        });
        assert!(!validate(&doc).preview.unwrap().has_goals);
    }

    #[test]
    fn nested_smart_text_counts_as_goals() {
        let doc = json!({ "version": "1.0", "goals": { "smart": { "relevant": "Career change" } } });
        assert!(validate(&doc).preview.unwrap().has_goals);
    }
}
