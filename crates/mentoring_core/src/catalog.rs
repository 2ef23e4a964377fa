//! crates/mentoring_core/src/catalog.rs
//!
//! Static reference data: career tracks and email templates, plus the token
//! substitution used to personalise a template from the stored profile.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::domain::{Profile, Role};

//=========================================================================================
// Career Tracks
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CareerTrack {
    pub key: &'static str,
    pub label: &'static str,
}

pub const CAREER_TRACKS: &[CareerTrack] = &[
    CareerTrack { key: "soc-analyst", label: "SOC Analyst" },
    CareerTrack { key: "grc-analyst", label: "GRC Analyst" },
    CareerTrack { key: "penetration-tester", label: "Penetration Tester" },
    CareerTrack { key: "cloud-security", label: "Cloud Security Engineer" },
    CareerTrack { key: "appsec", label: "Application Security Engineer" },
    CareerTrack { key: "incident-responder", label: "Incident Responder" },
];

/// Looks up a career track by its key.
pub fn career_track(key: &str) -> Option<&'static CareerTrack> {
    CAREER_TRACKS.iter().find(|t| t.key == key)
}

//=========================================================================================
// Email Templates
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmailTemplate {
    pub id: &'static str,
    pub label: &'static str,
    /// When the template is meant to be sent.
    pub scenario: &'static str,
    pub subject: &'static str,
    pub body: &'static str,
}

pub const EMAIL_TEMPLATES: &[EmailTemplate] = &[
    EmailTemplate {
        id: "welcome",
        label: "First Outreach / Welcome Email",
        scenario: "Send this before or right after your first session.",
        subject: "Welcome to Our Mentoring Relationship!",
        body: "Hi [MENTEE_NAME],

It was great connecting with you through the [PROGRAM_NAME] mentoring program! I'm excited to support your journey into cybersecurity.

Based on our initial conversation, it sounds like you're most interested in [TARGET_ROLE]. I've started putting together resources tailored to that path, which I'll share in our first session.

Before we meet, it would be great if you could think through:
  \u{2022} Where you want to be in 12 months \u{2014} what does success look like?
  \u{2022} Your top 2\u{2013}3 skills gaps you most want to close
  \u{2022} Any certifications you've already started or considered

Our first session is scheduled for [SESSION_DATE]. I look forward to working with you!

[MENTOR_NAME]",
    },
    EmailTemplate {
        id: "resources",
        label: "Role-Specific Resource Email",
        scenario: "Send after Session 1 once the target role is clear.",
        subject: "Your [TARGET_ROLE] Career Path \u{2014} Resources & Next Steps",
        body: "Hi [MENTEE_NAME],

It was great speaking with you about your career transition into [TARGET_ROLE]! Based on our conversation, I've pulled together resources specifically tailored to your interests and background.

--- CERTIFICATIONS TO CONSIDER ---
[Paste relevant certs from the Resource Library tab]

--- PRACTICE PLATFORMS ---
[Paste relevant platforms from the Resource Library tab]

--- COMMUNITIES & NETWORKING ---
\u{2022} Women in Cybersecurity (WiCyS) \u{2014} wicys.org
[Add other local/relevant communities]

--- GETTING STARTED ---
Your [CURRENT_BACKGROUND] will be incredibly valuable in cybersecurity. I'd recommend starting with [FIRST_STEP] while working toward [MEDIUM_TERM_GOAL].

Please don't hesitate to reach out with questions!

[MENTOR_NAME]",
    },
    EmailTemplate {
        id: "checkin",
        label: "Mid-Program Check-In",
        scenario: "Send between sessions to maintain momentum.",
        subject: "Checking In \u{2014} How Are Things Going?",
        body: "Hi [MENTEE_NAME],

I wanted to check in between our sessions \u{2014} how are things going?

A few things I'm curious about:
  \u{2022} Have you had a chance to work on the action items from our last session?
  \u{2022} How is [CURRENT_FOCUS_AREA] progressing?
  \u{2022} Anything you've run into that you'd like to talk through?

No pressure for a long reply \u{2014} even a quick update helps me tailor our next session.

Our next session is [SESSION_DATE]. If you need to reschedule, just let me know!

[MENTOR_NAME]",
    },
    EmailTemplate {
        id: "resource-share",
        label: "Sharing a Specific Resource or Opportunity",
        scenario: "Use when sharing an event, course, or opportunity you spotted.",
        subject: "Resources for [TOPIC] \u{2014} As Promised",
        body: "Hi [MENTEE_NAME],

Following up on our conversation \u{2014} I came across [RESOURCE_NAME] and immediately thought of you.

What it is: [BRIEF_DESCRIPTION]
Why it's relevant: [PERSONALIZED_REASON]
Cost: [COST]
Link: [URL]

[OPTIONAL: If there's an event]
Date: [EVENT_DATE]
Location: [EVENT_LOCATION]
Registration: [REGISTRATION_URL]

This looks like a great fit given your goal of [MENTEE_GOAL]. Let me know if you have questions!

[MENTOR_NAME]",
    },
    EmailTemplate {
        id: "celebrate",
        label: "Celebrating a Win / End of Program",
        scenario: "Send when a mentee hits a milestone or the program wraps.",
        subject: "Congratulations \u{2014} And What's Next",
        body: "Hi [MENTEE_NAME],

I just wanted to take a moment to acknowledge \u{2014} [SPECIFIC_WIN].

That is a real achievement, and you should be proud. This didn't happen by accident. It's the result of [SPECIFIC_EFFORT_OR_QUALITY].

As you move forward:
  \u{2022} Don't stop building \u{2014} [SPECIFIC_NEXT_STEP]
  \u{2022} Stay connected to the community \u{2014} [SPECIFIC_COMMUNITY]
  \u{2022} Pay it forward \u{2014} when you're ready, consider becoming a mentor yourself

It has been a genuine pleasure working with you. Please keep me posted on your journey, and never hesitate to reach out.

Onward!

[MENTOR_NAME]",
    },
];

pub fn email_template(id: &str) -> Option<&'static EmailTemplate> {
    EMAIL_TEMPLATES.iter().find(|t| t.id == id)
}

//=========================================================================================
// Token Filling
//=========================================================================================

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[[A-Z_]+\]").expect("valid template token regex"))
}

/// Replacement values for template tokens such as `[MENTEE_NAME]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TokenMap(BTreeMap<String, String>);

impl TokenMap {
    /// Builds the substitutions available from a profile.
    ///
    /// The profile's own name fills the token for its role and the partner's name
    /// fills the other one. `[PROGRAM_NAME]` is always present.
    pub fn from_profile(profile: Option<&Profile>, program_name: &str) -> Self {
        let mut map = BTreeMap::new();
        if let Some(profile) = profile {
            let (own, partner) = match profile.role {
                Role::Mentor => ("[MENTOR_NAME]", "[MENTEE_NAME]"),
                Role::Mentee => ("[MENTEE_NAME]", "[MENTOR_NAME]"),
            };
            if !profile.name.is_empty() {
                map.insert(own.to_string(), profile.name.clone());
            }
            if let Some(partner_name) = profile.partner_name.as_deref().filter(|n| !n.is_empty()) {
                map.insert(partner.to_string(), partner_name.to_string());
            }
            if let Some(track) = profile.target_role.as_deref().and_then(career_track) {
                map.insert("[TARGET_ROLE]".to_string(), track.label.to_string());
            }
        }
        map.insert("[PROGRAM_NAME]".to_string(), program_name.to_string());
        Self(map)
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.0.get(token).map(String::as_str)
    }

    /// Replaces every known token; unknown tokens are left for the user to fill.
    pub fn fill(&self, text: &str) -> String {
        token_pattern()
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let token = &caps[0];
                self.get(token).unwrap_or(token).to_string()
            })
            .into_owned()
    }
}

/// The distinct tokens still present in `text`, in order of first appearance.
pub fn unfilled_tokens(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for m in token_pattern().find_iter(text) {
        if !seen.iter().any(|s: &String| s == m.as_str()) {
            seen.push(m.as_str().to_string());
        }
    }
    seen
}

/// A template with the profile's tokens applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilledTemplate {
    pub id: &'static str,
    pub label: &'static str,
    pub scenario: &'static str,
    pub subject: String,
    pub body: String,
    pub unfilled_tokens: Vec<String>,
}

impl EmailTemplate {
    pub fn fill(&self, tokens: &TokenMap) -> FilledTemplate {
        let subject = tokens.fill(self.subject);
        let body = tokens.fill(self.body);
        let mut unfilled = unfilled_tokens(&subject);
        for token in unfilled_tokens(&body) {
            if !unfilled.contains(&token) {
                unfilled.push(token);
            }
        }
        FilledTemplate {
            id: self.id,
            label: self.label,
            scenario: self.scenario,
            subject,
            body,
            unfilled_tokens: unfilled,
        }
    }
}
