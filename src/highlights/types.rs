//! Highlight data model
//!
//! Field names follow the camelCase wire format the feedback views persist.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::anchor::Anchor;

/// Feedback section a highlight belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Fluency,
    Grammar,
    Vocabulary,
    Pronunciation,
    #[default]
    Overall,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Fluency => "fluency",
            Section::Grammar => "grammar",
            Section::Vocabulary => "vocabulary",
            Section::Pronunciation => "pronunciation",
            Section::Overall => "overall",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fluency" => Ok(Section::Fluency),
            "grammar" => Ok(Section::Grammar),
            "vocabulary" => Ok(Section::Vocabulary),
            "pronunciation" => Ok(Section::Pronunciation),
            "overall" => Ok(Section::Overall),
            other => Err(format!("unknown section: {}", other)),
        }
    }
}

/// The (submission, question, section) tuple a highlight is scoped to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeKey {
    pub submission_id: String,
    pub question_index: u32,
    #[serde(default)]
    pub section: Section,
}

impl ScopeKey {
    pub fn new(submission_id: &str, question_index: u32, section: Section) -> Self {
        Self {
            submission_id: submission_id.to_string(),
            question_index,
            section,
        }
    }
}

/// A persisted highlight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    /// Unique identifier (UUID)
    pub id: String,
    #[serde(flatten)]
    pub scope: ScopeKey,
    /// Annotation color, fixed at creation
    pub color: String,
    /// Exact (trimmed) text at creation time
    pub text: String,
    /// Optional reviewer note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub anchor: Anchor,
    /// Tag of the container the anchor was captured against
    pub container_selector: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A highlight before the store assigns its id and timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct NewHighlight {
    pub scope: ScopeKey,
    pub color: String,
    pub text: String,
    pub anchor: Anchor,
    pub container_selector: String,
}

impl Highlight {
    pub(crate) fn create(new: NewHighlight) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            scope: new.scope,
            color: new.color,
            text: new.text,
            comment: None,
            anchor: new.anchor,
            container_selector: new.container_selector,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn in_scope(&self, scope: &ScopeKey) -> bool {
        &self.scope == scope
    }
}
