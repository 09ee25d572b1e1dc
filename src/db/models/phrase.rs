//! Phrase records and the read-side projections the cache builds on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PhraseStatus {
    Pending,
    Reviewed,
    Deleted,
}

impl PhraseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhraseStatus::Pending => "Pending",
            PhraseStatus::Reviewed => "Reviewed",
            PhraseStatus::Deleted => "Deleted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhraseRecord {
    pub phrase_id: i64,
    pub text: String,
    pub group_id: i64,
    pub open_id: String,
    pub status: PhraseStatus,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

/// Submission payload for a new phrase. Always stored as `Pending`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPhrase {
    pub text: String,
    pub open_id: String,
    pub group_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewPhraseOutcome {
    Created(i64),
    DuplicateText,
}

/// Moderator changes to an existing phrase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhraseEdit {
    pub text: Option<String>,
    pub status: Option<PhraseStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhraseUpdateOutcome {
    Updated,
    NotFound,
    /// The new text, or restoring a deleted phrase, would collide with a
    /// live phrase's text.
    DuplicateText,
}

/// The two columns enrichment needs from a phrase row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseBrief {
    pub text: String,
    pub group_id: i64,
}

/// Total clicks for one phrase, as ranked by the top-clicked query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhraseClicks {
    pub phrase_id: i64,
    pub total_clicks: i64,
}
