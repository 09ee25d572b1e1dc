use serde::Deserialize;

/// One append-only click increment. `phrase_id` is not enforced as a foreign
/// key; readers must tolerate events whose phrase no longer exists.
#[derive(Debug, Clone, Deserialize)]
pub struct ClickSubmission {
    pub phrase_id: i64,
    pub clicks: i64,
    pub open_id: String,
    pub group_id: i64,
}

/// Click sum for one voter group on one phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupClicks {
    pub group_id: i64,
    pub clicks: i64,
}
