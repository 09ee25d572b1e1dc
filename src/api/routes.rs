use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    cache::{clamp_display_limit, sample_display_items, CachedPhraseItem},
    db::{
        ClickSubmission, NewPhrase, NewPhraseOutcome, PhraseEdit, PhraseRecord, PhraseStatus,
        PhraseUpdateOutcome,
    },
    utils::text::{validate_text, TextRejection},
    AppState,
};

use super::{ApiError, Envelope};

type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct DisplayQuery {
    /// Kept as a string so garbage falls back to the default limit instead of
    /// failing the request.
    pub limit: Option<String>,
}

/// Serves a shuffled sample of the current snapshot. Never touches the store.
pub async fn get_phrases(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DisplayQuery>,
) -> Json<Envelope<Vec<CachedPhraseItem>>> {
    let limit = clamp_display_limit(
        query
            .limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok()),
    );
    let snapshot = state.cache.read();
    let items = sample_display_items(&snapshot.items, limit, &mut rand::thread_rng());
    Json(Envelope::ok(items))
}

fn check_text(state: &AppState, text: &str) -> Result<(), ApiError> {
    validate_text(text, state.config.max_text_chars).map_err(|rejection| match rejection {
        TextRejection::Empty => ApiError::MalformedPayload("text must not be empty".into()),
        TextRejection::TooLong { max_chars } => ApiError::TextTooLong { max_chars },
    })
}

#[derive(Debug, Serialize)]
pub struct CreatedPhrase {
    pub phrase_id: i64,
}

pub async fn add_phrase(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewPhrase>, JsonRejection>,
) -> ApiResult<CreatedPhrase> {
    let Json(phrase) = payload.map_err(|_| {
        ApiError::MalformedPayload("text, open_id, group_id are required".into())
    })?;

    check_text(&state, &phrase.text)?;

    match state.db.insert_phrase(phrase, Utc::now()).await? {
        NewPhraseOutcome::Created(phrase_id) => Ok(Json(Envelope::ok(CreatedPhrase { phrase_id }))),
        NewPhraseOutcome::DuplicateText => Err(ApiError::DuplicateText),
    }
}

#[derive(Debug, Serialize)]
pub struct ClickReceipt {
    pub accepted: usize,
}

pub async fn record_clicks(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Vec<ClickSubmission>>, JsonRejection>,
) -> ApiResult<ClickReceipt> {
    let Json(submissions) = payload.map_err(|_| {
        ApiError::MalformedPayload("phrase_id, clicks, open_id and group_id are required".into())
    })?;

    if let Some(bad) = submissions.iter().find(|s| s.clicks <= 0) {
        return Err(ApiError::InvalidValue(format!(
            "clicks for phrase {} must be positive",
            bad.phrase_id
        )));
    }

    let accepted = state.db.record_clicks(submissions, Utc::now()).await?;
    Ok(Json(Envelope::ok(ClickReceipt { accepted })))
}

/// Moderator edit. At least one of `text` and `status` must be present.
#[derive(Debug, Deserialize)]
pub struct PhrasePatch {
    pub phrase_id: i64,
    pub text: Option<String>,
    pub status: Option<PhraseStatus>,
}

pub async fn patch_phrase(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PhrasePatch>, JsonRejection>,
) -> ApiResult<PhraseRecord> {
    let Json(patch) = payload.map_err(|_| {
        ApiError::MalformedPayload(
            "phrase_id plus text and/or status (Pending, Reviewed or Deleted) are required".into(),
        )
    })?;

    if patch.text.is_none() && patch.status.is_none() {
        return Err(ApiError::MalformedPayload(
            "nothing to change: send text, status or both".into(),
        ));
    }
    if let Some(text) = &patch.text {
        check_text(&state, text)?;
    }

    let edit = PhraseEdit {
        text: patch.text,
        status: patch.status,
    };
    apply_edit(&state, patch.phrase_id, edit).await
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub phrase_id: i64,
}

/// Soft delete: the row stays for analytics, only its status changes.
pub async fn delete_phrase(
    State(state): State<Arc<AppState>>,
    query: Result<Query<DeleteQuery>, QueryRejection>,
) -> ApiResult<PhraseRecord> {
    let Query(query) =
        query.map_err(|_| ApiError::MalformedPayload("phrase_id is required".into()))?;

    let edit = PhraseEdit {
        text: None,
        status: Some(PhraseStatus::Deleted),
    };
    apply_edit(&state, query.phrase_id, edit).await
}

/// Applies the edit and answers with the phrase as stored afterwards.
async fn apply_edit(
    state: &AppState,
    phrase_id: i64,
    edit: PhraseEdit,
) -> ApiResult<PhraseRecord> {
    match state.db.update_phrase(phrase_id, edit, Utc::now()).await? {
        PhraseUpdateOutcome::Updated => {}
        PhraseUpdateOutcome::NotFound => return Err(ApiError::UnknownPhrase(phrase_id)),
        PhraseUpdateOutcome::DuplicateText => return Err(ApiError::DuplicateText),
    }

    state
        .db
        .get_phrase(phrase_id)
        .await?
        .map(|record| Json(Envelope::ok(record)))
        .ok_or(ApiError::UnknownPhrase(phrase_id))
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub generation: u64,
    pub cached_phrases: usize,
    pub published_at: Option<DateTime<Utc>>,
}

pub async fn healthz(State(state): State<Arc<AppState>>) -> Json<Envelope<HealthReport>> {
    let snapshot = state.cache.read();
    Json(Envelope::ok(HealthReport {
        generation: snapshot.generation,
        cached_phrases: snapshot.len(),
        published_at: snapshot.published_at,
    }))
}
