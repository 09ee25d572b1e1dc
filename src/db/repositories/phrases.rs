use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, types::Value, ErrorCode, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{from_millis, parse_status, to_i64, to_millis, to_u64},
    models::{
        NewPhrase, NewPhraseOutcome, PhraseBrief, PhraseEdit, PhraseRecord, PhraseStatus,
        PhraseUpdateOutcome,
    },
};

const PHRASE_COLUMNS: &str =
    "phrase_id, text, group_id, open_id, status, create_time, update_time";

fn row_to_phrase(row: &Row) -> Result<PhraseRecord> {
    let status: String = row.get("status")?;

    Ok(PhraseRecord {
        phrase_id: row.get("phrase_id")?,
        text: row.get("text")?,
        group_id: row.get("group_id")?,
        open_id: row.get("open_id")?,
        status: parse_status(&status)?,
        create_time: from_millis(row.get("create_time")?, "create_time")?,
        update_time: from_millis(row.get("update_time")?, "update_time")?,
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation)
}

impl Database {
    /// Insert a submitted phrase as `Pending`.
    pub async fn insert_phrase(
        &self,
        phrase: NewPhrase,
        now: DateTime<Utc>,
    ) -> Result<NewPhraseOutcome> {
        self.execute(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO phrases (text, group_id, open_id, status, create_time, update_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![
                    phrase.text,
                    phrase.group_id,
                    phrase.open_id,
                    PhraseStatus::Pending.as_str(),
                    to_millis(now),
                ],
            );

            match inserted {
                Ok(_) => Ok(NewPhraseOutcome::Created(conn.last_insert_rowid())),
                Err(err) if is_constraint_violation(&err) => Ok(NewPhraseOutcome::DuplicateText),
                Err(err) => Err(anyhow::Error::new(err).context("failed to insert phrase")),
            }
        })
        .await
    }

    pub async fn get_phrase(&self, phrase_id: i64) -> Result<Option<PhraseRecord>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PHRASE_COLUMNS} FROM phrases WHERE phrase_id = ?1"
            ))?;
            let mut rows = stmt.query(params![phrase_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_phrase(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// Moderation edit. Fields left as `None` keep their stored value; any
    /// change refreshes `update_time`.
    pub async fn update_phrase(
        &self,
        phrase_id: i64,
        edit: PhraseEdit,
        now: DateTime<Utc>,
    ) -> Result<PhraseUpdateOutcome> {
        self.execute(move |conn| {
            let updated = conn.execute(
                "UPDATE phrases
                 SET text = COALESCE(?1, text),
                     status = COALESCE(?2, status),
                     update_time = ?3
                 WHERE phrase_id = ?4",
                params![
                    edit.text,
                    edit.status.map(|status| status.as_str()),
                    to_millis(now),
                    phrase_id
                ],
            );

            match updated {
                Ok(0) => Ok(PhraseUpdateOutcome::NotFound),
                Ok(_) => Ok(PhraseUpdateOutcome::Updated),
                Err(err) if is_constraint_violation(&err) => Ok(PhraseUpdateOutcome::DuplicateText),
                Err(err) => Err(anyhow::Error::new(err).context("failed to update phrase")),
            }
        })
        .await
    }

    pub async fn count_reviewed(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM phrases WHERE status = ?1",
                    params![PhraseStatus::Reviewed.as_str()],
                    |row| row.get(0),
                )
                .context("failed to count reviewed phrases")?;
            to_u64(count, "reviewed count")
        })
        .await
    }

    /// Reviewed phrases, most recently updated first. Ties fall back to
    /// insertion order so repeated calls agree.
    pub async fn list_newest_reviewed(&self, limit: usize) -> Result<Vec<PhraseRecord>> {
        let limit = to_i64(limit)?;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PHRASE_COLUMNS} FROM phrases
                 WHERE status = ?1
                 ORDER BY update_time DESC, phrase_id ASC
                 LIMIT ?2"
            ))?;
            let mut rows = stmt.query(params![PhraseStatus::Reviewed.as_str(), limit])?;
            let mut phrases = Vec::new();
            while let Some(row) = rows.next()? {
                phrases.push(row_to_phrase(row)?);
            }
            Ok(phrases)
        })
        .await
        .context("failed to list newest reviewed phrases")
    }

    /// Up to `count` random Reviewed phrases, never one listed in `exclude`.
    pub async fn list_random_reviewed(
        &self,
        count: usize,
        exclude: Vec<i64>,
    ) -> Result<Vec<PhraseRecord>> {
        let count = to_i64(count)?;
        self.execute(move |conn| {
            let exclusion = if exclude.is_empty() {
                String::new()
            } else {
                let placeholders = vec!["?"; exclude.len()].join(", ");
                format!("AND phrase_id NOT IN ({placeholders})")
            };
            let mut stmt = conn.prepare(&format!(
                "SELECT {PHRASE_COLUMNS} FROM phrases
                 WHERE status = ? {exclusion}
                 ORDER BY RANDOM()
                 LIMIT ?"
            ))?;

            let mut values = Vec::with_capacity(exclude.len() + 2);
            values.push(Value::Text(PhraseStatus::Reviewed.as_str().to_string()));
            values.extend(exclude.into_iter().map(Value::Integer));
            values.push(Value::Integer(count));

            let mut rows = stmt.query(params_from_iter(values))?;
            let mut phrases = Vec::new();
            while let Some(row) = rows.next()? {
                phrases.push(row_to_phrase(row)?);
            }
            Ok(phrases)
        })
        .await
        .context("failed to sample reviewed phrases")
    }

    pub async fn get_phrase_brief(&self, phrase_id: i64) -> Result<Option<PhraseBrief>> {
        self.execute(move |conn| {
            conn.query_row(
                "SELECT text, group_id FROM phrases WHERE phrase_id = ?1",
                params![phrase_id],
                |row| {
                    Ok(PhraseBrief {
                        text: row.get(0)?,
                        group_id: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(|err| anyhow!("failed to load phrase {phrase_id}: {err}"))
        })
        .await
    }

    pub async fn touch_update_time(&self, phrase_id: i64, at: DateTime<Utc>) -> Result<()> {
        self.execute(move |conn| {
            conn.execute(
                "UPDATE phrases SET update_time = ?1 WHERE phrase_id = ?2",
                params![to_millis(at), phrase_id],
            )
            .with_context(|| format!("failed to touch phrase {phrase_id}"))?;
            Ok(())
        })
        .await
    }
}
