use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::db::{
    connection::Database,
    helpers::{to_i64, to_millis},
    models::{ClickSubmission, GroupClicks, PhraseClicks, PhraseStatus},
};

impl Database {
    /// Append click events in one transaction. Submissions that point at a
    /// phrase which is not currently `Reviewed` are skipped. Returns how many
    /// were stored.
    pub async fn record_clicks(
        &self,
        submissions: Vec<ClickSubmission>,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let mut accepted = 0;

            for submission in submissions {
                let reviewed: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM phrases WHERE phrase_id = ?1 AND status = ?2)",
                    params![submission.phrase_id, PhraseStatus::Reviewed.as_str()],
                    |row| row.get(0),
                )?;
                if !reviewed {
                    continue;
                }

                tx.execute(
                    "INSERT INTO phrase_clicks (phrase_id, group_id, open_id, clicks, click_time)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        submission.phrase_id,
                        submission.group_id,
                        submission.open_id,
                        submission.clicks,
                        to_millis(now),
                    ],
                )?;
                accepted += 1;
            }

            tx.commit()?;
            Ok(accepted)
        })
        .await
        .context("failed to record clicks")
    }

    /// Reviewed phrases ranked by total clicks. Clicks whose phrase no longer
    /// exists, or is not `Reviewed`, drop out of the inner join.
    pub async fn list_top_clicked(&self, limit: usize) -> Result<Vec<PhraseClicks>> {
        let limit = to_i64(limit)?;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT c.phrase_id, SUM(c.clicks) AS total_clicks
                 FROM phrase_clicks AS c
                 INNER JOIN phrases AS p ON p.phrase_id = c.phrase_id
                 WHERE p.status = ?1
                 GROUP BY c.phrase_id
                 ORDER BY total_clicks DESC, c.phrase_id ASC
                 LIMIT ?2",
            )?;
            let mut rows = stmt.query(params![PhraseStatus::Reviewed.as_str(), limit])?;
            let mut ranked = Vec::new();
            while let Some(row) = rows.next()? {
                ranked.push(PhraseClicks {
                    phrase_id: row.get(0)?,
                    total_clicks: row.get(1)?,
                });
            }
            Ok(ranked)
        })
        .await
        .context("failed to rank top clicked phrases")
    }

    /// Per-group click sums for one phrase, largest first.
    pub async fn get_click_distribution(&self, phrase_id: i64) -> Result<Vec<GroupClicks>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT group_id, SUM(clicks) AS group_clicks
                 FROM phrase_clicks
                 WHERE phrase_id = ?1
                 GROUP BY group_id
                 ORDER BY group_clicks DESC, group_id ASC",
            )?;
            let mut rows = stmt.query(params![phrase_id])?;
            let mut distribution = Vec::new();
            while let Some(row) = rows.next()? {
                distribution.push(GroupClicks {
                    group_id: row.get(0)?,
                    clicks: row.get(1)?,
                });
            }
            Ok(distribution)
        })
        .await
        .with_context(|| format!("failed to load click distribution for phrase {phrase_id}"))
    }
}
