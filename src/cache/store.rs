use std::future::Future;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::db::{Database, GroupClicks, PhraseBrief, PhraseClicks, PhraseRecord};

/// The queries a refresh cycle issues against the phrase store.
///
/// Futures must be `Send` because enrichment runs them on spawned tasks.
pub trait PhraseStore: Clone + Send + Sync + 'static {
    fn count_reviewed(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Reviewed phrases ordered by `update_time` descending.
    fn list_newest_reviewed(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<PhraseRecord>>> + Send;

    /// Reviewed phrases with at least one click, highest total first.
    fn list_top_clicked(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<PhraseClicks>>> + Send;

    /// Up to `count` Reviewed phrases in random order, skipping every id in
    /// `exclude`.
    fn list_random_reviewed(
        &self,
        count: usize,
        exclude: Vec<i64>,
    ) -> impl Future<Output = Result<Vec<PhraseRecord>>> + Send;

    fn get_phrase_brief(
        &self,
        phrase_id: i64,
    ) -> impl Future<Output = Result<Option<PhraseBrief>>> + Send;

    /// Per-group click sums, largest first. Empty when never clicked.
    fn get_click_distribution(
        &self,
        phrase_id: i64,
    ) -> impl Future<Output = Result<Vec<GroupClicks>>> + Send;

    fn touch_update_time(
        &self,
        phrase_id: i64,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<()>> + Send;
}

impl PhraseStore for Database {
    fn count_reviewed(&self) -> impl Future<Output = Result<u64>> + Send {
        Database::count_reviewed(self)
    }

    fn list_newest_reviewed(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<PhraseRecord>>> + Send {
        Database::list_newest_reviewed(self, limit)
    }

    fn list_top_clicked(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<PhraseClicks>>> + Send {
        Database::list_top_clicked(self, limit)
    }

    fn list_random_reviewed(
        &self,
        count: usize,
        exclude: Vec<i64>,
    ) -> impl Future<Output = Result<Vec<PhraseRecord>>> + Send {
        Database::list_random_reviewed(self, count, exclude)
    }

    fn get_phrase_brief(
        &self,
        phrase_id: i64,
    ) -> impl Future<Output = Result<Option<PhraseBrief>>> + Send {
        Database::get_phrase_brief(self, phrase_id)
    }

    fn get_click_distribution(
        &self,
        phrase_id: i64,
    ) -> impl Future<Output = Result<Vec<GroupClicks>>> + Send {
        Database::get_click_distribution(self, phrase_id)
    }

    fn touch_update_time(
        &self,
        phrase_id: i64,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<()>> + Send {
        Database::touch_update_time(self, phrase_id, at)
    }
}
