use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::{sync::Semaphore, task::JoinSet};

use super::{snapshot::CachedPhraseItem, store::PhraseStore};

const ENABLE_LOGS: bool = true;
use crate::{log_error, log_warn};

/// Result of enriching one candidate. Everything except `Ready` is a sentinel
/// that the refresh drops before publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichOutcome {
    Ready(CachedPhraseItem),
    /// The phrase row disappeared between selection and enrichment.
    Missing,
    Failed,
    TimedOut,
}

impl EnrichOutcome {
    pub fn into_item(self) -> Option<CachedPhraseItem> {
        match self {
            EnrichOutcome::Ready(item) => Some(item),
            _ => None,
        }
    }
}

/// Builds the display item for one phrase.
///
/// A phrase nobody has clicked falls back to its submitter's group with zero
/// clicks and is left untouched. A clicked phrase gets its `update_time`
/// bumped so it counts as freshly shown on the next selection.
pub async fn enrich_one<S: PhraseStore>(
    store: &S,
    phrase_id: i64,
) -> Result<Option<CachedPhraseItem>> {
    let Some(brief) = store
        .get_phrase_brief(phrase_id)
        .await
        .context("failed to load phrase brief")?
    else {
        return Ok(None);
    };

    let distribution = store
        .get_click_distribution(phrase_id)
        .await
        .context("failed to load click distribution")?;

    let Some(top) = distribution.first().copied() else {
        return Ok(Some(CachedPhraseItem {
            phrase_id,
            text: brief.text,
            total_clicks: 0,
            top_group_id: brief.group_id,
            top_group_clicks: 0,
        }));
    };

    let total_clicks = distribution.iter().map(|group| group.clicks).sum();

    store
        .touch_update_time(phrase_id, Utc::now())
        .await
        .context("failed to record shown time")?;

    Ok(Some(CachedPhraseItem {
        phrase_id,
        text: brief.text,
        total_clicks,
        top_group_id: top.group_id,
        top_group_clicks: top.clicks,
    }))
}

/// Enriches every candidate concurrently and waits for all of them.
///
/// At most `concurrency` enrichments run at once and each is bounded by
/// `per_task_timeout` once it starts. The returned vector has exactly one
/// outcome per candidate, in candidate order.
pub async fn enrich_candidates<S: PhraseStore>(
    store: &S,
    phrase_ids: &[i64],
    concurrency: usize,
    per_task_timeout: Duration,
) -> Vec<EnrichOutcome> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (index, &phrase_id) in phrase_ids.iter().enumerate() {
        let store = store.clone();
        let semaphore = Arc::clone(&semaphore);

        tasks.spawn(async move {
            let outcome = match semaphore.acquire_owned().await {
                Ok(_permit) => {
                    match tokio::time::timeout(per_task_timeout, enrich_one(&store, phrase_id))
                        .await
                    {
                        Ok(Ok(Some(item))) => EnrichOutcome::Ready(item),
                        Ok(Ok(None)) => {
                            log_warn!("phrase {phrase_id} vanished before enrichment");
                            EnrichOutcome::Missing
                        }
                        Ok(Err(err)) => {
                            log_error!("enrichment failed for phrase {phrase_id}: {err:#}");
                            EnrichOutcome::Failed
                        }
                        Err(_) => {
                            log_warn!(
                                "enrichment timeout (> {}ms) for phrase {phrase_id}",
                                per_task_timeout.as_millis()
                            );
                            EnrichOutcome::TimedOut
                        }
                    }
                }
                Err(_) => EnrichOutcome::Failed,
            };
            (index, outcome)
        });
    }

    let mut outcomes: Vec<Option<EnrichOutcome>> = phrase_ids.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => outcomes[index] = Some(outcome),
            Err(join_err) => log_error!("enrichment task did not complete: {join_err}"),
        }
    }

    // A task that panicked never reported its index; its slot stays empty.
    outcomes
        .into_iter()
        .map(|outcome| outcome.unwrap_or(EnrichOutcome::Failed))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::FakeStore;

    fn ready(outcome: &EnrichOutcome) -> &CachedPhraseItem {
        match outcome {
            EnrichOutcome::Ready(item) => item,
            other => panic!("expected Ready, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn aggregates_clicks_across_groups() {
        let store = FakeStore::new();
        store.add_reviewed(7, 3);
        store.add_clicks(7, 1, 5);
        store.add_clicks(7, 2, 12);

        let item = enrich_one(&store, 7).await.unwrap().expect("item");
        assert_eq!(item.total_clicks, 17);
        assert_eq!(item.top_group_id, 2);
        assert_eq!(item.top_group_clicks, 12);
        assert_eq!(store.touched(), vec![7]);
    }

    #[tokio::test]
    async fn unclicked_phrase_falls_back_to_submitter_group() {
        let store = FakeStore::new();
        store.add_reviewed(11, 4);

        let item = enrich_one(&store, 11).await.unwrap().expect("item");
        assert_eq!(item.total_clicks, 0);
        assert_eq!(item.top_group_id, 4);
        assert_eq!(item.top_group_clicks, 0);
        assert!(store.touched().is_empty());
    }

    #[tokio::test]
    async fn missing_phrase_yields_none() {
        let store = FakeStore::new();
        assert_eq!(enrich_one(&store, 99).await.unwrap(), None);
    }

    #[tokio::test]
    async fn outcomes_follow_candidate_order() {
        let store = FakeStore::new();
        for id in 1..=20 {
            store.add_reviewed(id, id % 3);
            store.add_clicks(id, 1, id);
        }
        let ids: Vec<i64> = (1..=20).rev().collect();

        let outcomes = enrich_candidates(&store, &ids, 4, Duration::from_secs(1)).await;
        assert_eq!(outcomes.len(), ids.len());
        let got: Vec<i64> = outcomes.iter().map(|o| ready(o).phrase_id).collect();
        assert_eq!(got, ids);
    }

    #[tokio::test]
    async fn failures_become_sentinels_without_stalling_the_rest() {
        let store = FakeStore::new();
        for id in 1..=4 {
            store.add_reviewed(id, 1);
        }
        store.fail_distribution_for(2);

        let outcomes = enrich_candidates(&store, &[1, 2, 3, 99], 2, Duration::from_secs(1)).await;
        assert_eq!(outcomes.len(), 4);
        assert_eq!(ready(&outcomes[0]).phrase_id, 1);
        assert_eq!(outcomes[1], EnrichOutcome::Failed);
        assert_eq!(ready(&outcomes[2]).phrase_id, 3);
        assert_eq!(outcomes[3], EnrichOutcome::Missing);
    }

    #[tokio::test]
    async fn slow_store_call_times_out() {
        let store = FakeStore::new();
        store.add_reviewed(1, 1);
        store.add_reviewed(2, 1);
        store.delay_brief_for(2, Duration::from_secs(5));

        let started = std::time::Instant::now();
        let outcomes =
            enrich_candidates(&store, &[1, 2], 2, Duration::from_millis(50)).await;
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(ready(&outcomes[0]).phrase_id, 1);
        assert_eq!(outcomes[1], EnrichOutcome::TimedOut);
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let store = FakeStore::new();
        for id in 1..=12 {
            store.add_reviewed(id, 1);
            store.delay_brief_for(id, Duration::from_millis(20));
        }
        let ids: Vec<i64> = (1..=12).collect();

        let outcomes = enrich_candidates(&store, &ids, 3, Duration::from_secs(2)).await;
        assert!(outcomes.iter().all(|o| matches!(o, EnrichOutcome::Ready(_))));
        assert!(store.peak_in_flight() <= 3);
        assert!(store.peak_in_flight() >= 1);
    }

    #[tokio::test]
    async fn empty_candidate_list_is_a_no_op() {
        let store = FakeStore::new();
        let outcomes = enrich_candidates(&store, &[], 4, Duration::from_secs(1)).await;
        assert!(outcomes.is_empty());
        assert!(store.calls().is_empty());
    }
}
