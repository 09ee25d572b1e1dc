use std::collections::HashSet;

use anyhow::{Context, Result};

use super::store::PhraseStore;

const ENABLE_LOGS: bool = true;
use crate::{log_debug, log_warn};

/// Upper bound on random backfill queries per cycle. Each sample excludes the
/// ids already held, so one round normally fills the list; extra rounds only
/// cover phrases that changed status between queries.
const MAX_BACKFILL_ROUNDS: usize = 8;

/// How a target size splits into newest / top-clicked / random slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPlan {
    pub effective_limit: usize,
    pub newest: usize,
    pub top: usize,
    pub random: usize,
}

impl SelectionPlan {
    /// Caps `limit` at `available`, then gives 30% to newest, 30% to top and
    /// the remainder to random.
    pub fn new(limit: usize, available: usize) -> Self {
        let effective_limit = limit.min(available);
        let newest = thirty_percent(effective_limit);
        let top = thirty_percent(effective_limit);

        Self {
            effective_limit,
            newest,
            top,
            random: effective_limit - newest - top,
        }
    }
}

/// `floor(0.3 * n)` without a float round trip.
pub(crate) fn thirty_percent(n: usize) -> usize {
    n * 3 / 10
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSelection {
    pub plan: SelectionPlan,
    /// Deduplicated, in first-seen order: newest, then top-clicked, then random.
    pub phrase_ids: Vec<i64>,
}

/// First-seen ordered id set.
#[derive(Default)]
struct CandidateList {
    seen: HashSet<i64>,
    ordered: Vec<i64>,
}

impl CandidateList {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            seen: HashSet::with_capacity(capacity),
            ordered: Vec::with_capacity(capacity),
        }
    }

    /// Returns how many ids were new.
    fn extend(&mut self, ids: impl IntoIterator<Item = i64>) -> usize {
        let before = self.ordered.len();
        for id in ids {
            if self.seen.insert(id) {
                self.ordered.push(id);
            }
        }
        self.ordered.len() - before
    }

    fn len(&self) -> usize {
        self.ordered.len()
    }
}

pub async fn select_candidates<S: PhraseStore>(
    store: &S,
    cache_limit: usize,
) -> Result<CandidateSelection> {
    let reviewed = store
        .count_reviewed()
        .await
        .context("failed to count reviewed phrases")?;
    let available = usize::try_from(reviewed).unwrap_or(usize::MAX);
    let plan = SelectionPlan::new(cache_limit, available);

    if plan.effective_limit == 0 {
        return Ok(CandidateSelection {
            plan,
            phrase_ids: Vec::new(),
        });
    }

    let newest = store
        .list_newest_reviewed(plan.newest)
        .await
        .context("failed to load newest phrases")?;
    let top = store
        .list_top_clicked(plan.top)
        .await
        .context("failed to load top clicked phrases")?;

    let mut candidates = CandidateList::with_capacity(plan.effective_limit);
    candidates.extend(newest.iter().map(|phrase| phrase.phrase_id));
    candidates.extend(top.iter().map(|ranked| ranked.phrase_id));

    let mut rounds = 0;
    while candidates.len() < plan.effective_limit {
        if rounds == MAX_BACKFILL_ROUNDS {
            log_warn!(
                "backfill gave up after {rounds} rounds with {}/{} candidates",
                candidates.len(),
                plan.effective_limit
            );
            break;
        }
        rounds += 1;

        let wanted = plan.effective_limit - candidates.len();
        let sampled = store
            .list_random_reviewed(wanted, candidates.ordered.clone())
            .await
            .context("failed to sample random phrases")?;
        if sampled.is_empty() {
            log_warn!(
                "random sample came back empty with {}/{} candidates",
                candidates.len(),
                plan.effective_limit
            );
            break;
        }

        let added = candidates.extend(sampled.iter().map(|phrase| phrase.phrase_id));
        log_debug!("backfill round {rounds}: wanted {wanted}, added {added}");
    }

    let mut phrase_ids = candidates.ordered;
    phrase_ids.truncate(plan.effective_limit);

    Ok(CandidateSelection { plan, phrase_ids })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::FakeStore;

    #[test]
    fn plan_for_small_population() {
        let plan = SelectionPlan::new(100, 10);
        assert_eq!(
            plan,
            SelectionPlan {
                effective_limit: 10,
                newest: 3,
                top: 3,
                random: 4,
            }
        );
    }

    #[test]
    fn plan_remainder_goes_to_random() {
        for limit in 0..200 {
            let plan = SelectionPlan::new(limit, usize::MAX);
            assert_eq!(plan.newest + plan.top + plan.random, limit);
            assert_eq!(plan.newest, (limit as f64 * 0.3) as usize);
        }
        assert_eq!(SelectionPlan::new(0, 50).effective_limit, 0);
    }

    #[tokio::test]
    async fn empty_population_issues_no_further_queries() {
        let store = FakeStore::new();
        let selection = select_candidates(&store, 100).await.unwrap();

        assert!(selection.phrase_ids.is_empty());
        assert_eq!(selection.plan.effective_limit, 0);
        assert_eq!(store.calls(), vec!["count_reviewed"]);
    }

    #[tokio::test]
    async fn ten_reviewed_fill_all_ten_slots() {
        let store = FakeStore::new();
        for id in 1..=10 {
            store.add_reviewed(id, 1);
        }
        store.add_clicks(4, 1, 9);
        store.add_clicks(5, 1, 3);

        let selection = select_candidates(&store, 100).await.unwrap();
        assert_eq!(selection.plan.newest, 3);
        assert_eq!(selection.plan.top, 3);
        assert_eq!(selection.plan.random, 4);
        assert_eq!(selection.phrase_ids.len(), 10);

        let unique: HashSet<i64> = selection.phrase_ids.iter().copied().collect();
        assert_eq!(unique.len(), 10);
    }

    #[tokio::test]
    async fn newest_wins_collisions_and_order_is_first_seen() {
        let store = FakeStore::new();
        for id in 1..=10 {
            store.add_reviewed(id, 1);
        }
        // Newest three are the highest update times: 10, 9, 8.
        store.add_clicks(9, 1, 50);
        store.add_clicks(2, 1, 40);
        store.add_clicks(3, 1, 30);

        let selection = select_candidates(&store, 10).await.unwrap();
        assert_eq!(&selection.phrase_ids[..5], &[10, 9, 8, 2, 3]);
        assert_eq!(selection.phrase_ids.len(), 10);
    }

    #[tokio::test]
    async fn backfill_excludes_ids_already_held() {
        let store = FakeStore::new();
        for id in 1..=10 {
            store.add_reviewed(id, 1);
        }
        store.add_clicks(1, 1, 4);

        let selection = select_candidates(&store, 10).await.unwrap();
        assert_eq!(selection.phrase_ids, vec![10, 9, 8, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(store.random_exclusions(), vec![vec![10, 9, 8, 1]]);
    }

    #[tokio::test]
    async fn overlapping_sample_is_deduplicated() {
        let store = FakeStore::new();
        for id in 1..=10 {
            store.add_reviewed(id, 1);
        }
        // A sample that repeats held ids, as a stale store might.
        store.pin_random_sample(vec![10, 9, 1, 2, 1, 3, 4]);

        let selection = select_candidates(&store, 10).await.unwrap();
        assert_eq!(selection.phrase_ids, vec![10, 9, 8, 1, 2, 3, 4]);
        let unique: HashSet<i64> = selection.phrase_ids.iter().copied().collect();
        assert_eq!(unique.len(), selection.phrase_ids.len());
    }

    #[tokio::test]
    async fn backfill_stops_at_round_cap() {
        let store = FakeStore::new();
        for id in 1..=10 {
            store.add_reviewed(id, 1);
        }
        // Random sampling only ever returns an id we already hold.
        store.pin_random_sample(vec![10]);

        let selection = select_candidates(&store, 10).await.unwrap();
        assert_eq!(selection.phrase_ids, vec![10, 9, 8]);
        let random_calls = store
            .calls()
            .iter()
            .filter(|call| **call == "list_random_reviewed")
            .count();
        assert_eq!(random_calls, MAX_BACKFILL_ROUNDS);
    }

    #[tokio::test]
    async fn backfill_stops_when_sample_is_empty() {
        let store = FakeStore::new();
        for id in 1..=10 {
            store.add_reviewed(id, 1);
        }
        store.pin_random_sample(Vec::new());

        let selection = select_candidates(&store, 10).await.unwrap();
        assert_eq!(selection.phrase_ids.len(), 3);
        assert_eq!(
            store
                .calls()
                .iter()
                .filter(|call| **call == "list_random_reviewed")
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let store = FakeStore::new();
        store.add_reviewed(1, 1);
        store.add_reviewed(2, 1);
        store.add_reviewed(3, 1);
        store.fail_on("list_top_clicked");

        let err = select_candidates(&store, 10).await.unwrap_err();
        assert!(format!("{err:#}").contains("top clicked"));
    }
}
