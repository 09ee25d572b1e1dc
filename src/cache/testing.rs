//! In-memory `PhraseStore` for exercising the cache without SQLite.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use anyhow::{bail, Result};
use chrono::{DateTime, TimeZone, Utc};

use super::store::PhraseStore;
use crate::db::{GroupClicks, PhraseBrief, PhraseClicks, PhraseRecord, PhraseStatus};

#[derive(Default)]
struct FakeState {
    phrases: BTreeMap<i64, FakePhrase>,
    clicks: Vec<(i64, i64, i64)>,
    clock: i64,
    calls: Vec<&'static str>,
    failing: HashSet<&'static str>,
    failing_distribution: HashSet<i64>,
    brief_delays: HashMap<i64, Duration>,
    pinned_random: Option<Vec<i64>>,
    random_exclusions: Vec<Vec<i64>>,
    touched: Vec<i64>,
    in_flight: usize,
    peak_in_flight: usize,
}

struct FakePhrase {
    text: String,
    group_id: i64,
    status: PhraseStatus,
    update_time: i64,
}

impl FakeState {
    fn record(&mut self, call: &'static str) -> Result<()> {
        self.calls.push(call);
        if self.failing.contains(call) {
            bail!("injected {call} failure");
        }
        Ok(())
    }

    fn reviewed_ids(&self) -> Vec<i64> {
        self.phrases
            .iter()
            .filter(|(_, phrase)| phrase.status == PhraseStatus::Reviewed)
            .map(|(id, _)| *id)
            .collect()
    }

    fn to_record(&self, phrase_id: i64) -> Option<PhraseRecord> {
        let phrase = self.phrases.get(&phrase_id)?;
        Some(PhraseRecord {
            phrase_id,
            text: phrase.text.clone(),
            group_id: phrase.group_id,
            open_id: String::new(),
            status: phrase.status,
            create_time: millis(0),
            update_time: millis(phrase.update_time),
        })
    }
}

fn millis(value: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(value).unwrap()
}

#[derive(Clone, Default)]
pub struct FakeStore {
    state: Arc<Mutex<FakeState>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Adds a reviewed phrase; later additions count as more recently updated.
    pub fn add_reviewed(&self, phrase_id: i64, group_id: i64) {
        self.add_with_status(phrase_id, group_id, PhraseStatus::Reviewed);
    }

    pub fn add_with_status(&self, phrase_id: i64, group_id: i64, status: PhraseStatus) {
        let mut state = self.state();
        state.clock += 1;
        let update_time = state.clock;
        state.phrases.insert(
            phrase_id,
            FakePhrase {
                text: format!("phrase {phrase_id}"),
                group_id,
                status,
                update_time,
            },
        );
    }

    pub fn add_clicks(&self, phrase_id: i64, group_id: i64, clicks: i64) {
        self.state().clicks.push((phrase_id, group_id, clicks));
    }

    pub fn pin_random_sample(&self, ids: Vec<i64>) {
        self.state().pinned_random = Some(ids);
    }

    /// The `exclude` argument of every random sample request, in call order.
    pub fn random_exclusions(&self) -> Vec<Vec<i64>> {
        self.state().random_exclusions.clone()
    }

    pub fn fail_on(&self, call: &'static str) {
        self.state().failing.insert(call);
    }

    pub fn clear_failures(&self) {
        self.state().failing.clear();
    }

    pub fn fail_distribution_for(&self, phrase_id: i64) {
        self.state().failing_distribution.insert(phrase_id);
    }

    pub fn delay_brief_for(&self, phrase_id: i64, delay: Duration) {
        self.state().brief_delays.insert(phrase_id, delay);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state().calls.clone()
    }

    pub fn touched(&self) -> Vec<i64> {
        let mut touched = self.state().touched.clone();
        touched.sort_unstable();
        touched
    }

    pub fn peak_in_flight(&self) -> usize {
        self.state().peak_in_flight
    }
}

impl PhraseStore for FakeStore {
    async fn count_reviewed(&self) -> Result<u64> {
        let mut state = self.state();
        state.record("count_reviewed")?;
        Ok(state.reviewed_ids().len() as u64)
    }

    async fn list_newest_reviewed(&self, limit: usize) -> Result<Vec<PhraseRecord>> {
        let mut state = self.state();
        state.record("list_newest_reviewed")?;
        let mut ids = state.reviewed_ids();
        ids.sort_by_key(|id| (std::cmp::Reverse(state.phrases[id].update_time), *id));
        Ok(ids
            .into_iter()
            .take(limit)
            .filter_map(|id| state.to_record(id))
            .collect())
    }

    async fn list_top_clicked(&self, limit: usize) -> Result<Vec<PhraseClicks>> {
        let mut state = self.state();
        state.record("list_top_clicked")?;
        let reviewed: HashSet<i64> = state.reviewed_ids().into_iter().collect();
        let mut totals: BTreeMap<i64, i64> = BTreeMap::new();
        for &(phrase_id, _, clicks) in &state.clicks {
            if reviewed.contains(&phrase_id) {
                *totals.entry(phrase_id).or_default() += clicks;
            }
        }
        let mut ranked: Vec<PhraseClicks> = totals
            .into_iter()
            .map(|(phrase_id, total_clicks)| PhraseClicks {
                phrase_id,
                total_clicks,
            })
            .collect();
        ranked.sort_by_key(|r| (std::cmp::Reverse(r.total_clicks), r.phrase_id));
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// Deterministic stand-in for random sampling: the lowest reviewed ids not
    /// in `exclude`. A pinned sample is returned as-is, exclusions ignored.
    async fn list_random_reviewed(
        &self,
        count: usize,
        exclude: Vec<i64>,
    ) -> Result<Vec<PhraseRecord>> {
        let mut state = self.state();
        state.record("list_random_reviewed")?;
        let ids: Vec<i64> = match state.pinned_random.clone() {
            Some(pinned) => pinned.into_iter().take(count).collect(),
            None => state
                .reviewed_ids()
                .into_iter()
                .filter(|id| !exclude.contains(id))
                .take(count)
                .collect(),
        };
        state.random_exclusions.push(exclude);
        Ok(ids.into_iter().filter_map(|id| state.to_record(id)).collect())
    }

    async fn get_phrase_brief(&self, phrase_id: i64) -> Result<Option<PhraseBrief>> {
        let delay = {
            let mut state = self.state();
            state.record("get_phrase_brief")?;
            state.in_flight += 1;
            state.peak_in_flight = state.peak_in_flight.max(state.in_flight);
            state.brief_delays.get(&phrase_id).copied()
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        state.in_flight -= 1;
        Ok(state.phrases.get(&phrase_id).map(|phrase| PhraseBrief {
            text: phrase.text.clone(),
            group_id: phrase.group_id,
        }))
    }

    async fn get_click_distribution(&self, phrase_id: i64) -> Result<Vec<GroupClicks>> {
        let mut state = self.state();
        state.record("get_click_distribution")?;
        if state.failing_distribution.contains(&phrase_id) {
            bail!("injected distribution failure for {phrase_id}");
        }
        let mut per_group: BTreeMap<i64, i64> = BTreeMap::new();
        for &(id, group_id, clicks) in &state.clicks {
            if id == phrase_id {
                *per_group.entry(group_id).or_default() += clicks;
            }
        }
        let mut distribution: Vec<GroupClicks> = per_group
            .into_iter()
            .map(|(group_id, clicks)| GroupClicks { group_id, clicks })
            .collect();
        distribution.sort_by_key(|g| (std::cmp::Reverse(g.clicks), g.group_id));
        Ok(distribution)
    }

    async fn touch_update_time(&self, phrase_id: i64, at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state();
        state.record("touch_update_time")?;
        state.touched.push(phrase_id);
        if let Some(phrase) = state.phrases.get_mut(&phrase_id) {
            phrase.update_time = at.timestamp_millis();
        }
        Ok(())
    }
}
