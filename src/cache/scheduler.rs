use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{
    enricher::{enrich_candidates, EnrichOutcome},
    selector::select_candidates,
    snapshot::SnapshotCache,
    store::PhraseStore,
};

const ENABLE_LOGS: bool = true;
use crate::{log_debug, log_error, log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSettings {
    pub interval: Duration,
    /// Target number of phrases held in the snapshot.
    pub cache_limit: usize,
    pub enrich_timeout: Duration,
    pub enrich_concurrency: usize,
    /// Upper bound on one whole select/enrich/publish cycle.
    pub cycle_timeout: Duration,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            cache_limit: 100,
            enrich_timeout: Duration::from_secs(2),
            enrich_concurrency: 16,
            cycle_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshReport {
    pub candidates: usize,
    pub published: usize,
    pub dropped: usize,
    pub generation: u64,
}

/// Runs refresh cycles against one store and publishes into one cache.
#[derive(Clone)]
pub struct Refresher<S> {
    store: S,
    cache: SnapshotCache,
    settings: RefreshSettings,
}

impl<S: PhraseStore> Refresher<S> {
    pub fn new(store: S, cache: SnapshotCache, settings: RefreshSettings) -> Self {
        Self {
            store,
            cache,
            settings,
        }
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    /// One select → enrich → publish pass. On error nothing is published and
    /// the previous snapshot stays visible.
    pub async fn refresh_once(&self) -> Result<RefreshReport> {
        let selection = select_candidates(&self.store, self.settings.cache_limit)
            .await
            .context("candidate selection failed")?;

        let outcomes = enrich_candidates(
            &self.store,
            &selection.phrase_ids,
            self.settings.enrich_concurrency,
            self.settings.enrich_timeout,
        )
        .await;

        if outcomes.len() != selection.phrase_ids.len() {
            bail!(
                "enrichment returned {} outcomes for {} candidates",
                outcomes.len(),
                selection.phrase_ids.len()
            );
        }

        let candidates = outcomes.len();
        let items: Vec<_> = outcomes
            .into_iter()
            .filter_map(EnrichOutcome::into_item)
            .collect();
        let published = items.len();
        let generation = self.cache.publish(items);

        Ok(RefreshReport {
            candidates,
            published,
            dropped: candidates - published,
            generation,
        })
    }
}

/// Refreshes on every tick until cancelled. The first tick fires
/// immediately. A slow cycle delays the next one instead of queueing ticks,
/// and cancellation drops an in-flight cycle before it can publish.
pub async fn refresh_loop<S: PhraseStore>(refresher: Refresher<S>, cancel_token: CancellationToken) {
    let settings = refresher.settings;
    let mut ticker = tokio::time::interval(settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let started = Instant::now();
                let cycle = tokio::time::timeout(settings.cycle_timeout, refresher.refresh_once());

                tokio::select! {
                    result = cycle => match result {
                        Ok(Ok(report)) => {
                            if report.dropped > 0 {
                                log_warn!(
                                    "refresh dropped {} of {} candidates",
                                    report.dropped,
                                    report.candidates
                                );
                            }
                            log_debug!(
                                "refresh generation {} published {} phrases in {}ms",
                                report.generation,
                                report.published,
                                started.elapsed().as_millis()
                            );
                        }
                        Ok(Err(err)) => log_error!("refresh cycle failed, keeping previous snapshot: {err:#}"),
                        Err(_) => log_warn!(
                            "refresh cycle timeout (> {}ms), keeping previous snapshot",
                            settings.cycle_timeout.as_millis()
                        ),
                    },
                    _ = cancel_token.cancelled() => {
                        log_info!("refresh loop cancelled mid-cycle");
                        break;
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("refresh loop shutting down");
                break;
            }
        }
    }
}

/// Owns the background refresh task.
pub struct RefreshController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl Default for RefreshController {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start<S: PhraseStore>(&mut self, refresher: Refresher<S>) -> Result<()> {
        if self.handle.is_some() {
            bail!("refresh loop already running");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(refresh_loop(refresher, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        match self.handle.take() {
            Some(handle) => handle
                .await
                .map_err(|err| anyhow!("refresh loop task failed to join: {err}")),
            None => Ok(()),
        }
    }
}
