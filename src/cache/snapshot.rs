use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One phrase as the public display shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedPhraseItem {
    pub phrase_id: i64,
    pub text: String,
    pub total_clicks: i64,
    pub top_group_id: i64,
    pub top_group_clicks: i64,
}

/// An immutable, fully built list of display items. Never modified after
/// publication; a refresh builds a new one.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub items: Vec<CachedPhraseItem>,
    /// Zero until the first publish, then incremented by one per publish.
    pub generation: u64,
    pub published_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Shared handle to the latest published snapshot.
///
/// The lock only guards the `Arc` pointer: `publish` swaps it, `read` clones
/// it. Building the next snapshot happens entirely outside the lock.
#[derive(Clone, Default)]
pub struct SnapshotCache {
    current: Arc<RwLock<Arc<Snapshot>>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> Arc<Snapshot> {
        let guard = match self.current.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(&guard)
    }

    /// Replaces the held snapshot and returns the new generation number.
    pub fn publish(&self, items: Vec<CachedPhraseItem>) -> u64 {
        let published_at = Utc::now();
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let generation = guard.generation + 1;
        *guard = Arc::new(Snapshot {
            items,
            generation,
            published_at: Some(published_at),
        });
        generation
    }
}
