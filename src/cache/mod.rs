//! Rotating phrase cache.
//!
//! A background [`Refresher`] periodically picks a blend of newest,
//! most-clicked and random reviewed phrases, enriches each with its click
//! statistics, and publishes the result into a [`SnapshotCache`]. Request
//! handlers only ever read the published snapshot and re-sample it with
//! [`sample_display_items`]; they never touch the database on the read path.

pub mod enricher;
pub mod sampling;
pub mod scheduler;
pub mod selector;
pub mod snapshot;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use enricher::EnrichOutcome;
pub use sampling::{clamp_display_limit, sample_display_items};
pub use scheduler::{RefreshController, RefreshReport, RefreshSettings, Refresher};
pub use selector::{CandidateSelection, SelectionPlan};
pub use snapshot::{CachedPhraseItem, Snapshot, SnapshotCache};
pub use store::PhraseStore;
