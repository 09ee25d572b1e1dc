use rand::{seq::SliceRandom, Rng};

use super::{
    selector::{thirty_percent, SelectionPlan},
    snapshot::CachedPhraseItem,
};

pub const DEFAULT_DISPLAY_LIMIT: usize = 100;
pub const MAX_DISPLAY_LIMIT: usize = 1_000;

/// Normalises a client-supplied limit: missing or non-positive values get the
/// default, oversized ones are capped.
pub fn clamp_display_limit(requested: Option<i64>) -> usize {
    match requested {
        Some(value) if value > 0 => usize::try_from(value)
            .unwrap_or(MAX_DISPLAY_LIMIT)
            .min(MAX_DISPLAY_LIMIT),
        _ => DEFAULT_DISPLAY_LIMIT,
    }
}

/// Picks up to `limit` items from the cached list for one display request.
///
/// The cached list is laid out newest block, top-clicked block, random block,
/// each roughly 30/30/40 of its length. We take the same split of `limit`
/// from the head of each block, then shuffle. Window bounds are clamped to
/// the list, so short lists never index out of range.
pub fn sample_display_items<R: Rng + ?Sized>(
    cached: &[CachedPhraseItem],
    limit: usize,
    rng: &mut R,
) -> Vec<CachedPhraseItem> {
    let cached_len = cached.len();
    let plan = SelectionPlan::new(limit, cached_len);
    let gap = thirty_percent(cached_len);

    let mut picked = Vec::with_capacity(plan.effective_limit);
    for (start, count) in [(0, plan.newest), (gap, plan.top), (2 * gap, plan.random)] {
        picked.extend_from_slice(window(cached, start, count));
    }

    picked.shuffle(rng);
    picked
}

fn window<T>(items: &[T], start: usize, count: usize) -> &[T] {
    let start = start.min(items.len());
    let end = start.saturating_add(count).min(items.len());
    &items[start..end]
}
