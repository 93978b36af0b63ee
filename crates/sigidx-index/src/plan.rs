//! Locality planning: order key batches by physical position.

use sigidx_error::Result;
use sigidx_types::ReadId;

use crate::table::SignalIndex;

/// `start` of every key in `keys`, in input order.
///
/// Fails with `NotFound` on the first absent key.
pub fn signal_row_starts(index: &SignalIndex, keys: &[ReadId]) -> Result<Vec<u64>> {
    keys.iter()
        .map(|key| index.location(key).map(|loc| loc.start))
        .collect()
}

/// Permutation of `0..keys.len()` that visits `keys` by ascending `start`.
///
/// The sort is stable: keys with equal `start` (including repeated keys) keep
/// their input order. Nothing is returned if any key is absent.
pub fn plan_order(index: &SignalIndex, keys: &[ReadId]) -> Result<Vec<usize>> {
    let starts = signal_row_starts(index, keys)?;
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by_key(|&position| starts[position]);
    Ok(order)
}

/// Every read id in the table, ascending by `start`.
///
/// Ties are broken by read id so the listing is deterministic.
#[must_use]
pub fn sorted_read_ids(index: &SignalIndex) -> Vec<ReadId> {
    let mut entries: Vec<(u64, ReadId)> = index
        .iter()
        .map(|(read_id, loc)| (loc.start, *read_id))
        .collect();
    entries.sort_unstable_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| a.1.as_bytes().cmp(b.1.as_bytes()))
    });
    entries.into_iter().map(|(_, read_id)| read_id).collect()
}
