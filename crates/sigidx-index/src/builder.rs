//! One-pass index construction over a store's read table.

use sigidx_error::{Result, SigIdxError};
use sigidx_store::{ReadBatch, SignalStore};
use sigidx_types::{ReadRecord, SignalLocation};
use tracing::{debug, error, info, warn};

use crate::table::SignalIndex;

/// Counters reported by [`build_signal_index_with_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Read-table batches visited.
    pub batches: usize,
    /// Read rows visited.
    pub reads: usize,
    /// Rows whose read id was already present; the later row won.
    pub duplicates: usize,
}

/// Scan every row of every read-table batch once and index each read.
///
/// # Errors
///
/// Any failure to enumerate batches or extract a row aborts the build and no
/// table is returned.
pub fn build_signal_index<S: SignalStore>(store: &S) -> Result<SignalIndex> {
    build_signal_index_with_stats(store).map(|(index, _)| index)
}

/// [`build_signal_index`] plus scan counters.
pub fn build_signal_index_with_stats<S: SignalStore>(
    store: &S,
) -> Result<(SignalIndex, BuildStats)> {
    let batch_count = store.read_batch_count()?;
    let mut index = SignalIndex::default();
    let mut stats = BuildStats::default();

    for batch_index in 0..batch_count {
        // Only this batch is held; it is dropped before the next is acquired,
        // including when `?` returns early.
        let batch = store.read_batch(batch_index)?;
        let row_count = batch.row_count()?;
        debug!(batch = batch_index, rows = row_count, "indexing read batch");
        index.reserve(row_count);

        for row in 0..row_count {
            let record = batch.read_record(row).inspect_err(|err| {
                error!(batch = batch_index, row, error = %err, "read row extraction failed");
            })?;
            let location = location_from_record(&record).inspect_err(|err| {
                error!(
                    batch = batch_index,
                    row,
                    read_id = %record.read_id,
                    error = %err,
                    "read row has no usable signal location"
                );
            })?;

            if index.insert(record.read_id, location).is_some() {
                stats.duplicates += 1;
                warn!(
                    batch = batch_index,
                    row,
                    read_id = %record.read_id,
                    "duplicate read id, later row replaces earlier entry"
                );
            }
            stats.reads += 1;
        }

        drop(batch);
        stats.batches += 1;
    }

    info!(
        entries = index.len(),
        batches = stats.batches,
        reads = stats.reads,
        duplicates = stats.duplicates,
        "signal index built"
    );
    Ok((index, stats))
}

/// Collapse a read's signal-row list to `(first row, row count)`.
///
/// The store guarantees the rows are contiguous, so the list itself is not
/// kept.
fn location_from_record(record: &ReadRecord) -> Result<SignalLocation> {
    let Some(&start) = record.signal_rows.first() else {
        return Err(SigIdxError::store(format!(
            "read {} has no signal rows",
            record.read_id
        )));
    };
    let row_count = u32::try_from(record.signal_rows.len()).map_err(|_| {
        SigIdxError::store(format!(
            "read {} spans {} signal rows, more than u32::MAX",
            record.read_id,
            record.signal_rows.len()
        ))
    })?;
    let sample_count = u32::try_from(record.sample_count).map_err(|_| {
        SigIdxError::store(format!(
            "read {} has {} samples, more than u32::MAX",
            record.read_id, record.sample_count
        ))
    })?;

    Ok(SignalLocation {
        start,
        row_count,
        sample_count,
        calibration_offset: record.calibration_offset,
        calibration_scale: record.calibration_scale,
    })
}
