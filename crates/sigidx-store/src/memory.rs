//! In-memory signal store.
//!
//! Holds the read table as a list of batches and the sample store as a flat
//! list of rows. Stores round-trip through JSON fixture files so the facade
//! can open them by path.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sigidx_error::{Result, SigIdxError};
use sigidx_types::{ReadId, ReadRecord, SignalRowInfo};
use tracing::{debug, info};

use crate::traits::{OpenStore, ReadBatch, SignalStore};

/// Read table plus sample store, held entirely in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    read_batches: Vec<Vec<ReadRecord>>,
    signal_rows: Vec<Vec<i16>>,
}

impl MemoryStore {
    /// Assemble a store from raw parts.
    ///
    /// No contiguity or count checks are performed, so tests can model
    /// malformed files.
    #[must_use]
    pub const fn from_parts(
        read_batches: Vec<Vec<ReadRecord>>,
        signal_rows: Vec<Vec<i16>>,
    ) -> Self {
        Self {
            read_batches,
            signal_rows,
        }
    }

    /// Total reads across every batch.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.read_batches.iter().map(Vec::len).sum()
    }

    /// Rows in the sample store.
    #[must_use]
    pub fn signal_row_count(&self) -> usize {
        self.signal_rows.len()
    }

    /// Every read record, batch by batch.
    pub fn records(&self) -> impl Iterator<Item = &ReadRecord> {
        self.read_batches.iter().flatten()
    }

    /// Decode a JSON fixture.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|err| SigIdxError::store(format!("invalid store fixture: {err}")))
    }

    pub fn to_json_vec(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|err| SigIdxError::internal(format!("store fixture encoding failed: {err}")))
    }

    /// Write the store as a JSON fixture file.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json_vec()?)?;
        info!(
            path = %path.display(),
            reads = self.read_count(),
            signal_rows = self.signal_rows.len(),
            "saved memory store fixture"
        );
        Ok(())
    }

    fn row(&self, row: u64) -> Result<&[i16]> {
        usize::try_from(row)
            .ok()
            .and_then(|idx| self.signal_rows.get(idx))
            .map(Vec::as_slice)
            .ok_or_else(|| {
                SigIdxError::store(format!(
                    "signal row {row} out of range ({} rows)",
                    self.signal_rows.len()
                ))
            })
    }
}

/// Borrowed view of one read-table batch.
#[derive(Debug, Clone, Copy)]
pub struct MemoryReadBatch<'a> {
    rows: &'a [ReadRecord],
}

impl ReadBatch for MemoryReadBatch<'_> {
    fn row_count(&self) -> Result<usize> {
        Ok(self.rows.len())
    }

    fn read_record(&self, row: usize) -> Result<ReadRecord> {
        self.rows.get(row).cloned().ok_or_else(|| {
            SigIdxError::store(format!(
                "read row {row} out of range ({} rows in batch)",
                self.rows.len()
            ))
        })
    }
}

impl SignalStore for MemoryStore {
    type Batch<'a> = MemoryReadBatch<'a>;

    fn read_batch_count(&self) -> Result<usize> {
        Ok(self.read_batches.len())
    }

    fn read_batch(&self, index: usize) -> Result<Self::Batch<'_>> {
        let rows = self.read_batches.get(index).ok_or_else(|| {
            SigIdxError::store(format!(
                "read batch {index} out of range ({} batches)",
                self.read_batches.len()
            ))
        })?;
        Ok(MemoryReadBatch { rows })
    }

    fn signal_row_info(&self, rows: &[u64]) -> Result<Vec<SignalRowInfo>> {
        rows.iter()
            .map(|&row| {
                let samples = self.row(row)?;
                let stored_sample_count = u32::try_from(samples.len()).map_err(|_| {
                    SigIdxError::store(format!("signal row {row} exceeds u32 samples"))
                })?;
                Ok(SignalRowInfo {
                    row,
                    stored_sample_count,
                })
            })
            .collect()
    }

    fn decode_signal(&self, row: &SignalRowInfo, out: &mut [i16]) -> Result<()> {
        let samples = self.row(row.row)?;
        if samples.len() != out.len() {
            return Err(SigIdxError::store(format!(
                "signal row {} holds {} samples, caller buffer has {}",
                row.row,
                samples.len(),
                out.len()
            )));
        }
        out.copy_from_slice(samples);
        Ok(())
    }
}

impl OpenStore for MemoryStore {
    fn open(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .map_err(|err| SigIdxError::initialization(path, err.to_string()))?;
        let store: Self = serde_json::from_slice(&bytes)
            .map_err(|err| SigIdxError::initialization(path, format!("invalid fixture: {err}")))?;
        debug!(
            path = %path.display(),
            batches = store.read_batches.len(),
            signal_rows = store.signal_rows.len(),
            "opened memory store"
        );
        Ok(store)
    }
}

/// Incrementally assembles a [`MemoryStore`].
///
/// Each pushed read gets a fresh run of contiguous sample rows, chunked to
/// at most `max_samples_per_row` samples, so the built store always honors
/// the contiguity guarantee.
#[derive(Debug, Clone)]
pub struct MemoryStoreBuilder {
    max_samples_per_row: usize,
    reads_per_batch: usize,
    read_batches: Vec<Vec<ReadRecord>>,
    signal_rows: Vec<Vec<i16>>,
}

impl MemoryStoreBuilder {
    /// Both limits are clamped to at least 1.
    #[must_use]
    pub fn new(max_samples_per_row: usize, reads_per_batch: usize) -> Self {
        Self {
            max_samples_per_row: max_samples_per_row.max(1),
            reads_per_batch: reads_per_batch.max(1),
            read_batches: Vec::new(),
            signal_rows: Vec::new(),
        }
    }

    /// Append sample rows that belong to no read.
    ///
    /// Useful to place reads at a non-zero `start`.
    pub fn pad_rows(&mut self, count: usize) -> &mut Self {
        self.signal_rows
            .extend(std::iter::repeat_with(Vec::new).take(count));
        self
    }

    /// Append one read and its samples; returns the rows assigned to it.
    pub fn push_read(
        &mut self,
        read_id: ReadId,
        calibration_offset: f32,
        calibration_scale: f32,
        samples: &[i16],
    ) -> Vec<u64> {
        let first = self.signal_rows.len() as u64;
        if samples.is_empty() {
            self.signal_rows.push(Vec::new());
        } else {
            self.signal_rows.extend(
                samples
                    .chunks(self.max_samples_per_row)
                    .map(<[i16]>::to_vec),
            );
        }
        let end = self.signal_rows.len() as u64;
        let signal_rows: Vec<u64> = (first..end).collect();

        self.push_record(ReadRecord {
            read_id,
            calibration_offset,
            calibration_scale,
            sample_count: samples.len() as u64,
            signal_rows: signal_rows.clone(),
        });
        signal_rows
    }

    /// Append a read record verbatim, without adding sample rows.
    pub fn push_record(&mut self, record: ReadRecord) -> &mut Self {
        match self.read_batches.last_mut() {
            Some(batch) if batch.len() < self.reads_per_batch => batch.push(record),
            _ => self.read_batches.push(vec![record]),
        }
        self
    }

    #[must_use]
    pub fn build(self) -> MemoryStore {
        MemoryStore::from_parts(self.read_batches, self.signal_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(seed: u8) -> ReadId {
        ReadId::from_bytes([seed; 16])
    }

    #[test]
    fn builder_chunks_samples_into_contiguous_rows() {
        let mut builder = MemoryStoreBuilder::new(4, 2);
        let rows_a = builder.push_read(id(1), 0.0, 1.0, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        let rows_b = builder.push_read(id(2), 0.0, 1.0, &[11, 12]);
        let rows_c = builder.push_read(id(3), 0.0, 1.0, &[]);
        let store = builder.build();

        assert_eq!(rows_a, vec![0, 1, 2]);
        assert_eq!(rows_b, vec![3]);
        assert_eq!(rows_c, vec![4], "empty read still owns one row");
        assert_eq!(store.signal_row_count(), 5);
        assert_eq!(store.read_batch_count().expect("count"), 2);

        let infos = store.signal_row_info(&rows_a).expect("row info");
        let counts: Vec<u32> = infos.iter().map(|info| info.stored_sample_count).collect();
        assert_eq!(counts, vec![4, 4, 2]);
    }

    #[test]
    fn batches_respect_reads_per_batch() {
        let mut builder = MemoryStoreBuilder::new(16, 2);
        for seed in 0..5 {
            builder.push_read(id(seed), 0.0, 1.0, &[i16::from(seed)]);
        }
        let store = builder.build();
        assert_eq!(store.read_batch_count().expect("count"), 3);
        let last = store.read_batch(2).expect("last batch");
        assert_eq!(last.row_count().expect("rows"), 1);
        assert_eq!(last.read_record(0).expect("record").read_id, id(4));
        assert!(last.read_record(1).is_err());
    }

    #[test]
    fn decode_checks_row_and_buffer() {
        let mut builder = MemoryStoreBuilder::new(8, 8);
        builder.pad_rows(2);
        let rows = builder.push_read(id(9), 0.0, 1.0, &[5, 6, 7]);
        let store = builder.build();
        assert_eq!(rows, vec![2]);

        let info = store.signal_row_info(&rows).expect("info")[0];
        let mut out = [0_i16; 3];
        store.decode_signal(&info, &mut out).expect("decode");
        assert_eq!(out, [5, 6, 7]);

        let mut short = [0_i16; 2];
        assert!(store.decode_signal(&info, &mut short).is_err());

        let err = store.signal_row_info(&[99]).expect_err("missing row");
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn fixture_round_trip_and_open_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("run.pod5");

        let mut builder = MemoryStoreBuilder::new(8, 8);
        builder.push_read(id(1), 1.5, 0.25, &[1, -2, 3]);
        let store = builder.build();
        store.save(&path).expect("save fixture");

        let opened = MemoryStore::open(&path).expect("open fixture");
        assert_eq!(opened, store);

        let missing = MemoryStore::open(&dir.path().join("absent.pod5")).expect_err("missing");
        assert!(matches!(missing, SigIdxError::Initialization { .. }));

        fs::write(&path, b"not json").expect("overwrite");
        let garbage = MemoryStore::open(&path).expect_err("garbage");
        assert!(matches!(garbage, SigIdxError::Initialization { .. }));
    }
}
