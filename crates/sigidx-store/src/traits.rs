//! The seam between the index and an external signal store.
//!
//! A store exposes a batched read table and a row-addressed sample store.

use std::path::Path;

use sigidx_error::Result;
use sigidx_types::{ReadRecord, SignalRowInfo};

/// One batch of the read (metadata) table.
///
/// Dropping the batch releases it.
pub trait ReadBatch {
    /// Number of read rows in this batch.
    fn row_count(&self) -> Result<usize>;

    /// Extract one read row.
    ///
    /// # Errors
    ///
    /// Returns a store error when the row cannot be decoded.
    fn read_record(&self, row: usize) -> Result<ReadRecord>;
}

/// An open signal file.
///
/// Implementations guarantee that the signal rows listed for one read are
/// contiguous in the sample store. Methods take `&self`; whether a handle may
/// be shared across threads is expressed by `Sync` on the implementing type.
pub trait SignalStore {
    type Batch<'a>: ReadBatch
    where
        Self: 'a;

    /// Number of batches in the read table.
    fn read_batch_count(&self) -> Result<usize>;

    /// Acquire one read-table batch.
    fn read_batch(&self, index: usize) -> Result<Self::Batch<'_>>;

    /// Batched lookup of sample-store row metadata, one entry per requested
    /// row and in request order.
    fn signal_row_info(&self, rows: &[u64]) -> Result<Vec<SignalRowInfo>>;

    /// Decode the samples of one sample-store row into `out`, whose length
    /// must equal `row.stored_sample_count`.
    fn decode_signal(&self, row: &SignalRowInfo, out: &mut [i16]) -> Result<()>;
}

/// A store that can be opened from a filesystem path.
///
/// Closing is `Drop`.
pub trait OpenStore: SignalStore + Sized {
    /// # Errors
    ///
    /// Returns `SigIdxError::Initialization` when the file cannot be opened.
    fn open(path: &Path) -> Result<Self>;
}
