//! Row shapes exchanged with the external signal store.

use serde::{Deserialize, Serialize};

use crate::ReadId;

/// One row of the store's read (metadata) table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadRecord {
    pub read_id: ReadId,
    pub calibration_offset: f32,
    pub calibration_scale: f32,
    /// Total samples across every signal row of this read.
    pub sample_count: u64,
    /// Sample-store rows assigned to this read, in order.
    pub signal_rows: Vec<u64>,
}

/// Per-row metadata of the sample store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalRowInfo {
    /// Absolute sample-store row index.
    pub row: u64,
    /// Samples stored in this row.
    pub stored_sample_count: u32,
}
