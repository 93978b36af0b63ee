//! Read-id → signal-location index for columnar signal files.
//!
//! Locating one read's samples in a signal file normally means scanning the
//! read table. This crate does that scan once ([`build_signal_index`]),
//! persists the result in a flat fixed-width format ([`save_index`] /
//! [`load_index`]), and afterwards decodes samples straight from the sample
//! store ([`fetch_raw`], [`fetch_calibrated`]) at a cost bounded by the number
//! of rows backing the read. [`plan_order`] reorders a key batch by physical
//! position so a sequence of fetches reads the store front to back.

pub mod builder;
pub mod codec;
pub mod fetch;
pub mod plan;
pub mod table;

pub use builder::{BuildStats, build_signal_index, build_signal_index_with_stats};
pub use codec::{
    INDEX_FORMAT_TAG, INDEX_FORMAT_VERSION, INDEX_HEADER_BYTES, INDEX_RECORD_BYTES,
    IndexFileHeader, decode_index, encode_index, load_index, read_index, record_offset,
    save_index, write_index,
};
pub use fetch::{calibrate, fetch_calibrated, fetch_raw, fetch_raw_into};
pub use plan::{plan_order, signal_row_starts, sorted_read_ids};
pub use table::SignalIndex;
