//! Random-access reads over columnar signal files.
//!
//! [`IndexSession`] pairs one open store with its read-id index.
//! [`RandomAccessReader`] manages many files and their on-disk index files,
//! and [`build_dir_indexes`] pre-builds indexes for a whole directory.

pub mod build;
pub mod config;
pub mod reader;
pub mod session;

pub use build::{
    build_dir_indexes, build_file_index, collect_data_files, default_build_workers, is_rotational,
};
pub use config::{DEFAULT_DATA_EXTENSION, DEFAULT_INDEX_SUFFIX, ReaderConfig, index_path_for};
pub use reader::RandomAccessReader;
pub use session::{IndexSession, parse_read_id};

pub use sigidx_error::{Result, SigIdxError};
pub use sigidx_index::{BuildStats, SignalIndex};
pub use sigidx_store::{MemoryStore, MemoryStoreBuilder, OpenStore, ReadBatch, SignalStore};
pub use sigidx_types::{ReadId, ReadRecord, SignalLocation, SignalRowInfo};
