//! Boundary between the signal index and the columnar file reader.
//!
//! The index never parses signal files itself. It consumes a handle that
//! implements [`SignalStore`]: batch enumeration over the read table, a
//! per-row accessor, and direct access to sample-store rows.
//! [`MemoryStore`] is the in-process implementation used by tests, benches
//! and fixture files.

pub mod memory;
pub mod traits;

pub use memory::{MemoryReadBatch, MemoryStore, MemoryStoreBuilder};
pub use traits::{OpenStore, ReadBatch, SignalStore};
