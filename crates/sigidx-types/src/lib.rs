//! Core types shared by the index, the store boundary and the facade.

pub mod location;
pub mod read_id;
pub mod record;

pub use location::SignalLocation;
pub use read_id::{READ_ID_BYTES, ReadId};
pub use record::{ReadRecord, SignalRowInfo};
