//! One open signal file plus its index.

use std::path::Path;

use sigidx_error::{Result, SigIdxError};
use sigidx_index::{
    SignalIndex, build_signal_index, fetch_calibrated, fetch_raw, load_index, plan_order,
    save_index, signal_row_starts, sorted_read_ids,
};
use sigidx_store::{OpenStore, SignalStore};
use sigidx_types::{ReadId, SignalLocation};
use tracing::debug;

/// Parse a caller-supplied identifier string.
pub fn parse_read_id(read_id: impl AsRef<str>) -> Result<ReadId> {
    ReadId::parse(read_id.as_ref())
}

fn parse_all<I>(read_ids: I) -> Result<Vec<ReadId>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    read_ids.into_iter().map(parse_read_id).collect()
}

/// Owns one store handle and at most one index over it.
///
/// Lookups take identifier strings in UUID form, with or without hyphens.
/// Every lookup fails with `Internal` until an index has been built or
/// loaded.
#[derive(Debug)]
pub struct IndexSession<S> {
    store: S,
    index: Option<SignalIndex>,
}

impl<S: OpenStore> IndexSession<S> {
    pub fn open(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "opening signal store");
        Ok(Self::new(S::open(path)?))
    }
}

impl<S: SignalStore> IndexSession<S> {
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store, index: None }
    }

    /// Start from an index built or loaded elsewhere.
    #[must_use]
    pub const fn with_index(store: S, index: SignalIndex) -> Self {
        Self {
            store,
            index: Some(index),
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Scan the store and replace any current index.
    pub fn build_index(&mut self) -> Result<&SignalIndex> {
        let index = build_signal_index(&self.store)?;
        Ok(self.index.insert(index))
    }

    pub fn save_index(&self, path: &Path) -> Result<()> {
        save_index(self.index()?, path)
    }

    /// Load a persisted index and replace any current one.
    ///
    /// On failure the current index is kept.
    pub fn load_index(&mut self, path: &Path) -> Result<&SignalIndex> {
        let index = load_index(path)?;
        Ok(self.index.insert(index))
    }

    pub fn index(&self) -> Result<&SignalIndex> {
        self.index
            .as_ref()
            .ok_or_else(|| SigIdxError::internal("no index: build or load one first"))
    }

    pub const fn has_index(&self) -> bool {
        self.index.is_some()
    }

    fn location(&self, read_id: &ReadId) -> Result<&SignalLocation> {
        self.index()?.location(read_id)
    }

    pub fn calibration(&self, read_id: impl AsRef<str>) -> Result<(f32, f32)> {
        self.index()?.calibration(&parse_read_id(read_id)?)
    }

    pub fn calibration_offset(&self, read_id: impl AsRef<str>) -> Result<f32> {
        self.calibration(read_id).map(|(offset, _)| offset)
    }

    pub fn calibration_scale(&self, read_id: impl AsRef<str>) -> Result<f32> {
        self.calibration(read_id).map(|(_, scale)| scale)
    }

    pub fn signal_length(&self, read_id: impl AsRef<str>) -> Result<u32> {
        self.index()?.signal_length(&parse_read_id(read_id)?)
    }

    pub fn fetch_signal(&self, read_id: impl AsRef<str>) -> Result<Vec<i16>> {
        self.fetch_signal_by_id(&parse_read_id(read_id)?)
    }

    pub fn fetch_signal_by_id(&self, read_id: &ReadId) -> Result<Vec<i16>> {
        fetch_raw(&self.store, self.location(read_id)?)
    }

    pub fn fetch_calibrated_signal(&self, read_id: impl AsRef<str>) -> Result<Vec<f32>> {
        let read_id = parse_read_id(read_id)?;
        fetch_calibrated(&self.store, self.location(&read_id)?)
    }

    /// Fetch many reads in physical order; results come back in input order.
    ///
    /// All-or-nothing: the first failure discards every fetched signal.
    pub fn fetch_signals<I>(&self, read_ids: I) -> Result<Vec<Vec<i16>>>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.fetch_signals_by_id(&parse_all(read_ids)?)
    }

    pub fn fetch_signals_by_id(&self, read_ids: &[ReadId]) -> Result<Vec<Vec<i16>>> {
        let index = self.index()?;
        let order = plan_order(index, read_ids)?;

        let mut signals = vec![Vec::new(); read_ids.len()];
        for position in order {
            signals[position] = fetch_raw(&self.store, index.location(&read_ids[position])?)?;
        }
        Ok(signals)
    }

    /// Every indexed read id in table order.
    pub fn list_read_ids(&self) -> Result<Vec<ReadId>> {
        Ok(self.index()?.read_ids().copied().collect())
    }

    /// Every indexed read id ascending by physical position.
    pub fn list_read_ids_sorted(&self) -> Result<Vec<ReadId>> {
        Ok(sorted_read_ids(self.index()?))
    }

    pub fn signal_row_starts<I>(&self, read_ids: I) -> Result<Vec<u64>>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        signal_row_starts(self.index()?, &parse_all(read_ids)?)
    }

    /// Input identifiers reordered by physical position.
    pub fn sort_read_ids_by_location<I>(&self, read_ids: I) -> Result<Vec<ReadId>>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let read_ids = parse_all(read_ids)?;
        let order = plan_order(self.index()?, &read_ids)?;
        Ok(order.into_iter().map(|position| read_ids[position]).collect())
    }
}
