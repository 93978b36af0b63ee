//! In-memory index table.

use foldhash::fast::RandomState;
use hashbrown::HashMap;
use hashbrown::hash_map;
use sigidx_error::{Result, SigIdxError};
use sigidx_types::{ReadId, SignalLocation};

/// Mapping from read id to the one location of that read's samples.
///
/// A table is populated once, by [`crate::build_signal_index`],
/// [`crate::load_index`] or `collect()`, and is read-only afterwards. The
/// public API takes `&self` only, so a table can be shared across threads
/// without locking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalIndex {
    entries: HashMap<ReadId, SignalLocation, RandomState>,
}

impl SignalIndex {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity_and_hasher(capacity, RandomState::default()),
        }
    }

    pub(crate) fn reserve(&mut self, additional: usize) {
        self.entries.reserve(additional);
    }

    /// Returns the replaced location when `read_id` was already present.
    pub(crate) fn insert(
        &mut self,
        read_id: ReadId,
        location: SignalLocation,
    ) -> Option<SignalLocation> {
        self.entries.insert(read_id, location)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, read_id: &ReadId) -> bool {
        self.entries.contains_key(read_id)
    }

    #[must_use]
    pub fn get(&self, read_id: &ReadId) -> Option<&SignalLocation> {
        self.entries.get(read_id)
    }

    /// Location of `read_id`, or `NotFound`.
    pub fn location(&self, read_id: &ReadId) -> Result<&SignalLocation> {
        self.entries
            .get(read_id)
            .ok_or_else(|| SigIdxError::not_found(read_id))
    }

    /// `(calibration_offset, calibration_scale)` captured at build time.
    pub fn calibration(&self, read_id: &ReadId) -> Result<(f32, f32)> {
        self.location(read_id).map(SignalLocation::calibration)
    }

    /// Number of samples in the read's signal.
    pub fn signal_length(&self, read_id: &ReadId) -> Result<u32> {
        self.location(read_id).map(|loc| loc.sample_count)
    }

    /// Entries in table iteration order (unspecified, stable for one table).
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.entries.iter(),
        }
    }

    pub fn read_ids(&self) -> impl ExactSizeIterator<Item = &ReadId> + '_ {
        self.entries.keys()
    }
}

/// Later entries overwrite earlier ones with the same read id.
impl FromIterator<(ReadId, SignalLocation)> for SignalIndex {
    fn from_iter<I: IntoIterator<Item = (ReadId, SignalLocation)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut index = Self::with_capacity(iter.size_hint().0);
        for (read_id, location) in iter {
            index.insert(read_id, location);
        }
        index
    }
}

/// Iterator over `(read id, location)` pairs.
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    inner: hash_map::Iter<'a, ReadId, SignalLocation>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a ReadId, &'a SignalLocation);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a SignalIndex {
    type Item = (&'a ReadId, &'a SignalLocation);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(start: u64) -> SignalLocation {
        SignalLocation {
            start,
            row_count: 1,
            sample_count: 10,
            calibration_offset: -3.0,
            calibration_scale: 0.5,
        }
    }

    #[test]
    fn lookup_and_missing_key() {
        let a = ReadId::from_bytes([1; 16]);
        let index: SignalIndex = [(a, loc(7))].into_iter().collect();

        assert_eq!(index.len(), 1);
        assert_eq!(index.location(&a).expect("present").start, 7);
        assert_eq!(index.calibration(&a).expect("present"), (-3.0, 0.5));
        assert_eq!(index.signal_length(&a).expect("present"), 10);

        let absent = ReadId::from_bytes([2; 16]);
        assert!(!index.contains(&absent));
        assert!(index.location(&absent).expect_err("absent").is_not_found());
        assert!(index.calibration(&absent).expect_err("absent").is_not_found());
        assert!(index.signal_length(&absent).expect_err("absent").is_not_found());
    }

    #[test]
    fn collect_keeps_last_duplicate() {
        let a = ReadId::from_bytes([1; 16]);
        let index: SignalIndex = [(a, loc(1)), (a, loc(2))].into_iter().collect();
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(&a).map(|l| l.start), Some(2));
    }

    #[test]
    fn table_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SignalIndex>();
    }
}
