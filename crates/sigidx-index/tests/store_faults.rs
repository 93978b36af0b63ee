use std::cell::Cell;

use sigidx_error::{Result, SigIdxError};
use sigidx_index::{build_signal_index, build_signal_index_with_stats, fetch_raw};
use sigidx_store::{MemoryStore, MemoryStoreBuilder, ReadBatch, SignalStore};
use sigidx_types::{ReadId, ReadRecord, SignalRowInfo};

/// Wraps a [`MemoryStore`], counts live read batches and injects failures.
struct FaultyStore {
    inner: MemoryStore,
    open_batches: Cell<usize>,
    max_open_batches: Cell<usize>,
    fail_batch: Option<usize>,
    fail_record: Option<(usize, usize)>,
    fail_decode_row: Option<u64>,
    decoded_rows: Cell<usize>,
}

impl FaultyStore {
    fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            open_batches: Cell::new(0),
            max_open_batches: Cell::new(0),
            fail_batch: None,
            fail_record: None,
            fail_decode_row: None,
            decoded_rows: Cell::new(0),
        }
    }
}

struct TrackedBatch<'a> {
    store: &'a FaultyStore,
    batch_index: usize,
    inner: <MemoryStore as SignalStore>::Batch<'a>,
}

impl Drop for TrackedBatch<'_> {
    fn drop(&mut self) {
        self.store.open_batches.set(self.store.open_batches.get() - 1);
    }
}

impl ReadBatch for TrackedBatch<'_> {
    fn row_count(&self) -> Result<usize> {
        self.inner.row_count()
    }

    fn read_record(&self, row: usize) -> Result<ReadRecord> {
        if self.store.fail_record == Some((self.batch_index, row)) {
            return Err(SigIdxError::store(format!(
                "injected record failure at batch {} row {row}",
                self.batch_index
            )));
        }
        self.inner.read_record(row)
    }
}

impl SignalStore for FaultyStore {
    type Batch<'a> = TrackedBatch<'a>;

    fn read_batch_count(&self) -> Result<usize> {
        self.inner.read_batch_count()
    }

    fn read_batch(&self, index: usize) -> Result<Self::Batch<'_>> {
        if self.fail_batch == Some(index) {
            return Err(SigIdxError::store(format!("injected batch failure at {index}")));
        }
        let inner = self.inner.read_batch(index)?;
        let open = self.open_batches.get() + 1;
        self.open_batches.set(open);
        self.max_open_batches.set(self.max_open_batches.get().max(open));
        Ok(TrackedBatch {
            store: self,
            batch_index: index,
            inner,
        })
    }

    fn signal_row_info(&self, rows: &[u64]) -> Result<Vec<SignalRowInfo>> {
        self.inner.signal_row_info(rows)
    }

    fn decode_signal(&self, row: &SignalRowInfo, out: &mut [i16]) -> Result<()> {
        if self.fail_decode_row == Some(row.row) {
            return Err(SigIdxError::store(format!("injected decode failure at row {}", row.row)));
        }
        self.decoded_rows.set(self.decoded_rows.get() + 1);
        self.inner.decode_signal(row, out)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn id(seed: u8) -> ReadId {
    ReadId::from_bytes([seed; 16])
}

fn store_with_reads(count: u8) -> MemoryStore {
    let mut builder = MemoryStoreBuilder::new(3, 2);
    for seed in 0..count {
        let samples: Vec<i16> = (0..i16::from(seed) + 4).collect();
        builder.push_read(id(seed), f32::from(seed), 0.5, &samples);
    }
    builder.build()
}

#[test]
fn build_holds_one_batch_at_a_time() {
    let store = FaultyStore::new(store_with_reads(7));
    let (index, stats) = build_signal_index_with_stats(&store).expect("build");
    assert_eq!(index.len(), 7);
    assert_eq!(stats.batches, 4);
    assert_eq!(store.max_open_batches.get(), 1);
    assert_eq!(store.open_batches.get(), 0);
}

#[test]
fn batch_failure_aborts_build_and_releases_batches() {
    init_tracing();
    let mut store = FaultyStore::new(store_with_reads(7));
    store.fail_batch = Some(2);
    let err = build_signal_index(&store).expect_err("batch 2 fails");
    assert!(matches!(err, SigIdxError::Store { .. }));
    assert_eq!(store.open_batches.get(), 0);
}

#[test]
fn record_failure_aborts_build_and_releases_batches() {
    init_tracing();
    let mut store = FaultyStore::new(store_with_reads(7));
    store.fail_record = Some((1, 1));
    let err = build_signal_index(&store).expect_err("record fails");
    assert!(err.to_string().contains("injected record failure"));
    assert_eq!(store.open_batches.get(), 0);
}

#[test]
fn decode_failure_on_any_row_fails_whole_fetch() {
    init_tracing();
    let inner = store_with_reads(5);
    let index = build_signal_index(&inner).expect("build");
    let loc = *index.location(&id(4)).expect("read 4");
    assert_eq!(loc.row_count, 3);

    let mut store = FaultyStore::new(inner);
    store.fail_decode_row = Some(loc.start + 2);
    let err = fetch_raw(&store, &loc).expect_err("last row fails");
    assert!(matches!(err, SigIdxError::Store { .. }));
    assert_eq!(store.decoded_rows.get(), 2, "rows before the failure were decoded");
}

#[test]
fn build_is_deterministic() {
    let store = store_with_reads(9);
    let first = build_signal_index(&store).expect("first build");
    let second = build_signal_index(&store).expect("second build");
    assert_eq!(first, second);
    let mut first_ids: Vec<_> = first.read_ids().copied().map(ReadId::into_bytes).collect();
    let mut second_ids: Vec<_> = second.read_ids().copied().map(ReadId::into_bytes).collect();
    first_ids.sort_unstable();
    second_ids.sort_unstable();
    assert_eq!(first_ids, second_ids);
}
