use sigidx::{IndexSession, MemoryStore, MemoryStoreBuilder, ReadId, SigIdxError};
use tempfile::tempdir;

const READ: &str = "0f0e0d0c-0b0a-4908-8706-050403020100";

fn fixture() -> MemoryStore {
    let mut builder = MemoryStoreBuilder::new(3, 1);
    builder.pad_rows(4);
    builder.push_read(ReadId::parse(READ).expect("id"), 2.0, 0.25, &[10, 20, 30, 40]);
    builder.push_read(ReadId::from_bytes([0xEE; 16]), 0.0, 1.0, &[7]);
    builder.build()
}

#[test]
fn open_build_save_and_reload() {
    let dir = tempdir().expect("tempdir");
    let data = dir.path().join("run.pod5");
    let index_path = dir.path().join("run.pod5.idx");
    fixture().save(&data).expect("fixture");

    let mut session = IndexSession::<MemoryStore>::open(&data).expect("open");
    assert_eq!(session.build_index().expect("build").len(), 2);
    session.save_index(&index_path).expect("save");

    let mut reopened = IndexSession::<MemoryStore>::open(&data).expect("reopen");
    reopened.load_index(&index_path).expect("load");
    assert_eq!(reopened.index().expect("index"), session.index().expect("index"));
    assert_eq!(reopened.fetch_signal(READ).expect("fetch"), vec![10, 20, 30, 40]);
    assert_eq!(
        reopened.fetch_calibrated_signal(READ.replace('-', "")).expect("fetch"),
        vec![3.0, 5.5, 8.0, 10.5]
    );
}

#[test]
fn save_without_index_is_internal_error() {
    let dir = tempdir().expect("tempdir");
    let session = IndexSession::new(fixture());
    let err = session
        .save_index(&dir.path().join("x.idx"))
        .expect_err("nothing to save");
    assert!(matches!(err, SigIdxError::Internal(_)));
}

#[test]
fn missing_store_is_initialization_error() {
    let dir = tempdir().expect("tempdir");
    let err = IndexSession::<MemoryStore>::open(&dir.path().join("absent.pod5"))
        .expect_err("absent store");
    assert!(matches!(err, SigIdxError::Initialization { .. }));
}

#[test]
fn corrupt_index_file_is_format_error() {
    let dir = tempdir().expect("tempdir");
    let index_path = dir.path().join("bad.idx");
    std::fs::write(&index_path, b"P5IDX\0garbage").expect("write");
    let mut session = IndexSession::new(fixture());
    assert!(session.load_index(&index_path).expect_err("corrupt").is_format());
    assert!(!session.has_index());
}

#[test]
fn absent_read_is_not_found_through_every_lookup() {
    let mut session = IndexSession::new(fixture());
    session.build_index().expect("build");
    let absent = "ffffffff-ffff-4fff-8fff-ffffffffffff";

    assert!(session.calibration(absent).expect_err("cal").is_not_found());
    assert!(session.calibration_offset(absent).expect_err("offset").is_not_found());
    assert!(session.calibration_scale(absent).expect_err("scale").is_not_found());
    assert!(session.signal_length(absent).expect_err("len").is_not_found());
    assert!(session.fetch_signal(absent).expect_err("fetch").is_not_found());
    assert!(session.fetch_calibrated_signal(absent).expect_err("cal fetch").is_not_found());
    assert!(session.fetch_signals([READ, absent]).expect_err("bulk").is_not_found());
    assert!(session.signal_row_starts([absent]).expect_err("starts").is_not_found());
    assert!(
        session
            .sort_read_ids_by_location([absent])
            .expect_err("sort")
            .is_not_found()
    );
}
