//! Flat binary persistence for [`SignalIndex`].
//!
//! Layout (fixed width, no padding, native byte order):
//!
//! | offset | bytes | field                        |
//! |--------|-------|------------------------------|
//! | 0      | 6     | format tag `P5IDX\0`         |
//! | 6      | 2     | format version               |
//! | 8      | 2     | reserved, written as zero    |
//! | 10     | 8     | entry count                  |
//! | 18     | 40·n  | entries                      |
//!
//! Each entry is the 16-byte read id followed by `start: u64`,
//! `row_count: u32`, `sample_count: u32`, `calibration_offset: f32` and
//! `calibration_scale: f32`. Entry `i` therefore starts at
//! [`record_offset`]`(i)`.
//!
//! The file carries no endianness marker; it is only readable on machines
//! with the byte order that wrote it.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use sigidx_error::{Result, SigIdxError};
use sigidx_types::{READ_ID_BYTES, ReadId, SignalLocation};
use tracing::{debug, error, info};

use crate::table::SignalIndex;

/// Format tag at offset 0.
pub const INDEX_FORMAT_TAG: [u8; 6] = *b"P5IDX\0";
/// Current format version. Any other value is rejected on load.
pub const INDEX_FORMAT_VERSION: u16 = 1;
/// Exact header size.
pub const INDEX_HEADER_BYTES: usize = 18;
/// Exact size of one entry.
pub const INDEX_RECORD_BYTES: usize = READ_ID_BYTES + LOCATION_BYTES;

const LOCATION_BYTES: usize = 24;
/// Upper bound on the capacity reserved from an unverified entry count.
/// Larger tables grow as entries are actually decoded.
const MAX_PRESIZE_ENTRIES: u64 = 1 << 16;

/// Decoded header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexFileHeader {
    pub version: u16,
    pub entry_count: u64,
}

impl IndexFileHeader {
    #[must_use]
    pub const fn new(entry_count: u64) -> Self {
        Self {
            version: INDEX_FORMAT_VERSION,
            entry_count,
        }
    }

    #[must_use]
    pub fn encode(&self) -> [u8; INDEX_HEADER_BYTES] {
        let mut out = [0_u8; INDEX_HEADER_BYTES];
        out[0..6].copy_from_slice(&INDEX_FORMAT_TAG);
        out[6..8].copy_from_slice(&self.version.to_ne_bytes());
        // 8..10 reserved
        out[10..18].copy_from_slice(&self.entry_count.to_ne_bytes());
        out
    }

    /// Decode and validate tag and version. The reserved field is ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < INDEX_HEADER_BYTES {
            return Err(SigIdxError::format(format!(
                "index header too short: expected {INDEX_HEADER_BYTES}, got {}",
                bytes.len()
            )));
        }
        if bytes[0..6] != INDEX_FORMAT_TAG {
            return Err(SigIdxError::format(format!(
                "invalid index format tag: {:02X?}",
                &bytes[0..6]
            )));
        }
        let version = u16::from_ne_bytes([bytes[6], bytes[7]]);
        if version != INDEX_FORMAT_VERSION {
            return Err(SigIdxError::format(format!(
                "unsupported index format version {version}, expected {INDEX_FORMAT_VERSION}"
            )));
        }
        let mut count = [0_u8; 8];
        count.copy_from_slice(&bytes[10..18]);
        Ok(Self {
            version,
            entry_count: u64::from_ne_bytes(count),
        })
    }
}

/// Byte offset of entry `index` in a persisted file.
#[must_use]
pub const fn record_offset(index: u64) -> Option<u64> {
    match index.checked_mul(INDEX_RECORD_BYTES as u64) {
        Some(body) => body.checked_add(INDEX_HEADER_BYTES as u64),
        None => None,
    }
}

fn encode_record(read_id: &ReadId, loc: &SignalLocation) -> [u8; INDEX_RECORD_BYTES] {
    let mut out = [0_u8; INDEX_RECORD_BYTES];
    out[0..16].copy_from_slice(read_id.as_bytes());
    out[16..24].copy_from_slice(&loc.start.to_ne_bytes());
    out[24..28].copy_from_slice(&loc.row_count.to_ne_bytes());
    out[28..32].copy_from_slice(&loc.sample_count.to_ne_bytes());
    out[32..36].copy_from_slice(&loc.calibration_offset.to_ne_bytes());
    out[36..40].copy_from_slice(&loc.calibration_scale.to_ne_bytes());
    out
}

fn decode_record(
    bytes: &[u8; INDEX_RECORD_BYTES],
    position: u64,
) -> Result<(ReadId, SignalLocation)> {
    let mut read_id = [0_u8; READ_ID_BYTES];
    read_id.copy_from_slice(&bytes[0..16]);
    let mut start = [0_u8; 8];
    start.copy_from_slice(&bytes[16..24]);
    let field_u32 = |at: usize| [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]];

    let loc = SignalLocation {
        start: u64::from_ne_bytes(start),
        row_count: u32::from_ne_bytes(field_u32(24)),
        sample_count: u32::from_ne_bytes(field_u32(28)),
        calibration_offset: f32::from_ne_bytes(field_u32(32)),
        calibration_scale: f32::from_ne_bytes(field_u32(36)),
    };
    if loc.row_count == 0 {
        return Err(SigIdxError::format(format!(
            "index entry {position} has row_count 0"
        )));
    }
    Ok((ReadId::from_bytes(read_id), loc))
}

/// Stream the header and every entry, in table iteration order.
pub fn write_index<W: Write>(index: &SignalIndex, mut writer: W) -> Result<()> {
    let header = IndexFileHeader::new(index.len() as u64);
    writer.write_all(&header.encode())?;
    for (read_id, loc) in index {
        writer.write_all(&encode_record(read_id, loc))?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a complete index from a stream.
///
/// The stream must end exactly after the declared entries.
pub fn read_index<R: Read>(mut reader: R) -> Result<SignalIndex> {
    let mut header_bytes = [0_u8; INDEX_HEADER_BYTES];
    reader
        .read_exact(&mut header_bytes)
        .map_err(|err| SigIdxError::from_index_read(err, "header"))?;
    let header = IndexFileHeader::decode(&header_bytes)?;

    let slack = header.entry_count / 10 * 3;
    let presize = header
        .entry_count
        .saturating_add(slack)
        .min(MAX_PRESIZE_ENTRIES);
    let mut index = SignalIndex::with_capacity(usize::try_from(presize).unwrap_or(usize::MAX));

    let mut record = [0_u8; INDEX_RECORD_BYTES];
    for position in 0..header.entry_count {
        reader
            .read_exact(&mut record)
            .map_err(|err| SigIdxError::from_index_read(err, &format!("entry {position}")))?;
        let (read_id, loc) = decode_record(&record, position)?;
        index.insert(read_id, loc);
    }

    let mut probe = [0_u8; 1];
    if reader.read(&mut probe)? != 0 {
        return Err(SigIdxError::format(format!(
            "trailing bytes after {} declared index entries",
            header.entry_count
        )));
    }

    debug!(
        declared = header.entry_count,
        entries = index.len(),
        "decoded signal index"
    );
    Ok(index)
}

#[must_use]
pub fn encode_index(index: &SignalIndex) -> Vec<u8> {
    let mut out = Vec::with_capacity(INDEX_HEADER_BYTES + index.len() * INDEX_RECORD_BYTES);
    out.extend_from_slice(&IndexFileHeader::new(index.len() as u64).encode());
    for (read_id, loc) in index {
        out.extend_from_slice(&encode_record(read_id, loc));
    }
    out
}

/// Byte length a file declaring `entry_count` entries must have.
fn expected_len(entry_count: u64) -> Result<u64> {
    record_offset(entry_count).ok_or_else(|| {
        SigIdxError::format(format!(
            "declared entry count {entry_count} overflows the file size"
        ))
    })
}

fn check_declared_len(header: &IndexFileHeader, actual: u64) -> Result<()> {
    let expected = expected_len(header.entry_count)?;
    if actual != expected {
        return Err(SigIdxError::format(format!(
            "index is {actual} bytes, {} entries need {expected}",
            header.entry_count
        )));
    }
    Ok(())
}

/// Decode an in-memory index image.
///
/// The buffer length is checked against the declared entry count before any
/// entry is decoded.
pub fn decode_index(bytes: &[u8]) -> Result<SignalIndex> {
    let header = IndexFileHeader::decode(bytes)?;
    check_declared_len(&header, bytes.len() as u64)?;
    read_index(bytes)
}

/// Persist `index` at `path`, replacing any existing file.
pub fn save_index(index: &SignalIndex, path: &Path) -> Result<()> {
    let file = File::create(path).inspect_err(|err| {
        error!(path = %path.display(), error = %err, "cannot create index file");
    })?;
    write_index(index, BufWriter::new(file))?;
    info!(
        path = %path.display(),
        entries = index.len(),
        "saved signal index"
    );
    Ok(())
}

/// Load an index written by [`save_index`].
///
/// The file length is checked against the declared entry count before any
/// entry is decoded.
pub fn load_index(path: &Path) -> Result<SignalIndex> {
    let file = File::open(path).inspect_err(|err| {
        error!(path = %path.display(), error = %err, "cannot open index file");
    })?;
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let mut header_bytes = [0_u8; INDEX_HEADER_BYTES];
    reader
        .read_exact(&mut header_bytes)
        .map_err(|err| SigIdxError::from_index_read(err, "header"))?;
    let header = IndexFileHeader::decode(&header_bytes)?;
    check_declared_len(&header, file_len).inspect_err(|err| {
        error!(path = %path.display(), error = %err, "rejecting index file");
    })?;

    let index = read_index(header_bytes.as_slice().chain(reader))?;
    info!(
        path = %path.display(),
        entries = index.len(),
        "loaded signal index"
    );
    Ok(index)
}
