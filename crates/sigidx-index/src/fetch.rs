//! Direct sample decoding for one indexed read.

use sigidx_error::{Result, SigIdxError};
use sigidx_store::SignalStore;
use sigidx_types::SignalLocation;
use tracing::{error, trace};

/// Decode all raw samples of the read at `loc`.
///
/// The returned vector has exactly `loc.sample_count` elements.
pub fn fetch_raw<S: SignalStore>(store: &S, loc: &SignalLocation) -> Result<Vec<i16>> {
    let mut out = vec![0_i16; loc.sample_count as usize];
    fetch_raw_into(store, loc, &mut out)?;
    Ok(out)
}

/// Decode the read at `loc` into `out`, which must hold exactly
/// `loc.sample_count` samples.
///
/// # Errors
///
/// `Internal` when `out` has the wrong length, before the store is touched.
/// `Store` when the location claims more rows than it has samples, when the
/// store fails on any row, or when the rows' stored sample counts do not add
/// up to `sample_count`. On error the contents of `out` are
/// unspecified.
pub fn fetch_raw_into<S: SignalStore>(
    store: &S,
    loc: &SignalLocation,
    out: &mut [i16],
) -> Result<()> {
    if out.len() != loc.sample_count as usize {
        return Err(SigIdxError::internal(format!(
            "fetch buffer holds {} samples, read has {}",
            out.len(),
            loc.sample_count
        )));
    }
    // Every row holds at least one sample, except the single row of an empty
    // read.
    if loc.row_count > loc.sample_count.max(1) {
        let err = SigIdxError::store(format!(
            "read spans {} rows but holds only {} samples",
            loc.row_count, loc.sample_count
        ));
        error!(start = loc.start, error = %err, "signal fetch aborted");
        return Err(err);
    }
    let range = loc.row_range().ok_or_else(|| {
        SigIdxError::store(format!(
            "signal rows {}+{} overflow the row address space",
            loc.start, loc.row_count
        ))
    })?;
    let rows: Vec<u64> = range.collect();

    let infos = store.signal_row_info(&rows).inspect_err(|err| {
        error!(start = loc.start, rows = loc.row_count, error = %err, "signal row lookup failed");
    })?;
    if infos.len() != rows.len() {
        return Err(SigIdxError::store(format!(
            "store returned {} row descriptors for {} rows",
            infos.len(),
            rows.len()
        )));
    }

    let mut filled = 0_usize;
    for info in &infos {
        let end = filled + info.stored_sample_count as usize;
        if end > out.len() {
            let err = SigIdxError::store(format!(
                "signal row {} overruns the read: {end} samples decoded, {} expected",
                info.row,
                out.len()
            ));
            error!(row = info.row, error = %err, "signal fetch aborted");
            return Err(err);
        }
        store
            .decode_signal(info, &mut out[filled..end])
            .inspect_err(|err| {
                error!(row = info.row, error = %err, "signal row decode failed");
            })?;
        filled = end;
    }

    if filled != out.len() {
        let err = SigIdxError::store(format!(
            "signal rows {}..{} hold {filled} samples, {} expected",
            loc.start,
            loc.start + u64::from(loc.row_count),
            out.len()
        ));
        error!(start = loc.start, error = %err, "signal fetch aborted");
        return Err(err);
    }

    trace!(start = loc.start, rows = loc.row_count, samples = filled, "fetched signal");
    Ok(())
}

/// Decode the read at `loc` and convert it to calibrated units.
pub fn fetch_calibrated<S: SignalStore>(store: &S, loc: &SignalLocation) -> Result<Vec<f32>> {
    let raw = fetch_raw(store, loc)?;
    Ok(calibrate(&raw, loc))
}

/// Apply `(raw + offset) * scale` to every sample.
#[must_use]
pub fn calibrate(raw: &[i16], loc: &SignalLocation) -> Vec<f32> {
    raw.iter().map(|&sample| loc.calibrate(sample)).collect()
}
