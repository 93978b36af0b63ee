//! Physical location descriptor for one read's signal.

use std::ops::Range;

/// Where one read's samples live in the sample store and how to calibrate
/// them.
///
/// `row_count >= 1` for every location produced by the builder or the codec.
/// The rows `[start, start + row_count)` are contiguous in the store; that is
/// the store's guarantee and is not re-checked here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalLocation {
    /// First sample-store row holding this read's samples.
    pub start: u64,
    /// Number of contiguous sample-store rows.
    pub row_count: u32,
    /// Total decoded samples across all rows.
    pub sample_count: u32,
    pub calibration_offset: f32,
    pub calibration_scale: f32,
}

impl SignalLocation {
    /// Sample-store rows backing this read, or `None` if the end overflows.
    #[must_use]
    pub fn row_range(&self) -> Option<Range<u64>> {
        let end = self.start.checked_add(u64::from(self.row_count))?;
        Some(self.start..end)
    }

    /// Convert one raw sample to calibrated units: `(raw + offset) * scale`.
    #[must_use]
    pub fn calibrate(&self, raw: i16) -> f32 {
        (f32::from(raw) + self.calibration_offset) * self.calibration_scale
    }

    /// `(offset, scale)` pair.
    #[must_use]
    pub const fn calibration(&self) -> (f32, f32) {
        (self.calibration_offset, self.calibration_scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(start: u64, row_count: u32) -> SignalLocation {
        SignalLocation {
            start,
            row_count,
            sample_count: 8192,
            calibration_offset: 5.0,
            calibration_scale: 0.1,
        }
    }

    #[test]
    fn row_range_covers_contiguous_rows() {
        assert_eq!(location(100, 2).row_range(), Some(100..102));
        assert_eq!(location(u64::MAX, 1).row_range(), None);
    }

    #[test]
    fn calibrate_applies_offset_then_scale() {
        let loc = location(0, 1);
        assert_eq!(loc.calibrate(10), (10.0 + 5.0) * 0.1);
        assert_eq!(loc.calibration(), (5.0, 0.1));
    }
}
