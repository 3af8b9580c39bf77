use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

// Configuration constants.
pub const SAMPLE_RATE: u32 = 44100; // Nominal capture rate, used for buffer sizing.
pub const READ_INTERVAL: Duration = Duration::from_millis(100); // Pause between reads.

/// Level above which the "too loud" warning is shown.
pub const THRESHOLD_DB: f32 = 85.0;
/// Upper bound of the displayed range.
pub const DB_CEILING: f32 = 120.0;

/// Maximum absolute sample magnitude in one batch.
///
/// Computed in i32 so `i16::MIN` does not overflow on negation.
pub fn peak_magnitude(samples: &[i16]) -> f32 {
    samples
        .iter()
        .map(|&s| (s as i32).abs())
        .max()
        .unwrap_or(0) as f32
}

/// Converts a peak magnitude to a dB-like level.
///
/// The magnitude is clamped to a minimum of 1 so silence maps to 0 dB
/// instead of a non-positive logarithm argument.
pub fn level_db(magnitude: f32) -> f32 {
    20.0 * magnitude.max(1.0).log10()
}

/// Level as shown by the numeric readout.
pub fn display_db(level: f32) -> f32 {
    level.clamp(0.0, DB_CEILING)
}

/// Fill fraction of the level bar.
pub fn bar_fraction(level: f32) -> f32 {
    (level / DB_CEILING).clamp(0.0, 1.0)
}

/// Whether the raw (unclamped) level exceeds the warning threshold.
pub fn is_too_loud(level: f32) -> bool {
    level > THRESHOLD_DB
}

/// Latest level published by the sampling thread and polled by the GUI.
///
/// Stored as raw f32 bits in an atomic; there is exactly one writer (the
/// sampler callback) and one reader (the UI frame loop), so relaxed
/// ordering is sufficient.
#[derive(Default)]
pub struct SharedLevel(AtomicU32);

impl SharedLevel {
    pub fn new() -> Self {
        Self(AtomicU32::new(0.0f32.to_bits()))
    }

    pub fn store(&self, level: f32) {
        self.0.store(level.to_bits(), Ordering::Relaxed);
    }

    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_matches_log_rule_for_positive_magnitudes() {
        for m in [1u32, 2, 10, 100, 1000, 32767] {
            let expected = 20.0 * (m as f32).log10();
            assert_eq!(level_db(m as f32), expected);
        }
    }

    #[test]
    fn zero_magnitude_maps_to_zero_not_nan() {
        let level = level_db(0.0);
        assert_eq!(level, 0.0);
        assert!(level.is_finite());
    }

    #[test]
    fn peak_is_largest_absolute_sample() {
        assert_eq!(peak_magnitude(&[0, -12000, 300, 11999]), 12000.0);
        assert_eq!(peak_magnitude(&[0, 0, 0]), 0.0);
        assert_eq!(peak_magnitude(&[]), 0.0);
        // abs(i16::MIN) must not overflow
        assert_eq!(peak_magnitude(&[i16::MIN]), 32768.0);
    }

    #[test]
    fn readout_clamps_to_display_range() {
        let cases = [
            (-10.0, 0),
            (0.0, 0),
            (72.0, 72),
            (85.0, 85),
            (120.0, 120),
            (200.0, 120),
        ];
        for (level, shown) in cases {
            assert_eq!(display_db(level) as i32, shown);
        }
    }

    #[test]
    fn bar_fraction_clamps_to_unit_range() {
        assert_eq!(bar_fraction(0.0), 0.0);
        assert_eq!(bar_fraction(60.0), 0.5);
        assert_eq!(bar_fraction(120.0), 1.0);
        assert_eq!(bar_fraction(150.0), 1.0);
        assert_eq!(bar_fraction(-5.0), 0.0);
    }

    #[test]
    fn warning_requires_strictly_exceeding_threshold() {
        assert!(!is_too_loud(85.0));
        assert!(is_too_loud(85.1));
        assert!(!is_too_loud(0.0));
    }

    #[test]
    fn shared_level_round_trips() {
        let shared = SharedLevel::new();
        assert_eq!(shared.load(), 0.0);
        shared.store(90.3);
        assert_eq!(shared.load(), 90.3);
    }
}
