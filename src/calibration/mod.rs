//! # Calibration
//! Rolling history of raw magnitudes and the percentile bounds derived from it.
//!
//! The history is append-ordered and capped (oldest evicted first). Bounds are
//! never stored: they are recomputed from a sorted copy of the history on
//! every request, using linear interpolation between the closest ranks.

pub mod store;

pub use store::{FileStore, MemoryStore};

/// Default history cap.
pub const DEFAULT_CAPACITY: usize = 500;
pub const DEFAULT_PERCENTILE_LOW: f64 = 5.0;
pub const DEFAULT_PERCENTILE_HIGH: f64 = 95.0;

/// Cross-call calibration state consulted by the score engine.
///
/// `record` must absorb storage failures; scoring never fails because the
/// history could not be persisted.
pub trait CalibrationStore: Send + Sync {
    /// Current history, oldest first.
    fn history(&self) -> Vec<f64>;

    /// Append one raw magnitude and truncate to capacity.
    fn record(&self, raw: f64);

    /// Percentile bounds over the current history, `None` when empty or degenerate.
    fn bounds(&self, p_low: f64, p_high: f64) -> Option<(f64, f64)> {
        percentile_bounds(&self.history(), p_low, p_high)
    }
}

/// Percentile `p` (0..=100) of an ascending slice.
///
/// `k = (n - 1) * p / 100`; on an integral rank the value at that rank is
/// returned, otherwise the two neighbours are blended by the fractional part.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() || !p.is_finite() {
        return None;
    }
    let p = p.clamp(0.0, 100.0);
    let k = (sorted.len() - 1) as f64 * p / 100.0;
    let f = k.floor();
    let c = k.ceil();
    let (fi, ci) = (f as usize, c as usize);
    if fi == ci {
        return Some(sorted[fi]);
    }
    Some(sorted[fi] + (sorted[ci] - sorted[fi]) * (k - f))
}

/// Sort a copy of `history` and return `(low, high)` when `high > low`.
pub fn percentile_bounds(history: &[f64], p_low: f64, p_high: f64) -> Option<(f64, f64)> {
    let mut sorted: Vec<f64> = history.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    let low = percentile(&sorted, p_low)?;
    let high = percentile(&sorted, p_high)?;
    (high > low).then_some((low, high))
}

/// Keep only the newest `cap` entries.
pub(crate) fn truncate_front(v: &mut Vec<f64>, cap: usize) {
    if v.len() > cap {
        let excess = v.len() - cap;
        v.drain(0..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_rank_returns_exact_value() {
        let h = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(percentile(&h, 25.0), Some(20.0));
        assert_eq!(percentile(&h, 75.0), Some(40.0));
        assert_eq!(percentile(&h, 0.0), Some(10.0));
        assert_eq!(percentile(&h, 100.0), Some(50.0));
    }

    #[test]
    fn fractional_rank_interpolates() {
        let h = [10.0, 20.0, 30.0, 40.0, 50.0];
        // k = 4 * 0.10 = 0.4 and k = 4 * 0.90 = 3.6
        assert!((percentile(&h, 10.0).unwrap() - 14.0).abs() < 1e-9);
        assert!((percentile(&h, 90.0).unwrap() - 46.0).abs() < 1e-9);
    }

    #[test]
    fn bounds_sort_a_copy() {
        let h = vec![50.0, 10.0, 40.0, 20.0, 30.0];
        assert_eq!(percentile_bounds(&h, 25.0, 75.0), Some((20.0, 40.0)));
        assert_eq!(h[0], 50.0);
    }

    #[test]
    fn degenerate_bounds_are_none() {
        assert_eq!(percentile_bounds(&[], 5.0, 95.0), None);
        assert_eq!(percentile_bounds(&[0.2], 5.0, 95.0), None);
        assert_eq!(percentile_bounds(&[0.2; 40], 5.0, 95.0), None);
        assert_eq!(percentile_bounds(&[0.1, 0.9], 95.0, 5.0), None);
    }

    #[test]
    fn truncate_keeps_newest() {
        let mut v: Vec<f64> = (1..=10).map(f64::from).collect();
        truncate_front(&mut v, 3);
        assert_eq!(v, vec![8.0, 9.0, 10.0]);
    }
}
