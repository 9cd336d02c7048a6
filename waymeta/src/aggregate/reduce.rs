//! Score reductions.

use std::collections::HashMap;
use std::hash::Hash;

/// Median of `values`, reordering them in place.
///
/// For an even count this is the mean of the two middle values. Returns
/// `None` for an empty slice.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by(f64::total_cmp);

    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Divides every score by the largest one, returning that maximum.
///
/// If the maximum is not positive (an empty map or all-zero scores) the
/// scores are left as they are.
pub fn normalize_by_max<K: Eq + Hash>(scores: &mut HashMap<K, f64>) -> f64 {
    let max = scores.values().copied().fold(0.0_f64, f64::max);
    if max > 0.0 {
        for value in scores.values_mut() {
            *value /= max;
        }
    }
    max
}
