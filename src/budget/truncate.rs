//! Token-aware prefix truncation.

use crate::budget::estimator::LengthEstimator;

/// Longest prefix of `text`, cut on a char boundary, whose estimate is `<= limit`.
///
/// Returns `text` unchanged when it already fits; otherwise the result is a
/// strict prefix. Estimates are monotone in length, so the boundary is found by
/// binary search over char boundaries.
pub fn truncate_to_fit<'a>(estimator: &LengthEstimator, text: &'a str, limit: usize) -> &'a str {
    if estimator.estimate(text) <= limit {
        return text;
    }

    let boundaries: Vec<usize> = text.char_indices().map(|(idx, _)| idx).collect();
    // boundaries[0] == 0 always fits; the full text does not
    let (mut lo, mut hi) = (0usize, boundaries.len());
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if estimator.estimate(&text[..boundaries[mid]]) <= limit {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    &text[..boundaries.get(lo).copied().unwrap_or(0)]
}
