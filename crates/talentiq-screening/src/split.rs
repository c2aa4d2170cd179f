//! Dynamic tier split: 1-D k-means with k=2 over the ranked score list.

/// Spread below which the score list is treated as one cluster.
const DEGENERATE_SPREAD: f64 = 0.05;
/// An all-high degenerate cluster screens everyone in full.
const ALL_HIGH_THRESHOLD: f64 = 0.7;
/// Centroid movement below which iteration stops.
const CONVERGENCE: f64 = 0.001;
const MAX_ITERATIONS: usize = 5;

/// Find the top-tier size for a descending-sorted score list.
///
/// Returns a value in `[min(min_top_count, n), n]`; everything before the
/// returned index is the top tier.
pub fn dynamic_split(scores: &[f64], min_top_count: usize) -> usize {
    let n = scores.len();
    if n == 0 {
        return 0;
    }
    if n < min_top_count {
        return n;
    }

    let mut c_hi = scores.iter().cloned().fold(f64::MIN, f64::max);
    let mut c_lo = scores.iter().cloned().fold(f64::MAX, f64::min);

    if c_hi - c_lo < DEGENERATE_SPREAD {
        return if c_hi > ALL_HIGH_THRESHOLD { n } else { min_top_count };
    }

    let mut split = 0;
    for _ in 0..MAX_ITERATIONS {
        // First index closer to the low centroid than the high one; the
        // list is sorted, so everything after it is low too.
        split = scores
            .iter()
            .position(|s| (s - c_lo).abs() < (s - c_hi).abs())
            .unwrap_or(n);

        let high = &scores[..split];
        let low = &scores[split..];

        let new_hi = if high.is_empty() { c_hi } else { mean(high) };
        let new_lo = if low.is_empty() { c_lo } else { mean(low) };

        if (new_hi - c_hi).abs() < CONVERGENCE && (new_lo - c_lo).abs() < CONVERGENCE {
            break;
        }
        c_hi = new_hi;
        c_lo = new_lo;
    }

    split.max(min_top_count)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
