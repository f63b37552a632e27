//! Count distributions over segments.
//!
//! All three return one count per segment, summing exactly to `total`.

use super::config::{sanitize_weight, Distribution, Segment, StageWeights};

/// `floor(total / n)` each; the first `total % n` segments get one more.
pub fn even_split(total: usize, n: usize) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    let base = total / n;
    let rem = total % n;
    (0..n).map(|i| base + usize::from(i < rem)).collect()
}

/// Rounded proportional shares, corrected one unit at a time (cycling from
/// the first segment) until they sum to `total`.
///
/// Weights that are zero, negative or non-finite count as 1. Corrections
/// downwards skip segments already at 0.
pub fn pareto_split(total: usize, weights: &[f64]) -> Vec<usize> {
    let n = weights.len();
    if n == 0 {
        return Vec::new();
    }
    let weights: Vec<f64> = weights.iter().copied().map(sanitize_weight).collect();
    let sum: f64 = weights.iter().sum();

    let mut counts: Vec<usize> = weights
        .iter()
        .map(|w| (w / sum * total as f64).round().max(0.0) as usize)
        .collect();

    let mut assigned: usize = counts.iter().sum();
    let mut i = 0;
    while assigned < total {
        counts[i % n] += 1;
        assigned += 1;
        i += 1;
    }
    while assigned > total {
        let slot = i % n;
        if counts[slot] > 0 {
            counts[slot] -= 1;
            assigned -= 1;
        }
        i += 1;
    }
    counts
}

/// Pareto split with weights looked up by segment id in `stages`.
pub fn stage_split(total: usize, segments: &[Segment], stages: &StageWeights) -> Vec<usize> {
    let weights: Vec<f64> = segments.iter().map(|s| stages.weight_for(&s.id)).collect();
    pareto_split(total, &weights)
}

/// Dispatches to the split for `mode`.
pub fn distribute(
    total: usize,
    segments: &[Segment],
    mode: Distribution,
    stages: &StageWeights,
) -> Vec<usize> {
    match mode {
        Distribution::Even => even_split(total, segments.len()),
        Distribution::Pareto => {
            let weights: Vec<f64> = segments.iter().map(|s| s.weight).collect();
            pareto_split(total, &weights)
        }
        Distribution::Stage => stage_split(total, segments, stages),
    }
}
