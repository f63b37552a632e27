//! Budget-to-count derivation.

use tracing::{debug, warn};

use super::config::{BudgetInputs, Distribution, Segment, StageWeights};
use super::distribution::distribute;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fewest rows a segment may receive before it is dropped.
pub const MIN_VARIANTS_PER_VERTICAL: usize = 3;

/// Upper bound on the producible total, however large the budget.
pub const MAX_VARIANTS_CEILING: usize = 100_000;

pub const WARN_INSUFFICIENT_BUDGET: &str = "Insufficient budget for 3 variations per vertical.";
pub const WARN_NO_VERTICALS_LEFT: &str =
    "Insufficient budget for 3 variations per vertical: no verticals remain.";
pub const WARN_VERTICALS_DROPPED: &str =
    "Some verticals were dropped due to < 3 variations under floor.";

/// Result of [`derive_counts_with_budget`].
///
/// `counts[i]` belongs to `used_verticals[i]`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct BudgetDerivation {
    pub min_spend_per_variant: f64,
    pub max_variants: usize,
    /// Advisory; only set when both daily budget and read days are positive.
    pub max_concurrent: Option<usize>,
    pub ads_total: usize,
    pub counts: Vec<usize>,
    pub used_verticals: Vec<Segment>,
    pub dropped_verticals: Vec<String>,
    pub warnings: Vec<String>,
}

impl BudgetDerivation {
    /// `(segment id, count)` pairs for the segments that survived.
    pub fn allocations(&self) -> impl Iterator<Item = (&str, usize)> {
        self.used_verticals
            .iter()
            .map(|s| s.id.as_str())
            .zip(self.counts.iter().copied())
    }
}

pub fn compute_min_spend_per_variant(target_cpa: f64, min_spend_factor: f64) -> f64 {
    target_cpa * min_spend_factor
}

/// `floor(total_budget / min_spend_per_variant)`, capped at
/// [`MAX_VARIANTS_CEILING`], or 0 when the divisor is not positive.
pub fn compute_max_variants(total_budget: f64, min_spend_per_variant: f64) -> usize {
    if min_spend_per_variant <= 0.0 || !min_spend_per_variant.is_finite() {
        return 0;
    }
    let raw = (total_budget / min_spend_per_variant).floor();
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, MAX_VARIANTS_CEILING as f64) as usize
}

/// How many variants the daily budget can keep in flight over the read
/// window. `None` unless `daily_budget` and `read_days` are both positive.
pub fn compute_max_concurrent(
    daily_budget: f64,
    min_spend_per_variant: f64,
    read_days: f64,
) -> Option<usize> {
    if daily_budget <= 0.0 || read_days <= 0.0 {
        return None;
    }
    if min_spend_per_variant <= 0.0 {
        return Some(0);
    }
    let raw = (daily_budget / (min_spend_per_variant / read_days)).floor();
    Some(if raw.is_nan() { 0 } else { raw.clamp(0.0, MAX_VARIANTS_CEILING as f64) as usize })
}

/// Sizes a plan from its budget.
///
/// The producible total is split over `segments` with `mode`. Any segment
/// receiving fewer than [`MIN_VARIANTS_PER_VERTICAL`] rows is dropped and
/// the same total is redistributed over the rest, until every remaining
/// segment clears the floor or none remain.
///
/// # Examples
///
/// ```
/// use creative_matrix::budget::{derive_counts_with_budget, BudgetInputs, Distribution, Segment, StageWeights};
///
/// let inputs = BudgetInputs::new(22_000.0, 50.0).with_read_days(10.0);
/// let segments: Vec<Segment> = ["A", "B", "C", "D"].iter().map(|id| Segment::new(*id, 1.0)).collect();
/// let d = derive_counts_with_budget(&inputs, &segments, Distribution::Even, &StageWeights::default());
///
/// assert_eq!(d.min_spend_per_variant, 2000.0);
/// assert_eq!(d.max_variants, 11);
/// assert_eq!(d.counts, vec![4, 4, 3]);
/// assert_eq!(d.dropped_verticals, vec!["D".to_string()]);
/// ```
pub fn derive_counts_with_budget(
    inputs: &BudgetInputs,
    segments: &[Segment],
    mode: Distribution,
    stages: &StageWeights,
) -> BudgetDerivation {
    let inputs = inputs.sanitized();
    let msv = compute_min_spend_per_variant(inputs.target_cpa, inputs.min_spend_factor);
    let max_variants = compute_max_variants(inputs.total_budget, msv);
    let max_concurrent = compute_max_concurrent(inputs.daily_budget, msv, inputs.read_days);

    if max_variants == MAX_VARIANTS_CEILING {
        warn!(
            total_budget = inputs.total_budget,
            ceiling = MAX_VARIANTS_CEILING,
            "producible total capped"
        );
    }

    let mut warnings = Vec::new();
    let mut ads_total = max_variants;

    if max_variants < segments.len() * MIN_VARIANTS_PER_VERTICAL {
        warnings.push(WARN_INSUFFICIENT_BUDGET.to_string());
    }

    let mut used: Vec<Segment> = segments.to_vec();
    let mut counts = distribute(ads_total, &used, mode, stages);
    let mut dropped: Vec<String> = Vec::new();

    while counts.iter().any(|&c| c < MIN_VARIANTS_PER_VERTICAL) {
        let (keep, drop): (Vec<_>, Vec<_>) = used
            .into_iter()
            .zip(&counts)
            .partition(|(_, c)| **c >= MIN_VARIANTS_PER_VERTICAL);
        dropped.extend(drop.into_iter().map(|(s, _)| s.id));
        used = keep.into_iter().map(|(s, _)| s).collect();

        if used.is_empty() {
            warnings.push(WARN_NO_VERTICALS_LEFT.to_string());
            counts.clear();
            ads_total = 0;
            break;
        }
        counts = distribute(ads_total, &used, mode, stages);
    }

    if !dropped.is_empty() {
        warn!(dropped = ?dropped, ads_total, "segments dropped below the per-segment floor");
        warnings.push(WARN_VERTICALS_DROPPED.to_string());
    }

    debug!(
        min_spend_per_variant = msv,
        max_variants,
        ads_total,
        segments = used.len(),
        "budget sizing complete"
    );

    BudgetDerivation {
        min_spend_per_variant: msv,
        max_variants,
        max_concurrent,
        ads_total,
        counts,
        used_verticals: used,
        dropped_verticals: dropped,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs(ids: &[&str]) -> Vec<Segment> {
        ids.iter().map(|id| Segment::new(*id, 1.0)).collect()
    }

    #[test]
    fn test_min_spend_and_max_variants() {
        assert!((compute_min_spend_per_variant(50.0, 40.0) - 2000.0).abs() < 1e-10);
        assert_eq!(compute_max_variants(22_000.0, 2000.0), 11);
        assert_eq!(compute_max_variants(22_000.0, 0.0), 0);
        assert_eq!(compute_max_variants(1999.0, 2000.0), 0);
    }

    #[test]
    fn test_huge_budget_is_capped() {
        assert_eq!(compute_max_variants(1e30, 2000.0), MAX_VARIANTS_CEILING);
        assert_eq!(compute_max_variants(f64::MAX, 1e-300), MAX_VARIANTS_CEILING);
        assert_eq!(compute_max_concurrent(1e30, 2000.0, 10.0), Some(MAX_VARIANTS_CEILING));

        let d = derive_counts_with_budget(
            &BudgetInputs::new(1e30, 50.0),
            &segs(&["A", "B"]),
            Distribution::Even,
            &StageWeights::default(),
        );
        assert_eq!(d.ads_total, MAX_VARIANTS_CEILING);
        assert_eq!(d.counts.iter().sum::<usize>(), MAX_VARIANTS_CEILING);
    }

    #[test]
    fn test_max_concurrent() {
        assert_eq!(compute_max_concurrent(1000.0, 2000.0, 10.0), Some(5));
        assert_eq!(compute_max_concurrent(0.0, 2000.0, 10.0), None);
        assert_eq!(compute_max_concurrent(1000.0, 2000.0, 0.0), None);
        assert_eq!(compute_max_concurrent(1000.0, 0.0, 10.0), Some(0));
    }

    #[test]
    fn test_budget_floor_warning() {
        let inputs = BudgetInputs::new(22_000.0, 50.0).with_read_days(10.0);
        let d = derive_counts_with_budget(
            &inputs,
            &segs(&["A", "B", "C", "D"]),
            Distribution::Even,
            &StageWeights::default(),
        );
        assert!((d.min_spend_per_variant - 2000.0).abs() < 1e-10);
        assert_eq!(d.max_variants, 11);
        assert_eq!(d.max_concurrent, None);
        assert_eq!(d.ads_total, 11);
        assert!(d
            .warnings
            .iter()
            .any(|w| w.contains("Insufficient budget for 3 variations per vertical")));
        assert!(d.warnings.iter().any(|w| w == WARN_VERTICALS_DROPPED));

        let ids: Vec<&str> = d.used_verticals.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert_eq!(d.counts, vec![4, 4, 3]);
        assert_eq!(d.dropped_verticals, vec!["D"]);
    }

    #[test]
    fn test_no_drop_when_budget_suffices() {
        let inputs = BudgetInputs::new(60_000.0, 50.0);
        let d = derive_counts_with_budget(
            &inputs,
            &segs(&["A", "B"]),
            Distribution::Pareto,
            &StageWeights::default(),
        );
        assert_eq!(d.max_variants, 30);
        assert_eq!(d.counts, vec![15, 15]);
        assert!(d.warnings.is_empty());
        assert!(d.dropped_verticals.is_empty());
    }

    #[test]
    fn test_all_segments_dropped() {
        let inputs = BudgetInputs::new(4_000.0, 50.0);
        let d = derive_counts_with_budget(
            &inputs,
            &segs(&["A", "B"]),
            Distribution::Even,
            &StageWeights::default(),
        );
        assert_eq!(d.max_variants, 2);
        assert_eq!(d.ads_total, 0);
        assert!(d.counts.is_empty());
        assert!(d.used_verticals.is_empty());
        assert_eq!(d.dropped_verticals, vec!["A", "B"]);
        assert!(d.warnings.iter().any(|w| w == WARN_NO_VERTICALS_LEFT));
    }

    #[test]
    fn test_weighted_drop_keeps_weights() {
        let inputs = BudgetInputs::new(20_000.0, 50.0);
        let segments = vec![
            Segment::new("A", 6.0),
            Segment::new("B", 3.0),
            Segment::new("C", 1.0),
        ];
        let d = derive_counts_with_budget(
            &inputs,
            &segments,
            Distribution::Pareto,
            &StageWeights::default(),
        );
        // 10 rows: 6,3,1 -> C dropped -> 10 over weights 6,3 -> 7,3
        assert_eq!(d.counts, vec![7, 3]);
        assert_eq!(d.dropped_verticals, vec!["C"]);
    }

    #[test]
    fn test_non_finite_inputs_do_not_panic() {
        let inputs = BudgetInputs::new(f64::INFINITY, f64::NAN);
        let d = derive_counts_with_budget(
            &inputs,
            &segs(&["A"]),
            Distribution::Even,
            &StageWeights::default(),
        );
        assert_eq!(d.max_variants, 0);
        assert!(d.counts.is_empty());
    }

    #[test]
    fn test_stage_distribution() {
        let inputs = BudgetInputs::new(32_000.0, 50.0);
        let d = derive_counts_with_budget(
            &inputs,
            &segs(&["Top", "Mid", "Bottom"]),
            Distribution::Stage,
            &StageWeights::default(),
        );
        assert_eq!(d.counts, vec![6, 4, 6]);
        let pairs: Vec<(&str, usize)> = d.allocations().collect();
        assert_eq!(pairs[1], ("Mid", 4));
    }
}
