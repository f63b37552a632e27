//! Pairwise diversity.

use super::config::ImpactWeights;
use crate::model::{Field, Row};

/// Sum of impact weights over the diversity fields on which `a` and `b`
/// differ. Two unset values count as equal.
pub fn diversity_delta(a: &Row, b: &Row, weights: &ImpactWeights) -> f64 {
    Field::DIVERSITY
        .iter()
        .filter(|&&f| a.get(f) != b.get(f))
        .map(|&f| weights.weight(f))
        .sum()
}
