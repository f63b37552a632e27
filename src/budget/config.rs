//! Budget inputs and distribution settings.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a row total is spread over segments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum Distribution {
    /// Equal shares; the remainder goes to the first segments.
    Even,
    /// Proportional to each segment's weight.
    #[default]
    Pareto,
    /// Proportional to a fixed weight per stage label (see [`StageWeights`]).
    Stage,
}

/// A segment (vertical value) and its relative weight.
///
/// Weights that are zero, negative or non-finite count as 1.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    pub id: String,
    #[cfg_attr(feature = "serde", serde(default = "default_weight"))]
    pub weight: f64,
}

#[cfg(feature = "serde")]
fn default_weight() -> f64 {
    1.0
}

impl Segment {
    pub fn new(id: impl Into<String>, weight: f64) -> Self {
        Self {
            id: id.into(),
            weight,
        }
    }

    /// Usable weight.
    pub fn effective_weight(&self) -> f64 {
        sanitize_weight(self.weight)
    }
}

pub(crate) fn sanitize_weight(w: f64) -> f64 {
    if w.is_finite() && w > 0.0 {
        w
    } else {
        1.0
    }
}

/// Weights keyed by stage label for [`Distribution::Stage`].
///
/// Labels without an entry weigh 1.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct StageWeights(BTreeMap<String, f64>);

impl Default for StageWeights {
    fn default() -> Self {
        Self::empty()
            .with_stage("Top", 3.0)
            .with_stage("Mid", 2.0)
            .with_stage("Bottom", 3.0)
    }
}

impl StageWeights {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with_stage(mut self, label: impl Into<String>, weight: f64) -> Self {
        self.0.insert(label.into(), weight);
        self
    }

    pub fn weight_for(&self, label: &str) -> f64 {
        self.0.get(label).copied().map_or(1.0, sanitize_weight)
    }
}

/// Scalar budget inputs.
///
/// `read_days` and `daily_budget` are optional in practice: a value of 0
/// leaves the concurrency estimate undefined.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct BudgetInputs {
    pub total_budget: f64,
    #[cfg_attr(feature = "serde", serde(rename = "targetCPA"))]
    pub target_cpa: f64,
    /// Multiplier from CPA to the minimum spend a variant needs.
    pub min_spend_factor: f64,
    pub read_days: f64,
    pub daily_budget: f64,
}

impl Default for BudgetInputs {
    fn default() -> Self {
        Self {
            total_budget: 0.0,
            target_cpa: 0.0,
            min_spend_factor: Self::DEFAULT_MIN_SPEND_FACTOR,
            read_days: 0.0,
            daily_budget: 0.0,
        }
    }
}

impl BudgetInputs {
    pub const DEFAULT_MIN_SPEND_FACTOR: f64 = 40.0;

    pub fn new(total_budget: f64, target_cpa: f64) -> Self {
        Self {
            total_budget,
            target_cpa,
            ..Self::default()
        }
    }

    pub fn with_min_spend_factor(mut self, factor: f64) -> Self {
        self.min_spend_factor = factor;
        self
    }

    pub fn with_read_days(mut self, days: f64) -> Self {
        self.read_days = days;
        self
    }

    pub fn with_daily_budget(mut self, budget: f64) -> Self {
        self.daily_budget = budget;
        self
    }

    /// Copy with non-finite values replaced by their default (40 for the
    /// spend factor, 0 otherwise) and negatives raised to 0.
    pub fn sanitized(&self) -> Self {
        let clean = |v: f64, default: f64| if v.is_finite() { v.max(0.0) } else { default };
        Self {
            total_budget: clean(self.total_budget, 0.0),
            target_cpa: clean(self.target_cpa, 0.0),
            min_spend_factor: clean(self.min_spend_factor, Self::DEFAULT_MIN_SPEND_FACTOR),
            read_days: clean(self.read_days, 0.0),
            daily_budget: clean(self.daily_budget, 0.0),
        }
    }

    /// Rejects non-finite or negative values.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("total_budget", self.total_budget),
            ("target_cpa", self.target_cpa),
            ("min_spend_factor", self.min_spend_factor),
            ("read_days", self.read_days),
            ("daily_budget", self.daily_budget),
        ];
        for (name, v) in fields {
            if !v.is_finite() {
                return Err(Error::InvalidConfig(format!("{name} must be finite, got {v}")));
            }
            if v < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be non-negative, got {v}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_inputs() {
        let b = BudgetInputs::default();
        assert!((b.min_spend_factor - 40.0).abs() < 1e-10);
        assert!(b.validate().is_ok());
    }

    #[test]
    fn test_sanitized() {
        let b = BudgetInputs::new(f64::NAN, -5.0)
            .with_min_spend_factor(f64::INFINITY)
            .with_read_days(-1.0)
            .with_daily_budget(300.0)
            .sanitized();
        assert_eq!(b.total_budget, 0.0);
        assert_eq!(b.target_cpa, 0.0);
        assert!((b.min_spend_factor - 40.0).abs() < 1e-10);
        assert_eq!(b.read_days, 0.0);
        assert!((b.daily_budget - 300.0).abs() < 1e-10);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(BudgetInputs::new(-1.0, 50.0).validate().is_err());
        assert!(BudgetInputs::new(100.0, f64::NAN).validate().is_err());
        assert!(BudgetInputs::new(100.0, 50.0)
            .with_min_spend_factor(f64::NEG_INFINITY)
            .validate()
            .is_err());
    }

    #[test]
    fn test_stage_weights() {
        let w = StageWeights::default();
        assert!((w.weight_for("Top") - 3.0).abs() < 1e-10);
        assert!((w.weight_for("Mid") - 2.0).abs() < 1e-10);
        assert!((w.weight_for("Bottom") - 3.0).abs() < 1e-10);
        assert!((w.weight_for("Other") - 1.0).abs() < 1e-10);

        let w = StageWeights::empty().with_stage("Top", -2.0);
        assert!((w.weight_for("Top") - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_segment_weight() {
        assert!((Segment::new("A", 2.5).effective_weight() - 2.5).abs() < 1e-10);
        assert!((Segment::new("A", 0.0).effective_weight() - 1.0).abs() < 1e-10);
        assert!((Segment::new("A", f64::NAN).effective_weight() - 1.0).abs() < 1e-10);
    }
}
