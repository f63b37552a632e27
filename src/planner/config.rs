//! Plan request.

use super::rails::{sanitize_learn_ratio, DEFAULT_LEARN_RATIO};
use crate::budget::{BudgetInputs, Distribution, Segment, StageWeights};
use crate::error::{Error, Result};
use crate::generator::GeneratorConfig;
use crate::model::Row;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Everything one planning call needs besides pools and rules.
///
/// # Examples
///
/// ```
/// use creative_matrix::budget::{BudgetInputs, Distribution, Segment};
/// use creative_matrix::planner::PlanRequest;
///
/// let request = PlanRequest::new("Pain Point")
///     .with_segments(vec![Segment::new("Price", 5.0), Segment::new("Quality", 3.0)])
///     .with_distribution(Distribution::Pareto)
///     .with_budget(BudgetInputs::new(80_000.0, 50.0).with_read_days(10.0))
///     .with_seed(7);
/// assert!(request.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct PlanRequest {
    /// Segment dimension label, e.g. "Pain Point".
    pub main_dimension: String,
    pub segments: Vec<Segment>,
    pub distribution: Distribution,
    pub stage_weights: StageWeights,
    pub budget: BudgetInputs,
    pub generator: GeneratorConfig,
    /// Share of generated rows for the Learn rail, in `[0, 1]`.
    pub learn_ratio: f64,
    /// Added to the seed for the Scale rail.
    pub scale_seed_offset: u64,
    /// Rows carried over unchanged; they count against the budget.
    pub locked_rows: Vec<Row>,
    /// Hero rows allowed per segment before a warning is raised.
    pub max_heroes: usize,
}

impl Default for PlanRequest {
    fn default() -> Self {
        Self {
            main_dimension: String::new(),
            segments: Vec::new(),
            distribution: Distribution::default(),
            stage_weights: StageWeights::default(),
            budget: BudgetInputs::default(),
            generator: GeneratorConfig::default(),
            learn_ratio: DEFAULT_LEARN_RATIO,
            scale_seed_offset: Self::DEFAULT_SCALE_SEED_OFFSET,
            locked_rows: Vec::new(),
            max_heroes: Self::DEFAULT_MAX_HEROES,
        }
    }
}

impl PlanRequest {
    pub const DEFAULT_SCALE_SEED_OFFSET: u64 = 1;
    pub const DEFAULT_MAX_HEROES: usize = 2;

    pub fn new(main_dimension: impl Into<String>) -> Self {
        Self {
            main_dimension: main_dimension.into(),
            ..Self::default()
        }
    }

    pub fn with_segments(mut self, segments: Vec<Segment>) -> Self {
        self.segments = segments;
        self
    }

    pub fn with_distribution(mut self, distribution: Distribution) -> Self {
        self.distribution = distribution;
        self
    }

    pub fn with_stage_weights(mut self, weights: StageWeights) -> Self {
        self.stage_weights = weights;
        self
    }

    pub fn with_budget(mut self, budget: BudgetInputs) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_generator(mut self, generator: GeneratorConfig) -> Self {
        self.generator = generator;
        self
    }

    /// Shortcut for `generator.seed`.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.generator.seed = Some(seed);
        self
    }

    pub fn with_learn_ratio(mut self, ratio: f64) -> Self {
        self.learn_ratio = ratio;
        self
    }

    pub fn with_scale_seed_offset(mut self, offset: u64) -> Self {
        self.scale_seed_offset = offset;
        self
    }

    pub fn with_locked_rows(mut self, rows: Vec<Row>) -> Self {
        self.locked_rows = rows;
        self
    }

    pub fn with_max_heroes(mut self, max: usize) -> Self {
        self.max_heroes = max;
        self
    }

    /// Copy with every numeric input clamped into range.
    pub fn sanitized(&self) -> Self {
        Self {
            budget: self.budget.sanitized(),
            generator: self.generator.sanitized(),
            learn_ratio: sanitize_learn_ratio(self.learn_ratio),
            ..self.clone()
        }
    }

    /// Validates the request.
    pub fn validate(&self) -> Result<()> {
        if !self.learn_ratio.is_finite() || !(0.0..=1.0).contains(&self.learn_ratio) {
            return Err(Error::InvalidConfig(format!(
                "learn_ratio must be in [0, 1], got {}",
                self.learn_ratio
            )));
        }
        if let Some(seg) = self.segments.iter().find(|s| s.id.is_empty()) {
            return Err(Error::InvalidConfig(format!(
                "segment ids must be non-empty (weight {})",
                seg.weight
            )));
        }
        self.budget.validate()?;
        self.generator.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_request() {
        let r = PlanRequest::default();
        assert!((r.learn_ratio - 0.7).abs() < 1e-10);
        assert_eq!(r.scale_seed_offset, 1);
        assert_eq!(r.max_heroes, 2);
        assert_eq!(r.distribution, Distribution::Pareto);
        assert!(r.validate().is_ok());
    }

    #[test]
    fn test_validate_learn_ratio() {
        assert!(PlanRequest::default().with_learn_ratio(1.5).validate().is_err());
        assert!(PlanRequest::default()
            .with_learn_ratio(f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_nested() {
        let r = PlanRequest::default().with_budget(BudgetInputs::new(-5.0, 10.0));
        assert!(r.validate().is_err());
        let r = PlanRequest::default().with_segments(vec![Segment::new("", 1.0)]);
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_sanitized_clamps() {
        let r = PlanRequest::default()
            .with_learn_ratio(3.0)
            .with_budget(BudgetInputs::new(f64::NAN, 50.0))
            .sanitized();
        assert!((r.learn_ratio - 1.0).abs() < 1e-10);
        assert_eq!(r.budget.total_budget, 0.0);
        assert!(r.validate().is_ok());
    }

    #[test]
    fn test_with_seed_sets_generator_seed() {
        let r = PlanRequest::new("Pain Point").with_seed(99);
        assert_eq!(r.generator.seed, Some(99));
        assert_eq!(r.main_dimension, "Pain Point");
    }
}
