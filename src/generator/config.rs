//! Generator configuration: variety levels, impact weights, pipeline flags.

use crate::error::{Error, Result};
use crate::model::{Field, PoolCatalogue, Row};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Highest variety level.
pub const MAX_VARIETY_LEVEL: u8 = 3;

/// Maps a variety level to the number of pool items eligible for a
/// generation call: `0 -> 0`, `1 -> 2`, `2 -> 3`, `3 -> 5`, each capped at
/// `pool_size`.
pub fn slider_to_count(level: u8, pool_size: usize) -> usize {
    let wanted = match level {
        0 => return 0,
        1 => 2,
        2 => 3,
        _ => 5,
    };
    wanted.min(pool_size)
}

/// Variety level (0..=3) per field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Variety([u8; 9]);

impl Default for Variety {
    fn default() -> Self {
        Self([2, 2, 2, 2, 2, 1, 1, 1, 1])
    }
}

impl Variety {
    /// Every field at `level`.
    pub fn uniform(level: u8) -> Self {
        Self([level.min(MAX_VARIETY_LEVEL); 9])
    }

    pub fn level(&self, field: Field) -> u8 {
        self.0[field.index()]
    }

    /// Sets one field's level, clamped to [`MAX_VARIETY_LEVEL`].
    pub fn with_level(mut self, field: Field, level: u8) -> Self {
        self.0[field.index()] = level.min(MAX_VARIETY_LEVEL);
        self
    }

    /// Eligible item count for `field` against a pool of `pool_size`.
    pub fn count(&self, field: Field, pool_size: usize) -> usize {
        slider_to_count(self.level(field), pool_size)
    }

    /// The diversity field whose level is best raised next: the one with the
    /// highest impact weight that is below the top level and not yet using
    /// its whole pool.
    pub fn suggest_raise(&self, pools: &PoolCatalogue, impact: &ImpactWeights) -> Option<Field> {
        let mut viable: Vec<Field> = Field::DIVERSITY
            .iter()
            .copied()
            .filter(|&f| {
                let size = pools.pool(f).len();
                size > 0 && self.level(f) < MAX_VARIETY_LEVEL && self.count(f, size) < size
            })
            .collect();
        viable.sort_by(|a, b| impact.weight(*b).total_cmp(&impact.weight(*a)));
        viable.first().copied()
    }

    /// Copy with `field` one level higher.
    pub fn raised(self, field: Field) -> Self {
        let next = self.level(field).saturating_add(1);
        self.with_level(field, next)
    }

    fn clamped(self) -> Self {
        Self(self.0.map(|l| l.min(MAX_VARIETY_LEVEL)))
    }
}

/// Per-field contribution to the diversity delta.
///
/// Only [`Field::DIVERSITY`] fields carry a weight; the others weigh 0.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ImpactWeights([f64; 7]);

impl Default for ImpactWeights {
    fn default() -> Self {
        Self([0.9, 0.85, 0.7, 0.6, 0.6, 0.4, 0.2])
    }
}

impl ImpactWeights {
    pub fn weight(&self, field: Field) -> f64 {
        self.0.get(field.index()).copied().unwrap_or(0.0)
    }

    /// Overrides one weight. Ignored for fields outside [`Field::DIVERSITY`].
    pub fn with_weight(mut self, field: Field, weight: f64) -> Self {
        if let Some(slot) = self.0.get_mut(field.index()) {
            *slot = weight;
        }
        self
    }

    /// Largest delta two rows can reach.
    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    fn sanitized(self) -> Self {
        let defaults = Self::default().0;
        let mut out = self.0;
        for (w, d) in out.iter_mut().zip(defaults) {
            *w = if w.is_finite() { w.max(0.0) } else { d };
        }
        Self(out)
    }
}

/// Pipeline-dependent hard constraints applied during candidate generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct PipelineFlags {
    /// Reject Spec `1:1` combined with Opening `VOFirst`.
    pub disallow_vo_first_square: bool,
}

impl PipelineFlags {
    pub fn rejects(&self, row: &Row) -> bool {
        self.disallow_vo_first_square
            && row.get(Field::Spec) == Some("1:1")
            && row.get(Field::Opening) == Some("VOFirst")
    }
}

/// Configuration for the candidate generator.
///
/// # Examples
///
/// ```
/// use creative_matrix::generator::{GeneratorConfig, Variety};
/// use creative_matrix::model::Field;
///
/// let config = GeneratorConfig::default()
///     .with_variety(Variety::uniform(2).with_level(Field::Pattern, 3))
///     .with_diversity_target(2.0)
///     .with_seed(123);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct GeneratorConfig {
    pub variety: Variety,
    pub impact_weights: ImpactWeights,
    /// Minimum delta between consecutive selected rows of a segment.
    pub diversity_target: f64,
    /// Random seed for reproducibility.
    pub seed: Option<u64>,
    pub flags: PipelineFlags,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            variety: Variety::default(),
            impact_weights: ImpactWeights::default(),
            diversity_target: Self::DEFAULT_DIVERSITY_TARGET,
            seed: None,
            flags: PipelineFlags::default(),
        }
    }
}

impl GeneratorConfig {
    pub const DEFAULT_DIVERSITY_TARGET: f64 = 2.2;

    /// Oversampling factor over the rows a segment needs.
    pub const OVERSAMPLE: usize = 3;

    /// Candidate attempts allowed per needed row.
    pub const ATTEMPTS_PER_ROW: usize = 500;

    /// Attempt floor for small segments.
    pub const MIN_ATTEMPTS: usize = 1500;

    /// Largest per-segment need the generator works towards; larger
    /// requests are filled short.
    pub const MAX_ROWS_PER_SEGMENT: usize = 100_000;

    pub fn with_variety(mut self, variety: Variety) -> Self {
        self.variety = variety;
        self
    }

    pub fn with_impact_weights(mut self, weights: ImpactWeights) -> Self {
        self.impact_weights = weights;
        self
    }

    pub fn with_diversity_target(mut self, target: f64) -> Self {
        self.diversity_target = target;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_flags(mut self, flags: PipelineFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Copy with out-of-range values clamped: levels to 3, negative weights
    /// and targets to 0, non-finite ones to their defaults.
    pub fn sanitized(&self) -> Self {
        let diversity_target = if self.diversity_target.is_finite() {
            self.diversity_target.max(0.0)
        } else {
            Self::DEFAULT_DIVERSITY_TARGET
        };
        Self {
            variety: self.variety.clamped(),
            impact_weights: self.impact_weights.sanitized(),
            diversity_target,
            seed: self.seed,
            flags: self.flags,
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.diversity_target.is_finite() || self.diversity_target < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "diversity_target must be a non-negative number, got {}",
                self.diversity_target
            )));
        }
        for field in Field::ALL {
            let level = self.variety.level(field);
            if level > MAX_VARIETY_LEVEL {
                return Err(Error::InvalidConfig(format!(
                    "variety level for {field} must be at most {MAX_VARIETY_LEVEL}, got {level}"
                )));
            }
        }
        for field in Field::DIVERSITY {
            let w = self.impact_weights.weight(field);
            if !w.is_finite() || w < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "impact weight for {field} must be a non-negative number, got {w}"
                )));
            }
        }
        Ok(())
    }
}
