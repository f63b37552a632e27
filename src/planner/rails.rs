//! Learn/Scale rail split.

use crate::model::Rail;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default share of rows that go to the Learn rail.
pub const DEFAULT_LEARN_RATIO: f64 = 0.7;

/// Rows per rail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RailSplit {
    pub learn: usize,
    pub scale: usize,
}

impl RailSplit {
    pub fn get(&self, rail: Rail) -> usize {
        match rail {
            Rail::Learn => self.learn,
            Rail::Scale => self.scale,
        }
    }

    pub fn total(&self) -> usize {
        self.learn + self.scale
    }
}

/// Clamps a learn ratio to `[0, 1]`; non-finite values fall back to
/// [`DEFAULT_LEARN_RATIO`].
pub fn sanitize_learn_ratio(ratio: f64) -> f64 {
    if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        DEFAULT_LEARN_RATIO
    }
}

/// `learn = floor(ads_total * learn_ratio)`, `scale = ads_total - learn`.
///
/// ```
/// use creative_matrix::planner::split_rails;
///
/// let split = split_rails(10, 0.7);
/// assert_eq!((split.learn, split.scale), (7, 3));
/// ```
pub fn split_rails(ads_total: usize, learn_ratio: f64) -> RailSplit {
    let ratio = sanitize_learn_ratio(learn_ratio);
    let learn = ((ads_total as f64 * ratio).floor() as usize).min(ads_total);
    RailSplit {
        learn,
        scale: ads_total - learn,
    }
}
