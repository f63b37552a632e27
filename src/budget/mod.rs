//! Budget sizing.
//!
//! Turns spend inputs into a producible row total and a per-segment count
//! distribution:
//!
//! - `min_spend_per_variant = target_cpa * min_spend_factor`
//! - `max_variants = floor(total_budget / min_spend_per_variant)`, capped at
//!   [`MAX_VARIANTS_CEILING`]
//! - counts split `Even`, `Pareto` (by weight) or `Stage` (by stage label)
//!
//! Segments that fall below three rows are dropped and the total is
//! redistributed over the rest.

mod config;
mod distribution;
mod sizing;

pub use config::{BudgetInputs, Distribution, Segment, StageWeights};
pub use distribution::{distribute, even_split, pareto_split, stage_split};
pub use sizing::{
    compute_max_concurrent, compute_max_variants, compute_min_spend_per_variant,
    derive_counts_with_budget, BudgetDerivation, MAX_VARIANTS_CEILING, MIN_VARIANTS_PER_VERTICAL,
    WARN_INSUFFICIENT_BUDGET, WARN_NO_VERTICALS_LEFT, WARN_VERTICALS_DROPPED,
};
