//! Rule-driven creative combination generator.
//!
//! Produces sets of creative-ad attribute combinations ("rows") for a list
//! of campaign segments, sized by budget and shaped by a rule pack:
//!
//! - **Budget sizing**: converts budget, target CPA and spend factor into a
//!   producible row total and a per-segment distribution (even, weighted or
//!   stage-weighted), dropping segments that cannot reach three rows.
//! - **Rules**: IF/THEN clause matching, hard constraints (`disallow`,
//!   `allowOnly`, `mustInclude`), soft preferences (`prefer`, `penalize`)
//!   and set-level `quota` caps and floors, composed into a
//!   filter-score-sort-trim pipeline.
//! - **Generator**: seeded sampling from variety-limited pools with
//!   similarity-key uniqueness and a sequential diversity floor.
//! - **Planner**: Learn/Scale rail split, per-rail generation, locked rows
//!   and a final cross-segment ranking pass with per-row rule traces.
//!
//! # Determinism
//!
//! Every call owns its random source. With a seed, output is identical
//! across runs; the Scale rail uses the seed plus a fixed offset.
//!
//! # Errors
//!
//! Generation never fails. Infeasible inputs yield fewer rows, warnings and
//! need-more-supply markers; see [`Error`] for the few strict entry points.
//!
//! # Example
//!
//! ```
//! use creative_matrix::budget::{BudgetInputs, Segment};
//! use creative_matrix::model::{Field, PoolCatalogue};
//! use creative_matrix::planner::{PlanRequest, PlanRunner};
//! use creative_matrix::rules::{Condition, IfClause, Rule, ThenClause, ThenCondition};
//!
//! let rules = vec![Rule::disallow(
//!     IfClause::new().with(Field::Opening, Condition::equals("VOFirst")),
//!     ThenClause::new().with(Field::Format, ThenCondition::one_of(["Static_SP", "Static_MR"])),
//! )];
//! let request = PlanRequest::new("Pain Point")
//!     .with_segments(vec![Segment::new("Price", 5.0), Segment::new("Quality", 3.0)])
//!     .with_budget(BudgetInputs::new(80_000.0, 50.0))
//!     .with_seed(7);
//!
//! let plan = PlanRunner::run(&request, &PoolCatalogue::standard(), &rules);
//! assert!(plan.rows.iter().all(|r| {
//!     !(r.opening.as_deref() == Some("VOFirst")
//!         && matches!(r.format.as_deref(), Some("Static_SP" | "Static_MR")))
//! }));
//! ```

pub mod budget;
pub mod error;
pub mod generator;
pub mod model;
pub mod planner;
pub mod random;
pub mod rules;

pub use error::{Error, Result};
