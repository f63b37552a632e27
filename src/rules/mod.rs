//! Rule engine.
//!
//! A rule pack is a flat list of [`Rule`]s of six kinds:
//!
//! | Kind | Role |
//! |------|------|
//! | `disallow` | Reject a row when IF holds and any THEN field matches |
//! | `allowOnly` | Reject a row when IF holds and THEN is not fully satisfied |
//! | `mustInclude` | Same evaluation as `allowOnly` |
//! | `prefer` | Add `weight` to the score when IF holds and any THEN field matches |
//! | `penalize` | Subtract `weight` under the same condition |
//! | `quota` | Cap or floor the share of a field's values over the ranked set |
//!
//! [`RulePipeline`] runs them in that order over a candidate set: hard
//! filter, soft score, stable descending sort, quota enforcement.

mod clause;
mod engine;
mod hard;
mod pack;
mod quota;
mod soft;
mod types;

pub use clause::{matches, matches_op, ClauseValue, Condition, IfClause, Op, ThenClause, ThenCondition};
pub use engine::RulePipeline;
pub use hard::{violates, violates_allow_only, violates_disallow, violates_must_include};
pub use pack::{
    DisabledQuota, LegacyAllowOnly, LegacyDisallow, LegacyRules, PackScope, RulePack, RunModifiers,
};
pub use quota::apply_quotas;
pub use soft::{satisfies_then, score_soft, trace_hits};
pub use types::{ConstraintRule, QuotaRule, QuotaScope, Rule, RuleKind, WeightedRule};
