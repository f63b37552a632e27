//! Hard-constraint evaluation.
//!
//! A row violating any disallow, allowOnly or mustInclude rule is removed
//! from a candidate set. The checks are pure, so re-applying them to an
//! already filtered set is a no-op.

use super::clause::{matches, ThenClause};
use super::types::{ConstraintRule, Rule};
use crate::model::Row;

/// IF matches and either THEN is empty or any THEN field is present and
/// satisfied (OR across fields).
pub fn violates_disallow(row: &Row, rule: &ConstraintRule) -> bool {
    if !matches(row, &rule.when) {
        return false;
    }
    if rule.then.is_empty() {
        return true;
    }
    rule.then
        .iter()
        .any(|(field, cond)| row.get(field).is_some_and(|actual| cond.matches_any(actual)))
}

/// IF matches and some THEN field is absent or not permitted.
pub fn violates_allow_only(row: &Row, rule: &ConstraintRule) -> bool {
    matches(row, &rule.when) && !permits_all(row, &rule.then)
}

/// Same predicate as [`violates_allow_only`]; kept separate so the two
/// rule kinds can diverge without touching packs that use them.
pub fn violates_must_include(row: &Row, rule: &ConstraintRule) -> bool {
    matches(row, &rule.when) && !permits_all(row, &rule.then)
}

fn permits_all(row: &Row, then: &ThenClause) -> bool {
    then.iter()
        .all(|(field, cond)| row.get(field).is_some_and(|actual| cond.permits(actual)))
}

/// Dispatches on the rule kind; soft and quota rules never violate.
pub fn violates(row: &Row, rule: &Rule) -> bool {
    match rule {
        Rule::Disallow(r) => violates_disallow(row, r),
        Rule::AllowOnly(r) => violates_allow_only(row, r),
        Rule::MustInclude(r) => violates_must_include(row, r),
        Rule::Prefer(_) | Rule::Penalize(_) | Rule::Quota(_) => false,
    }
}
