//! Soft preferences and rule traces.

use super::clause::{matches, ThenClause};
use super::types::{Rule, WeightedRule};
use crate::model::{Row, RuleHit};

/// Whether any THEN field is present and matched (OR across fields).
fn any_then_satisfied(row: &Row, then: &ThenClause) -> bool {
    then.iter()
        .any(|(field, cond)| row.get(field).is_some_and(|actual| cond.matches_any(actual)))
}

fn fires(row: &Row, rule: &WeightedRule) -> bool {
    matches(row, &rule.when) && any_then_satisfied(row, &rule.then)
}

/// Signed contribution of one rule: `+weight` for a firing prefer,
/// `-weight` for a firing penalize, 0 otherwise.
pub fn score_soft(row: &Row, rule: &Rule) -> f64 {
    match rule {
        Rule::Prefer(r) if fires(row, r) => r.effective_weight(),
        Rule::Penalize(r) if fires(row, r) => -r.effective_weight(),
        _ => 0.0,
    }
}

/// Every THEN field is present and permitted (AND across fields). An empty
/// THEN is trivially satisfied.
pub fn satisfies_then(row: &Row, then: &ThenClause) -> bool {
    then.iter()
        .all(|(field, cond)| row.get(field).is_some_and(|actual| cond.permits(actual)))
}

/// Rules a surviving row hit: soft rules with their weight, allowOnly and
/// mustInclude without. Disallow and quota rules are never listed.
pub fn trace_hits<'a, I>(row: &Row, rules: I) -> Vec<RuleHit>
where
    I: IntoIterator<Item = &'a Rule>,
{
    rules
        .into_iter()
        .filter_map(|rule| match rule {
            Rule::Prefer(r) | Rule::Penalize(r)
                if matches(row, &r.when) && satisfies_then(row, &r.then) =>
            {
                Some(RuleHit {
                    kind: rule.kind(),
                    weight: Some(r.effective_weight()),
                })
            }
            Rule::AllowOnly(r) | Rule::MustInclude(r)
                if matches(row, &r.when) && satisfies_then(row, &r.then) =>
            {
                Some(RuleHit {
                    kind: rule.kind(),
                    weight: None,
                })
            }
            _ => None,
        })
        .collect()
}
