//! Rank-and-filter pipeline.

use super::hard::violates;
use super::quota::apply_quotas;
use super::soft::{score_soft, trace_hits};
use super::types::{QuotaRule, Rule};
use crate::model::Row;

/// Rules of one pack, partitioned by role.
///
/// Hard rules filter, soft rules score, quotas trim. Order inside each
/// partition follows pack order.
///
/// # Examples
///
/// ```
/// use creative_matrix::model::{Field, Row};
/// use creative_matrix::rules::{Condition, IfClause, Rule, RulePipeline, ThenClause, ThenCondition};
///
/// let rules = vec![
///     Rule::disallow(
///         IfClause::new().with(Field::Opening, Condition::equals("VOFirst")),
///         ThenClause::new().with(Field::Format, ThenCondition::one_of(["Static_SP"])),
///     ),
///     Rule::prefer(
///         IfClause::new(),
///         ThenClause::new().with(Field::Tone, ThenCondition::one_of(["Urgent"])),
///         0.5,
///     ),
/// ];
/// let pipeline = RulePipeline::new(&rules);
///
/// let rows = vec![
///     Row::new("Pain Point", "A").with(Field::Tone, "Rational"),
///     Row::new("Pain Point", "A").with(Field::Tone, "Urgent"),
///     Row::new("Pain Point", "A")
///         .with(Field::Opening, "VOFirst")
///         .with(Field::Format, "Static_SP"),
/// ];
/// let ranked = pipeline.filter_and_rank(rows);
/// assert_eq!(ranked.len(), 2);
/// assert_eq!(ranked[0].tone.as_deref(), Some("Urgent"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RulePipeline<'a> {
    all: &'a [Rule],
}

impl<'a> RulePipeline<'a> {
    pub fn new(rules: &'a [Rule]) -> Self {
        Self { all: rules }
    }

    pub fn rules(&self) -> &'a [Rule] {
        self.all
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    fn hard(&self) -> impl Iterator<Item = &'a Rule> {
        self.all.iter().filter(|r| r.kind().is_hard())
    }

    fn soft(&self) -> impl Iterator<Item = &'a Rule> {
        self.all.iter().filter(|r| r.kind().is_soft())
    }

    fn quotas(&self) -> impl Iterator<Item = &'a QuotaRule> {
        self.all.iter().filter_map(|r| match r {
            Rule::Quota(q) => Some(q),
            _ => None,
        })
    }

    /// Whether any disallow, allowOnly or mustInclude rule rejects `row`.
    pub fn violates_hard(&self, row: &Row) -> bool {
        self.hard().any(|rule| violates(row, rule))
    }

    /// Sum of prefer/penalize contributions.
    pub fn score(&self, row: &Row) -> f64 {
        self.soft().map(|rule| score_soft(row, rule)).sum()
    }

    /// Filters hard violators, scores survivors, sorts them by descending
    /// score (stable for ties) and enforces quotas.
    ///
    /// Score and quota annotations are recomputed from scratch on every call.
    pub fn filter_and_rank(&self, rows: Vec<Row>) -> Vec<Row> {
        let mut survivors: Vec<Row> = rows
            .into_iter()
            .filter(|row| !self.violates_hard(row))
            .map(|mut row| {
                row.diagnostics.score = self.score(&row);
                row.diagnostics.quota.clear();
                row.diagnostics.quota_need.clear();
                row
            })
            .collect();

        survivors.sort_by(|a, b| b.diagnostics.score.total_cmp(&a.diagnostics.score));

        apply_quotas(survivors, self.quotas())
    }

    /// Records which rules each row hit.
    pub fn attach_trace(&self, rows: &mut [Row]) {
        for row in rows.iter_mut() {
            let hits = trace_hits(row, self.all);
            row.diagnostics.rules_hit = Some(hits);
        }
    }
}
