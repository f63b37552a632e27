//! Rule variants.

use super::clause::{IfClause, ThenClause};
use crate::model::Field;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Discriminator of a [`Rule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum RuleKind {
    Disallow,
    AllowOnly,
    MustInclude,
    Prefer,
    Penalize,
    Quota,
}

impl RuleKind {
    /// Row-level filters.
    pub fn is_hard(self) -> bool {
        matches!(
            self,
            RuleKind::Disallow | RuleKind::AllowOnly | RuleKind::MustInclude
        )
    }

    /// Row-level score contributions.
    pub fn is_soft(self) -> bool {
        matches!(self, RuleKind::Prefer | RuleKind::Penalize)
    }
}

/// IF/THEN payload shared by the three hard-constraint kinds.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstraintRule {
    #[cfg_attr(feature = "serde", serde(rename = "if", default))]
    pub when: IfClause,
    #[cfg_attr(feature = "serde", serde(default))]
    pub then: ThenClause,
}

impl ConstraintRule {
    pub fn new(when: IfClause, then: ThenClause) -> Self {
        Self { when, then }
    }
}

/// IF/THEN payload plus weight for prefer/penalize.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WeightedRule {
    #[cfg_attr(feature = "serde", serde(rename = "if", default))]
    pub when: IfClause,
    #[cfg_attr(feature = "serde", serde(default))]
    pub then: ThenClause,
    /// Nominally in `[0, 1]`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub weight: f64,
}

impl WeightedRule {
    pub fn new(when: IfClause, then: ThenClause, weight: f64) -> Self {
        Self { when, then, weight }
    }

    /// The weight, or 0 when it is not a finite number.
    pub fn effective_weight(&self) -> f64 {
        if self.weight.is_finite() {
            self.weight
        } else {
            0.0
        }
    }
}

/// Which rows a quota counts against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum QuotaScope {
    /// One bucket over all rows.
    #[default]
    Global,
    /// One bucket per vertical value.
    PerVertical,
}

/// Set-level share constraint on one field's values.
///
/// `max_share` is a fraction in `[0, 1]` and wins over `max_pct` (percent,
/// `[0, 100]`) when both are present. Out-of-range inputs are clamped and
/// non-finite ones ignored when the quota is evaluated.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct QuotaRule {
    pub field: Field,
    #[cfg_attr(feature = "serde", serde(default))]
    pub scope: QuotaScope,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub value: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub one_of: Option<Vec<String>>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub max_share: Option<f64>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub min_pct: Option<f64>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub max_pct: Option<f64>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub tolerance: Option<f64>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub per_vertical_min_distinct: Option<f64>,
}

impl QuotaRule {
    pub const DEFAULT_TOLERANCE: usize = 1;

    pub fn new(field: Field) -> Self {
        Self {
            field,
            scope: QuotaScope::Global,
            value: None,
            one_of: None,
            max_share: None,
            min_pct: None,
            max_pct: None,
            tolerance: None,
            per_vertical_min_distinct: None,
        }
    }

    pub fn with_scope(mut self, scope: QuotaScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.one_of = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_max_share(mut self, share: f64) -> Self {
        self.max_share = Some(share);
        self
    }

    pub fn with_max_pct(mut self, pct: f64) -> Self {
        self.max_pct = Some(pct);
        self
    }

    pub fn with_min_pct(mut self, pct: f64) -> Self {
        self.min_pct = Some(pct);
        self
    }

    pub fn with_tolerance(mut self, tolerance: usize) -> Self {
        self.tolerance = Some(tolerance as f64);
        self
    }

    pub fn with_per_vertical_min_distinct(mut self, n: usize) -> Self {
        self.per_vertical_min_distinct = Some(n as f64);
        self
    }

    /// Target values: `one_of` when non-empty, else `value` when non-empty.
    /// Empty means the quota targets nothing.
    pub fn target_values(&self) -> Vec<String> {
        match (&self.one_of, &self.value) {
            (Some(vs), _) if !vs.is_empty() => vs.clone(),
            (_, Some(v)) if !v.is_empty() => vec![v.clone()],
            _ => Vec::new(),
        }
    }

    /// Tolerance in whole rows (default 1, never negative).
    pub fn effective_tolerance(&self) -> usize {
        match self.tolerance {
            Some(t) if t.is_finite() => t.max(0.0).floor() as usize,
            _ => Self::DEFAULT_TOLERANCE,
        }
    }

    /// Row cap for a bucket of `bucket_size` rows, if the quota sets one:
    /// `floor(size * maxShare)`, else `floor(size * maxPct / 100)`.
    pub fn cap_for(&self, bucket_size: usize) -> Option<usize> {
        let size = bucket_size as f64;
        finite(self.max_share)
            .map(|s| (size * s.clamp(0.0, 1.0)).floor())
            .or_else(|| finite(self.max_pct).map(|p| (size * p.clamp(0.0, 100.0) / 100.0).floor()))
            .map(|cap| cap as usize)
    }

    /// Minimum share as a percentage in `[0, 100]`, if any.
    pub fn min_pct_clamped(&self) -> Option<f64> {
        finite(self.min_pct).map(|p| p.clamp(0.0, 100.0))
    }

    /// Required distinct values per vertical (at least 1), if any.
    pub fn min_distinct(&self) -> Option<usize> {
        finite(self.per_vertical_min_distinct).map(|n| n.max(1.0).floor() as usize)
    }
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

/// One entry of a rule pack.
///
/// `AllowOnly` and `MustInclude` evaluate identically today but stay
/// distinct kinds: pack authors choose between them deliberately.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "camelCase"))]
pub enum Rule {
    Disallow(ConstraintRule),
    AllowOnly(ConstraintRule),
    MustInclude(ConstraintRule),
    Prefer(WeightedRule),
    Penalize(WeightedRule),
    Quota(QuotaRule),
}

impl Rule {
    pub fn kind(&self) -> RuleKind {
        match self {
            Rule::Disallow(_) => RuleKind::Disallow,
            Rule::AllowOnly(_) => RuleKind::AllowOnly,
            Rule::MustInclude(_) => RuleKind::MustInclude,
            Rule::Prefer(_) => RuleKind::Prefer,
            Rule::Penalize(_) => RuleKind::Penalize,
            Rule::Quota(_) => RuleKind::Quota,
        }
    }

    pub fn disallow(when: IfClause, then: ThenClause) -> Self {
        Rule::Disallow(ConstraintRule::new(when, then))
    }

    pub fn allow_only(when: IfClause, then: ThenClause) -> Self {
        Rule::AllowOnly(ConstraintRule::new(when, then))
    }

    pub fn must_include(when: IfClause, then: ThenClause) -> Self {
        Rule::MustInclude(ConstraintRule::new(when, then))
    }

    pub fn prefer(when: IfClause, then: ThenClause, weight: f64) -> Self {
        Rule::Prefer(WeightedRule::new(when, then, weight))
    }

    pub fn penalize(when: IfClause, then: ThenClause, weight: f64) -> Self {
        Rule::Penalize(WeightedRule::new(when, then, weight))
    }
}

impl From<QuotaRule> for Rule {
    fn from(q: QuotaRule) -> Self {
        Rule::Quota(q)
    }
}
