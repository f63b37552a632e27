//! Generated rows and their generation-scoped diagnostics.

use std::fmt;

use super::field::Field;
use crate::rules::{QuotaScope, RuleKind};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Output partition a row was generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Rail {
    Learn,
    Scale,
}

/// One creative combination.
///
/// Attribute values hold [`PoolItem`](super::PoolItem) ids; `None` means the
/// attribute's pool had nothing eligible for this generation call.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "PascalCase"))]
pub struct Row {
    pub main_dimension: String,
    pub vertical_value: String,
    pub pattern: Option<String>,
    pub format: Option<String>,
    pub visual_style: Option<String>,
    pub opening: Option<String>,
    pub tone: Option<String>,
    pub talent: Option<String>,
    #[cfg_attr(feature = "serde", serde(rename = "CTA"))]
    pub cta: Option<String>,
    pub proof_device: Option<String>,
    pub spec: Option<String>,
    pub cluster: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub rail: Option<Rail>,
    /// Pinned by the caller; carried through planning untouched.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "std::ops::Not::not")
    )]
    pub locked: bool,
    /// Marked as a hero creative; counted against the per-segment hero cap.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "std::ops::Not::not")
    )]
    pub hero: bool,
    /// Derived per generation pass; not part of the row's identity.
    #[cfg_attr(feature = "serde", serde(default, rename = "__diagnostics"))]
    pub diagnostics: Diagnostics,
}

impl Row {
    pub fn new(main_dimension: impl Into<String>, vertical_value: impl Into<String>) -> Self {
        Self {
            main_dimension: main_dimension.into(),
            vertical_value: vertical_value.into(),
            pattern: None,
            format: None,
            visual_style: None,
            opening: None,
            tone: None,
            talent: None,
            cta: None,
            proof_device: None,
            spec: None,
            cluster: None,
            rail: None,
            locked: false,
            hero: false,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Builder-style setter for one attribute.
    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.set(field, Some(value.into()));
        self
    }

    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    pub fn with_hero(mut self, hero: bool) -> Self {
        self.hero = hero;
        self
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set(&mut self, field: Field, value: Option<String>) {
        *self.slot_mut(field) = value;
    }

    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::Pattern => &self.pattern,
            Field::Format => &self.format,
            Field::VisualStyle => &self.visual_style,
            Field::Opening => &self.opening,
            Field::Tone => &self.tone,
            Field::Talent => &self.talent,
            Field::Cta => &self.cta,
            Field::ProofDevice => &self.proof_device,
            Field::Spec => &self.spec,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Pattern => &mut self.pattern,
            Field::Format => &mut self.format,
            Field::VisualStyle => &mut self.visual_style,
            Field::Opening => &mut self.opening,
            Field::Tone => &mut self.tone,
            Field::Talent => &mut self.talent,
            Field::Cta => &mut self.cta,
            Field::ProofDevice => &mut self.proof_device,
            Field::Spec => &mut self.spec,
        }
    }

    pub fn similarity_key(&self) -> SimilarityKey {
        SimilarityKey {
            vertical_value: self.vertical_value.clone(),
            pattern: self.pattern.clone(),
            format: self.format.clone(),
            visual_style: self.visual_style.clone(),
        }
    }

    /// The row's quota need markers, if any quota flagged its bucket.
    pub fn quota_needs(&self) -> &[QuotaNeed] {
        &self.diagnostics.quota_need
    }
}

/// The (VerticalValue, Pattern, Format, VisualStyle) tuple no two rows of a
/// segment may share.
///
/// Compared field by field, so an unset value never equals an empty one and
/// ids containing the display separator cannot collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimilarityKey {
    pub vertical_value: String,
    pub pattern: Option<String>,
    pub format: Option<String>,
    pub visual_style: Option<String>,
}

/// `VerticalValue|Pattern|Format|VisualStyle`, unset values left empty.
impl fmt::Display for SimilarityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.vertical_value,
            self.pattern.as_deref().unwrap_or(""),
            self.format.as_deref().unwrap_or(""),
            self.visual_style.as_deref().unwrap_or(""),
        )
    }
}

/// Transient annotations attached while generating and ranking.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct Diagnostics {
    /// Display form of the row's [`SimilarityKey`].
    pub sim_key: String,
    /// Delta to the previously selected row of the same segment.
    pub diversity_delta: f64,
    /// Sum of prefer/penalize contributions.
    pub score: f64,
    pub quota: Vec<QuotaMeta>,
    pub quota_need: Vec<QuotaNeed>,
    /// Filled by the final pass; `None` until then.
    pub rules_hit: Option<Vec<RuleHit>>,
}

/// Quota bookkeeping for a row that was kept inside a quota's target group.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct QuotaMeta {
    pub field: Field,
    pub values: Vec<String>,
    pub scope: QuotaScope,
    pub bucket_size: usize,
    pub cap: Option<usize>,
    pub tolerance: usize,
    pub kept: bool,
}

/// Infeasibility signal attached to every row of an under-supplied bucket.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "camelCase"))]
pub enum QuotaNeed {
    /// Fewer target rows than `minPct` requires.
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    MinShare {
        field: Field,
        values: Vec<String>,
        scope: QuotaScope,
        bucket_size: usize,
        min_required: i64,
        current: usize,
        tolerance: usize,
        need: usize,
    },
    /// Fewer distinct values of `field` than `perVerticalMinDistinct`.
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    MinDistinct {
        field: Field,
        values: Vec<String>,
        scope: QuotaScope,
        bucket_size: usize,
        per_vertical_min_distinct: usize,
        current_distinct: usize,
        need: usize,
    },
}

impl QuotaNeed {
    /// How many more rows (or distinct values) the bucket is short.
    pub fn need(&self) -> usize {
        match self {
            QuotaNeed::MinShare { need, .. } | QuotaNeed::MinDistinct { need, .. } => *need,
        }
    }

    pub fn field(&self) -> Field {
        match self {
            QuotaNeed::MinShare { field, .. } | QuotaNeed::MinDistinct { field, .. } => *field,
        }
    }
}

/// A rule that matched and was satisfied by a surviving row.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RuleHit {
    pub kind: RuleKind,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub weight: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_every_field() {
        let mut row = Row::new("Pain Point", "A");
        for (i, f) in Field::ALL.iter().enumerate() {
            assert_eq!(row.get(*f), None);
            row.set(*f, Some(format!("v{i}")));
        }
        for (i, f) in Field::ALL.iter().enumerate() {
            assert_eq!(row.get(*f), Some(format!("v{i}").as_str()));
        }
    }

    #[test]
    fn test_similarity_key() {
        let row = Row::new("Pain Point", "A")
            .with(Field::Pattern, "P")
            .with(Field::VisualStyle, "V")
            .with(Field::Tone, "ignored");
        assert_eq!(row.similarity_key().to_string(), "A|P||V");
        assert_eq!(row.similarity_key().format, None);
    }

    #[test]
    fn test_similarity_key_separator_in_ids() {
        let a = Row::new("Pain Point", "A|B").with(Field::Pattern, "C");
        let b = Row::new("Pain Point", "A").with(Field::Pattern, "B|C");
        assert_eq!(a.similarity_key().to_string(), b.similarity_key().to_string());
        assert_ne!(a.similarity_key(), b.similarity_key());

        let unset = Row::new("Pain Point", "A");
        let empty = Row::new("Pain Point", "A").with(Field::Format, "");
        assert_ne!(unset.similarity_key(), empty.similarity_key());
    }

    #[test]
    fn test_quota_need_accessors() {
        let need = QuotaNeed::MinDistinct {
            field: Field::Opening,
            values: vec![],
            scope: QuotaScope::PerVertical,
            bucket_size: 4,
            per_vertical_min_distinct: 3,
            current_distinct: 1,
            need: 2,
        };
        assert_eq!(need.need(), 2);
        assert_eq!(need.field(), Field::Opening);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_row_serializes_with_original_names() {
        let row = Row::new("Pain Point", "A").with(Field::Cta, "ShopNow");
        let v = serde_json::to_value(&row).unwrap();
        assert_eq!(v["MainDimension"], "Pain Point");
        assert_eq!(v["VerticalValue"], "A");
        assert_eq!(v["CTA"], "ShopNow");
        assert!(v.get("Rail").is_none());
        assert!(v.get("Locked").is_none());

        let back: Row = serde_json::from_value(serde_json::json!({
            "MainDimension": "Pain Point",
            "VerticalValue": "B",
            "Pattern": null, "Format": "Video_PS", "VisualStyle": null,
            "Opening": null, "Tone": null, "Talent": null, "CTA": null,
            "ProofDevice": null, "Spec": null, "Cluster": "Airpost",
            "Locked": true
        }))
        .unwrap();
        assert!(back.locked);
        assert!(!back.hero);
        assert_eq!(back.format.as_deref(), Some("Video_PS"));
    }
}
