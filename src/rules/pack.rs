//! Rule packs: assembly, legacy documents and run-time modifiers.
//!
//! The generator never reads packs from storage. Callers load the global,
//! brand and run-override rules, merge them here and hand the effective
//! pack to a generation call as an immutable snapshot.

use std::collections::BTreeMap;

use tracing::debug;

use super::clause::{Condition, IfClause, ThenClause, ThenCondition};
use super::types::{QuotaRule, Rule};
use crate::model::Field;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where a pack comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum PackScope {
    #[default]
    Global,
    Brand,
    /// Transient overrides for a single run.
    Run,
    /// Assembled for one generation call.
    Effective,
}

/// An ordered list of rules.
///
/// Order only affects trace readability and quota application order; no
/// deduplication is ever performed.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RulePack {
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub scope: PackScope,
    #[cfg_attr(feature = "serde", serde(default))]
    pub rules: Vec<Rule>,
}

impl RulePack {
    pub fn new(name: impl Into<String>, scope: PackScope, rules: Vec<Rule>) -> Self {
        Self {
            name: name.into(),
            scope,
            rules,
        }
    }

    pub fn with_rule(mut self, rule: impl Into<Rule>) -> Self {
        self.rules.push(rule.into());
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Concatenates global, brand and run rules, in that order.
    pub fn merge(global: &RulePack, brand: &RulePack, run: &[Rule]) -> RulePack {
        debug!(
            global = global.len(),
            brand = brand.len(),
            run = run.len(),
            "assembling effective rule pack"
        );
        let rules = global
            .rules
            .iter()
            .chain(&brand.rules)
            .chain(run)
            .cloned()
            .collect();
        RulePack::new("effective", PackScope::Effective, rules)
    }

    /// Returns a copy with `modifiers` applied.
    pub fn modified(&self, modifiers: &RunModifiers) -> RulePack {
        RulePack {
            name: self.name.clone(),
            scope: self.scope,
            rules: modifiers.apply(&self.rules),
        }
    }
}

impl From<LegacyRules> for RulePack {
    fn from(legacy: LegacyRules) -> Self {
        RulePack::new("legacy", PackScope::Brand, legacy.into_rules())
    }
}

/// A disallow entry of the legacy pack shape: equality conditions under
/// `when`, forbidden ids per field under `thenNot`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct LegacyDisallow {
    pub when: BTreeMap<String, String>,
    pub then_not: BTreeMap<String, Vec<String>>,
}

/// An allowOnly entry of the legacy pack shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct LegacyAllowOnly {
    pub when: BTreeMap<String, String>,
    pub then_only: BTreeMap<String, Vec<String>>,
}

/// Legacy `{disallow: [...], allowOnly: [...]}` document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct LegacyRules {
    pub disallow: Vec<LegacyDisallow>,
    pub allow_only: Vec<LegacyAllowOnly>,
}

impl LegacyRules {
    /// Compatibility rules shipped with the standard pool catalogue.
    pub fn standard() -> Self {
        fn map<V: Clone>(pairs: &[(&str, V)]) -> BTreeMap<String, V> {
            pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
        }
        fn ids(values: &[&str]) -> Vec<String> {
            values.iter().map(|v| v.to_string()).collect()
        }
        let no_statics = || map(&[("Format", ids(&["Static_SP", "Static_MR"]))]);

        Self {
            disallow: vec![
                LegacyDisallow {
                    when: map(&[("Opening", "VOFirst".to_string())]),
                    then_not: no_statics(),
                },
                LegacyDisallow {
                    when: map(&[("Opening", "AppHUD".to_string())]),
                    then_not: map(&[("VisualStyle", ids(&["MacroProduct"]))]),
                },
                LegacyDisallow {
                    when: map(&[("ProofDevice", "ScreenCapture".to_string())]),
                    then_not: no_statics(),
                },
            ],
            allow_only: vec![LegacyAllowOnly {
                when: map(&[("Pattern", "TestimonialStory".to_string())]),
                then_only: map(&[(
                    "Format",
                    ids(&["UGC_3ReasonsWhy", "UGC_FlipTheScript", "Video_PS"]),
                )]),
            }],
        }
    }

    /// Materializes every entry as an ordinary rule: disallows first, then
    /// allowOnlys.
    ///
    /// A `when` key that is not a field name makes the entry match nothing.
    /// `thenNot` / `thenOnly` keys that are not field names are dropped. A
    /// disallow only rejects on a listed value, so an entry listing none is
    /// skipped rather than turned into an IF-only rule.
    pub fn into_rules(self) -> Vec<Rule> {
        let disallow = self.disallow.into_iter().filter_map(|d| {
            let then = legacy_then(&d.then_not);
            let lists_any = then
                .iter()
                .any(|(_, c)| c.one_of.as_ref().is_some_and(|vs| !vs.is_empty()));
            if !lists_any {
                debug!(when = ?d.when, "skipping legacy disallow without thenNot values");
                return None;
            }
            Some(Rule::disallow(legacy_when(&d.when), then))
        });
        let allow_only = self
            .allow_only
            .into_iter()
            .map(|a| Rule::allow_only(legacy_when(&a.when), legacy_then(&a.then_only)));
        disallow.chain(allow_only).collect()
    }
}

fn legacy_when(when: &BTreeMap<String, String>) -> IfClause {
    when.iter().fold(IfClause::new(), |c, (k, v)| match k.parse::<Field>() {
        Ok(field) => c.with(field, Condition::equals(v.clone())),
        Err(_) => c.with_unknown_key(k.clone()),
    })
}

fn legacy_then(then: &BTreeMap<String, Vec<String>>) -> ThenClause {
    then.iter()
        .filter_map(|(k, v)| Some((k.parse::<Field>().ok()?, v)))
        .fold(ThenClause::new(), |c, (f, v)| {
            c.with(f, ThenCondition::one_of(v.iter().cloned()))
        })
}

/// Disables quotas on `field`; when `values` is non-empty only quotas
/// targeting at least one of them.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisabledQuota {
    pub field: Field,
    #[cfg_attr(feature = "serde", serde(default))]
    pub values: Vec<String>,
}

impl DisabledQuota {
    fn covers(&self, quota: &QuotaRule) -> bool {
        if quota.field != self.field {
            return false;
        }
        if self.values.is_empty() {
            return true;
        }
        quota
            .target_values()
            .iter()
            .any(|v| self.values.contains(v))
    }
}

/// Session-level adjustments applied to the effective pack before a run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct RunModifiers {
    /// Multiplier for every prefer/penalize weight.
    pub soft_weight_scale: f64,
    pub disabled_quotas: Vec<DisabledQuota>,
}

impl Default for RunModifiers {
    fn default() -> Self {
        Self {
            soft_weight_scale: 1.0,
            disabled_quotas: Vec::new(),
        }
    }
}

impl RunModifiers {
    pub fn with_soft_weight_scale(mut self, scale: f64) -> Self {
        self.soft_weight_scale = scale;
        self
    }

    pub fn with_disabled_quota(mut self, field: Field, values: Vec<String>) -> Self {
        self.disabled_quotas.push(DisabledQuota { field, values });
        self
    }

    /// Drops disabled quotas and rescales soft weights. Scaled weights are
    /// clamped to `[-1, 1]` and rounded to 4 decimals.
    pub fn apply(&self, rules: &[Rule]) -> Vec<Rule> {
        let scale = if self.soft_weight_scale.is_finite() {
            self.soft_weight_scale
        } else {
            1.0
        };

        rules
            .iter()
            .filter(|rule| match rule {
                Rule::Quota(q) => !self.disabled_quotas.iter().any(|d| d.covers(q)),
                _ => true,
            })
            .cloned()
            .map(|rule| match rule {
                Rule::Prefer(mut r) => {
                    r.weight = scale_weight(r.weight, scale);
                    Rule::Prefer(r)
                }
                Rule::Penalize(mut r) => {
                    r.weight = scale_weight(r.weight, scale);
                    Rule::Penalize(r)
                }
                other => other,
            })
            .collect()
    }
}

fn scale_weight(weight: f64, scale: f64) -> f64 {
    let w = if weight.is_finite() { weight } else { 0.0 };
    ((w * scale * 10_000.0).round() / 10_000.0).clamp(-1.0, 1.0)
}

#[cfg(feature = "serde")]
mod json {
    use super::*;
    use crate::error::{Error, Result};
    use serde_json::Value;
    use tracing::warn;

    impl RulePack {
        /// Reads a rule-pack document.
        ///
        /// Accepted shapes: `{name, scope, rules: [...]}`, a bare rule
        /// array, and the legacy `{disallow, allowOnly}` object. Individual
        /// rules that cannot be read are skipped with a warning; only a
        /// document that is not JSON, or has none of these shapes, errors.
        pub fn from_json(text: &str) -> Result<RulePack> {
            let doc: Value = serde_json::from_str(text)?;
            RulePack::from_value(doc)
        }

        pub fn from_value(doc: Value) -> Result<RulePack> {
            match doc {
                Value::Array(items) => Ok(RulePack::new("", PackScope::Global, read_rules(items))),
                Value::Object(mut map) => {
                    if let Some(Value::Array(items)) = map.remove("rules") {
                        let name = map
                            .get("name")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string();
                        let scope = map
                            .remove("scope")
                            .and_then(|s| serde_json::from_value(s).ok())
                            .unwrap_or_default();
                        Ok(RulePack::new(name, scope, read_rules(items)))
                    } else if map.contains_key("disallow") || map.contains_key("allowOnly") {
                        let legacy: LegacyRules = serde_json::from_value(Value::Object(map))?;
                        Ok(RulePack::from(legacy))
                    } else {
                        Err(Error::UnrecognizedPack(
                            "expected `rules`, `disallow` or `allowOnly`".into(),
                        ))
                    }
                }
                other => Err(Error::UnrecognizedPack(format!(
                    "expected an object or array, found {}",
                    kind_of(&other)
                ))),
            }
        }
    }

    fn read_rules(items: Vec<Value>) -> Vec<Rule> {
        items
            .into_iter()
            .enumerate()
            .filter_map(|(idx, item)| match serde_json::from_value::<Rule>(item) {
                Ok(rule) => Some(rule),
                Err(err) => {
                    warn!(index = idx, error = %err, "skipping malformed rule");
                    None
                }
            })
            .collect()
    }

    fn kind_of(v: &Value) -> &'static str {
        match v {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Array(_) => "an array",
            Value::Object(_) => "an object",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::types::{QuotaScope, RuleKind, WeightedRule};

    fn prefer(weight: f64) -> Rule {
        Rule::Prefer(WeightedRule::new(IfClause::new(), ThenClause::new(), weight))
    }

    #[test]
    fn test_merge_order_without_dedup() {
        let global = RulePack::new("g", PackScope::Global, vec![prefer(0.1)]);
        let brand = RulePack::new("b", PackScope::Brand, vec![prefer(0.2), prefer(0.1)]);
        let run = vec![prefer(0.3)];
        let merged = RulePack::merge(&global, &brand, &run);

        let weights: Vec<f64> = merged
            .rules
            .iter()
            .map(|r| match r {
                Rule::Prefer(w) => w.weight,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(weights, vec![0.1, 0.2, 0.1, 0.3]);
        assert_eq!(merged.scope, PackScope::Effective);
    }

    #[test]
    fn test_legacy_conversion() {
        let legacy = LegacyRules {
            disallow: vec![LegacyDisallow {
                when: BTreeMap::from([("Opening".to_string(), "VOFirst".to_string())]),
                then_not: BTreeMap::from([(
                    "Format".to_string(),
                    vec!["Static_SP".to_string(), "Static_MR".to_string()],
                )]),
            }],
            allow_only: vec![LegacyAllowOnly {
                when: BTreeMap::from([
                    ("Pattern".to_string(), "TestimonialStory".to_string()),
                    ("Bogus".to_string(), "x".to_string()),
                ]),
                then_only: BTreeMap::from([("Format".to_string(), vec!["Video_PS".to_string()])]),
            }],
        };
        let pack = RulePack::from(legacy);
        assert_eq!(pack.len(), 2);
        assert_eq!(
            pack.rules[0],
            Rule::disallow(
                IfClause::new().with(Field::Opening, Condition::equals("VOFirst")),
                ThenClause::new()
                    .with(Field::Format, ThenCondition::one_of(["Static_SP", "Static_MR"])),
            )
        );
        match &pack.rules[1] {
            Rule::AllowOnly(r) => {
                assert_eq!(r.when.len(), 1);
                assert_eq!(r.when.unknown_keys(), ["Bogus".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_legacy_disallow_without_values_never_blocks() {
        use crate::model::Row;

        let when = BTreeMap::from([("Opening".to_string(), "VOFirst".to_string())]);
        let legacy = LegacyRules {
            disallow: vec![
                LegacyDisallow {
                    when: when.clone(),
                    then_not: BTreeMap::new(),
                },
                LegacyDisallow {
                    when: when.clone(),
                    then_not: BTreeMap::from([("Formatt".to_string(), vec!["Video_PS".to_string()])]),
                },
                LegacyDisallow {
                    when,
                    then_not: BTreeMap::from([("Format".to_string(), Vec::new())]),
                },
            ],
            allow_only: Vec::new(),
        };
        let rules = legacy.into_rules();
        assert!(rules.is_empty());

        let row = Row::new("Pain Point", "A")
            .with(Field::Opening, "VOFirst")
            .with(Field::Format, "Video_PS");
        assert!(!rules.iter().any(|r| crate::rules::violates(&row, r)));
    }

    #[test]
    fn test_legacy_unknown_when_key_matches_nothing() {
        use crate::model::Row;

        let legacy = LegacyRules {
            disallow: vec![LegacyDisallow {
                when: BTreeMap::from([("Openin".to_string(), "VOFirst".to_string())]),
                then_not: BTreeMap::from([("Format".to_string(), vec!["Static_SP".to_string()])]),
            }],
            allow_only: Vec::new(),
        };
        let rules = legacy.into_rules();
        assert_eq!(rules.len(), 1);

        let row = Row::new("Pain Point", "A")
            .with(Field::Opening, "VOFirst")
            .with(Field::Format, "Static_SP");
        assert!(!crate::rules::violates(&row, &rules[0]));
    }

    #[test]
    fn test_standard_legacy_rules() {
        use crate::model::Row;

        let rules = LegacyRules::standard().into_rules();
        assert_eq!(rules.len(), 4);
        assert!(matches!(rules[3], Rule::AllowOnly(_)));

        let blocked = |row: &Row| rules.iter().any(|r| crate::rules::violates(row, r));

        let row = Row::new("Pain Point", "Price")
            .with(Field::Opening, "AppHUD")
            .with(Field::VisualStyle, "MacroProduct");
        assert!(blocked(&row));

        let row = Row::new("Pain Point", "Price")
            .with(Field::Pattern, "TestimonialStory")
            .with(Field::Format, "Video_PS");
        assert!(!blocked(&row));

        let row = Row::new("Pain Point", "Price")
            .with(Field::Pattern, "TestimonialStory")
            .with(Field::Format, "Static_SP");
        assert!(blocked(&row));
    }

    #[test]
    fn test_modifiers_scale_and_clamp() {
        let rules = vec![
            prefer(0.6),
            Rule::Penalize(WeightedRule::new(IfClause::new(), ThenClause::new(), 0.123456)),
            Rule::disallow(IfClause::new(), ThenClause::new()),
        ];
        let out = RunModifiers::default().with_soft_weight_scale(2.0).apply(&rules);
        match (&out[0], &out[1]) {
            (Rule::Prefer(a), Rule::Penalize(b)) => {
                assert!((a.weight - 1.0).abs() < 1e-10);
                assert!((b.weight - 0.2469).abs() < 1e-10);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(out[2].kind(), RuleKind::Disallow);

        let same = RunModifiers::default()
            .with_soft_weight_scale(f64::NAN)
            .apply(&rules[..1]);
        assert_eq!(same, rules[..1].to_vec());
    }

    #[test]
    fn test_modifiers_disable_quotas() {
        let rules: Vec<Rule> = vec![
            QuotaRule::new(Field::Format).with_one_of(["Static_SP", "Static_MR"]).into(),
            QuotaRule::new(Field::Format).with_value("Video_PS").into(),
            QuotaRule::new(Field::Opening)
                .with_scope(QuotaScope::PerVertical)
                .with_per_vertical_min_distinct(2)
                .into(),
            prefer(0.5),
        ];

        let by_value = RunModifiers::default()
            .with_disabled_quota(Field::Format, vec!["Static_MR".into()])
            .apply(&rules);
        assert_eq!(by_value.len(), 3);
        assert_eq!(by_value[0], rules[1]);

        let by_field = RunModifiers::default()
            .with_disabled_quota(Field::Opening, vec![])
            .apply(&rules);
        assert_eq!(by_field.len(), 3);
        assert!(by_field.iter().all(|r| match r {
            Rule::Quota(q) => q.field == Field::Format,
            _ => true,
        }));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_json_pack_shape_skips_bad_rules() {
        let text = r#"{
            "name": "Global Rules v2",
            "scope": "global",
            "rules": [
                {"type": "disallow", "if": {"Opening": {"op": "equals", "value": "AppHUD"}},
                 "then": {"VisualStyle": {"oneOf": ["MacroProduct"]}}},
                {"type": "teleport", "if": {}},
                {"type": "quota", "field": "Nope"},
                {"type": "penalize", "if": {}, "then": {"Tone": {"oneOf": ["Humorous"]}}, "weight": 0.2}
            ]
        }"#;
        let pack = RulePack::from_json(text).unwrap();
        assert_eq!(pack.name, "Global Rules v2");
        assert_eq!(pack.scope, PackScope::Global);
        let kinds: Vec<RuleKind> = pack.rules.iter().map(Rule::kind).collect();
        assert_eq!(kinds, vec![RuleKind::Disallow, RuleKind::Penalize]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_json_legacy_and_array() {
        let legacy = r#"{"disallow": [{"when": {"ProofDevice": "ScreenCapture"},
                                      "thenNot": {"Format": ["Static_SP"]}}]}"#;
        let pack = RulePack::from_json(legacy).unwrap();
        assert_eq!(pack.len(), 1);
        assert_eq!(pack.rules[0].kind(), RuleKind::Disallow);

        let array = r#"[{"type": "mustInclude", "if": {}, "then": {"CTA": {"oneOf": ["ShopNow"]}}}]"#;
        let pack = RulePack::from_json(array).unwrap();
        assert_eq!(pack.rules[0].kind(), RuleKind::MustInclude);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_misspelled_if_field_does_not_block() {
        use crate::model::Row;

        let text = r#"[{"type": "disallow", "if": {"Formatt": {"op": "equals", "value": "Static_SP"}}}]"#;
        let pack = RulePack::from_json(text).unwrap();
        assert_eq!(pack.len(), 1);

        for format in ["Video_PS", "Static_SP"] {
            let row = Row::new("Pain Point", "A").with(Field::Format, format);
            assert!(!crate::rules::violates(&row, &pack.rules[0]));
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_json_legacy_empty_then_not_is_skipped() {
        let text = r#"{"disallow": [{"when": {"Opening": "VOFirst"}, "thenNot": {}}]}"#;
        let pack = RulePack::from_json(text).unwrap();
        assert!(pack.is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_json_rejects_unknown_documents() {
        assert!(RulePack::from_json("not json").is_err());
        assert!(RulePack::from_json("42").is_err());
        assert!(RulePack::from_json(r#"{"hello": 1}"#).is_err());
    }
}
