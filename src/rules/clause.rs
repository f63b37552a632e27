//! IF/THEN clauses and the clause matcher.
//!
//! Matching is total: a missing row value, an unknown operator or a value of
//! the wrong shape simply fails to match. Nothing in here can error.

use std::collections::BTreeMap;

use crate::model::{Field, Row};

#[cfg(feature = "serde")]
use serde::{
    de::DeserializeOwned, ser::SerializeMap, Deserialize, Deserializer, Serialize, Serializer,
};

/// Comparison operator of a clause condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum Op {
    Equals,
    OneOf,
    StartsWith,
    /// Any operator name not recognized. Never matches.
    #[cfg_attr(feature = "serde", serde(other))]
    Unknown,
}

/// A condition value: a single id or a list of ids.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ClauseValue {
    One(String),
    Many(Vec<String>),
}

impl ClauseValue {
    fn contains(&self, actual: &str) -> bool {
        match self {
            ClauseValue::One(v) => v == actual,
            ClauseValue::Many(vs) => vs.iter().any(|v| v == actual),
        }
    }
}

/// `actual <op> value`. A missing `actual` never matches.
pub fn matches_op(actual: Option<&str>, op: Op, value: &ClauseValue) -> bool {
    let Some(actual) = actual else {
        return false;
    };
    match (op, value) {
        (Op::Equals, ClauseValue::One(v)) => actual == v,
        (Op::OneOf, v) => v.contains(actual),
        (Op::StartsWith, ClauseValue::One(prefix)) => actual.starts_with(prefix.as_str()),
        _ => false,
    }
}

/// `{op, value}` condition used in IF clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Condition {
    pub op: Op,
    pub value: ClauseValue,
}

impl Condition {
    pub fn equals(value: impl Into<String>) -> Self {
        Self {
            op: Op::Equals,
            value: ClauseValue::One(value.into()),
        }
    }

    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            op: Op::OneOf,
            value: ClauseValue::Many(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn starts_with(prefix: impl Into<String>) -> Self {
        Self {
            op: Op::StartsWith,
            value: ClauseValue::One(prefix.into()),
        }
    }

    /// A condition that cannot match anything.
    pub fn never() -> Self {
        Self {
            op: Op::Unknown,
            value: ClauseValue::Many(Vec::new()),
        }
    }

    pub fn is_satisfied_by(&self, actual: Option<&str>) -> bool {
        matches_op(actual, self.op, &self.value)
    }
}

/// Conditions keyed by field; every condition must hold (AND).
///
/// An empty clause matches every row. A key that names no field reads as a
/// value no row carries, so a clause holding one matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IfClause {
    conditions: BTreeMap<Field, Condition>,
    unknown: Vec<String>,
}

impl IfClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, condition: Condition) -> Self {
        self.conditions.insert(field, condition);
        self
    }

    /// Records a key that is not a field name.
    pub fn with_unknown_key(mut self, key: impl Into<String>) -> Self {
        self.unknown.push(key.into());
        self
    }

    pub fn unknown_keys(&self) -> &[String] {
        &self.unknown
    }

    /// No keys at all, recognized or not.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.unknown.is_empty()
    }

    /// Number of field conditions.
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &Condition)> {
        self.conditions.iter().map(|(f, c)| (*f, c))
    }
}

/// Tests `row` against an IF clause.
pub fn matches(row: &Row, clause: &IfClause) -> bool {
    clause.unknown.is_empty()
        && clause
            .iter()
            .all(|(field, cond)| cond.is_satisfied_by(row.get(field)))
}

/// A THEN entry for one field.
///
/// Several spellings are accepted: `{oneOf: [...]}`, `{startsWith: "..."}`
/// and `{op, value}`. How they combine depends on the rule kind; see
/// [`ThenCondition::matches_any`] and [`ThenCondition::permits`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct ThenCondition {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub op: Option<Op>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub value: Option<ClauseValue>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub one_of: Option<Vec<String>>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub starts_with: Option<String>,
}

impl ThenCondition {
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            one_of: Some(values.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn starts_with(prefix: impl Into<String>) -> Self {
        Self {
            starts_with: Some(prefix.into()),
            ..Self::default()
        }
    }

    pub fn from_condition(condition: Condition) -> Self {
        Self {
            op: Some(condition.op),
            value: Some(condition.value),
            ..Self::default()
        }
    }

    fn op_matches(&self, actual: &str) -> Option<bool> {
        match (self.op, &self.value) {
            (Some(op), Some(value)) => Some(matches_op(Some(actual), op, value)),
            _ => None,
        }
    }

    /// True when any written form matches `actual`.
    pub fn matches_any(&self, actual: &str) -> bool {
        self.one_of
            .as_ref()
            .is_some_and(|vs| vs.iter().any(|v| v == actual))
            || self
                .starts_with
                .as_ref()
                .is_some_and(|p| actual.starts_with(p.as_str()))
            || self.op_matches(actual).unwrap_or(false)
    }

    /// Checks the first written form, by precedence oneOf, startsWith,
    /// op/value. With no form at all any present value is permitted.
    pub fn permits(&self, actual: &str) -> bool {
        if let Some(vs) = &self.one_of {
            vs.iter().any(|v| v == actual)
        } else if let Some(prefix) = &self.starts_with {
            actual.starts_with(prefix.as_str())
        } else {
            self.op_matches(actual).unwrap_or(true)
        }
    }
}

/// THEN entries keyed by field.
///
/// Keys that name no field are kept so the clause is not mistaken for an
/// empty one, but no evaluator ever satisfies or rejects on them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThenClause {
    conditions: BTreeMap<Field, ThenCondition>,
    unknown: Vec<String>,
}

impl ThenClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, condition: ThenCondition) -> Self {
        self.conditions.insert(field, condition);
        self
    }

    /// Records a key that is not a field name.
    pub fn with_unknown_key(mut self, key: impl Into<String>) -> Self {
        self.unknown.push(key.into());
        self
    }

    pub fn unknown_keys(&self) -> &[String] {
        &self.unknown
    }

    /// No keys at all, recognized or not.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.unknown.is_empty()
    }

    /// Number of field entries.
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &ThenCondition)> {
        self.conditions.iter().map(|(f, c)| (*f, c))
    }
}

// Clause maps are read leniently: keys that are not field names are set
// aside, and entries of the wrong shape degrade instead of failing the whole
// document.
#[cfg(feature = "serde")]
fn lenient_entries<T, F>(
    raw: Option<BTreeMap<String, serde_json::Value>>,
    on_bad_entry: F,
) -> (BTreeMap<Field, T>, Vec<String>)
where
    T: DeserializeOwned,
    F: Fn() -> T,
{
    let mut entries = BTreeMap::new();
    let mut unknown = Vec::new();
    for (key, value) in raw.unwrap_or_default() {
        match key.parse::<Field>() {
            Ok(field) => {
                let entry = serde_json::from_value(value).unwrap_or_else(|_| on_bad_entry());
                entries.insert(field, entry);
            }
            Err(_) => unknown.push(key),
        }
    }
    (entries, unknown)
}

#[cfg(feature = "serde")]
fn serialize_entries<S, T>(
    serializer: S,
    entries: &BTreeMap<Field, T>,
    unknown: &[String],
    placeholder: &T,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    let mut map = serializer.serialize_map(Some(entries.len() + unknown.len()))?;
    for (field, entry) in entries {
        map.serialize_entry(field.as_str(), entry)?;
    }
    for key in unknown {
        map.serialize_entry(key, placeholder)?;
    }
    map.end()
}

#[cfg(feature = "serde")]
impl Serialize for IfClause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_entries(serializer, &self.conditions, &self.unknown, &Condition::never())
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for IfClause {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;
        let (conditions, unknown) = lenient_entries(raw, Condition::never);
        Ok(Self { conditions, unknown })
    }
}

#[cfg(feature = "serde")]
impl Serialize for ThenClause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_entries(serializer, &self.conditions, &self.unknown, &ThenCondition::default())
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for ThenClause {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;
        let (conditions, unknown) = lenient_entries(raw, ThenCondition::default);
        Ok(Self { conditions, unknown })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        Row::new("Pain Point", "A")
            .with(Field::Pattern, "ProblemSolution")
            .with(Field::Format, "Static_SP")
            .with(Field::Opening, "VOFirst")
    }

    #[test]
    fn test_empty_clause_matches() {
        assert!(matches(&row(), &IfClause::new()));
        assert!(matches(&Row::new("x", "y"), &IfClause::new()));
    }

    #[test]
    fn test_equals() {
        let c = IfClause::new().with(Field::Opening, Condition::equals("VOFirst"));
        assert!(matches(&row(), &c));
        let c = IfClause::new().with(Field::Opening, Condition::equals("VO"));
        assert!(!matches(&row(), &c));
    }

    #[test]
    fn test_one_of_and_scalar_one_of() {
        let c = IfClause::new().with(Field::Format, Condition::one_of(["Video_PS", "Static_SP"]));
        assert!(matches(&row(), &c));

        let scalar = Condition {
            op: Op::OneOf,
            value: ClauseValue::One("Static_SP".into()),
        };
        assert!(matches(&row(), &IfClause::new().with(Field::Format, scalar)));
    }

    #[test]
    fn test_starts_with() {
        let c = IfClause::new().with(Field::Format, Condition::starts_with("Static_"));
        assert!(matches(&row(), &c));
        let c = IfClause::new().with(Field::Format, Condition::starts_with("UGC"));
        assert!(!matches(&row(), &c));
    }

    #[test]
    fn test_all_fields_must_hold() {
        let c = IfClause::new()
            .with(Field::Opening, Condition::equals("VOFirst"))
            .with(Field::Pattern, Condition::equals("Comparison"));
        assert!(!matches(&row(), &c));
    }

    #[test]
    fn test_missing_value_fails() {
        let c = IfClause::new().with(Field::Tone, Condition::one_of(["Urgent"]));
        assert!(!matches(&row(), &c));
    }

    #[test]
    fn test_unknown_op_never_matches() {
        let c = IfClause::new().with(Field::Opening, Condition::never());
        assert!(!matches(&row(), &c));
        let bad = Condition {
            op: Op::Equals,
            value: ClauseValue::Many(vec!["VOFirst".into()]),
        };
        assert!(!matches(&row(), &IfClause::new().with(Field::Opening, bad)));
    }

    #[test]
    fn test_then_forms() {
        let any = ThenCondition {
            one_of: Some(vec!["X".into()]),
            starts_with: Some("Sta".into()),
            ..ThenCondition::default()
        };
        assert!(any.matches_any("Static_SP"));
        // precedence: oneOf is the only form consulted
        assert!(!any.permits("Static_SP"));

        let empty = ThenCondition::default();
        assert!(!empty.matches_any("anything"));
        assert!(empty.permits("anything"));

        let op = ThenCondition::from_condition(Condition::equals("A"));
        assert!(op.matches_any("A") && op.permits("A"));
        assert!(!op.matches_any("B") && !op.permits("B"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_lenient_deserialize() {
        let json = r#"{
            "Opening": {"op": "equals", "value": "VOFirst"},
            "Format": {"op": "regex", "value": "x"},
            "oneOf": ["ignored"],
            "Tone": 42
        }"#;
        let c: IfClause = serde_json::from_str(json).unwrap();
        assert_eq!(c.len(), 3);
        assert_eq!(c.unknown_keys(), ["oneOf".to_string()]);
        // unknown operator and malformed entry both refuse to match
        let r = row().with(Field::Tone, "Urgent");
        assert!(!matches(&r, &c));

        let only_opening: IfClause =
            serde_json::from_str(r#"{"Opening": {"op": "equals", "value": "VOFirst"}}"#).unwrap();
        assert!(matches(&r, &only_opening));

        let null: IfClause = serde_json::from_str("null").unwrap();
        assert!(null.is_empty());
    }

    #[test]
    fn test_unknown_if_key_never_matches() {
        let c = IfClause::new().with_unknown_key("Formatt");
        assert!(!c.is_empty());
        assert_eq!(c.len(), 0);
        assert!(!matches(&row(), &c));
        assert!(!matches(&Row::new("x", "y"), &c));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_misspelled_if_key_survives_roundtrip() {
        let c: IfClause =
            serde_json::from_str(r#"{"Formatt": {"op": "equals", "value": "Static_SP"}}"#).unwrap();
        assert!(!matches(&row(), &c));

        let json = serde_json::to_string(&c).unwrap();
        let back: IfClause = serde_json::from_str(&json).unwrap();
        assert_eq!(back.unknown_keys(), ["Formatt".to_string()]);
        assert!(!matches(&row(), &back));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_then_unknown_keys_kept_aside() {
        let t: ThenClause = serde_json::from_str(r#"{"Formatt": {"oneOf": ["x"]}}"#).unwrap();
        assert!(!t.is_empty());
        assert_eq!(t.len(), 0);
        assert_eq!(serde_json::to_string(&t).unwrap(), r#"{"Formatt":{}}"#);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_then_deserialize_forms() {
        let json = r#"{"Format": {"oneOf": ["Static_SP"]}, "Spec": {"startsWith": "9"}}"#;
        let t: ThenClause = serde_json::from_str(json).unwrap();
        let entries: Vec<_> = t.iter().collect();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].1.matches_any("Static_SP"));
        assert!(entries[1].1.matches_any("9:16"));
    }
}
