//! Attribute names a row can carry.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One creative attribute of a [`Row`](super::Row).
///
/// The closed set of names rule clauses, quotas, variety levels and pools
/// are keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Field {
    Pattern,
    Format,
    VisualStyle,
    Opening,
    Tone,
    Talent,
    #[cfg_attr(feature = "serde", serde(rename = "CTA"))]
    Cta,
    ProofDevice,
    Spec,
}

impl Field {
    /// All fields, in candidate draw order.
    pub const ALL: [Field; 9] = [
        Field::Pattern,
        Field::Format,
        Field::VisualStyle,
        Field::Opening,
        Field::Tone,
        Field::Talent,
        Field::Cta,
        Field::ProofDevice,
        Field::Spec,
    ];

    /// Fields that contribute to the pairwise diversity delta.
    pub const DIVERSITY: [Field; 7] = [
        Field::Pattern,
        Field::Format,
        Field::VisualStyle,
        Field::Opening,
        Field::Tone,
        Field::Talent,
        Field::Cta,
    ];

    /// Canonical name, as used in rule-pack documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Pattern => "Pattern",
            Field::Format => "Format",
            Field::VisualStyle => "VisualStyle",
            Field::Opening => "Opening",
            Field::Tone => "Tone",
            Field::Talent => "Talent",
            Field::Cta => "CTA",
            Field::ProofDevice => "ProofDevice",
            Field::Spec => "Spec",
        }
    }

    /// Position in [`Field::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("unknown field: {s}"))
    }
}
