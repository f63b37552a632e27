//! Generator inputs and results.

use crate::model::{Rail, Row};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rows requested for one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Allocation {
    pub vertical: String,
    pub count: usize,
}

impl Allocation {
    pub fn new(vertical: impl Into<String>, count: usize) -> Self {
        Self {
            vertical: vertical.into(),
            count,
        }
    }
}

/// What one generator call fills.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Label copied into every row's `MainDimension`.
    pub main_dimension: String,
    pub allocations: Vec<Allocation>,
    pub rail: Option<Rail>,
}

impl GenerationRequest {
    pub fn new(main_dimension: impl Into<String>, allocations: Vec<Allocation>) -> Self {
        Self {
            main_dimension: main_dimension.into(),
            allocations,
            rail: None,
        }
    }

    pub fn with_rail(mut self, rail: Rail) -> Self {
        self.rail = Some(rail);
        self
    }

    /// Total rows asked for, saturating at `usize::MAX`.
    pub fn total(&self) -> usize {
        self.allocations
            .iter()
            .fold(0usize, |acc, a| acc.saturating_add(a.count))
    }
}

/// Per-segment generation statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SegmentReport {
    pub vertical: String,
    pub need: usize,
    /// Candidate draws made, accepted or not.
    pub attempts: usize,
    /// Unique, hard-compliant candidates collected.
    pub candidates: usize,
    pub selected: usize,
}

impl SegmentReport {
    /// Rows short of `need`.
    pub fn shortfall(&self) -> usize {
        self.need.saturating_sub(self.selected)
    }
}

/// Result of a generator run.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// Selected rows, segment by segment, in selection order.
    pub rows: Vec<Row>,
    pub segments: Vec<SegmentReport>,
}

impl GenerationResult {
    pub fn shortfall(&self) -> usize {
        self.segments
            .iter()
            .map(SegmentReport::shortfall)
            .fold(0usize, usize::saturating_add)
    }
}
