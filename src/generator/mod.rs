//! Candidate generator.
//!
//! Samples attribute tuples from variety-limited sub-pools, keeps the ones
//! that pass every hard rule and have a fresh similarity key, ranks them
//! with the rule pipeline and selects a sequence whose consecutive rows
//! differ by at least the diversity target.
//!
//! The diversity delta between two rows is
//! `sum(impact[f] for f in DIVERSITY if a[f] != b[f])`, with default
//! impacts Pattern 0.9, Format 0.85, VisualStyle 0.7, Opening 0.6,
//! Tone 0.6, Talent 0.4, CTA 0.2.

mod config;
mod diversity;
mod runner;
mod types;

pub use config::{
    slider_to_count, GeneratorConfig, ImpactWeights, PipelineFlags, Variety, MAX_VARIETY_LEVEL,
};
pub use diversity::diversity_delta;
pub use runner::GeneratorRunner;
pub use types::{Allocation, GenerationRequest, GenerationResult, SegmentReport};
