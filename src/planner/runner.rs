//! Plan orchestration.

use std::collections::HashSet;

use tracing::{debug, info};

use super::config::PlanRequest;
use super::rails::{split_rails, RailSplit};
use crate::budget::{derive_counts_with_budget, distribute, BudgetDerivation};
use crate::generator::{
    Allocation, GenerationRequest, GenerationResult, GeneratorConfig, GeneratorRunner,
    SegmentReport,
};
use crate::model::{PoolCatalogue, QuotaNeed, Rail, Row, SimilarityKey};
use crate::rules::{Rule, RulePipeline};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Result of a planning call.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct PlanResult {
    /// Locked rows first, then the ranked Learn and Scale rows.
    pub rows: Vec<Row>,
    pub warnings: Vec<String>,
    pub dropped_verticals: Vec<String>,
    pub min_spend_per_variant: f64,
    pub derivation: BudgetDerivation,
    pub rails: RailSplit,
    /// Generator statistics, Learn segments then Scale segments.
    pub segments: Vec<SegmentReport>,
    /// Generated rows dropped because a locked or Learn row already held
    /// their similarity key.
    pub cross_rail_duplicates: usize,
}

impl PlanResult {
    /// Distinct need-more-supply markers across all rows, in first-seen
    /// order.
    pub fn quota_needs(&self) -> Vec<&QuotaNeed> {
        let mut out: Vec<&QuotaNeed> = Vec::new();
        for need in self.rows.iter().flat_map(Row::quota_needs) {
            if !out.contains(&need) {
                out.push(need);
            }
        }
        out
    }

    /// Rows the generator could not fill, over both rails.
    pub fn shortfall(&self) -> usize {
        self.segments
            .iter()
            .map(SegmentReport::shortfall)
            .fold(0usize, usize::saturating_add)
    }

    pub fn rail_rows(&self, rail: Rail) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(move |r| r.rail == Some(rail))
    }
}

/// Sizes, generates and ranks a full plan.
///
/// 1. Budget sizing picks the producible total and the surviving segments.
/// 2. Locked rows are subtracted and the rest is split into Learn and Scale.
/// 3. Each rail spreads its total over the segments and runs the generator;
///    Scale uses `seed + scale_seed_offset`.
/// 4. Rails are generated independently, so a Scale row may repeat a key
///    already used by a Learn or locked row of its segment. Such rows are
///    dropped, keeping similarity keys unique per segment across the whole
///    plan; the plan comes out that many rows short.
/// 5. The merged rows go through one more filter/rank/quota pass and get
///    their rule trace.
///
/// # Examples
///
/// ```
/// use creative_matrix::budget::{BudgetInputs, Segment};
/// use creative_matrix::model::PoolCatalogue;
/// use creative_matrix::planner::{PlanRequest, PlanRunner};
///
/// let request = PlanRequest::new("Pain Point")
///     .with_segments(vec![Segment::new("A", 1.0), Segment::new("B", 1.0)])
///     .with_budget(BudgetInputs::new(40_000.0, 50.0))
///     .with_seed(42);
/// let plan = PlanRunner::run(&request, &PoolCatalogue::standard(), &[]);
///
/// assert_eq!(plan.derivation.ads_total, 20);
/// assert_eq!((plan.rails.learn, plan.rails.scale), (14, 6));
/// assert!(plan.rows.len() <= 20);
/// ```
pub struct PlanRunner;

impl PlanRunner {
    pub fn run(request: &PlanRequest, pools: &PoolCatalogue, rules: &[Rule]) -> PlanResult {
        let request = request.sanitized();

        let derivation = derive_counts_with_budget(
            &request.budget,
            &request.segments,
            request.distribution,
            &request.stage_weights,
        );

        let remaining = derivation
            .ads_total
            .saturating_sub(request.locked_rows.len());
        let rails = split_rails(remaining, request.learn_ratio);

        let learn_request = rail_request(&request, &derivation, rails.learn, Rail::Learn);
        let scale_request = rail_request(&request, &derivation, rails.scale, Rail::Scale);

        let learn_config = request.generator.clone();
        let scale_config = GeneratorConfig {
            seed: request
                .generator
                .seed
                .map(|s| s.wrapping_add(request.scale_seed_offset)),
            ..request.generator.clone()
        };

        let (learn, scale) = run_rails(
            (&learn_request, &learn_config),
            (&scale_request, &scale_config),
            pools,
            rules,
        );

        let mut segments = learn.segments;
        segments.extend(scale.segments);

        let merged: Vec<Row> = learn.rows.into_iter().chain(scale.rows).collect();
        let generated = merged.len();
        let merged = drop_duplicate_keys(&request.locked_rows, merged);
        let cross_rail_duplicates = generated - merged.len();

        let pipeline = RulePipeline::new(rules);
        let mut ranked = pipeline.filter_and_rank(merged);
        pipeline.attach_trace(&mut ranked);

        debug!(
            generated,
            duplicates = cross_rail_duplicates,
            kept = ranked.len(),
            "final rank-and-filter pass"
        );

        let mut rows = request.locked_rows.clone();
        rows.extend(ranked);

        let mut warnings = derivation.warnings.clone();
        warnings.extend(hero_cap_warnings(&rows, request.max_heroes));

        info!(
            ads_total = derivation.ads_total,
            locked = request.locked_rows.len(),
            learn = rails.learn,
            scale = rails.scale,
            rows = rows.len(),
            warnings = warnings.len(),
            "plan generated"
        );

        PlanResult {
            rows,
            warnings,
            dropped_verticals: derivation.dropped_verticals.clone(),
            min_spend_per_variant: derivation.min_spend_per_variant,
            derivation,
            rails,
            segments,
            cross_rail_duplicates,
        }
    }
}

/// Keeps the first row per similarity key, counting locked rows as already
/// placed.
fn drop_duplicate_keys(locked: &[Row], rows: Vec<Row>) -> Vec<Row> {
    let mut seen: HashSet<SimilarityKey> = locked.iter().map(Row::similarity_key).collect();
    rows.into_iter()
        .filter(|row| seen.insert(row.similarity_key()))
        .collect()
}

fn rail_request(
    request: &PlanRequest,
    derivation: &BudgetDerivation,
    total: usize,
    rail: Rail,
) -> GenerationRequest {
    let counts = distribute(
        total,
        &derivation.used_verticals,
        request.distribution,
        &request.stage_weights,
    );
    let allocations = derivation
        .used_verticals
        .iter()
        .zip(counts)
        .map(|(segment, count)| Allocation::new(segment.id.clone(), count))
        .collect();
    GenerationRequest::new(request.main_dimension.clone(), allocations).with_rail(rail)
}

#[cfg(feature = "parallel")]
fn run_rails(
    learn: (&GenerationRequest, &GeneratorConfig),
    scale: (&GenerationRequest, &GeneratorConfig),
    pools: &PoolCatalogue,
    rules: &[Rule],
) -> (GenerationResult, GenerationResult) {
    rayon::join(
        || GeneratorRunner::run(learn.0, pools, rules, learn.1),
        || GeneratorRunner::run(scale.0, pools, rules, scale.1),
    )
}

#[cfg(not(feature = "parallel"))]
fn run_rails(
    learn: (&GenerationRequest, &GeneratorConfig),
    scale: (&GenerationRequest, &GeneratorConfig),
    pools: &PoolCatalogue,
    rules: &[Rule],
) -> (GenerationResult, GenerationResult) {
    (
        GeneratorRunner::run(learn.0, pools, rules, learn.1),
        GeneratorRunner::run(scale.0, pools, rules, scale.1),
    )
}

/// One warning per segment holding more hero rows than `max_heroes`.
fn hero_cap_warnings(rows: &[Row], max_heroes: usize) -> Vec<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for row in rows.iter().filter(|r| r.hero) {
        match counts.iter_mut().find(|(v, _)| *v == row.vertical_value) {
            Some((_, n)) => *n += 1,
            None => counts.push((row.vertical_value.as_str(), 1)),
        }
    }
    counts
        .into_iter()
        .filter(|&(_, n)| n > max_heroes)
        .map(|(v, n)| format!("Hero cap exceeded in {v}: {n} > {max_heroes}"))
        .collect()
}
