//! Candidate generation loop.

use std::collections::HashSet;

use rand::Rng;
use tracing::{debug, warn};

use super::config::GeneratorConfig;
use super::diversity::diversity_delta;
use super::types::{Allocation, GenerationRequest, GenerationResult, SegmentReport};
use crate::model::{Field, PoolCatalogue, PoolItem, Rail, Row, SimilarityKey};
use crate::random::{choose, pick_n, rng_for};
use crate::rules::{Rule, RulePipeline};

/// Fills segments with unique, rule-compliant, diverse rows.
///
/// Per call, each field's eligible sub-pool is drawn once (size from its
/// variety level). Per segment, candidates are sampled until three times
/// the needed rows are collected or the attempt budget runs out, ranked by
/// the rule pipeline, then walked greedily: a candidate is selected when its
/// diversity delta to the last selected row reaches the diversity target.
///
/// # Examples
///
/// ```
/// use creative_matrix::generator::{Allocation, GenerationRequest, GeneratorConfig, GeneratorRunner};
/// use creative_matrix::model::PoolCatalogue;
///
/// let request = GenerationRequest::new("Pain Point", vec![Allocation::new("A", 4)]);
/// let config = GeneratorConfig::default().with_seed(42);
/// let result = GeneratorRunner::run(&request, &PoolCatalogue::standard(), &[], &config);
///
/// assert!(result.rows.len() <= 4);
/// assert!(result.rows.iter().all(|r| r.vertical_value == "A"));
/// ```
pub struct GeneratorRunner;

impl GeneratorRunner {
    /// Runs with a generator seeded from `config.seed`, or from entropy when
    /// no seed is set.
    pub fn run(
        request: &GenerationRequest,
        pools: &PoolCatalogue,
        rules: &[Rule],
        config: &GeneratorConfig,
    ) -> GenerationResult {
        let mut rng = rng_for(config.seed);
        Self::run_with_rng(request, pools, rules, config, &mut rng)
    }

    /// Runs with a caller-supplied random source.
    pub fn run_with_rng<R: Rng>(
        request: &GenerationRequest,
        pools: &PoolCatalogue,
        rules: &[Rule],
        config: &GeneratorConfig,
        rng: &mut R,
    ) -> GenerationResult {
        let config = config.sanitized();
        let pipeline = RulePipeline::new(rules);

        let sub_pools: [Vec<PoolItem>; 9] = Field::ALL.map(|field| {
            let pool = pools.pool(field);
            pick_n(pool, config.variety.count(field, pool.len()), &mut *rng)
        });

        let mut rows = Vec::new();
        let mut segments = Vec::with_capacity(request.allocations.len());

        for allocation in &request.allocations {
            let (selected, report) = fill_segment(
                allocation,
                &request.main_dimension,
                request.rail,
                &sub_pools,
                &pipeline,
                &config,
                rng,
            );
            rows.extend(selected);
            segments.push(report);
        }

        GenerationResult { rows, segments }
    }
}

fn draw_candidate<R: Rng>(
    main_dimension: &str,
    vertical: &str,
    rail: Option<Rail>,
    sub_pools: &[Vec<PoolItem>; 9],
    rng: &mut R,
) -> Row {
    let mut row = Row::new(main_dimension, vertical);
    for (field, items) in Field::ALL.iter().zip(sub_pools) {
        if let Some(item) = choose(items, rng) {
            row.set(*field, Some(item.id.clone()));
            if *field == Field::Format {
                row.cluster = item.cluster.clone();
            }
        }
    }
    row.rail = rail;
    row
}

/// Number of distinct similarity keys the drawn sub-pools can produce for
/// one segment. An empty sub-pool leaves its attribute unset, which is one
/// key value.
fn distinct_keys(sub_pools: &[Vec<PoolItem>; 9]) -> usize {
    [Field::Pattern, Field::Format, Field::VisualStyle]
        .iter()
        .map(|f| sub_pools[f.index()].len().max(1))
        .fold(1usize, usize::saturating_mul)
}

fn fill_segment<R: Rng>(
    allocation: &Allocation,
    main_dimension: &str,
    rail: Option<Rail>,
    sub_pools: &[Vec<PoolItem>; 9],
    pipeline: &RulePipeline<'_>,
    config: &GeneratorConfig,
    rng: &mut R,
) -> (Vec<Row>, SegmentReport) {
    let need = allocation.count;
    let capped_need = need.min(GeneratorConfig::MAX_ROWS_PER_SEGMENT);
    // No segment can hold more candidates than there are similarity keys.
    let target = capped_need
        .saturating_mul(GeneratorConfig::OVERSAMPLE)
        .min(distinct_keys(sub_pools));
    let max_attempts = capped_need
        .saturating_mul(GeneratorConfig::ATTEMPTS_PER_ROW)
        .max(GeneratorConfig::MIN_ATTEMPTS);

    let mut bucket: Vec<Row> = Vec::with_capacity(target);
    let mut seen: HashSet<SimilarityKey> = HashSet::new();
    let mut attempts = 0usize;

    while bucket.len() < target && attempts < max_attempts {
        attempts += 1;
        let mut row = draw_candidate(main_dimension, &allocation.vertical, rail, sub_pools, rng);

        if config.flags.rejects(&row) || pipeline.violates_hard(&row) {
            continue;
        }
        let key = row.similarity_key();
        if seen.contains(&key) {
            continue;
        }
        row.diagnostics.sim_key = key.to_string();
        seen.insert(key);
        bucket.push(row);
    }

    let candidates = bucket.len();
    if candidates < target {
        warn!(
            vertical = %allocation.vertical,
            attempts,
            candidates,
            target,
            "candidate attempt budget exhausted"
        );
    }

    let ranked = pipeline.filter_and_rank(bucket);

    let mut chosen: Vec<Row> = Vec::with_capacity(need.min(ranked.len()));
    for mut row in ranked {
        if chosen.len() >= need {
            break;
        }
        let delta = match chosen.last() {
            Some(prev) => diversity_delta(prev, &row, &config.impact_weights),
            None => 0.0,
        };
        if !chosen.is_empty() && delta < config.diversity_target {
            continue;
        }
        row.diagnostics.diversity_delta = delta;
        chosen.push(row);
    }

    if chosen.len() < need {
        warn!(
            vertical = %allocation.vertical,
            need,
            selected = chosen.len(),
            "segment filled short"
        );
    }
    debug!(
        vertical = %allocation.vertical,
        need,
        attempts,
        candidates,
        selected = chosen.len(),
        "segment generated"
    );

    let report = SegmentReport {
        vertical: allocation.vertical.clone(),
        need,
        attempts,
        candidates,
        selected: chosen.len(),
    };
    (chosen, report)
}
