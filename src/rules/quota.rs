//! Quota enforcement over a ranked row set.
//!
//! Quotas run in pack order. Each one splits the rows still alive into
//! buckets (one global bucket, or one per vertical value), trims target
//! groups that exceed their cap and flags buckets that fall short of a
//! minimum share or of a distinct-value floor. Trimmed rows are excluded from
//! every later quota and removed from the output at the end.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::types::{QuotaRule, QuotaScope};
use crate::model::{QuotaMeta, QuotaNeed, Row};

/// Applies `quotas` to `rows`, which must already be sorted by descending
/// score. Relative order of surviving rows is preserved.
pub fn apply_quotas<'a, I>(rows: Vec<Row>, quotas: I) -> Vec<Row>
where
    I: IntoIterator<Item = &'a QuotaRule>,
{
    let mut quotas = quotas.into_iter().peekable();
    if quotas.peek().is_none() {
        return rows;
    }

    let mut rows = rows;
    let mut dropped = vec![false; rows.len()];

    for quota in quotas {
        for bucket in buckets(&rows, &dropped, quota.scope) {
            enforce_bucket(&mut rows, &mut dropped, bucket, quota);
        }
    }

    rows.into_iter()
        .zip(dropped)
        .filter_map(|(row, gone)| (!gone).then_some(row))
        .collect()
}

/// Indices of live rows, grouped by scope. Per-vertical buckets come out in
/// order of first appearance.
fn buckets(rows: &[Row], dropped: &[bool], scope: QuotaScope) -> Vec<Vec<usize>> {
    let live = (0..rows.len()).filter(|&i| !dropped[i]);
    match scope {
        QuotaScope::Global => vec![live.collect()],
        QuotaScope::PerVertical => {
            let mut position: HashMap<&str, usize> = HashMap::new();
            let mut out: Vec<Vec<usize>> = Vec::new();
            for i in live {
                let key = rows[i].vertical_value.as_str();
                let slot = *position.entry(key).or_insert_with(|| {
                    out.push(Vec::new());
                    out.len() - 1
                });
                out[slot].push(i);
            }
            out
        }
    }
}

fn enforce_bucket(rows: &mut [Row], dropped: &mut [bool], mut bucket: Vec<usize>, quota: &QuotaRule) {
    let bucket_size = bucket.len();
    if bucket_size == 0 {
        return;
    }

    let field = quota.field;
    let values = quota.target_values();
    let tolerance = quota.effective_tolerance();
    let is_target =
        |row: &Row| row.get(field).is_some_and(|v| values.iter().any(|t| t == v));

    let group: Vec<usize> = bucket
        .iter()
        .copied()
        .filter(|&i| is_target(&rows[i]))
        .collect();

    let cap = quota.cap_for(bucket_size);
    let meta = QuotaMeta {
        field,
        values: values.clone(),
        scope: quota.scope,
        bucket_size,
        cap,
        tolerance,
        kept: true,
    };

    match cap {
        Some(cap) if group.len() > cap + tolerance => {
            let allowed = cap + tolerance;
            // Stable: among equal scores the earlier-ranked row is kept.
            let mut by_score = group;
            by_score.sort_by(|&a, &b| {
                rows[b]
                    .diagnostics
                    .score
                    .total_cmp(&rows[a].diagnostics.score)
            });
            for &i in &by_score[..allowed] {
                rows[i].diagnostics.quota.push(meta.clone());
            }
            for &i in &by_score[allowed..] {
                dropped[i] = true;
            }
            debug!(
                field = %field,
                bucket_size,
                cap,
                tolerance,
                trimmed = by_score.len() - allowed,
                "quota cap trimmed rows"
            );
            bucket.retain(|&i| !dropped[i]);
        }
        _ => {
            for &i in &group {
                rows[i].diagnostics.quota.push(meta.clone());
            }
        }
    }

    if let Some(min_pct) = quota.min_pct_clamped() {
        let required = (bucket_size as f64 * min_pct / 100.0).floor() as i64 - tolerance as i64;
        let current = bucket.iter().filter(|&&i| is_target(&rows[i])).count();
        if (current as i64) < required {
            let need = QuotaNeed::MinShare {
                field,
                values: values.clone(),
                scope: quota.scope,
                bucket_size,
                min_required: required,
                current,
                tolerance,
                need: (required - current as i64).max(0) as usize,
            };
            annotate_need(rows, &bucket, need);
        }
    }

    if quota.scope == QuotaScope::PerVertical {
        if let Some(min_distinct) = quota.min_distinct() {
            let distinct: BTreeSet<&str> = bucket.iter().filter_map(|&i| rows[i].get(field)).collect();
            let current_distinct = distinct.len();
            if current_distinct < min_distinct {
                let need = QuotaNeed::MinDistinct {
                    field,
                    values: values.clone(),
                    scope: quota.scope,
                    bucket_size,
                    per_vertical_min_distinct: min_distinct,
                    current_distinct,
                    need: min_distinct - current_distinct,
                };
                annotate_need(rows, &bucket, need);
            }
        }
    }
}

fn annotate_need(rows: &mut [Row], bucket: &[usize], need: QuotaNeed) {
    debug!(need = need.need(), field = %need.field(), "quota bucket under-supplied");
    for &i in bucket {
        rows[i].diagnostics.quota_need.push(need.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Field;

    fn scored(vertical: &str, format: &str, score: f64) -> Row {
        let mut r = Row::new("Pain Point", vertical).with(Field::Format, format);
        r.diagnostics.score = score;
        r
    }

    /// 20 rows sorted by descending score; rows 0,2,4,..,14 are `Static_SP`.
    fn twenty_rows() -> Vec<Row> {
        (0..20)
            .map(|i| {
                let format = if i % 2 == 0 && i < 16 { "Static_SP" } else { "Video_PS" };
                scored("A", format, 20.0 - i as f64)
            })
            .collect()
    }

    #[test]
    fn test_no_quotas_is_identity() {
        let rows = twenty_rows();
        let out = apply_quotas(rows.clone(), &[]);
        assert_eq!(out, rows);
    }

    #[test]
    fn test_cap_drops_lowest_scored_matches() {
        let q = QuotaRule::new(Field::Format)
            .with_one_of(["Static_SP"])
            .with_max_pct(25.0)
            .with_tolerance(0);
        let out = apply_quotas(twenty_rows(), [&q]);

        let kept: Vec<f64> = out
            .iter()
            .filter(|r| r.format.as_deref() == Some("Static_SP"))
            .map(|r| r.diagnostics.score)
            .collect();
        assert_eq!(out.len(), 17);
        assert_eq!(kept, vec![20.0, 18.0, 16.0, 14.0, 12.0]);
        assert!(out
            .iter()
            .filter(|r| r.format.as_deref() == Some("Static_SP"))
            .all(|r| r.diagnostics.quota[0].kept && r.diagnostics.quota[0].cap == Some(5)));
    }

    #[test]
    fn test_tolerance_allows_one_extra_by_default() {
        let q = QuotaRule::new(Field::Format)
            .with_value("Static_SP")
            .with_max_pct(25.0);
        let out = apply_quotas(twenty_rows(), [&q]);
        let n = out
            .iter()
            .filter(|r| r.format.as_deref() == Some("Static_SP"))
            .count();
        assert_eq!(n, 6);
    }

    #[test]
    fn test_under_cap_annotates_without_dropping() {
        let q = QuotaRule::new(Field::Format)
            .with_value("Static_SP")
            .with_max_share(0.5);
        let out = apply_quotas(twenty_rows(), [&q]);
        assert_eq!(out.len(), 20);
        let annotated = out.iter().filter(|r| !r.diagnostics.quota.is_empty()).count();
        assert_eq!(annotated, 8);
    }

    #[test]
    fn test_quota_without_values_targets_nothing() {
        let q = QuotaRule::new(Field::Format).with_max_share(0.0).with_tolerance(0);
        let out = apply_quotas(twenty_rows(), [&q]);
        assert_eq!(out.len(), 20);
    }

    #[test]
    fn test_min_pct_flags_bucket() {
        let rows: Vec<Row> = (0..10)
            .map(|i| scored("A", if i == 0 { "Static_SP" } else { "Video_PS" }, 0.0))
            .collect();
        let q = QuotaRule::new(Field::Format)
            .with_value("Static_SP")
            .with_min_pct(50.0);
        let out = apply_quotas(rows, [&q]);

        assert_eq!(out.len(), 10);
        for r in &out {
            assert_eq!(
                r.quota_needs(),
                &[QuotaNeed::MinShare {
                    field: Field::Format,
                    values: vec!["Static_SP".into()],
                    scope: QuotaScope::Global,
                    bucket_size: 10,
                    min_required: 4,
                    current: 1,
                    tolerance: 1,
                    need: 3,
                }]
            );
        }
    }

    #[test]
    fn test_min_pct_satisfied_within_tolerance() {
        let rows: Vec<Row> = (0..10)
            .map(|i| scored("A", if i < 4 { "Static_SP" } else { "Video_PS" }, 0.0))
            .collect();
        let q = QuotaRule::new(Field::Format)
            .with_value("Static_SP")
            .with_min_pct(50.0);
        let out = apply_quotas(rows, [&q]);
        assert!(out.iter().all(|r| r.quota_needs().is_empty()));
    }

    #[test]
    fn test_per_vertical_buckets_and_min_distinct() {
        let mut rows = Vec::new();
        for i in 0..4 {
            rows.push(scored("A", "Static_SP", 10.0 - i as f64));
        }
        for (i, f) in ["Static_SP", "Video_PS", "Anim_List"].iter().enumerate() {
            rows.push(scored("B", f, 5.0 - i as f64));
        }
        let q = QuotaRule::new(Field::Format)
            .with_value("Static_SP")
            .with_scope(QuotaScope::PerVertical)
            .with_max_share(0.5)
            .with_tolerance(0)
            .with_per_vertical_min_distinct(2);
        let out = apply_quotas(rows, [&q]);

        let a: Vec<&Row> = out.iter().filter(|r| r.vertical_value == "A").collect();
        let b: Vec<&Row> = out.iter().filter(|r| r.vertical_value == "B").collect();
        // A: cap floor(4 * 0.5) = 2, two lowest dropped, still one distinct value
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].diagnostics.score, 10.0);
        assert_eq!(a[1].diagnostics.score, 9.0);
        assert!(matches!(
            a[0].quota_needs(),
            [QuotaNeed::MinDistinct {
                current_distinct: 1,
                need: 1,
                ..
            }]
        ));
        // B: one target row, cap 1, three distinct formats
        assert_eq!(b.len(), 3);
        assert!(b.iter().all(|r| r.quota_needs().is_empty()));
    }

    #[test]
    fn test_dropped_rows_leave_later_quotas() {
        let rows = twenty_rows();
        let first = QuotaRule::new(Field::Format)
            .with_value("Static_SP")
            .with_max_share(0.0)
            .with_tolerance(0);
        let second = QuotaRule::new(Field::Format)
            .with_value("Video_PS")
            .with_max_share(0.5)
            .with_tolerance(0);
        let out = apply_quotas(rows, [&first, &second]);

        // After the first quota only the 12 Video_PS rows remain; the
        // second sees a bucket of 12 and caps at 6.
        assert_eq!(out.len(), 6);
        assert!(out.iter().all(|r| r.diagnostics.quota[0].bucket_size == 12));
    }

    #[test]
    fn test_order_preserved() {
        let q = QuotaRule::new(Field::Format)
            .with_value("Static_SP")
            .with_max_share(0.1)
            .with_tolerance(0);
        let out = apply_quotas(twenty_rows(), [&q]);
        let scores: Vec<f64> = out.iter().map(|r| r.diagnostics.score).collect();
        let mut sorted = scores.clone();
        sorted.sort_by(|a, b| b.total_cmp(a));
        assert_eq!(scores, sorted);
    }
}
