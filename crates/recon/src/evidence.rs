use std::collections::BTreeMap;

use crate::model::{Classification, MatchResult, MergedSheet, ReconSummary};

/// Compute summary statistics from the merged rows.
pub fn compute_summary(
    left_total: usize,
    right_total: usize,
    matches: &MatchResult,
    merged: &MergedSheet,
) -> ReconSummary {
    let mut bucket_counts: BTreeMap<String, usize> = Classification::ALL
        .iter()
        .map(|c| (c.to_string(), 0))
        .collect();
    let mut matched = 0;
    let mut duplicates = 0;
    let mut unmatched_left = 0;
    let mut unmatched_right = 0;

    for row in &merged.rows {
        *bucket_counts.entry(row.classification.to_string()).or_insert(0) += 1;

        match row.classification {
            Classification::MatchedOnFirstKey
            | Classification::MatchedOnSecondKey
            | Classification::MatchedOnBoth => matched += 1,
            Classification::Duplicate => duplicates += 1,
            Classification::UnmatchedLeft => unmatched_left += 1,
            Classification::UnmatchedRight => unmatched_right += 1,
        }
    }

    ReconSummary {
        left_total,
        right_total,
        right_consumed: matches.consumed_count(),
        matched,
        duplicates,
        unmatched_left,
        unmatched_right,
        output_rows: merged.rows.len(),
        bucket_counts,
    }
}
