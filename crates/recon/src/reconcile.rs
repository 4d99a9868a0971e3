use std::collections::HashSet;

use crate::config::OutputLayout;
use crate::error::ReconError;
use crate::model::{
    Classification, LeftOutcome, MatchResult, MergedRow, MergedSheet, RecordSet, Value,
};

/// Which source a merged column is copied from.
#[derive(Debug, Clone, Copy)]
enum Source {
    Left(usize),
    Right(usize),
}

/// Build the merged column plan. A column whose final name is already taken
/// (by the classification column or an earlier column) is dropped.
fn column_plan(
    left: &RecordSet,
    right: &RecordSet,
    layout: &OutputLayout,
) -> (Vec<String>, Vec<Source>) {
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(layout.classification_column.clone());

    let mut names = Vec::new();
    let mut sources = Vec::new();

    let left_cols = left
        .fields
        .iter()
        .enumerate()
        .map(|(i, f)| (format!("{}{f}", layout.left_prefix), Source::Left(i)));
    let right_cols = right
        .fields
        .iter()
        .enumerate()
        .map(|(i, f)| (format!("{}{f}", layout.right_prefix), Source::Right(i)));

    for (name, source) in left_cols.chain(right_cols) {
        if seen.insert(name.clone()) {
            names.push(name);
            sources.push(source);
        } else {
            log::warn!("column '{name}' appears twice in merged output, keeping the first");
        }
    }

    (names, sources)
}

fn row_values(
    sources: &[Source],
    left: &RecordSet,
    right: &RecordSet,
    left_idx: Option<usize>,
    right_idx: Option<usize>,
) -> Vec<Value> {
    sources
        .iter()
        .map(|s| match (*s, left_idx, right_idx) {
            (Source::Left(c), Some(li), _) => left.records[li].get(c).clone(),
            (Source::Right(c), _, Some(ri)) => right.records[ri].get(c).clone(),
            _ => Value::Empty,
        })
        .collect()
}

/// Assemble merged rows: one per left record in input order, then one per
/// never-consumed right record in ascending position.
pub fn reconcile(
    left: &RecordSet,
    right: &RecordSet,
    result: &MatchResult,
    layout: &OutputLayout,
) -> Result<MergedSheet, ReconError> {
    if result.outcomes.len() != left.len() {
        return Err(ReconError::unexpected(format!(
            "match result covers {} left records, {} has {}",
            result.outcomes.len(),
            left.name,
            left.len()
        )));
    }
    if result.consumed.len() != right.len() {
        return Err(ReconError::unexpected(format!(
            "match result covers {} right records, {} has {}",
            result.consumed.len(),
            right.name,
            right.len()
        )));
    }

    let (columns, sources) = column_plan(left, right, layout);
    let mut rows = Vec::with_capacity(left.len() + right.len());

    for (li, outcome) in result.outcomes.iter().enumerate() {
        let right_idx = match outcome {
            LeftOutcome::Matched { right: ri, .. } => {
                if *ri >= right.len() {
                    return Err(ReconError::at_record(
                        format!("matched right index {ri} out of range"),
                        li,
                    ));
                }
                Some(*ri)
            }
            LeftOutcome::Duplicate { .. } | LeftOutcome::Unmatched => None,
        };

        rows.push(MergedRow {
            classification: outcome.classification(),
            left: Some(li),
            right: right_idx,
            values: row_values(&sources, left, right, Some(li), right_idx),
        });
    }

    for ri in result.unconsumed() {
        rows.push(MergedRow {
            classification: Classification::UnmatchedRight,
            left: None,
            right: Some(ri),
            values: row_values(&sources, left, right, None, Some(ri)),
        });
    }

    Ok(MergedSheet {
        classification_column: layout.classification_column.clone(),
        columns,
        rows,
    })
}
