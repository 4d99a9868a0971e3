use crate::config::{DuplicatePolicy, MatchMode, MatchPolicy};
use crate::error::ReconError;
use crate::model::{KeyHit, LeftOutcome, MatchKeySpec, MatchResult, RecordSet, Value};

/// Column indices of each key pair, as (left, right).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKeys {
    pub columns: Vec<(usize, usize)>,
}

/// Look up every key field in both schemas. Fails on the first missing one.
pub fn resolve_keys(
    left: &RecordSet,
    right: &RecordSet,
    keys: &MatchKeySpec,
) -> Result<ResolvedKeys, ReconError> {
    let idx = |set: &RecordSet, field: &str| -> Result<usize, ReconError> {
        set.field_index(field)
            .ok_or_else(|| ReconError::MissingRequiredField {
                sheet: set.name.clone(),
                field: field.into(),
            })
    };

    let mut columns = Vec::with_capacity(keys.pairs().len());
    for pair in keys.pairs() {
        columns.push((idx(left, &pair.left)?, idx(right, &pair.right)?));
    }
    Ok(ResolvedKeys { columns })
}

/// Normalized comparison form of a value: trimmed and upper-cased.
/// Empty values have no token and never match anything, including each other.
pub fn match_token(value: &Value) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    Some(value.to_text().trim().to_uppercase())
}

pub fn values_match(a: &Value, b: &Value) -> bool {
    match (match_token(a), match_token(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn key_hit(left: &[Option<String>], right: &[Option<String>]) -> KeyHit {
    let eq = |i: usize| match (left.get(i), right.get(i)) {
        (Some(Some(l)), Some(Some(r))) => l == r,
        _ => false,
    };
    KeyHit {
        first: eq(0),
        second: eq(1),
    }
}

fn tokens(set: &RecordSet, row: usize, columns: impl Iterator<Item = usize>) -> Vec<Option<String>> {
    let record = &set.records[row];
    columns.map(|c| match_token(record.get(c))).collect()
}

/// First-hit matching of every left record against the right records.
///
/// Left records are visited in input order and, for each, right records are
/// scanned in input order; the first candidate on which any key pair compares
/// equal is selected. This is a nested O(L×R) scan: tokens are normalized
/// once per record, but the scan itself stays linear so that consumption in
/// one-to-one mode follows input order. Inputs in the low hundreds of rows
/// are the intended scale.
pub fn match_records(
    left: &RecordSet,
    right: &RecordSet,
    keys: &MatchKeySpec,
    policy: MatchPolicy,
) -> Result<MatchResult, ReconError> {
    let resolved = resolve_keys(left, right, keys)?;

    let right_tokens: Vec<Vec<Option<String>>> = (0..right.len())
        .map(|ri| tokens(right, ri, resolved.columns.iter().map(|c| c.1)))
        .collect();

    let one_to_one = policy.mode == MatchMode::OneToOne;
    let skip_consumed = one_to_one && policy.on_duplicate == DuplicatePolicy::Skip;

    let mut consumed = vec![false; right.len()];
    let mut outcomes = Vec::with_capacity(left.len());

    for li in 0..left.len() {
        let left_tokens = tokens(left, li, resolved.columns.iter().map(|c| c.0));
        let mut outcome = LeftOutcome::Unmatched;

        if left_tokens.iter().any(Option::is_some) {
            for (ri, right_row) in right_tokens.iter().enumerate() {
                if skip_consumed && consumed[ri] {
                    continue;
                }
                let hit = key_hit(&left_tokens, right_row);
                if !hit.any() {
                    continue;
                }
                if one_to_one && consumed[ri] {
                    outcome = LeftOutcome::Duplicate { right: ri, hit };
                } else {
                    consumed[ri] = true;
                    outcome = LeftOutcome::Matched { right: ri, hit };
                }
                break;
            }
        }

        log::trace!("{} record {li}: {outcome:?}", left.name);
        outcomes.push(outcome);
    }

    Ok(MatchResult { outcomes, consumed })
}
