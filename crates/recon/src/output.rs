//! Splits reconciled rows into the named sheets each output mode produces.

use crate::config::{Labels, OutputMode, ReconConfig};
use crate::model::{Classification, MergedRow, MergedSheet, RecordSet, Value};

/// Sheets grouped by artifact. `unmatched` is empty unless the mode writes a
/// separate unmatched artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPlan {
    pub primary: Vec<RecordSet>,
    pub unmatched: Vec<RecordSet>,
}

impl OutputPlan {
    pub fn sheets(&self) -> impl Iterator<Item = &RecordSet> {
        self.primary.iter().chain(self.unmatched.iter())
    }
}

/// Materialize merged rows as a sheet with the classification column first.
pub fn merged_sheet<'a>(
    name: &str,
    merged: &MergedSheet,
    rows: impl Iterator<Item = &'a MergedRow>,
    labels: &Labels,
) -> RecordSet {
    let mut fields = Vec::with_capacity(merged.columns.len() + 1);
    fields.push(merged.classification_column.clone());
    fields.extend(merged.columns.iter().cloned());

    let mut set = RecordSet::new(name, fields);
    for row in rows {
        let mut values = Vec::with_capacity(row.values.len() + 1);
        values.push(Value::Text(labels.label(row.classification)));
        values.extend(row.values.iter().cloned());
        set.push(values);
    }
    set
}

/// Raw source rows (unprefixed) with the classification column first.
fn source_sheet(
    name: String,
    source: &RecordSet,
    classification_column: &str,
    rows: impl Iterator<Item = (usize, Classification)>,
    labels: &Labels,
) -> RecordSet {
    let mut fields = Vec::with_capacity(source.fields.len() + 1);
    fields.push(classification_column.to_string());
    fields.extend(source.fields.iter().cloned());

    let mut set = RecordSet::new(name, fields);
    for (idx, class) in rows {
        let mut values = Vec::with_capacity(source.fields.len() + 1);
        values.push(Value::Text(labels.label(class)));
        let record = &source.records[idx];
        values.extend((0..source.fields.len()).map(|c| record.get(c).clone()));
        set.push(values);
    }
    set
}

pub fn plan_output(
    config: &ReconConfig,
    left: &RecordSet,
    right: &RecordSet,
    merged: &MergedSheet,
) -> OutputPlan {
    let labels = &config.output.labels;
    let sheet = config.output.sheet.as_str();

    match config.output.mode {
        OutputMode::SingleCombinedSheet => OutputPlan {
            primary: vec![merged_sheet(sheet, merged, merged.rows.iter(), labels)],
            unmatched: vec![],
        },
        OutputMode::MatchedOnly => OutputPlan {
            primary: vec![matched_sheet(sheet, merged, labels)],
            unmatched: vec![],
        },
        OutputMode::MatchedPlusUnmatchedSeparate => {
            let left_rows = merged.rows.iter().filter_map(|r| match (r.classification, r.left) {
                (Classification::UnmatchedLeft | Classification::Duplicate, Some(li)) => {
                    Some((li, r.classification))
                }
                _ => None,
            });
            let right_rows = merged.rows.iter().filter_map(|r| match (r.classification, r.right) {
                (Classification::UnmatchedRight, Some(ri)) => Some((ri, r.classification)),
                _ => None,
            });

            OutputPlan {
                primary: vec![matched_sheet(sheet, merged, labels)],
                unmatched: vec![
                    source_sheet(
                        config.unmatched_left_sheet(),
                        left,
                        &merged.classification_column,
                        left_rows,
                        labels,
                    ),
                    source_sheet(
                        config.unmatched_right_sheet(),
                        right,
                        &merged.classification_column,
                        right_rows,
                        labels,
                    ),
                ],
            }
        }
    }
}

fn matched_sheet(name: &str, merged: &MergedSheet, labels: &Labels) -> RecordSet {
    merged_sheet(
        name,
        merged,
        merged.rows.iter().filter(|r| r.classification.is_matched()),
        labels,
    )
}
