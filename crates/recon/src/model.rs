use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::{DuplicatePolicy, MatchMode};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A single cell value as read from a sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Excel serial date-time (1900 date system), kept apart from plain
    /// numbers so it is written back with a date format.
    DateTime(f64),
}

static EMPTY_VALUE: Value = Value::Empty;

impl Value {
    /// True for `Empty` and for text that is blank after trimming.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) | Self::Bool(_) | Self::DateTime(_) => false,
        }
    }

    /// Display text. Integral numbers render without decimals.
    pub fn to_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            Self::Bool(true) => "TRUE".to_string(),
            Self::Bool(false) => "FALSE".to_string(),
            Self::DateTime(serial) => serial_date_text(*serial),
        }
    }
}

/// `YYYY-MM-DD HH:MM:SS` for an Excel serial; out-of-range serials fall back
/// to the bare number.
fn serial_date_text(serial: f64) -> String {
    // 9999-12-31 is the last date Excel can hold.
    if !(0.0..2_958_466.0).contains(&serial) {
        return format!("{serial}");
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0));
    let millis = (serial * 86_400_000.0).round() as i64;
    match epoch.and_then(|e| e.checked_add_signed(chrono::Duration::milliseconds(millis))) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("{serial}"),
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s.to_string())
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s)
        }
    }
}

/// One row, values aligned with the owning [`RecordSet`]'s fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Value at `idx`; positions past the end of a short row read as `Empty`.
    pub fn get(&self, idx: usize) -> &Value {
        self.values.get(idx).unwrap_or(&EMPTY_VALUE)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// An ordered sequence of records sharing one field schema.
/// A record's position is its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    pub name: String,
    pub fields: Vec<String>,
    pub records: Vec<Record>,
}

impl RecordSet {
    pub fn new(name: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            name: name.into(),
            fields,
            records: Vec::new(),
        }
    }

    pub fn from_rows(name: impl Into<String>, fields: &[&str], rows: Vec<Vec<Value>>) -> Self {
        let mut set = Self::new(name, fields.iter().map(|f| f.to_string()).collect());
        for row in rows {
            set.push(row);
        }
        set
    }

    pub fn push(&mut self, values: Vec<Value>) {
        self.records.push(Record::new(values));
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }

    /// Value of `field` in record `row`, if both exist.
    pub fn value(&self, row: usize, field: &str) -> Option<&Value> {
        let idx = self.field_index(field)?;
        self.records.get(row).map(|r| r.get(idx))
    }
}

// ---------------------------------------------------------------------------
// Match keys
// ---------------------------------------------------------------------------

/// One (left field, right field) equality test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub left: String,
    pub right: String,
}

impl KeyPair {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

/// One or two key pairs; a record pair matches if any of them compares equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchKeySpec {
    pairs: Vec<KeyPair>,
}

pub const MAX_KEY_PAIRS: usize = 2;

impl MatchKeySpec {
    pub fn new(pairs: Vec<KeyPair>) -> Result<Self, crate::ReconError> {
        if pairs.is_empty() || pairs.len() > MAX_KEY_PAIRS {
            return Err(crate::ReconError::ConfigValidation(format!(
                "expected 1 or {MAX_KEY_PAIRS} key pairs, found {}",
                pairs.len()
            )));
        }
        for pair in &pairs {
            if pair.left.trim().is_empty() || pair.right.trim().is_empty() {
                return Err(crate::ReconError::ConfigValidation(
                    "key pair field names must not be empty".into(),
                ));
            }
        }
        Ok(Self { pairs })
    }

    pub fn single(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            pairs: vec![KeyPair::new(left, right)],
        }
    }

    pub fn pairs(&self) -> &[KeyPair] {
        &self.pairs
    }
}

// ---------------------------------------------------------------------------
// Match result
// ---------------------------------------------------------------------------

/// Which configured key pairs compared equal for a selected candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyHit {
    pub first: bool,
    pub second: bool,
}

impl KeyHit {
    pub fn any(&self) -> bool {
        self.first || self.second
    }

    pub fn classification(&self) -> Classification {
        match (self.first, self.second) {
            (true, true) => Classification::MatchedOnBoth,
            (false, true) => Classification::MatchedOnSecondKey,
            _ => Classification::MatchedOnFirstKey,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeftOutcome {
    Matched { right: usize, hit: KeyHit },
    /// First hit was a right record already consumed by an earlier left record.
    Duplicate { right: usize, hit: KeyHit },
    Unmatched,
}

impl LeftOutcome {
    pub fn classification(&self) -> Classification {
        match self {
            Self::Matched { hit, .. } => hit.classification(),
            Self::Duplicate { .. } => Classification::Duplicate,
            Self::Unmatched => Classification::UnmatchedLeft,
        }
    }
}

/// Matcher output, one outcome per left record and one flag per right record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub outcomes: Vec<LeftOutcome>,
    pub consumed: Vec<bool>,
}

impl MatchResult {
    pub fn consumed_count(&self) -> usize {
        self.consumed.iter().filter(|c| **c).count()
    }

    pub fn unconsumed(&self) -> impl Iterator<Item = usize> + '_ {
        self.consumed
            .iter()
            .enumerate()
            .filter(|(_, c)| !**c)
            .map(|(i, _)| i)
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    MatchedOnFirstKey,
    MatchedOnSecondKey,
    MatchedOnBoth,
    Duplicate,
    UnmatchedLeft,
    UnmatchedRight,
}

impl Classification {
    pub const ALL: [Classification; 6] = [
        Self::MatchedOnFirstKey,
        Self::MatchedOnSecondKey,
        Self::MatchedOnBoth,
        Self::Duplicate,
        Self::UnmatchedLeft,
        Self::UnmatchedRight,
    ];

    pub fn is_matched(&self) -> bool {
        matches!(
            self,
            Self::MatchedOnFirstKey | Self::MatchedOnSecondKey | Self::MatchedOnBoth
        )
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MatchedOnFirstKey => write!(f, "matched_on_first_key"),
            Self::MatchedOnSecondKey => write!(f, "matched_on_second_key"),
            Self::MatchedOnBoth => write!(f, "matched_on_both"),
            Self::Duplicate => write!(f, "duplicate"),
            Self::UnmatchedLeft => write!(f, "unmatched_left"),
            Self::UnmatchedRight => write!(f, "unmatched_right"),
        }
    }
}

// ---------------------------------------------------------------------------
// Merged output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub classification: Classification,
    pub left: Option<usize>,
    pub right: Option<usize>,
    /// Aligned with [`MergedSheet::columns`]; excludes the classification cell.
    pub values: Vec<Value>,
}

/// Reconciled rows before they are split into output sheets.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedSheet {
    pub classification_column: String,
    pub columns: Vec<String>,
    pub rows: Vec<MergedRow>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub left_total: usize,
    pub right_total: usize,
    pub right_consumed: usize,
    pub matched: usize,
    pub duplicates: usize,
    pub unmatched_left: usize,
    pub unmatched_right: usize,
    pub output_rows: usize,
    pub bucket_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub left_sheet: String,
    pub right_sheet: String,
    pub mode: MatchMode,
    pub on_duplicate: DuplicatePolicy,
    pub key_pairs: Vec<KeyPair>,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    #[serde(skip)]
    pub matches: MatchResult,
    #[serde(skip)]
    pub merged: MergedSheet,
}
