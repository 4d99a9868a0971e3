use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::{Classification, KeyPair, MatchKeySpec};

/// Excel's sheet-name length limit.
pub const MAX_SHEET_NAME_LEN: usize = 31;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    #[serde(default)]
    pub sheets: SheetNames,
    pub keys: Vec<KeyPair>,
    #[serde(default)]
    pub matching: MatchPolicy,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetNames {
    pub left: String,
    pub right: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            left: "CDL".into(),
            right: "GITHUB".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Matching policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct MatchPolicy {
    #[serde(default)]
    pub mode: MatchMode,
    #[serde(default)]
    pub on_duplicate: DuplicatePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Each right record satisfies at most one left record.
    #[default]
    OneToOne,
    /// Right records may satisfy any number of left records.
    ManyToOne,
}

/// What one-to-one matching does with a right record that is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Consumed right records are invisible to later left records.
    #[default]
    Skip,
    /// A later left record whose first hit is consumed is classified `Duplicate`.
    Flag,
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OneToOne => write!(f, "one_to_one"),
            Self::ManyToOne => write!(f, "many_to_one"),
        }
    }
}

impl std::fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Flag => write!(f, "flag"),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    MatchedOnly,
    #[serde(rename = "separate")]
    MatchedPlusUnmatchedSeparate,
    #[default]
    #[serde(rename = "combined")]
    SingleCombinedSheet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    #[default]
    NewFile,
    AppendToSource,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub mode: OutputMode,
    pub target: TargetKind,
    pub sheet: String,
    pub unmatched_left_sheet: Option<String>,
    pub unmatched_right_sheet: Option<String>,
    pub unmatched_file: Option<String>,
    pub classification_column: String,
    /// Defaults to `"<right sheet>_"`.
    pub right_prefix: Option<String>,
    pub left_prefix: String,
    pub labels: Labels,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::default(),
            target: TargetKind::default(),
            sheet: "Merged".into(),
            unmatched_left_sheet: None,
            unmatched_right_sheet: None,
            unmatched_file: None,
            classification_column: "Match_Type".into(),
            right_prefix: None,
            left_prefix: String::new(),
            labels: Labels::default(),
        }
    }
}

/// Per-classification label overrides. Unset entries use the snake_case name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub matched_on_first_key: Option<String>,
    pub matched_on_second_key: Option<String>,
    pub matched_on_both: Option<String>,
    pub duplicate: Option<String>,
    pub unmatched_left: Option<String>,
    pub unmatched_right: Option<String>,
}

impl Labels {
    pub fn label(&self, class: Classification) -> String {
        let custom = match class {
            Classification::MatchedOnFirstKey => &self.matched_on_first_key,
            Classification::MatchedOnSecondKey => &self.matched_on_second_key,
            Classification::MatchedOnBoth => &self.matched_on_both,
            Classification::Duplicate => &self.duplicate,
            Classification::UnmatchedLeft => &self.unmatched_left,
            Classification::UnmatchedRight => &self.unmatched_right,
        };
        custom.clone().unwrap_or_else(|| class.to_string())
    }
}

/// Resolved output column naming handed to the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub classification_column: String,
    pub left_prefix: String,
    pub right_prefix: String,
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

/// Built-in key configurations for the known CDL/GITHUB workbooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    A,
    B,
    C,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Self::A, Self::B, Self::C];

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "a" => Some(Self::A),
            "b" => Some(Self::B),
            "c" => Some(Self::C),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
            Self::C => "c",
        }
    }

    /// The left field paired with `pdm_column`.
    fn second_left_key(&self) -> &'static str {
        match self {
            Self::A => "Biz Name",
            Self::B => "EDL Tables",
            Self::C => "c",
        }
    }

    pub fn config(&self) -> ReconConfig {
        ReconConfig {
            name: format!("preset-{}", self.name()),
            sheets: SheetNames::default(),
            keys: vec![
                KeyPair::new("Table Field Name", "cdm_column"),
                KeyPair::new(self.second_left_key(), "pdm_column"),
            ],
            matching: MatchPolicy::default(),
            output: OutputConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn key_spec(&self) -> Result<MatchKeySpec, ReconError> {
        MatchKeySpec::new(self.keys.clone())
    }

    pub fn layout(&self) -> OutputLayout {
        OutputLayout {
            classification_column: self.output.classification_column.clone(),
            left_prefix: self.output.left_prefix.clone(),
            right_prefix: self
                .output
                .right_prefix
                .clone()
                .unwrap_or_else(|| format!("{}_", self.sheets.right)),
        }
    }

    pub fn unmatched_left_sheet(&self) -> String {
        self.output
            .unmatched_left_sheet
            .clone()
            .unwrap_or_else(|| format!("Unmatched_{}", self.sheets.left))
    }

    pub fn unmatched_right_sheet(&self) -> String {
        self.output
            .unmatched_right_sheet
            .clone()
            .unwrap_or_else(|| format!("Unmatched_{}", self.sheets.right))
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        self.key_spec()?;

        let left = self.sheets.left.trim();
        let right = self.sheets.right.trim();
        if left.is_empty() || right.is_empty() {
            return Err(ReconError::ConfigValidation(
                "left and right sheet names must not be empty".into(),
            ));
        }
        if left == right {
            return Err(ReconError::ConfigValidation(format!(
                "left and right sheets must differ, both are '{left}'"
            )));
        }

        if self.output.classification_column.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "classification_column must not be empty".into(),
            ));
        }

        let mut outputs = vec![self.output.sheet.clone()];
        if self.output.mode == OutputMode::MatchedPlusUnmatchedSeparate {
            outputs.push(self.unmatched_left_sheet());
            outputs.push(self.unmatched_right_sheet());
        }
        for (i, name) in outputs.iter().enumerate() {
            validate_sheet_name(name)?;
            if outputs[..i].contains(name) {
                return Err(ReconError::ConfigValidation(format!(
                    "output sheet name '{name}' is used twice"
                )));
            }
        }

        if self.output.target == TargetKind::AppendToSource
            && outputs.iter().any(|n| n == left || n == right)
        {
            return Err(ReconError::ConfigValidation(
                "appending to the source would overwrite an input sheet".into(),
            ));
        }

        Ok(())
    }
}

fn validate_sheet_name(name: &str) -> Result<(), ReconError> {
    if name.trim().is_empty() {
        return Err(ReconError::ConfigValidation(
            "output sheet name must not be empty".into(),
        ));
    }
    if name.chars().count() > MAX_SHEET_NAME_LEN {
        return Err(ReconError::ConfigValidation(format!(
            "output sheet name '{name}' exceeds {MAX_SHEET_NAME_LEN} characters"
        )));
    }
    if let Some(c) = name.chars().find(|c| "[]:*?/\\".contains(*c)) {
        return Err(ReconError::ConfigValidation(format!(
            "output sheet name '{name}' contains '{c}'"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VEND_COMPARE: &str = r#"
name = "vend_compare"

[sheets]
left = "CDL"
right = "GITHUB"

[[keys]]
left = "Table Field Name"
right = "cdm_column"

[[keys]]
left = "Biz Name"
right = "pdm_column"

[matching]
mode = "one_to_one"
on_duplicate = "flag"

[output]
mode = "separate"
sheet = "vend_compare_merged"
classification_column = "Comments"

[output.labels]
unmatched_left = "No matching record in GITHUB"
unmatched_right = "No matching record in CDL"
"#;

    #[test]
    fn parse_full_config() {
        let config = ReconConfig::from_toml(VEND_COMPARE).unwrap();
        assert_eq!(config.name, "vend_compare");
        assert_eq!(config.keys.len(), 2);
        assert_eq!(config.keys[1], KeyPair::new("Biz Name", "pdm_column"));
        assert_eq!(config.matching.mode, MatchMode::OneToOne);
        assert_eq!(config.matching.on_duplicate, DuplicatePolicy::Flag);
        assert_eq!(config.output.mode, OutputMode::MatchedPlusUnmatchedSeparate);
        assert_eq!(config.output.target, TargetKind::NewFile);
        assert_eq!(config.unmatched_left_sheet(), "Unmatched_CDL");
        assert_eq!(
            config.output.labels.label(Classification::UnmatchedLeft),
            "No matching record in GITHUB"
        );
        assert_eq!(
            config.output.labels.label(Classification::MatchedOnBoth),
            "matched_on_both"
        );
    }

    #[test]
    fn defaults_apply() {
        let config = ReconConfig::from_toml(
            r#"
name = "minimal"
[[keys]]
left = "id"
right = "ref"
"#,
        )
        .unwrap();
        assert_eq!(config.sheets.left, "CDL");
        assert_eq!(config.sheets.right, "GITHUB");
        assert_eq!(config.matching, MatchPolicy::default());
        assert_eq!(config.output.mode, OutputMode::SingleCombinedSheet);
        assert_eq!(config.output.sheet, "Merged");
        let layout = config.layout();
        assert_eq!(layout.right_prefix, "GITHUB_");
        assert_eq!(layout.classification_column, "Match_Type");
        assert_eq!(layout.left_prefix, "");
    }

    #[test]
    fn presets_match_known_workbooks() {
        let b = Preset::B.config();
        assert_eq!(b.keys[0], KeyPair::new("Table Field Name", "cdm_column"));
        assert_eq!(b.keys[1], KeyPair::new("EDL Tables", "pdm_column"));
        assert_eq!(Preset::parse(" C "), Some(Preset::C));
        assert_eq!(Preset::parse("d"), None);
        for preset in Preset::ALL {
            preset.config().validate().unwrap();
        }
    }

    #[test]
    fn reject_three_key_pairs() {
        let input = r#"
name = "bad"
[[keys]]
left = "a"
right = "b"
[[keys]]
left = "c"
right = "d"
[[keys]]
left = "e"
right = "f"
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("found 3"));
    }

    #[test]
    fn reject_same_sheet_twice() {
        let input = r#"
name = "bad"
[sheets]
left = "Data"
right = "Data"
[[keys]]
left = "a"
right = "b"
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn reject_long_or_clashing_output_sheets() {
        let mut config = Preset::A.config();
        config.output.sheet = "x".repeat(32);
        assert!(config.validate().is_err());

        config.output.sheet = "Merged/2".into();
        assert!(config.validate().is_err());

        config.output.sheet = "Unmatched_CDL".into();
        config.output.mode = OutputMode::MatchedPlusUnmatchedSeparate;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("used twice"));
    }

    #[test]
    fn reject_append_over_input_sheet() {
        let mut config = Preset::A.config();
        config.output.target = TargetKind::AppendToSource;
        config.output.sheet = "CDL".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("overwrite an input sheet"));
    }

    #[test]
    fn reject_unknown_mode() {
        let input = r#"
name = "bad"
[[keys]]
left = "a"
right = "b"
[matching]
mode = "one_to_many"
"#;
        assert!(matches!(
            ReconConfig::from_toml(input),
            Err(ReconError::ConfigParse(_))
        ));
    }
}
