use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad key count, clashing sheet names, etc.).
    ConfigValidation(String),
    /// Input workbook has no sheet with the configured name.
    MissingSheet { sheet: String, available: Vec<String> },
    /// A configured key field is absent from a sheet's header row.
    MissingRequiredField { sheet: String, field: String },
    /// Input file does not exist.
    InputNotFound { path: String },
    /// Output location refused the write.
    OutputWriteDenied { path: String, reason: String },
    /// Anything else. `record` is the left record index when matching was in progress.
    Unexpected { context: String, record: Option<usize> },
}

impl ReconError {
    pub fn unexpected(context: impl Into<String>) -> Self {
        Self::Unexpected { context: context.into(), record: None }
    }

    pub fn at_record(context: impl Into<String>, record: usize) -> Self {
        Self::Unexpected { context: context.into(), record: Some(record) }
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingSheet { sheet, available } => {
                write!(f, "sheet '{sheet}' not found (available: {})", available.join(", "))
            }
            Self::MissingRequiredField { sheet, field } => {
                write!(f, "sheet '{sheet}': missing required column '{field}'")
            }
            Self::InputNotFound { path } => write!(f, "input file not found: {path}"),
            Self::OutputWriteDenied { path, reason } => {
                write!(f, "cannot write {path}: {reason}")
            }
            Self::Unexpected { context, record: Some(idx) } => {
                write!(f, "{context} (left record {idx})")
            }
            Self::Unexpected { context, record: None } => write!(f, "{context}"),
        }
    }
}

impl std::error::Error for ReconError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let err = ReconError::MissingRequiredField {
            sheet: "CDL".into(),
            field: "Biz Name".into(),
        };
        assert_eq!(err.to_string(), "sheet 'CDL': missing required column 'Biz Name'");

        let err = ReconError::MissingSheet {
            sheet: "GITHUB".into(),
            available: vec!["CDL".into(), "Notes".into()],
        };
        assert!(err.to_string().contains("'GITHUB'"));
        assert!(err.to_string().contains("CDL, Notes"));

        let err = ReconError::at_record("right index 9 out of range", 4);
        assert_eq!(err.to_string(), "right index 9 out of range (left record 4)");
    }
}
