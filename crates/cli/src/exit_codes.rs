//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Scripts rely on them, so codes are never renumbered.
//!
//! | Code | Meaning                                   |
//! |------|-------------------------------------------|
//! | 0    | Success                                   |
//! | 1    | Unexpected error                          |
//! | 2    | Usage error (bad arguments)               |
//! | 3    | Input workbook not found                  |
//! | 4    | Named sheet missing from the workbook     |
//! | 5    | Key column missing from a sheet's header  |
//! | 6    | Output location refused the write         |
//! | 7    | Invalid configuration                     |

use tabmatch_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Unexpected failure (unreadable workbook, internal inconsistency).
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, conflicting options.
pub const EXIT_USAGE: u8 = 2;

/// Input workbook does not exist.
pub const EXIT_INPUT_NOT_FOUND: u8 = 3;

/// Configured left or right sheet is absent.
pub const EXIT_MISSING_SHEET: u8 = 4;

/// A key field named in the config is not a column of its sheet.
pub const EXIT_MISSING_FIELD: u8 = 5;

/// Permission or read-only failure writing the output workbook.
pub const EXIT_WRITE_DENIED: u8 = 6;

/// Config file failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 7;

/// Map a ReconError to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::MissingSheet { .. } => EXIT_MISSING_SHEET,
        ReconError::MissingRequiredField { .. } => EXIT_MISSING_FIELD,
        ReconError::InputNotFound { .. } => EXIT_INPUT_NOT_FOUND,
        ReconError::OutputWriteDenied { .. } => EXIT_WRITE_DENIED,
        ReconError::Unexpected { .. } => EXIT_ERROR,
    }
}
