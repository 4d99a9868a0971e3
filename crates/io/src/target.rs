// Where planned sheets end up: a fresh workbook, or the input workbook itself.

use std::path::{Path, PathBuf};

use tabmatch_recon::output::OutputPlan;
use tabmatch_recon::ReconError;

use crate::xlsx::{read_raw_sheets, to_xlsx_bytes, write_atomic, write_workbook, SheetOut};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Write a new workbook at this path (replacing any existing file).
    NewFile(PathBuf),
    /// Add the planned sheets to the source workbook, replacing same-named
    /// sheets and keeping the rest.
    AppendSheetToSource(PathBuf),
}

/// One workbook touched by a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub sheets: Vec<String>,
}

/// `<dir>/<stem><suffix>.xlsx` next to `path`.
pub fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".into());
    path.with_file_name(format!("{stem}{suffix}.xlsx"))
}

/// Only xlsx sources can be rewritten in place; other formats would be
/// silently converted.
pub fn supports_append(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"))
}

/// Path of the separate unmatched workbook for a NewFile target.
///
/// A configured name that is relative is resolved against the primary
/// output's directory.
pub fn unmatched_path(primary: &Path, configured: Option<&str>) -> PathBuf {
    match configured {
        Some(name) => {
            let p = Path::new(name);
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                primary.with_file_name(p)
            }
        }
        None => sibling_path(primary, "_unmatched"),
    }
}

/// Write every sheet of `plan` to `target`.
pub fn write_output(
    target: &OutputTarget,
    plan: &OutputPlan,
    unmatched_file: Option<&str>,
) -> Result<Vec<WrittenFile>, ReconError> {
    match target {
        OutputTarget::NewFile(path) => {
            let mut written = Vec::new();

            let primary: Vec<_> = plan.primary.iter().collect();
            write_workbook(path, &primary)?;
            written.push(WrittenFile {
                path: path.clone(),
                sheets: plan.primary.iter().map(|s| s.name.clone()).collect(),
            });

            if !plan.unmatched.is_empty() {
                let unmatched_path = unmatched_path(path, unmatched_file);
                if unmatched_path == *path {
                    return Err(ReconError::unexpected(format!(
                        "unmatched workbook would overwrite {}",
                        path.display()
                    )));
                }
                let unmatched: Vec<_> = plan.unmatched.iter().collect();
                write_workbook(&unmatched_path, &unmatched)?;
                written.push(WrittenFile {
                    path: unmatched_path,
                    sheets: plan.unmatched.iter().map(|s| s.name.clone()).collect(),
                });
            }

            Ok(written)
        }
        OutputTarget::AppendSheetToSource(path) => {
            if !supports_append(path) {
                return Err(ReconError::ConfigValidation(format!(
                    "cannot append to {}: only .xlsx workbooks can be appended to",
                    path.display()
                )));
            }
            let existing = read_raw_sheets(path)?;
            let planned: Vec<_> = plan.sheets().collect();

            let mut out: Vec<SheetOut<'_>> = Vec::with_capacity(existing.len() + planned.len());
            for raw in &existing {
                match planned.iter().find(|s| s.name == raw.name) {
                    Some(set) => {
                        log::info!("replacing sheet '{}' in {}", raw.name, path.display());
                        out.push(SheetOut::Table(*set));
                    }
                    None => out.push(SheetOut::Raw(raw)),
                }
            }
            for set in &planned {
                if !existing.iter().any(|raw| raw.name == set.name) {
                    out.push(SheetOut::Table(*set));
                }
            }

            let bytes = to_xlsx_bytes(&out)?;
            write_atomic(path, &bytes)?;
            log::info!("appended {} sheet(s) to {}", planned.len(), path.display());

            Ok(vec![WrittenFile {
                path: path.clone(),
                sheets: planned.iter().map(|s| s.name.clone()).collect(),
            }])
        }
    }
}
