// Excel import/export

use std::fs::File;
use std::io::{BufReader, ErrorKind, Write};
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use rust_xlsxwriter::{Format, Formula, Workbook as XlsxWorkbook, Worksheet, XlsxError};
use tempfile::NamedTempFile;

use tabmatch_recon::model::{RecordSet, Value};
use tabmatch_recon::ReconError;

use crate::grid::record_set_from_grid;

/// A sheet copied cell-for-cell, used when rewriting an existing workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSheet {
    pub name: String,
    /// (row, col) of the first cell of `rows`.
    pub start: (u32, u32),
    pub rows: Vec<Vec<Value>>,
    /// (row, col, formula) in absolute sheet coordinates. `rows` holds the
    /// cached results of these cells.
    pub formulas: Vec<(u32, u32, String)>,
}

impl RawSheet {
    fn cached(&self, row: u32, col: u32) -> Option<&Value> {
        let r = row.checked_sub(self.start.0)? as usize;
        let c = col.checked_sub(self.start.1)? as usize;
        self.rows.get(r)?.get(c)
    }
}

/// A sheet to be written.
#[derive(Debug, Clone, Copy)]
pub enum SheetOut<'a> {
    /// Header row (bold) followed by one row per record.
    Table(&'a RecordSet),
    Raw(&'a RawSheet),
}

impl SheetOut<'_> {
    pub fn name(&self) -> &str {
        match self {
            Self::Table(set) => &set.name,
            Self::Raw(raw) => &raw.name,
        }
    }
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<Sheets<BufReader<File>>, ReconError> {
    if !path.exists() {
        return Err(ReconError::InputNotFound {
            path: path.display().to_string(),
        });
    }
    open_workbook_auto(path)
        .map_err(|e| ReconError::unexpected(format!("failed to open {}: {e}", path.display())))
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) => Value::from(s.as_str()),
        Data::Float(n) => Value::Number(*n),
        Data::Int(n) => Value::Number(*n as f64),
        Data::Bool(b) => Value::Bool(*b),
        // The 1904 flag is not exposed, 1900 system assumed.
        Data::DateTime(dt) => Value::DateTime(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::from(s.as_str()),
        Data::Error(e) => Value::Text(format!("#{e:?}")),
    }
}

fn range_rows(range: &Range<Data>) -> Vec<Vec<Value>> {
    range
        .rows()
        .map(|row| row.iter().map(cell_value).collect())
        .collect()
}

fn worksheet_range(
    workbook: &mut Sheets<BufReader<File>>,
    path: &Path,
    sheet: &str,
) -> Result<Range<Data>, ReconError> {
    let available = workbook.sheet_names();
    if !available.iter().any(|n| n == sheet) {
        return Err(ReconError::MissingSheet {
            sheet: sheet.into(),
            available,
        });
    }
    workbook.worksheet_range(sheet).map_err(|e| {
        ReconError::unexpected(format!(
            "failed to read sheet '{sheet}' from {}: {e}",
            path.display()
        ))
    })
}

/// Sheet names in workbook order.
pub fn sheet_names(path: &Path) -> Result<Vec<String>, ReconError> {
    Ok(open(path)?.sheet_names())
}

/// Read one named sheet as a record set (header row + data rows).
pub fn read_sheet(path: &Path, sheet: &str) -> Result<RecordSet, ReconError> {
    let mut sets = read_sheets(path, &[sheet])?;
    Ok(sets.remove(0))
}

/// Read several named sheets from one workbook, in the order requested.
pub fn read_sheets(path: &Path, sheets: &[&str]) -> Result<Vec<RecordSet>, ReconError> {
    log::info!("reading {}", path.display());
    let mut workbook = open(path)?;

    let mut sets = Vec::with_capacity(sheets.len());
    for sheet in sheets {
        let range = worksheet_range(&mut workbook, path, sheet)?;
        let set = record_set_from_grid(sheet, range_rows(&range));
        log::info!(
            "{sheet} sheet: {} rows, {} columns",
            set.len(),
            set.fields.len()
        );
        sets.push(set);
    }
    Ok(sets)
}

/// Read every sheet cell-for-cell, preserving position within the sheet.
pub fn read_raw_sheets(path: &Path) -> Result<Vec<RawSheet>, ReconError> {
    let mut workbook = open(path)?;
    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = worksheet_range(&mut workbook, path, &name)?;
        let formulas = workbook.worksheet_formula(&name).map_err(|e| {
            ReconError::unexpected(format!(
                "failed to read formulas of '{name}' from {}: {e}",
                path.display()
            ))
        })?;
        let formula_cells = match formulas.start() {
            Some((row0, col0)) => formulas
                .used_cells()
                .filter(|(_, _, f)| !f.is_empty())
                .map(|(r, c, f)| (row0 + r as u32, col0 + c as u32, f.clone()))
                .collect(),
            None => Vec::new(),
        };
        sheets.push(RawSheet {
            start: range.start().unwrap_or((0, 0)),
            rows: range_rows(&range),
            formulas: formula_cells,
            name,
        });
    }
    Ok(sheets)
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

fn write_err(name: &str, e: XlsxError) -> ReconError {
    ReconError::unexpected(format!("failed to write sheet '{name}': {e}"))
}

/// Date, time or date-time display format for a serial, by which parts it has.
fn date_format(serial: f64) -> Format {
    let has_date = serial.floor() > 0.0;
    let has_time = serial.fract().abs() > 0.0001;
    let pattern = match (has_date, has_time) {
        (true, true) => "yyyy-mm-dd hh:mm:ss",
        (false, true) => "hh:mm:ss",
        _ => "yyyy-mm-dd",
    };
    Format::new().set_num_format(pattern)
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, value: &Value) -> Result<(), XlsxError> {
    match value {
        Value::Empty => {}
        Value::Text(s) => {
            worksheet.write_string(row, col, s)?;
        }
        Value::Number(n) => {
            worksheet.write_number(row, col, *n)?;
        }
        Value::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        Value::DateTime(serial) => {
            worksheet.write_number_with_format(row, col, *serial, &date_format(*serial))?;
        }
    }
    Ok(())
}

fn write_table(worksheet: &mut Worksheet, set: &RecordSet) -> Result<(), XlsxError> {
    let header = Format::new().set_bold();
    for (col, field) in set.fields.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, field, &header)?;
    }
    for (row_idx, record) in set.records.iter().enumerate() {
        let row = row_idx as u32 + 1;
        for col in 0..set.fields.len() {
            write_cell(worksheet, row, col as u16, record.get(col))?;
        }
    }
    Ok(())
}

fn write_raw(worksheet: &mut Worksheet, raw: &RawSheet) -> Result<(), XlsxError> {
    let (start_row, start_col) = raw.start;
    for (r, cells) in raw.rows.iter().enumerate() {
        for (c, value) in cells.iter().enumerate() {
            let row = start_row + r as u32;
            let col = (start_col as usize + c) as u16;
            write_cell(worksheet, row, col, value)?;
        }
    }
    for (row, col, formula) in &raw.formulas {
        let mut formula = Formula::new(formula.as_str());
        if let Some(cached) = raw.cached(*row, *col) {
            formula = formula.set_result(cached.to_text());
        }
        worksheet.write_formula(*row, *col as u16, formula)?;
    }
    Ok(())
}

/// Serialize sheets, in order, into xlsx bytes.
pub fn to_xlsx_bytes(sheets: &[SheetOut<'_>]) -> Result<Vec<u8>, ReconError> {
    let mut workbook = XlsxWorkbook::new();

    for sheet in sheets {
        let name = sheet.name();
        let worksheet = workbook
            .add_worksheet()
            .set_name(name)
            .map_err(|e| write_err(name, e))?;

        match sheet {
            SheetOut::Table(set) => write_table(worksheet, set),
            SheetOut::Raw(raw) => write_raw(worksheet, raw),
        }
        .map_err(|e| write_err(name, e))?;
    }

    workbook
        .save_to_buffer()
        .map_err(|e| ReconError::unexpected(format!("failed to build workbook: {e}")))
}

fn io_err(path: &Path, e: std::io::Error) -> ReconError {
    match e.kind() {
        ErrorKind::PermissionDenied => ReconError::OutputWriteDenied {
            path: path.display().to_string(),
            reason: e.to_string(),
        },
        _ => ReconError::unexpected(format!("cannot write {}: {e}", path.display())),
    }
}

fn temp_file_in(dir: &Path) -> std::io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".tabmatch-").suffix(".xlsx");
    // Regular new-file mode (umask applies) instead of tempfile's 0600.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(dir)
}

/// Write bytes through a temporary file in the destination directory, then
/// rename over `path`. A failed run never leaves a half-written workbook.
///
/// A read-only `path` is refused rather than replaced, and an existing
/// file's permissions carry over to the new one.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ReconError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let existing = std::fs::metadata(path).ok();
    if existing.as_ref().is_some_and(|m| m.permissions().readonly()) {
        return Err(ReconError::OutputWriteDenied {
            path: path.display().to_string(),
            reason: "file is read-only".into(),
        });
    }

    let mut tmp = temp_file_in(dir).map_err(|e| io_err(path, e))?;
    if let Some(meta) = existing {
        tmp.as_file()
            .set_permissions(meta.permissions())
            .map_err(|e| io_err(path, e))?;
    }
    tmp.write_all(bytes).map_err(|e| io_err(path, e))?;
    tmp.persist(path).map_err(|e| io_err(path, e.error))?;
    Ok(())
}

/// Write record sets as a fresh workbook, one sheet each.
pub fn write_workbook(path: &Path, sheets: &[&RecordSet]) -> Result<(), ReconError> {
    let out: Vec<SheetOut<'_>> = sheets.iter().map(|s| SheetOut::Table(*s)).collect();
    let bytes = to_xlsx_bytes(&out)?;
    write_atomic(path, &bytes)?;
    log::info!("wrote {} sheet(s) to {}", sheets.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cdl() -> RecordSet {
        RecordSet::from_rows(
            "CDL",
            &["Table Field Name", "Biz Name", "Order"],
            vec![
                vec!["vendor_id".into(), "Vendor Id".into(), Value::Number(1.0)],
                vec!["vendor_nm".into(), Value::Empty, Value::Number(2.5)],
            ],
        )
    }

    fn github() -> RecordSet {
        RecordSet::from_rows(
            "GITHUB",
            &["cdm_column", "pdm_column", "active"],
            vec![vec!["VENDOR_ID".into(), "vendor id".into(), Value::Bool(true)]],
        )
    }

    #[test]
    fn write_then_read_named_sheets() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("compare.xlsx");
        write_workbook(&path, &[&cdl(), &github()]).unwrap();

        assert_eq!(sheet_names(&path).unwrap(), vec!["CDL", "GITHUB"]);

        let sets = read_sheets(&path, &["GITHUB", "CDL"]).unwrap();
        assert_eq!(sets[0].name, "GITHUB");
        assert_eq!(sets[0].records[0].get(2), &Value::Bool(true));
        assert_eq!(sets[1], cdl());
    }

    #[test]
    fn missing_sheet_lists_available() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("compare.xlsx");
        write_workbook(&path, &[&cdl()]).unwrap();

        match read_sheet(&path, "GITHUB").unwrap_err() {
            ReconError::MissingSheet { sheet, available } => {
                assert_eq!(sheet, "GITHUB");
                assert_eq!(available, vec!["CDL"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_input_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nope.xlsx");
        assert!(matches!(
            read_sheet(&path, "CDL"),
            Err(ReconError::InputNotFound { .. })
        ));
    }

    #[test]
    fn raw_sheets_keep_cells_in_place() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("notes.xlsx");
        let raw = RawSheet {
            name: "Notes".into(),
            start: (2, 1),
            rows: vec![vec!["hello".into(), Value::Empty, Value::Number(3.0)]],
            formulas: vec![(2, 3, "1+2".into())],
        };
        let bytes = to_xlsx_bytes(&[SheetOut::Raw(&raw)]).unwrap();
        write_atomic(&path, &bytes).unwrap();

        let back = read_raw_sheets(&path).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].name, "Notes");
        assert_eq!(back[0].start, (2, 1));
        assert_eq!(back[0].rows[0][0], Value::Text("hello".into()));
        assert_eq!(back[0].rows[0][2], Value::Number(3.0));
        assert_eq!(back[0].formulas.len(), 1);
        let (row, col, formula) = &back[0].formulas[0];
        assert_eq!((*row, *col), (2, 3));
        assert_eq!(formula.trim_start_matches('='), "1+2");
    }

    #[test]
    fn dates_keep_a_date_format() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("dates.xlsx");
        let set = RecordSet::from_rows(
            "CDL",
            &["Table Field Name", "Created", "At"],
            vec![vec![
                "vendor_id".into(),
                Value::DateTime(45306.0),
                Value::DateTime(45306.5),
            ]],
        );
        write_workbook(&path, &[&set]).unwrap();

        let back = read_sheet(&path, "CDL").unwrap();
        assert_eq!(back.records[0].get(1), &Value::DateTime(45306.0));
        assert_eq!(back.records[0].get(2), &Value::DateTime(45306.5));
    }

    #[test]
    fn write_into_missing_directory_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("no/such/dir/out.xlsx");
        assert!(write_workbook(&path, &[&cdl()]).is_err());
        assert!(!path.exists());
    }

    fn set_readonly(path: &Path, readonly: bool) {
        let mut perms = std::fs::metadata(path).unwrap().permissions();
        perms.set_readonly(readonly);
        std::fs::set_permissions(path, perms).unwrap();
    }

    #[test]
    fn read_only_file_is_write_denied() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("out.xlsx");
        write_workbook(&path, &[&cdl()]).unwrap();
        set_readonly(&path, true);

        let err = write_workbook(&path, &[&github()]).unwrap_err();
        set_readonly(&path, false);

        match err {
            ReconError::OutputWriteDenied { path: denied, .. } => {
                assert_eq!(denied, path.display().to_string());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(sheet_names(&path).unwrap(), vec!["CDL"]);
    }

    #[cfg(unix)]
    #[test]
    fn read_only_directory_is_write_denied() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let locked = temp_dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

        // Privileged users ignore directory modes; nothing to check then.
        let canary = locked.join("canary");
        if std::fs::write(&canary, b"").is_ok() {
            std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let path = locked.join("out.xlsx");
        let result = write_workbook(&path, &[&cdl()]);
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(
            result,
            Err(ReconError::OutputWriteDenied { .. })
        ));
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn rewrite_keeps_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("shared.xlsx");
        write_workbook(&path, &[&cdl()]).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        write_workbook(&path, &[&github()]).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
