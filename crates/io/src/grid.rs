// Raw cell grid -> RecordSet (header row + data rows)

use tabmatch_recon::model::{RecordSet, Value};

/// Build a record set from a sheet's used range.
///
/// The first row with any non-empty cell is the header. Blank headers become
/// `Unnamed: <col>` and repeated headers get `.1`, `.2`, ... suffixes so every
/// field name is unique. Rows with no non-empty cell are dropped, and data
/// rows are padded or cut to the header width.
pub fn record_set_from_grid(name: &str, grid: Vec<Vec<Value>>) -> RecordSet {
    let mut rows = grid
        .into_iter()
        .filter(|row| row.iter().any(|v| !v.is_empty()));

    let Some(header) = rows.next() else {
        return RecordSet::new(name, Vec::new());
    };

    let fields = header_names(&header);
    let width = fields.len();
    let mut set = RecordSet::new(name, fields);

    for mut row in rows {
        row.resize(width, Value::Empty);
        set.push(row);
    }

    set
}

fn header_names(header: &[Value]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(header.len());

    for (col, cell) in header.iter().enumerate() {
        let base = if cell.is_empty() {
            format!("Unnamed: {col}")
        } else {
            cell.to_text()
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while names.contains(&candidate) {
            candidate = format!("{base}.{suffix}");
            suffix += 1;
        }
        names.push(candidate);
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<Value> {
        cells.iter().map(|c| Value::from(*c)).collect()
    }

    #[test]
    fn header_then_data() {
        let set = record_set_from_grid(
            "CDL",
            vec![row(&["Table Field Name", "Biz Name"]), row(&["a", "b"])],
        );
        assert_eq!(set.name, "CDL");
        assert_eq!(set.fields, vec!["Table Field Name", "Biz Name"]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.value(0, "Biz Name"), Some(&Value::Text("b".into())));
    }

    #[test]
    fn blank_and_repeated_headers_are_renamed() {
        let set = record_set_from_grid(
            "CDL",
            vec![row(&["id", "", "id", "id", "id.1"])],
        );
        assert_eq!(set.fields, vec!["id", "Unnamed: 1", "id.1", "id.2", "id.1.1"]);
    }

    #[test]
    fn blank_rows_are_dropped_and_short_rows_padded() {
        let set = record_set_from_grid(
            "GITHUB",
            vec![
                row(&["", ""]),
                row(&["cdm_column", "pdm_column"]),
                row(&["", "  "]),
                row(&["x"]),
                row(&["y", "z", "overflow"]),
            ],
        );
        assert_eq!(set.fields, vec!["cdm_column", "pdm_column"]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.records[0].values(), &[Value::Text("x".into()), Value::Empty]);
        assert_eq!(set.records[1].values().len(), 2);
    }

    #[test]
    fn empty_grid_has_no_fields() {
        let set = record_set_from_grid("Empty", vec![]);
        assert!(set.fields.is_empty());
        assert!(set.is_empty());
    }
}
