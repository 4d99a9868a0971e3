// Spreadsheet I/O: named sheets in, planned sheets out

pub mod grid;
pub mod target;
pub mod xlsx;

pub use target::{write_output, OutputTarget, WrittenFile};
pub use xlsx::{read_sheet, read_sheets};
