// In-memory tabular data
// The loanbook carries a caller-defined column set (any number of
// intermediate-parent levels plus passthrough columns that must be echoed on
// output), so inputs are held as a column-ordered string table rather than a
// fixed struct. Empty CSV cells become None.

use anyhow::{Context, Result};
use std::io::{Read, Write};
use std::path::Path;

/// A minimal column-ordered table. All cells are optional strings.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Frame {
    pub fn new(columns: Vec<String>) -> Self {
        Frame {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row. The cell count must match the column count.
    pub fn push_row(&mut self, row: Vec<Option<String>>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> &[Option<String>] {
        &self.rows[index]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Option<String>]> {
        self.rows.iter().map(|r| r.as_slice())
    }

    /// Cell lookup by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows[row][col].as_deref()
    }

    // ========================================================================
    // CSV I/O
    // ========================================================================

    pub fn from_csv_path(path: &Path) -> Result<Frame> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
        Frame::from_csv_reader(file)
            .with_context(|| format!("Failed to read CSV file: {}", path.display()))
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Frame> {
        let mut rdr = csv::Reader::from_reader(reader);

        let columns: Vec<String> = rdr
            .headers()
            .context("Failed to read CSV header")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut frame = Frame::new(columns);
        for result in rdr.records() {
            let record = result.context("Failed to read CSV record")?;
            let row: Vec<Option<String>> = record
                .iter()
                .map(|cell| {
                    let cell = cell.trim();
                    if cell.is_empty() {
                        None
                    } else {
                        Some(cell.to_string())
                    }
                })
                .collect();
            frame.push_row(row);
        }

        Ok(frame)
    }

    pub fn write_csv_path(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
        self.write_csv(file)
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.columns)
            .context("Failed to write CSV header")?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))
                .context("Failed to write CSV record")?;
        }
        wtr.flush().context("Failed to flush CSV writer")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_from_csv_reader() {
        let csv = "id_loan,name_direct_loantaker\nL1,Acme Corp\nL2,\n";
        let frame = Frame::from_csv_reader(Cursor::new(csv)).unwrap();

        assert_eq!(frame.columns(), &["id_loan", "name_direct_loantaker"]);
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.get(0, "id_loan"), Some("L1"));
        assert_eq!(frame.get(0, "name_direct_loantaker"), Some("Acme Corp"));
        assert_eq!(frame.get(1, "name_direct_loantaker"), None);
    }

    #[test]
    fn test_csv_round_trip() {
        let csv = "a,b\n1,\n,2\n";
        let frame = Frame::from_csv_reader(Cursor::new(csv)).unwrap();

        let mut out = Vec::new();
        frame.write_csv(&mut out).unwrap();
        let again = Frame::from_csv_reader(Cursor::new(out)).unwrap();

        assert_eq!(frame, again);
    }

    #[test]
    fn test_missing_column_lookup() {
        let frame = Frame::new(vec!["a".to_string()]);
        assert!(frame.column_index("b").is_none());
        assert!(!frame.has_column("b"));
        assert!(frame.has_column("a"));
    }
}
