/// The source file as read: rows of optional cells, no column semantics yet.
///
/// Row 0 carries the category of each column, row 1 the field name, and every
/// row after that is one incident record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawGrid {
    /// Each CSV record, one `Option<String>` per field. `None` is a missing cell.
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawGrid {
    pub fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        Self { rows }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Widest row; short rows are treated as padded with missing cells.
    pub fn num_columns(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(|c| c.as_deref())
    }
}
