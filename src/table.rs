//! In-memory run metadata: the raw fetched table and the curated master table.
//!
//! The master table owns every row. Rows carry a [`RowId`] assigned at
//! ingestion so that derived views can refer back to them after filtering,
//! column changes or edits.

use polars::prelude::{Column, DataFrame, PolarsResult};
use std::collections::BTreeSet;
use std::fmt;

/// A loosely-typed cell value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    /// Build a cell from user- or service-supplied text. Empty text is [`CellValue::Empty`].
    pub fn from_text(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// Text rendering used for categorical comparison and export.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
        }
    }

    /// Numeric coercion. Text that does not parse as a number yields `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            CellValue::Number(n) => Some(*n),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::from_text(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s)
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// Integral values print without a fractional part (`2000000000`, not `2000000000.0`).
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Stable identity of a master-table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Table as returned by a metadata service: header names may repeat.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: RowId,
    pub cells: Vec<CellValue>,
}

/// The master record set. Column names are pairwise unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataTable {
    columns: Vec<String>,
    rows: Vec<Row>,
    next_id: u64,
}

impl MetadataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from unique column names and rows. Returns `None` when
    /// a name repeats. Short rows are padded with empty cells, long rows truncated.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Option<Self> {
        let mut seen = BTreeSet::new();
        if !columns.iter().all(|c| seen.insert(c.as_str())) {
            return None;
        }
        let mut table = Self {
            columns,
            rows: Vec::with_capacity(rows.len()),
            next_id: 0,
        };
        for cells in rows {
            table.push_row(cells);
        }
        Some(table)
    }

    /// Append a row and return the identity assigned to it.
    pub fn push_row(&mut self, mut cells: Vec<CellValue>) -> RowId {
        cells.resize(self.columns.len(), CellValue::Empty);
        let id = RowId(self.next_id);
        self.next_id += 1;
        self.rows.push(Row { id, cells });
        id
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn row_by_id(&self, id: RowId) -> Option<&Row> {
        // Ids are assigned in push order and rows are never reordered.
        self.rows
            .binary_search_by_key(&id, |r| r.id)
            .ok()
            .map(|i| &self.rows[i])
    }

    fn row_position(&self, id: RowId) -> Option<usize> {
        self.rows.binary_search_by_key(&id, |r| r.id).ok()
    }

    pub fn cell(&self, id: RowId, column: &str) -> Option<&CellValue> {
        let c = self.column_index(column)?;
        self.row_by_id(id).and_then(|r| r.cells.get(c))
    }

    /// Overwrite one cell. Returns `false` (and changes nothing) when the row
    /// or column does not exist.
    pub fn set_cell(&mut self, id: RowId, column: &str, value: CellValue) -> bool {
        let Some(c) = self.column_index(column) else {
            return false;
        };
        let Some(r) = self.row_position(id) else {
            return false;
        };
        self.rows[r].cells[c] = value;
        true
    }

    /// Append a column of empty values. Empty or whitespace-only names and
    /// names already present are ignored.
    pub fn add_column(&mut self, name: &str) -> bool {
        if name.trim().is_empty() || self.has_column(name) {
            return false;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.cells.push(CellValue::Empty);
        }
        true
    }

    /// Remove every named column that exists; absent names are skipped.
    /// Returns how many columns were removed.
    pub fn remove_columns<S: AsRef<str>>(&mut self, names: &[S]) -> usize {
        let drop: BTreeSet<&str> = names.iter().map(|n| n.as_ref()).collect();
        let keep: Vec<bool> = self
            .columns
            .iter()
            .map(|c| !drop.contains(c.as_str()))
            .collect();
        let removed = keep.iter().filter(|k| !**k).count();
        if removed == 0 {
            return 0;
        }
        let mut flags = keep.iter();
        self.columns.retain(|_| *flags.next().unwrap_or(&true));
        for row in &mut self.rows {
            let mut flags = keep.iter();
            row.cells.retain(|_| *flags.next().unwrap_or(&true));
        }
        removed
    }

    /// Sorted distinct text values of a column (empty cells included as `""`).
    pub fn distinct_values(&self, column: &str) -> Vec<String> {
        let Some(c) = self.column_index(column) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .map(|r| r.cells[c].as_text())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Materialize selected rows as a polars frame of string columns.
    /// Empty cells become nulls.
    pub fn to_dataframe(&self, row_ids: &[RowId]) -> PolarsResult<DataFrame> {
        let positions: Vec<usize> = row_ids
            .iter()
            .filter_map(|id| self.row_position(*id))
            .collect();
        let columns: Vec<Column> = self
            .columns
            .iter()
            .enumerate()
            .map(|(c, name)| {
                let values: Vec<Option<String>> = positions
                    .iter()
                    .map(|&r| match &self.rows[r].cells[c] {
                        CellValue::Empty => None,
                        v => Some(v.as_text()),
                    })
                    .collect();
                Column::new(name.as_str().into(), values)
            })
            .collect();
        DataFrame::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MetadataTable {
        MetadataTable::from_rows(
            vec!["run".to_string(), "bases".to_string()],
            vec![
                vec!["SRR1".into(), CellValue::Number(5e8)],
                vec!["SRR2".into(), CellValue::Number(2e9)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_cell_value_text_and_number() {
        assert_eq!(CellValue::Number(2e9).as_text(), "2000000000");
        assert_eq!(CellValue::Number(1.5).as_text(), "1.5");
        assert_eq!(CellValue::from_text(" 42 ").as_number(), Some(42.0));
        assert_eq!(CellValue::from_text("bad").as_number(), None);
        assert_eq!(CellValue::from_text(""), CellValue::Empty);
        assert!(CellValue::Text(String::new()).is_empty());
    }

    #[test]
    fn test_from_rows_rejects_duplicates() {
        assert!(MetadataTable::from_rows(vec!["a".into(), "a".into()], vec![]).is_none());
    }

    #[test]
    fn test_from_rows_pads_short_rows() {
        let t = MetadataTable::from_rows(
            vec!["a".into(), "b".into()],
            vec![vec!["x".into()], vec!["1".into(), "2".into(), "3".into()]],
        )
        .unwrap();
        assert_eq!(t.rows()[0].cells, vec![CellValue::from("x"), CellValue::Empty]);
        assert_eq!(t.rows()[1].cells.len(), 2);
    }

    #[test]
    fn test_add_column() {
        let mut t = sample();
        assert!(t.add_column("notes"));
        assert_eq!(t.columns(), &["run", "bases", "notes"]);
        assert!(t.rows().iter().all(|r| r.cells[2] == CellValue::Empty));

        assert!(!t.add_column("notes"));
        assert!(!t.add_column("   "));
        assert!(!t.add_column(""));
        assert_eq!(t.columns().len(), 3);
    }

    #[test]
    fn test_remove_columns_ignores_missing() {
        let mut t = sample();
        assert_eq!(t.remove_columns(&["bases", "missing"]), 1);
        assert_eq!(t.columns(), &["run"]);
        assert_eq!(t.rows()[1].cells, vec![CellValue::from("SRR2")]);
        assert_eq!(t.remove_columns(&["missing"]), 0);
    }

    #[test]
    fn test_set_cell_by_row_id() {
        let mut t = sample();
        let id = t.rows()[1].id;
        assert!(t.set_cell(id, "run", "SRR9".into()));
        assert_eq!(t.cell(id, "run"), Some(&CellValue::from("SRR9")));
        assert!(!t.set_cell(RowId(99), "run", "x".into()));
        assert!(!t.set_cell(id, "nope", "x".into()));
    }

    #[test]
    fn test_distinct_values_sorted() {
        let mut t = sample();
        t.push_row(vec!["SRR1".into(), CellValue::Empty]);
        assert_eq!(t.distinct_values("run"), vec!["SRR1", "SRR2"]);
        assert!(t.distinct_values("missing").is_empty());
    }

    #[test]
    fn test_to_dataframe_selects_rows() {
        let t = sample();
        let df = t.to_dataframe(&[t.rows()[1].id]).unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(df.width(), 2);
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec!["run", "bases"]);
    }
}
