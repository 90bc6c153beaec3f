//! Apply an edit made in the display view to the master table.

use crate::filter::DisplayView;
use crate::table::{CellValue, MetadataTable, RowId};
use thiserror::Error;
use tracing::debug;

/// A cell edit, addressed by position in the current display view.
#[derive(Debug, Clone, PartialEq)]
pub struct EditEvent {
    pub row: usize,
    pub column: usize,
    pub value: CellValue,
}

impl EditEvent {
    pub fn new(row: usize, column: usize, value: impl Into<CellValue>) -> Self {
        Self {
            row,
            column,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("row {row} is outside the displayed {rows} rows")]
    RowOutOfRange { row: usize, rows: usize },
    #[error("column {column} is outside the displayed {columns} columns")]
    ColumnOutOfRange { column: usize, columns: usize },
    #[error("row {0} no longer exists")]
    UnknownRow(RowId),
    #[error("column \"{0}\" no longer exists")]
    UnknownColumn(String),
}

/// Resolve the view position to a master row id and column name, then
/// write the value there. Nothing is modified when resolution fails.
pub fn reconcile_edit(
    master: &mut MetadataTable,
    view: &DisplayView,
    event: EditEvent,
) -> Result<(RowId, String), EditError> {
    let row_id = view.row_id_at(event.row).ok_or(EditError::RowOutOfRange {
        row: event.row,
        rows: view.row_count(),
    })?;
    let column = view
        .column_at(event.column)
        .ok_or(EditError::ColumnOutOfRange {
            column: event.column,
            columns: view.columns().len(),
        })?
        .to_string();
    if master.row_by_id(row_id).is_none() {
        return Err(EditError::UnknownRow(row_id));
    }
    if !master.set_cell(row_id, &column, event.value) {
        return Err(EditError::UnknownColumn(column));
    }
    debug!(row = %row_id, column = %column, "applied cell edit");
    Ok((row_id, column))
}
