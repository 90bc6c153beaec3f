//! Row filtering: the derived, read-only display view of the master table.
//!
//! A [`DisplayView`] never owns data. It lists the surviving row ids in
//! master order plus the column names, so that any position in the view
//! can be resolved back to a master cell.

use crate::table::{CellValue, MetadataTable, RowId};
use polars::prelude::{DataFrame, PolarsResult};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

pub const DEFAULT_THRESHOLD_COLUMN: &str = "base_count";
pub const DEFAULT_THRESHOLD: f64 = 1e9;
pub const DEFAULT_NO_RESTRICTION: &str = "All";

/// Fixed parameters of the filter engine.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterRules {
    pub threshold_column: String,
    /// Rows are kept when the threshold column is at least this value.
    pub threshold: f64,
    /// Choice that lifts a categorical restriction.
    pub no_restriction: String,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            threshold_column: DEFAULT_THRESHOLD_COLUMN.to_string(),
            threshold: DEFAULT_THRESHOLD,
            no_restriction: DEFAULT_NO_RESTRICTION.to_string(),
        }
    }
}

/// Active filter state, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub columns: BTreeMap<String, BTreeSet<String>>,
    pub numeric_threshold: bool,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, enabled: bool) -> Self {
        self.numeric_threshold = enabled;
        self
    }

    pub fn with_column<I, S>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_column(column, values);
        self
    }

    /// Replace the allowed values for `column`. An empty set removes the restriction.
    pub fn set_column<I, S>(&mut self, column: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            self.columns.remove(column);
        } else {
            self.columns.insert(column.to_string(), values);
        }
    }

    pub fn clear_column(&mut self, column: &str) {
        self.columns.remove(column);
    }

    pub fn clear(&mut self) {
        self.columns.clear();
        self.numeric_threshold = false;
    }

    /// Drop restrictions on columns that no longer exist in the master table.
    pub fn retain_columns(&mut self, table: &MetadataTable) {
        self.columns.retain(|c, _| table.has_column(c));
    }

    /// Categorical restrictions that actually constrain rows.
    pub fn active_columns<'a>(
        &'a self,
        rules: &'a FilterRules,
    ) -> impl Iterator<Item = (&'a str, &'a BTreeSet<String>)> + 'a {
        self.columns
            .iter()
            .filter(move |(_, allowed)| {
                !allowed.is_empty() && !allowed.contains(&rules.no_restriction)
            })
            .map(|(c, allowed)| (c.as_str(), allowed))
    }

    pub fn is_unrestricted(&self, rules: &FilterRules) -> bool {
        !self.numeric_threshold && self.active_columns(rules).next().is_none()
    }
}

/// Filtered projection of the master table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayView {
    columns: Vec<String>,
    row_ids: Vec<RowId>,
}

impl DisplayView {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_ids(&self) -> &[RowId] {
        &self.row_ids
    }

    pub fn row_count(&self) -> usize {
        self.row_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_ids.is_empty()
    }

    pub fn row_id_at(&self, position: usize) -> Option<RowId> {
        self.row_ids.get(position).copied()
    }

    pub fn column_at(&self, position: usize) -> Option<&str> {
        self.columns.get(position).map(String::as_str)
    }

    /// Read the master cell behind view position `(row, column)`.
    pub fn cell<'a>(
        &self,
        master: &'a MetadataTable,
        row: usize,
        column: usize,
    ) -> Option<&'a CellValue> {
        master.cell(self.row_id_at(row)?, self.column_at(column)?)
    }

    pub fn to_dataframe(&self, master: &MetadataTable) -> PolarsResult<DataFrame> {
        master.to_dataframe(&self.row_ids)
    }

    /// First `n` rows, for previews.
    pub fn head(&self, master: &MetadataTable, n: usize) -> PolarsResult<DataFrame> {
        let n = n.min(self.row_ids.len());
        master.to_dataframe(&self.row_ids[..n])
    }
}

/// Apply `spec` to `master`. Filters compose with AND; row order is the
/// master's; columns are never removed.
pub fn derive_display_view(
    master: &MetadataTable,
    spec: &FilterSpec,
    rules: &FilterRules,
) -> DisplayView {
    let threshold_idx = if spec.numeric_threshold {
        master.column_index(&rules.threshold_column)
    } else {
        None
    };
    let categorical: Vec<(usize, &BTreeSet<String>)> = spec
        .active_columns(rules)
        .filter_map(|(c, allowed)| master.column_index(c).map(|i| (i, allowed)))
        .collect();

    let row_ids: Vec<RowId> = master
        .rows()
        .iter()
        .filter(|row| {
            if let Some(i) = threshold_idx {
                match row.cells[i].as_number() {
                    Some(v) if v >= rules.threshold => {}
                    _ => return false,
                }
            }
            categorical
                .iter()
                .all(|(i, allowed)| allowed.contains(&row.cells[*i].as_text()))
        })
        .map(|row| row.id)
        .collect();

    trace!(
        total = master.row_count(),
        shown = row_ids.len(),
        "derived display view"
    );
    DisplayView {
        columns: master.columns().to_vec(),
        row_ids,
    }
}

/// Options a multi-select control for `column` would offer: the
/// no-restriction marker, then the column's distinct values.
pub fn filter_choices(master: &MetadataTable, column: &str, rules: &FilterRules) -> Vec<String> {
    let mut choices = vec![rules.no_restriction.clone()];
    choices.extend(
        master
            .distinct_values(column)
            .into_iter()
            .filter(|v| *v != rules.no_restriction),
    );
    choices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn master() -> MetadataTable {
        MetadataTable::from_rows(
            vec![
                "run_accession".to_string(),
                "base_count".to_string(),
                "library_strategy".to_string(),
            ],
            vec![
                vec!["SRR1".into(), CellValue::Number(5e8), "WGS".into()],
                vec!["SRR2".into(), CellValue::Number(2e9), "AMPLICON".into()],
                vec!["SRR3".into(), "bad".into(), "WGS".into()],
                vec!["SRR4".into(), "3000000000".into(), "WGS".into()],
            ],
        )
        .unwrap()
    }

    fn runs(view: &DisplayView, t: &MetadataTable) -> Vec<String> {
        (0..view.row_count())
            .map(|r| view.cell(t, r, 0).unwrap().as_text())
            .collect()
    }

    #[test]
    fn test_no_filters_shows_everything() {
        let t = master();
        let view = derive_display_view(&t, &FilterSpec::new(), &FilterRules::default());
        assert_eq!(view.row_count(), 4);
        assert_eq!(view.columns(), t.columns());
    }

    #[test]
    fn test_threshold_excludes_unparseable() {
        let t = MetadataTable::from_rows(
            vec!["base_count".to_string()],
            vec![
                vec![CellValue::Number(5e8)],
                vec![CellValue::Number(2e9)],
                vec!["bad".into()],
            ],
        )
        .unwrap();
        let spec = FilterSpec::new().with_threshold(true);
        let view = derive_display_view(&t, &spec, &FilterRules::default());
        assert_eq!(view.row_ids(), &[t.rows()[1].id]);
    }

    #[test]
    fn test_categorical_and_threshold_compose() {
        let t = master();
        let rules = FilterRules::default();
        let spec = FilterSpec::new()
            .with_threshold(true)
            .with_column("library_strategy", ["WGS"]);
        let view = derive_display_view(&t, &spec, &rules);
        assert_eq!(runs(&view, &t), vec!["SRR4"]);
    }

    #[test]
    fn test_no_restriction_marker_lifts_filter() {
        let t = master();
        let rules = FilterRules::default();
        let spec = FilterSpec::new().with_column("library_strategy", ["All", "WGS"]);
        assert!(spec.is_unrestricted(&rules));
        assert_eq!(derive_display_view(&t, &spec, &rules).row_count(), 4);
    }

    #[test]
    fn test_empty_allowed_set_removes_filter() {
        let mut spec = FilterSpec::new().with_column("library_strategy", ["WGS"]);
        spec.set_column("library_strategy", Vec::<String>::new());
        assert!(spec.columns.is_empty());
    }

    #[test]
    fn test_unknown_column_filter_is_ignored() {
        let t = master();
        let spec = FilterSpec::new().with_column("nope", ["x"]);
        assert_eq!(
            derive_display_view(&t, &spec, &FilterRules::default()).row_count(),
            4
        );
    }

    #[test]
    fn test_numbers_compared_as_text() {
        let t = master();
        let spec = FilterSpec::new().with_column("base_count", ["2000000000"]);
        let view = derive_display_view(&t, &spec, &FilterRules::default());
        assert_eq!(runs(&view, &t), vec!["SRR2"]);
    }

    #[test]
    fn test_more_constraints_never_add_rows() {
        let t = master();
        let rules = FilterRules::default();
        let mut spec = FilterSpec::new();
        let mut last = derive_display_view(&t, &spec, &rules).row_count();
        spec.set_column("library_strategy", ["WGS", "AMPLICON"]);
        let n = derive_display_view(&t, &spec, &rules).row_count();
        assert!(n <= last);
        last = n;
        spec.numeric_threshold = true;
        let n = derive_display_view(&t, &spec, &rules).row_count();
        assert!(n <= last);
        last = n;
        spec.set_column("run_accession", ["SRR2"]);
        assert!(derive_display_view(&t, &spec, &rules).row_count() <= last);
    }

    #[test]
    fn test_order_is_preserved() {
        let t = master();
        let spec = FilterSpec::new().with_column("library_strategy", ["WGS"]);
        let view = derive_display_view(&t, &spec, &FilterRules::default());
        let ids = view.row_ids();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(runs(&view, &t), vec!["SRR1", "SRR3", "SRR4"]);
    }

    #[test]
    fn test_filter_choices() {
        let t = master();
        assert_eq!(
            filter_choices(&t, "library_strategy", &FilterRules::default()),
            vec!["All", "AMPLICON", "WGS"]
        );
    }

    #[test]
    fn test_head_limits_rows() {
        let t = master();
        let view = derive_display_view(&t, &FilterSpec::new(), &FilterRules::default());
        assert_eq!(view.head(&t, 2).unwrap().height(), 2);
        assert_eq!(view.head(&t, 10).unwrap().height(), 4);
    }
}
