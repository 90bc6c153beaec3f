//! Column normalization applied to every freshly fetched table.
//!
//! Three passes, in order: duplicate names get a `__N` suffix, excluded
//! columns are dropped, mandatory columns are added as empty columns.

use crate::table::{CellValue, MetadataTable, RawTable};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Separator between a duplicated column name and its numeric suffix.
pub const DUPLICATE_SUFFIX_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeRules {
    /// Columns always dropped from fetched metadata.
    pub excluded: Vec<String>,
    /// Columns always present after normalization, in this order when added.
    pub mandatory: Vec<String>,
}

/// What normalization changed, for user-facing warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// `(original, renamed)` for every duplicate header.
    pub renamed: Vec<(String, String)>,
    pub dropped: Vec<String>,
    pub added: Vec<String>,
}

impl NormalizeReport {
    pub fn has_duplicates(&self) -> bool {
        !self.renamed.is_empty()
    }
}

/// Rename repeated names so that every name is unique.
///
/// The first occurrence keeps its name; later ones become `name__1`,
/// `name__2`, ... in order of appearance. A suffix is skipped when it would
/// collide with a name already present in the header.
pub fn dedupe_column_names(names: &[String]) -> (Vec<String>, Vec<(String, String)>) {
    let originals: HashSet<&str> = names.iter().map(String::as_str).collect();
    let mut used: HashSet<String> = HashSet::with_capacity(names.len());
    let mut last_suffix: HashMap<&str, usize> = HashMap::new();
    let mut out = Vec::with_capacity(names.len());
    let mut renamed = Vec::new();

    for name in names {
        if used.insert(name.clone()) {
            out.push(name.clone());
            continue;
        }
        let mut k = last_suffix.get(name.as_str()).copied().unwrap_or(0);
        let candidate = loop {
            k += 1;
            let candidate = format!("{}{}{}", name, DUPLICATE_SUFFIX_SEPARATOR, k);
            if !used.contains(&candidate) && !originals.contains(candidate.as_str()) {
                break candidate;
            }
        };
        last_suffix.insert(name.as_str(), k);
        used.insert(candidate.clone());
        renamed.push((name.clone(), candidate.clone()));
        out.push(candidate);
    }
    (out, renamed)
}

/// Normalize a raw table into a fresh master table. The input is not modified.
pub fn normalize(raw: &RawTable, rules: &NormalizeRules) -> (MetadataTable, NormalizeReport) {
    let (names, renamed) = dedupe_column_names(&raw.columns);

    let excluded: HashSet<&str> = rules.excluded.iter().map(String::as_str).collect();
    let keep: Vec<usize> = (0..names.len())
        .filter(|&i| !excluded.contains(names[i].as_str()))
        .collect();
    let dropped: Vec<String> = names
        .iter()
        .filter(|n| excluded.contains(n.as_str()))
        .cloned()
        .collect();

    let mut columns: Vec<String> = keep.iter().map(|&i| names[i].clone()).collect();
    let mut added = Vec::new();
    for name in &rules.mandatory {
        if !columns.contains(name) && !added.contains(name) {
            added.push(name.clone());
        }
    }
    columns.extend(added.iter().cloned());

    let rows: Vec<Vec<CellValue>> = raw
        .rows
        .iter()
        .map(|row| {
            keep.iter()
                .map(|&i| row.get(i).cloned().unwrap_or_default())
                .collect()
        })
        .collect();

    let table = MetadataTable::from_rows(columns, rows).unwrap_or_default();
    if !renamed.is_empty() {
        debug!(count = renamed.len(), "renamed duplicate columns");
    }
    debug!(
        dropped = dropped.len(),
        added = added.len(),
        rows = table.row_count(),
        "normalized fetched metadata"
    );
    (
        table,
        NormalizeReport {
            renamed,
            dropped,
            added,
        },
    )
}
