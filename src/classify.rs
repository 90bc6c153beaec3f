//! Suggest an environment category for a project from its organism name.

use crate::catalog::CategoryMapping;
use crate::table::MetadataTable;
use tracing::debug;

pub const DEFAULT_CATEGORY: &str = "Other";
pub const DEFAULT_LABEL_SEPARATOR: &str = "; ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierRules {
    /// Candidate organism columns, tried in order; the first present one is used.
    pub organism_columns: Vec<String>,
    pub default_label: String,
    pub separator: String,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            organism_columns: vec!["scientific_name".to_string(), "organism_name".to_string()],
            default_label: DEFAULT_CATEGORY.to_string(),
            separator: DEFAULT_LABEL_SEPARATOR.to_string(),
        }
    }
}

/// The value the classifier looks at: the organism field of the first row,
/// case-folded. Candidate columns are tried in order and the first one with
/// a non-empty value in that row is used, so an empty column added during
/// normalization does not hide a later candidate.
pub fn representative_value(table: &MetadataTable, rules: &ClassifierRules) -> Option<String> {
    let first = table.rows().first()?;
    rules
        .organism_columns
        .iter()
        .filter_map(|c| table.cell(first.id, c))
        .map(|v| v.as_text().trim().to_lowercase())
        .find(|v| !v.is_empty())
}

/// First mapping keyword contained in the representative value wins.
/// Falls back to the default label when nothing matches, the organism
/// column is absent, or the table has no rows.
pub fn classify(table: &MetadataTable, mapping: &CategoryMapping, rules: &ClassifierRules) -> String {
    let Some(value) = representative_value(table, rules) else {
        debug!("no organism value; using default category");
        return rules.default_label.clone();
    };
    classify_value(&value, mapping, rules)
}

/// Classify a single organism string.
pub fn classify_value(value: &str, mapping: &CategoryMapping, rules: &ClassifierRules) -> String {
    let value = value.to_lowercase();
    mapping
        .entries()
        .iter()
        .find(|entry| {
            let key = entry.keyword.to_lowercase();
            !key.is_empty() && value.contains(&key)
        })
        .map(|entry| {
            debug!(keyword = %entry.keyword, "environment keyword matched");
            entry.label(&rules.separator)
        })
        .unwrap_or_else(|| rules.default_label.clone())
}
