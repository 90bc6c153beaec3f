//! Add the curation fields a category calls for.

use crate::catalog::FieldCatalog;
use crate::table::MetadataTable;
use tracing::debug;

/// Append an empty column for every catalog field of `category` the table
/// lacks, in catalog order. Returns the names added; re-applying the same
/// category adds nothing.
pub fn inject_fields(
    table: &mut MetadataTable,
    category: &str,
    catalog: &FieldCatalog,
    separator: &str,
) -> Vec<String> {
    let added: Vec<String> = catalog
        .fields_for(category, separator)
        .into_iter()
        .filter(|field| table.add_column(field))
        .collect();
    debug!(category, added = added.len(), "injected category fields");
    added
}
