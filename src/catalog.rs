//! Static lookup tables: environment keyword → category labels, and
//! category → fields offered for injection.
//!
//! Both ship with built-in defaults (see `data/`) and can be replaced by
//! files named in the configuration. They are loaded once at startup and
//! never change afterwards.

use crate::source::read_delimited;
use crate::table::RawTable;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const KEYWORD_COLUMN: &str = "granular environment";
pub const BROAD_COLUMN: &str = "broad classification";
pub const EXTRA_COLUMN: &str = "extra";

const BUILTIN_MAPPING: &str = include_str!("../data/env_categories.csv");
const BUILTIN_FIELD_CATALOG: &str = include_str!("../data/field_catalog.toml");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse category mapping: {0}")]
    Parse(String),
    #[error("category mapping is missing required column \"{0}\"")]
    MissingColumn(&'static str),
    #[error("category mapping row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },
    #[error("could not parse field catalog: {0}")]
    FieldCatalog(#[from] toml::de::Error),
}

/// One keyword with its broad label and an optional extra label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMappingEntry {
    pub keyword: String,
    pub labels: Vec<String>,
}

impl CategoryMappingEntry {
    pub fn new(keyword: &str, broad: &str, extra: Option<&str>) -> Self {
        let mut labels = vec![broad.to_string()];
        if let Some(extra) = extra.filter(|e| !e.trim().is_empty()) {
            labels.push(extra.to_string());
        }
        Self {
            keyword: keyword.to_string(),
            labels,
        }
    }

    /// Labels joined with `separator`; a single label is returned as-is.
    pub fn label(&self, separator: &str) -> String {
        self.labels.join(separator)
    }
}

/// Ordered keyword table. Order matters: the classifier stops at the first hit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryMapping {
    entries: Vec<CategoryMappingEntry>,
}

impl CategoryMapping {
    pub fn from_entries(entries: Vec<CategoryMappingEntry>) -> Self {
        Self { entries }
    }

    /// The mapping shipped with the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_csv(BUILTIN_MAPPING.as_bytes())
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let bytes = std::fs::read(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_csv(&bytes)
    }

    /// Load from `path` when given, otherwise the built-in table.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(p) => Self::from_path(p),
            None => Self::builtin(),
        }
    }

    pub fn from_csv(bytes: &[u8]) -> Result<Self, CatalogError> {
        let raw = read_delimited(bytes, b',').map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::from_raw(&raw)
    }

    fn from_raw(raw: &RawTable) -> Result<Self, CatalogError> {
        let find = |name: &'static str| {
            raw.columns
                .iter()
                .position(|c| c.trim().eq_ignore_ascii_case(name))
        };
        let keyword_idx = find(KEYWORD_COLUMN).ok_or(CatalogError::MissingColumn(KEYWORD_COLUMN))?;
        let broad_idx = find(BROAD_COLUMN).ok_or(CatalogError::MissingColumn(BROAD_COLUMN))?;
        let extra_idx = find(EXTRA_COLUMN);

        let mut entries = Vec::with_capacity(raw.rows.len());
        for (i, row) in raw.rows.iter().enumerate() {
            let cell = |idx: usize| {
                row.get(idx)
                    .map(|v| v.as_text().trim().to_string())
                    .unwrap_or_default()
            };
            let keyword = cell(keyword_idx);
            let broad = cell(broad_idx);
            // Header is row 1 in the source file.
            let row_number = i + 2;
            if keyword.is_empty() {
                return Err(CatalogError::MalformedRow {
                    row: row_number,
                    reason: format!("empty \"{}\"", KEYWORD_COLUMN),
                });
            }
            if broad.is_empty() {
                return Err(CatalogError::MalformedRow {
                    row: row_number,
                    reason: format!("empty \"{}\" for \"{}\"", BROAD_COLUMN, keyword),
                });
            }
            let extra = extra_idx.map(cell);
            entries.push(CategoryMappingEntry::new(
                &keyword,
                &broad,
                extra.as_deref(),
            ));
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CategoryMappingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Category name → ordered list of fields to offer for injection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FieldCatalog {
    #[serde(default)]
    categories: BTreeMap<String, Vec<String>>,
}

impl FieldCatalog {
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml(BUILTIN_FIELD_CATALOG)
    }

    pub fn from_toml(content: &str) -> Result<Self, CatalogError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(p) => Self::from_path(p),
            None => Self::builtin(),
        }
    }

    pub fn from_map(categories: BTreeMap<String, Vec<String>>) -> Self {
        Self { categories }
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Fields for a category label. Never fails: an unknown label yields an
    /// empty list. A combined label (`"A; B"`) yields A's fields followed by
    /// B's, without repeats.
    pub fn fields_for(&self, label: &str, separator: &str) -> Vec<String> {
        if let Some(fields) = self.categories.get(label) {
            return fields.clone();
        }
        if separator.is_empty() || !label.contains(separator) {
            return Vec::new();
        }
        let mut out: Vec<String> = Vec::new();
        for part in label.split(separator) {
            for field in self.categories.get(part.trim()).into_iter().flatten() {
                if !out.contains(field) {
                    out.push(field.clone());
                }
            }
        }
        out
    }
}
