//! Metadata fetch collaborators.
//!
//! The curation core only sees the [`MetadataFetcher`] trait. Fetching is
//! blocking; callers that need cancellation wrap it themselves.

use crate::source::{read_delimited, read_delimited_file};
use crate::table::RawTable;
use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

pub const DEFAULT_ENA_URL: &str = "https://www.ebi.ac.uk/ena/portal/api/filereport";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Run fields requested when a detailed fetch is not asked for.
pub const DEFAULT_FIELDS: &[&str] = &[
    "run_accession",
    "sample_accession",
    "experiment_accession",
    "study_accession",
    "scientific_name",
    "tax_id",
    "instrument_platform",
    "instrument_model",
    "library_name",
    "library_strategy",
    "library_source",
    "library_selection",
    "library_layout",
    "read_count",
    "base_count",
    "collection_date",
    "country",
    "fastq_ftp",
];

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("metadata service returned {status}: {message}")]
    Service { status: u16, message: String },
    #[error("unknown project \"{0}\"")]
    UnknownProject(String),
    #[error("no runs found for \"{0}\"")]
    EmptyResult(String),
    #[error("could not read metadata: {0}")]
    Parse(String),
}

pub trait MetadataFetcher {
    /// Fetch run metadata for a project. `detailed` asks for every field the
    /// service can return instead of the default selection.
    fn fetch(&self, project_id: &str, detailed: bool) -> Result<RawTable, FetchError>;
}

/// Whether `id` looks like a BioProject or SRA/ENA/DDBJ study accession.
pub fn is_known_accession(id: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(PRJ(NA|EB|DB)\d+|[SED]RP\d+|[SED]RX\d+|[SED]RR\d+)$")
            .unwrap_or_else(|e| panic!("invalid accession pattern: {}", e))
    });
    re.is_match(id)
}

/// Whether `id` can name a project and its export file: letters, digits,
/// `_`, `-` and `.`, with no `..` component. Anything else could leave the
/// export directory once joined into a path.
pub fn is_valid_project_id(id: &str) -> bool {
    !id.is_empty()
        && !id.contains("..")
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn non_empty(project_id: &str, table: RawTable) -> Result<RawTable, FetchError> {
    if table.is_empty() {
        Err(FetchError::EmptyResult(project_id.to_string()))
    } else {
        Ok(table)
    }
}

/// ENA portal `filereport` client (tab-separated run report).
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct EnaFetcher {
    pub base_url: String,
    pub timeout: std::time::Duration,
    pub fields: Vec<String>,
}

#[cfg(feature = "http")]
impl Default for EnaFetcher {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ENA_URL.to_string(),
            timeout: std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            fields: DEFAULT_FIELDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(feature = "http")]
impl EnaFetcher {
    fn fields_param(&self, detailed: bool) -> String {
        if detailed || self.fields.is_empty() {
            "all".to_string()
        } else {
            self.fields.join(",")
        }
    }
}

#[cfg(feature = "http")]
impl MetadataFetcher for EnaFetcher {
    fn fetch(&self, project_id: &str, detailed: bool) -> Result<RawTable, FetchError> {
        use std::io::Read;

        tracing::info!(project = project_id, detailed, url = %self.base_url, "fetching run metadata");
        let response = ureq::get(&self.base_url)
            .timeout(self.timeout)
            .query("accession", project_id)
            .query("result", "read_run")
            .query("fields", &self.fields_param(detailed))
            .query("format", "tsv")
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(400 | 404, _) => {
                    FetchError::UnknownProject(project_id.to_string())
                }
                ureq::Error::Status(status, response) => FetchError::Service {
                    status,
                    message: response
                        .into_string()
                        .ok()
                        .and_then(|s| s.lines().next().map(str::to_string))
                        .unwrap_or_else(|| "no message".to_string()),
                },
                ureq::Error::Transport(t) => FetchError::Network(t.to_string()),
            })?;

        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let table = read_delimited(&body, b'\t').map_err(|e| FetchError::Parse(e.to_string()))?;
        non_empty(project_id, table)
    }
}

/// Reads a previously downloaded report from disk, whatever the project id.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    pub path: PathBuf,
}

impl FileFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MetadataFetcher for FileFetcher {
    fn fetch(&self, project_id: &str, _detailed: bool) -> Result<RawTable, FetchError> {
        if !self.path.exists() {
            return Err(FetchError::UnknownProject(project_id.to_string()));
        }
        let table =
            read_delimited_file(&self.path).map_err(|e| FetchError::Parse(e.to_string()))?;
        non_empty(project_id, table)
    }
}

/// In-memory fetcher keyed by project id.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    tables: HashMap<String, RawTable>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, project_id: &str, table: RawTable) -> Self {
        self.tables.insert(project_id.to_string(), table);
        self
    }
}

impl MetadataFetcher for StaticFetcher {
    fn fetch(&self, project_id: &str, _detailed: bool) -> Result<RawTable, FetchError> {
        let table = self
            .tables
            .get(project_id)
            .cloned()
            .ok_or_else(|| FetchError::UnknownProject(project_id.to_string()))?;
        non_empty(project_id, table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_known_accessions() {
        assert!(is_known_accession("PRJNA123456"));
        assert!(is_known_accession("prjeb42"));
        assert!(is_known_accession("SRP098789"));
        assert!(!is_known_accession("hello"));
        assert!(!is_known_accession("PRJNA"));
    }

    #[test]
    fn test_valid_project_id() {
        assert!(is_valid_project_id("PRJNA123456"));
        assert!(is_valid_project_id("my-study_v2.1"));
        assert!(!is_valid_project_id(""));
        assert!(!is_valid_project_id("../escaped"));
        assert!(!is_valid_project_id("/tmp/abs"));
        assert!(!is_valid_project_id("a\\b"));
        assert!(!is_valid_project_id(".."));
        assert!(!is_valid_project_id("PRJ NA1"));
    }

    #[test]
    fn test_static_fetcher() {
        let table = RawTable::new(vec!["a".into()], vec![vec!["1".into()]]);
        let fetcher = StaticFetcher::new()
            .with_table("PRJNA1", table.clone())
            .with_table("PRJNA2", RawTable::new(vec!["a".into()], vec![]));
        assert_eq!(fetcher.fetch("PRJNA1", false).unwrap(), table);
        assert!(matches!(
            fetcher.fetch("PRJNA2", false),
            Err(FetchError::EmptyResult(_))
        ));
        assert!(matches!(
            fetcher.fetch("PRJNA3", false),
            Err(FetchError::UnknownProject(_))
        ));
    }

    #[test]
    fn test_file_fetcher_reads_tsv() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("report.tsv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "run_accession\tbase_count").unwrap();
        writeln!(f, "SRR1\t100").unwrap();
        drop(f);

        let raw = FileFetcher::new(&path).fetch("PRJNA1", false).unwrap();
        assert_eq!(raw.columns, vec!["run_accession", "base_count"]);
        assert_eq!(raw.rows.len(), 1);

        let missing = FileFetcher::new(dir.path().join("none.tsv"));
        assert!(matches!(
            missing.fetch("PRJNA1", false),
            Err(FetchError::UnknownProject(_))
        ));
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_fields_param() {
        let f = EnaFetcher::default();
        assert_eq!(f.fields_param(true), "all");
        assert!(f.fields_param(false).starts_with("run_accession,"));
    }
}
