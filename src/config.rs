use crate::catalog::{CategoryMapping, FieldCatalog};
use crate::classify::{ClassifierRules, DEFAULT_CATEGORY, DEFAULT_LABEL_SEPARATOR};
use crate::export::{ExportOptions, DEFAULT_FILENAME_SUFFIX};
use crate::fetch::{DEFAULT_ENA_URL, DEFAULT_FIELDS, DEFAULT_TIMEOUT_SECS};
use crate::filter::{FilterRules, DEFAULT_NO_RESTRICTION, DEFAULT_THRESHOLD, DEFAULT_THRESHOLD_COLUMN};
use crate::normalize::NormalizeRules;
use crate::CompressionFormat;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.toml";
const CONFIG_VERSION: &str = "0.1";

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Generate default configuration template as a string with comments.
    /// All fields are commented out so defaults are used, but users can uncomment to override.
    pub fn generate_default_config(&self) -> String {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config)
            .unwrap_or_else(|e| panic!("Failed to serialize default config: {}", e));

        Self::comment_all_fields(&toml_str, &Self::collect_all_comments())
    }

    fn collect_all_comments() -> HashMap<String, String> {
        let sections: &[(&str, &[(&str, &str)])] = &[
            ("", APP_COMMENTS),
            ("fetch", FETCH_COMMENTS),
            ("curation", CURATION_COMMENTS),
            ("filter", FILTER_COMMENTS),
            ("catalog", CATALOG_COMMENTS),
            ("export", EXPORT_COMMENTS),
            ("logging", LOGGING_COMMENTS),
        ];
        let mut comments = HashMap::new();
        for (section, fields) in sections {
            for (field, comment) in *fields {
                let key = if section.is_empty() {
                    field.to_string()
                } else {
                    format!("{}.{}", section, field)
                };
                comments.insert(key, comment.to_string());
            }
        }
        comments
    }

    /// Comment out every line of the serialized defaults and attach field comments.
    /// Unset Option fields are added as `# field = null` so they stay discoverable.
    fn comment_all_fields(toml: &str, comments: &HashMap<String, String>) -> String {
        let mut result = String::new();
        result.push_str("# sracurate configuration file\n");
        result
            .push_str("# This file uses TOML format. See https://toml.io/ for syntax reference.\n");
        result.push('\n');

        let mut current_section = String::new();
        let mut seen: HashSet<String> = HashSet::new();

        let mut lines = toml.lines().peekable();
        while let Some(line) = lines.next() {
            if let Some(section) = extract_section_name(line) {
                Self::push_missing_options(&mut result, &current_section, comments, &seen);
                current_section = section;
                if let Some((_, header)) = SECTION_HEADERS
                    .iter()
                    .find(|(s, _)| *s == current_section)
                {
                    result.push_str(header);
                    result.push('\n');
                }
                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
                continue;
            }

            if let Some(field_path) = extract_field_path(line, &current_section) {
                if let Some(comment) = comments.get(&field_path) {
                    for comment_line in comment.lines() {
                        result.push_str("# ");
                        result.push_str(comment_line);
                        result.push('\n');
                    }
                }
                seen.insert(field_path);
                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
            } else if line.trim().is_empty() {
                result.push('\n');
            } else {
                // continuation of a multi-line array
                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
            }

            if lines.peek().is_none() {
                Self::push_missing_options(&mut result, &current_section, comments, &seen);
            }
        }
        result
    }

    fn push_missing_options(
        result: &mut String,
        section: &str,
        comments: &HashMap<String, String>,
        seen: &HashSet<String>,
    ) {
        for field_path in OPTION_FIELDS {
            let Some((field_section, field)) = field_path.split_once('.') else {
                continue;
            };
            if field_section != section || seen.contains(*field_path) {
                continue;
            }
            if let Some(comment) = comments.get(*field_path) {
                for comment_line in comment.lines() {
                    result.push_str("# ");
                    result.push_str(comment_line);
                    result.push('\n');
                }
            }
            result.push_str(&format!("# {} = null\n", field));
        }
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path(CONFIG_FILE);

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, self.generate_default_config())?;

        Ok(config_path)
    }
}

/// Extract section name from TOML line like "[fetch]"
fn extract_section_name(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.starts_with('[') && trimmed.ends_with(']') && !trimmed.contains('=') {
        Some(trimmed[1..trimmed.len() - 1].to_string())
    } else {
        None
    }
}

/// Extract "section.field" from a `field = value` line
fn extract_field_path(line: &str, current_section: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('[') {
        return None;
    }
    let eq_pos = trimmed.find('=')?;
    let field_name = trimmed[..eq_pos].trim();
    if field_name.starts_with('"') {
        return None;
    }
    if current_section.is_empty() {
        Some(field_name.to_string())
    } else {
        Some(format!("{}.{}", current_section, field_name))
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub fetch: FetchConfig,
    pub curation: CurationConfig,
    pub filter: FilterConfig,
    pub catalog: CatalogConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

const APP_COMMENTS: &[(&str, &str)] = &[(
    "version",
    "Configuration format version (for future compatibility)",
)];

const SECTION_HEADERS: &[(&str, &str)] = &[
    (
        "fetch",
        "# ============================================================================\n# Metadata Service\n# ============================================================================",
    ),
    (
        "curation",
        "# ============================================================================\n# Column Normalization and Classification\n# ============================================================================",
    ),
    (
        "filter",
        "# ============================================================================\n# Filters\n# ============================================================================",
    ),
    (
        "catalog",
        "# ============================================================================\n# Category Tables\n# ============================================================================\n# Leave paths unset to use the built-in tables.",
    ),
    (
        "export",
        "# ============================================================================\n# CSV Export\n# ============================================================================",
    ),
    (
        "logging",
        "# ============================================================================\n# Logging\n# ============================================================================",
    ),
];

/// Option fields that are not serialized while unset but should appear in the template
const OPTION_FIELDS: &[&str] = &[
    "catalog.mapping_path",
    "catalog.field_catalog_path",
    "export.directory",
    "export.compression",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Fields requested for a standard (non-detailed) fetch
    pub fields: Vec<String>,
    pub detailed: bool,
}

const FETCH_COMMENTS: &[(&str, &str)] = &[
    ("base_url", "Run report endpoint of the metadata service"),
    ("timeout_secs", "Request timeout in seconds"),
    (
        "fields",
        "Fields requested for a standard fetch. A detailed fetch asks for all fields",
    ),
    ("detailed", "Always perform a detailed fetch"),
];

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ENA_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            fields: DEFAULT_FIELDS.iter().map(|s| s.to_string()).collect(),
            detailed: false,
        }
    }
}

impl FetchConfig {
    pub fn merge(&mut self, other: Self) {
        let default = FetchConfig::default();
        if other.base_url != default.base_url {
            self.base_url = other.base_url;
        }
        if other.timeout_secs != default.timeout_secs {
            self.timeout_secs = other.timeout_secs;
        }
        if other.fields != default.fields {
            self.fields = other.fields;
        }
        if other.detailed != default.detailed {
            self.detailed = other.detailed;
        }
    }

    #[cfg(feature = "http")]
    pub fn ena_fetcher(&self) -> crate::fetch::EnaFetcher {
        crate::fetch::EnaFetcher {
            base_url: self.base_url.clone(),
            timeout: std::time::Duration::from_secs(self.timeout_secs),
            fields: self.fields.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CurationConfig {
    pub excluded_columns: Vec<String>,
    pub mandatory_columns: Vec<String>,
    pub organism_columns: Vec<String>,
    pub default_category: String,
    pub label_separator: String,
}

const CURATION_COMMENTS: &[(&str, &str)] = &[
    (
        "excluded_columns",
        "Columns dropped from every fetched table (missing names are ignored)",
    ),
    (
        "mandatory_columns",
        "Columns always present after a fetch; missing ones are added empty",
    ),
    (
        "organism_columns",
        "Columns holding the organism name, tried in order, used to suggest a category",
    ),
    (
        "default_category",
        "Category suggested when no mapping keyword matches",
    ),
    (
        "label_separator",
        "Separator between a broad label and its extra label",
    ),
];

impl Default for CurationConfig {
    fn default() -> Self {
        let rules = ClassifierRules::default();
        Self {
            excluded_columns: [
                "fastq_ftp",
                "fastq_md5",
                "fastq_bytes",
                "fastq_aspera",
                "submitted_ftp",
                "submitted_md5",
                "sra_ftp",
                "sra_md5",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            mandatory_columns: [
                "run_accession",
                "sample_accession",
                "scientific_name",
                "library_strategy",
                "base_count",
                "collection_date",
                "country",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            organism_columns: rules.organism_columns,
            default_category: DEFAULT_CATEGORY.to_string(),
            label_separator: DEFAULT_LABEL_SEPARATOR.to_string(),
        }
    }
}

impl CurationConfig {
    pub fn merge(&mut self, other: Self) {
        let default = CurationConfig::default();
        if other.excluded_columns != default.excluded_columns {
            self.excluded_columns = other.excluded_columns;
        }
        if other.mandatory_columns != default.mandatory_columns {
            self.mandatory_columns = other.mandatory_columns;
        }
        if other.organism_columns != default.organism_columns {
            self.organism_columns = other.organism_columns;
        }
        if other.default_category != default.default_category {
            self.default_category = other.default_category;
        }
        if other.label_separator != default.label_separator {
            self.label_separator = other.label_separator;
        }
    }

    pub fn normalize_rules(&self) -> NormalizeRules {
        NormalizeRules {
            excluded: self.excluded_columns.clone(),
            mandatory: self.mandatory_columns.clone(),
        }
    }

    pub fn classifier_rules(&self) -> ClassifierRules {
        ClassifierRules {
            organism_columns: self.organism_columns.clone(),
            default_label: self.default_category.clone(),
            separator: self.label_separator.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterConfig {
    pub threshold_column: String,
    pub threshold: f64,
    pub no_restriction: String,
}

const FILTER_COMMENTS: &[(&str, &str)] = &[
    (
        "threshold_column",
        "Column compared against the threshold when the numeric filter is on",
    ),
    (
        "threshold",
        "Rows are kept when threshold_column is at least this value",
    ),
    (
        "no_restriction",
        "Choice that disables a categorical filter",
    ),
];

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            threshold_column: DEFAULT_THRESHOLD_COLUMN.to_string(),
            threshold: DEFAULT_THRESHOLD,
            no_restriction: DEFAULT_NO_RESTRICTION.to_string(),
        }
    }
}

impl FilterConfig {
    pub fn merge(&mut self, other: Self) {
        let default = FilterConfig::default();
        if other.threshold_column != default.threshold_column {
            self.threshold_column = other.threshold_column;
        }
        if other.threshold != default.threshold {
            self.threshold = other.threshold;
        }
        if other.no_restriction != default.no_restriction {
            self.no_restriction = other.no_restriction;
        }
    }

    pub fn rules(&self) -> FilterRules {
        FilterRules {
            threshold_column: self.threshold_column.clone(),
            threshold: self.threshold,
            no_restriction: self.no_restriction.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    pub mapping_path: Option<PathBuf>,
    pub field_catalog_path: Option<PathBuf>,
}

const CATALOG_COMMENTS: &[(&str, &str)] = &[
    (
        "mapping_path",
        "CSV with columns \"granular environment\", \"broad classification\" and optional \"extra\"",
    ),
    (
        "field_catalog_path",
        "TOML file with a [categories] table of category = [fields]",
    ),
];

impl CatalogConfig {
    pub fn merge(&mut self, other: Self) {
        if other.mapping_path.is_some() {
            self.mapping_path = other.mapping_path;
        }
        if other.field_catalog_path.is_some() {
            self.field_catalog_path = other.field_catalog_path;
        }
    }

    /// Load both tables. Errors here are fatal for the application.
    pub fn load(&self) -> Result<(CategoryMapping, FieldCatalog)> {
        let mapping = CategoryMapping::load(self.mapping_path.as_deref())?;
        let catalog = FieldCatalog::load(self.field_catalog_path.as_deref())?;
        Ok((mapping, catalog))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    /// Destination directory. null = current directory
    pub directory: Option<PathBuf>,
    pub filename_suffix: String,
    /// Field delimiter as ASCII value (44 = comma)
    pub delimiter: u8,
    pub include_header: bool,
    /// gzip, zstd, bzip2 or xz. null = uncompressed
    pub compression: Option<String>,
    pub preview_rows: usize,
}

const EXPORT_COMMENTS: &[(&str, &str)] = &[
    (
        "directory",
        "Directory exports are written to. null = current directory",
    ),
    (
        "filename_suffix",
        "Appended to the project id to form the file name",
    ),
    ("delimiter", "Field delimiter as ASCII value (44 = comma, 9 = tab)"),
    ("include_header", "Write a header row"),
    (
        "compression",
        "Compress the exported file: \"gzip\", \"zstd\", \"bzip2\" or \"xz\". null = uncompressed",
    ),
    ("preview_rows", "Number of rows shown in the preview"),
];

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: None,
            filename_suffix: DEFAULT_FILENAME_SUFFIX.to_string(),
            delimiter: b',',
            include_header: true,
            compression: None,
            preview_rows: 10,
        }
    }
}

impl ExportConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ExportConfig::default();
        if other.directory.is_some() {
            self.directory = other.directory;
        }
        if other.filename_suffix != default.filename_suffix {
            self.filename_suffix = other.filename_suffix;
        }
        if other.delimiter != default.delimiter {
            self.delimiter = other.delimiter;
        }
        if other.include_header != default.include_header {
            self.include_header = other.include_header;
        }
        if other.compression.is_some() {
            self.compression = other.compression;
        }
        if other.preview_rows != default.preview_rows {
            self.preview_rows = other.preview_rows;
        }
    }

    pub fn options(&self) -> ExportOptions {
        ExportOptions {
            directory: self
                .directory
                .clone()
                .unwrap_or_else(|| PathBuf::from(".")),
            filename_suffix: self.filename_suffix.clone(),
            delimiter: self.delimiter,
            include_header: self.include_header,
            compression: self
                .compression
                .as_deref()
                .and_then(CompressionFormat::from_name),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// tracing filter directive; RUST_LOG takes precedence
    pub filter: String,
}

const LOGGING_COMMENTS: &[(&str, &str)] = &[(
    "filter",
    "Log filter (tracing EnvFilter syntax). RUST_LOG overrides this",
)];

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "sracurate=info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        if other.filter != LoggingConfig::default().filter {
            self.filter = other.filter;
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            fetch: FetchConfig::default(),
            curation: CurationConfig::default(),
            filter: FilterConfig::default(),
            catalog: CatalogConfig::default(),
            export: ExportConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// Configuration loading and merging
impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let manager = ConfigManager::new(app_name)?;
        Self::load_from(&manager)
    }

    /// Load configuration using a specific config directory
    pub fn load_from(manager: &ConfigManager) -> Result<Self> {
        let mut config = AppConfig::default();
        let config_path = manager.config_path(CONFIG_FILE);
        if config_path.exists() {
            config.merge(Self::read_file(&config_path)?);
        }

        config
            .validate()
            .map_err(|e| eyre!("Invalid configuration in {}: {}", config_path.display(), e))?;

        Ok(config)
    }

    fn read_file(path: &Path) -> Result<AppConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre!("Failed to read config file at {}: {}", path.display(), e))?;

        toml::from_str(&content)
            .map_err(|e| eyre!("Failed to parse config file at {}: {}", path.display(), e))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }
        self.fetch.merge(other.fetch);
        self.curation.merge(other.curation);
        self.filter.merge(other.filter);
        self.catalog.merge(other.catalog);
        self.export.merge(other.export);
        self.logging.merge(other.logging);
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with(CONFIG_VERSION) {
            return Err(eyre!(
                "Unsupported config version: {}. Expected {}.x",
                self.version,
                CONFIG_VERSION
            ));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(eyre!("fetch.timeout_secs must be greater than 0"));
        }
        if !self.filter.threshold.is_finite() {
            return Err(eyre!("filter.threshold must be a finite number"));
        }
        if self.filter.threshold_column.trim().is_empty() {
            return Err(eyre!("filter.threshold_column must not be empty"));
        }
        if self.curation.label_separator.is_empty() {
            return Err(eyre!("curation.label_separator must not be empty"));
        }
        if self.export.filename_suffix.contains(['/', '\\']) {
            return Err(eyre!("export.filename_suffix must not contain path separators"));
        }
        if let Some(name) = &self.export.compression {
            if CompressionFormat::from_name(name).is_none() {
                return Err(eyre!("Unknown export.compression \"{}\"", name));
            }
        }
        Ok(())
    }
}
