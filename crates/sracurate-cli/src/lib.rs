//! Shared CLI definitions for sracurate.
//!
//! Used by the main application and by the build script (manpage) and
//! gen_docs binary (command-line-options markdown).

use clap::{CommandFactory, Parser, ValueEnum};
use std::path::{Path, PathBuf};

/// Compression format for exported files
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Gzip compression (.gz) - Most common, good balance of speed and compression
    Gzip,
    /// Zstandard compression (.zst) - Modern, fast compression with good ratios
    Zstd,
    /// Bzip2 compression (.bz2) - Good compression ratio, slower than gzip
    Bzip2,
    /// XZ compression (.xz) - Excellent compression ratio, slower than bzip2
    Xz,
}

impl CompressionFormat {
    /// Detect compression format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(|e| e.to_str())?;
        match ext.to_lowercase().as_str() {
            "gz" => Some(Self::Gzip),
            "zst" | "zstd" => Some(Self::Zstd),
            "bz2" | "bz" => Some(Self::Bzip2),
            "xz" => Some(Self::Xz),
            _ => None,
        }
    }

    /// Parse a config value such as "gzip" or "zst".
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "gzip" | "gz" => Some(Self::Gzip),
            "zstd" | "zst" => Some(Self::Zstd),
            "bzip2" | "bz2" => Some(Self::Bzip2),
            "xz" => Some(Self::Xz),
            _ => None,
        }
    }

    /// Get file extension for this compression format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gzip => "gz",
            Self::Zstd => "zst",
            Self::Bzip2 => "bz2",
            Self::Xz => "xz",
        }
    }
}

/// `COL=V1,V2`: keep rows whose COL is one of the listed values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFilterArg {
    pub column: String,
    pub values: Vec<String>,
}

/// `ROW,COL=VALUE`: set a cell of the displayed table. ROW is the 0-based
/// position in the filtered view; COL is a column name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellEditArg {
    pub row: usize,
    pub column: String,
    pub value: String,
}

pub fn parse_column_filter(s: &str) -> Result<ColumnFilterArg, String> {
    let (column, values) = s
        .split_once('=')
        .ok_or_else(|| format!("expected COL=V1,V2, got \"{}\"", s))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("missing column name in \"{}\"", s));
    }
    let values = values
        .split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    Ok(ColumnFilterArg {
        column: column.to_string(),
        values,
    })
}

pub fn parse_cell_edit(s: &str) -> Result<CellEditArg, String> {
    let (target, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ROW,COL=VALUE, got \"{}\"", s))?;
    let (row, column) = target
        .split_once(',')
        .ok_or_else(|| format!("expected ROW,COL=VALUE, got \"{}\"", s))?;
    let row = row
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("row must be a non-negative integer, got \"{}\"", row.trim()))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("missing column name in \"{}\"", s));
    }
    Ok(CellEditArg {
        row,
        column: column.to_string(),
        value: value.to_string(),
    })
}

/// Command-line arguments for sracurate
#[derive(Clone, Parser, Debug)]
#[command(
    name = "sracurate",
    version,
    about = "Curate SRA/BioProject run metadata",
    long_about = include_str!("../long_about.txt")
)]
pub struct Args {
    /// BioProject accession to curate (e.g. PRJNA12345). Not required with --generate-config
    #[arg(required_unless_present = "generate_config", value_name = "PROJECT_ID")]
    pub project_id: Option<String>,

    /// Read the run report from this TSV/CSV file (optionally compressed) instead of the network
    #[arg(long = "source", value_name = "FILE")]
    pub source: Option<PathBuf>,

    /// Request every available report field instead of the default set
    #[arg(long = "detailed", action)]
    pub detailed: bool,

    /// Directory for the exported CSV (overrides config [export] directory)
    #[arg(long = "out-dir", value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Keep only runs whose base count reaches the configured threshold
    #[arg(long = "threshold-filter", action)]
    pub threshold_filter: bool,

    /// Keep rows whose COL is one of the listed values. Repeatable; filters combine with AND
    #[arg(long = "filter", value_name = "COL=V1,V2", value_parser = parse_column_filter)]
    pub filter: Vec<ColumnFilterArg>,

    /// Add an empty column. Repeatable
    #[arg(long = "add-column", value_name = "NAME")]
    pub add_column: Vec<String>,

    /// Remove a column. Repeatable
    #[arg(long = "remove-column", value_name = "NAME")]
    pub remove_column: Vec<String>,

    /// Add the metadata fields expected for the project's category
    #[arg(long = "inject", action)]
    pub inject: bool,

    /// Category to inject fields for (default: the suggested category)
    #[arg(long = "category", value_name = "NAME", requires = "inject")]
    pub category: Option<String>,

    /// Set a cell of the filtered table. ROW is 0-based. Repeatable, applied in order
    #[arg(long = "edit", value_name = "ROW,COL=VALUE", value_parser = parse_cell_edit)]
    pub edit: Vec<CellEditArg>,

    /// Number of rows to print as a preview (overrides config [export] preview_rows)
    #[arg(long = "preview", value_name = "N")]
    pub preview: Option<usize>,

    /// Print the filter choices for a column. Repeatable
    #[arg(long = "list-values", value_name = "COL")]
    pub list_values: Vec<String>,

    /// Do not write the exported CSV
    #[arg(long = "no-export", action)]
    pub no_export: bool,

    /// Compress the exported file (gzip, zstd, bzip2, xz)
    #[arg(long = "compression", value_enum)]
    pub compression: Option<CompressionFormat>,

    /// Environment keyword mapping CSV (overrides config and built-in table)
    #[arg(long = "mapping", value_name = "FILE")]
    pub mapping: Option<PathBuf>,

    /// Field catalog TOML (overrides config and built-in catalog)
    #[arg(long = "field-catalog", value_name = "FILE")]
    pub field_catalog: Option<PathBuf>,

    /// Log debug information to stderr
    #[arg(short = 'v', long = "verbose", action)]
    pub verbose: bool,

    /// Generate default configuration file at ~/.config/sracurate/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,
}

/// Escape `|` and newlines for use in markdown table cells.
fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

fn value_placeholder(arg: &clap::Arg) -> String {
    arg.get_value_names()
        .map(|names| {
            names
                .iter()
                .map(|n: &clap::builder::Str| format!("<{}>", n.as_ref() as &str))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

/// Render command-line options as markdown.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = String::from("# Command Line Options\n\n");

    out.push_str("## Usage\n\n```\n");
    out.push_str(&cmd.render_usage().to_string());
    out.push_str("\n```\n\n");

    out.push_str("## Options\n\n");
    out.push_str("| Option | Description |\n");
    out.push_str("|--------|-------------|\n");

    for arg in cmd.get_arguments() {
        let id = arg.get_id().as_ref().to_string();
        if id == "help" || id == "version" {
            continue;
        }

        let option_str = if arg.is_positional() {
            let placeholder = value_placeholder(arg);
            if arg.is_required_set() {
                placeholder
            } else {
                format!("[{placeholder}]")
            }
        } else {
            let mut parts = Vec::new();
            if let Some(s) = arg.get_short() {
                parts.push(format!("-{s}"));
            }
            if let Some(l) = arg.get_long() {
                parts.push(format!("--{l}"));
            }
            let op = parts.join(", ");
            let placeholder = if arg.get_action().takes_values() {
                value_placeholder(arg)
            } else {
                String::new()
            };
            if placeholder.is_empty() {
                op
            } else {
                format!("{op} {placeholder}")
            }
        };

        let help = arg
            .get_help()
            .map(|h| escape_table_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!("| `{option_str}` | {help} |\n"));
    }

    out
}
