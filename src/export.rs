//! Write the current display view to CSV.

use crate::fetch::is_valid_project_id;
use crate::filter::DisplayView;
use crate::table::MetadataTable;
use crate::CompressionFormat;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_FILENAME_SUFFIX: &str = "_metadata.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub directory: PathBuf,
    pub filename_suffix: String,
    pub delimiter: u8,
    pub include_header: bool,
    pub compression: Option<CompressionFormat>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            filename_suffix: DEFAULT_FILENAME_SUFFIX.to_string(),
            delimiter: b',',
            include_header: true,
            compression: None,
        }
    }
}

/// `{directory}/{project_id}{suffix}`, plus `.gz`/`.zst`/... when compressed.
pub fn export_path(project_id: &str, options: &ExportOptions) -> PathBuf {
    let mut name = format!("{}{}", project_id, options.filename_suffix);
    if let Some(c) = options.compression {
        name.push('.');
        name.push_str(c.extension());
    }
    options.directory.join(name)
}

/// Export the filtered view (not the whole master table). Creates the
/// destination directory when missing. Returns `None` without writing
/// anything when there is no data.
pub fn export_view(
    master: &MetadataTable,
    view: &DisplayView,
    project_id: &str,
    options: &ExportOptions,
) -> Result<Option<PathBuf>> {
    if master.is_empty() || project_id.trim().is_empty() {
        return Ok(None);
    }
    let project_id = project_id.trim();
    if !is_valid_project_id(project_id) {
        return Err(eyre!(
            "Project id \"{}\" cannot be used as a file name",
            project_id
        ));
    }
    if !options.directory.exists() {
        std::fs::create_dir_all(&options.directory).map_err(|e| {
            eyre!(
                "Could not create directory {}: {}",
                options.directory.display(),
                e
            )
        })?;
    }
    let path = export_path(project_id, options);
    let mut df = view.to_dataframe(master)?;
    write_csv(&mut df, &path, options)?;
    info!(path = %path.display(), rows = df.height(), "exported metadata");
    Ok(Some(path))
}

fn write_csv(df: &mut DataFrame, path: &Path, options: &ExportOptions) -> Result<()> {
    let file = File::create(path)?;
    let writer: Box<dyn Write> = match options.compression {
        Some(CompressionFormat::Gzip) => Box::new(flate2::write::GzEncoder::new(
            file,
            flate2::Compression::default(),
        )),
        Some(CompressionFormat::Zstd) => Box::new(zstd::Encoder::new(file, 0)?.auto_finish()),
        Some(CompressionFormat::Bzip2) => Box::new(bzip2::write::BzEncoder::new(
            file,
            bzip2::Compression::default(),
        )),
        Some(CompressionFormat::Xz) => Box::new(xz2::write::XzEncoder::new(
            file, 6, // compression level
        )),
        None => Box::new(file),
    };
    CsvWriter::new(writer)
        .with_separator(options.delimiter)
        .include_header(options.include_header)
        .finish(df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{derive_display_view, FilterRules, FilterSpec};
    use crate::table::CellValue;
    use tempfile::TempDir;

    fn master() -> MetadataTable {
        MetadataTable::from_rows(
            vec!["run_accession".to_string(), "base_count".to_string()],
            vec![
                vec!["SRR1".into(), CellValue::Number(5e8)],
                vec!["SRR2".into(), CellValue::Number(2e9)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_export_path() {
        let mut options = ExportOptions {
            directory: PathBuf::from("/tmp/out"),
            ..Default::default()
        };
        assert_eq!(
            export_path("PRJNA1", &options),
            PathBuf::from("/tmp/out/PRJNA1_metadata.csv")
        );
        options.compression = Some(CompressionFormat::Gzip);
        assert_eq!(
            export_path("PRJNA1", &options),
            PathBuf::from("/tmp/out/PRJNA1_metadata.csv.gz")
        );
    }

    #[test]
    fn test_export_writes_filtered_rows_and_creates_dir() {
        let dir = TempDir::new().unwrap();
        let options = ExportOptions {
            directory: dir.path().join("nested/out"),
            ..Default::default()
        };
        let t = master();
        let view = derive_display_view(
            &t,
            &FilterSpec::new().with_threshold(true),
            &FilterRules::default(),
        );
        let path = export_view(&t, &view, "PRJNA1", &options).unwrap().unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["run_accession,base_count", "SRR2,2000000000"]);
    }

    #[test]
    fn test_export_rejects_path_like_project_id() {
        let dir = TempDir::new().unwrap();
        let options = ExportOptions {
            directory: dir.path().join("out"),
            ..Default::default()
        };
        let t = master();
        let view = derive_display_view(&t, &FilterSpec::new(), &FilterRules::default());
        assert!(export_view(&t, &view, "../escaped", &options).is_err());
        assert!(export_view(&t, &view, "/tmp/escaped", &options).is_err());
        assert!(!dir.path().join("escaped_metadata.csv").exists());
        assert!(!options.directory.exists());
    }

    #[test]
    fn test_export_empty_is_noop() {
        let dir = TempDir::new().unwrap();
        let options = ExportOptions {
            directory: dir.path().join("never"),
            ..Default::default()
        };
        let t = MetadataTable::new();
        let view = derive_display_view(&t, &FilterSpec::new(), &FilterRules::default());
        assert!(export_view(&t, &view, "PRJNA1", &options).unwrap().is_none());
        assert!(!options.directory.exists());
    }
}
