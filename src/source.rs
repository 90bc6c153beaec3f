//! Delimited-text ingestion shared by the fetchers and the category mapping loader.

use crate::table::{CellValue, RawTable};
use crate::CompressionFormat;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::{CsvReadOptions, CsvReader, SerReader};
use std::io::Cursor;
use std::path::Path;

/// Pick a separator from a file extension (`.tsv`/`.tab`/`.txt` → tab, otherwise comma).
/// Compression extensions are looked through.
pub fn separator_for_path(path: &Path) -> u8 {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_lowercase();
    let stem = name
        .trim_end_matches(".gz")
        .trim_end_matches(".zst")
        .trim_end_matches(".bz2")
        .trim_end_matches(".xz");
    if stem.ends_with(".tsv") || stem.ends_with(".tab") || stem.ends_with(".txt") {
        b'\t'
    } else {
        b','
    }
}

/// Parse delimited text into a [`RawTable`].
///
/// The header is read as an ordinary row so that repeated column names
/// survive; every field is kept as text and empty fields become
/// [`CellValue::Empty`].
pub fn read_delimited(bytes: &[u8], separator: u8) -> Result<RawTable> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(RawTable::default());
    }
    let read_options = CsvReadOptions::default()
        .with_has_header(false)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| opts.with_separator(separator));
    let df = CsvReader::new(Cursor::new(bytes))
        .with_options(read_options)
        .finish()?;

    let mut columns: Vec<Vec<Option<String>>> = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let values = column.as_materialized_series().str()?;
        columns.push(
            values
                .into_iter()
                .map(|v| v.map(str::to_string))
                .collect(),
        );
    }

    let height = df.height();
    if height == 0 {
        return Ok(RawTable::default());
    }
    let header: Vec<String> = columns
        .iter()
        .map(|c| c[0].clone().unwrap_or_default().trim().to_string())
        .collect();
    let rows: Vec<Vec<CellValue>> = (1..height)
        .map(|r| {
            columns
                .iter()
                .map(|c| match &c[r] {
                    Some(s) => CellValue::from_text(s),
                    None => CellValue::Empty,
                })
                .collect()
        })
        .collect();
    Ok(RawTable::new(header, rows))
}

/// Read a local delimited file, decompressing by extension.
pub fn read_delimited_file(path: &Path) -> Result<RawTable> {
    use std::io::Read;

    let file = std::fs::File::open(path)
        .map_err(|e| eyre!("Could not open {}: {}", path.display(), e))?;
    let mut reader: Box<dyn Read> = match CompressionFormat::from_extension(path) {
        Some(CompressionFormat::Gzip) => Box::new(flate2::read::GzDecoder::new(file)),
        Some(CompressionFormat::Zstd) => Box::new(zstd::Decoder::new(file)?),
        Some(CompressionFormat::Bzip2) => Box::new(bzip2::read::BzDecoder::new(file)),
        Some(CompressionFormat::Xz) => Box::new(xz2::read::XzDecoder::new(file)),
        None => Box::new(file),
    };
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    read_delimited(&bytes, separator_for_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_delimited_keeps_duplicate_headers() {
        let raw = read_delimited(b"a,a,b\n1,,x\n2,3,y\n", b',').unwrap();
        assert_eq!(raw.columns, vec!["a", "a", "b"]);
        assert_eq!(raw.rows.len(), 2);
        assert_eq!(raw.rows[0][1], CellValue::Empty);
        assert_eq!(raw.rows[1][1], CellValue::from("3"));
    }

    #[test]
    fn test_read_delimited_tab() {
        let raw = read_delimited(b"run\tbases\nSRR1\t100\n", b'\t').unwrap();
        assert_eq!(raw.columns, vec!["run", "bases"]);
        assert_eq!(raw.rows[0][1].as_number(), Some(100.0));
    }

    #[test]
    fn test_read_delimited_blank_input() {
        let raw = read_delimited(b"  \n", b',').unwrap();
        assert!(raw.columns.is_empty());
        assert!(raw.is_empty());
    }

    #[test]
    fn test_separator_for_path() {
        assert_eq!(separator_for_path(Path::new("x.tsv")), b'\t');
        assert_eq!(separator_for_path(Path::new("x.TSV.gz")), b'\t');
        assert_eq!(separator_for_path(Path::new("x.csv")), b',');
        assert_eq!(separator_for_path(Path::new("x")), b',');
    }
}
