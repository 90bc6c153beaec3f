use sracurate::{AppConfig, CategoryMapping, FieldCatalog, FileFetcher, Session, SessionSettings};
use std::fs;
use std::path::{Path, PathBuf};

/// Run report with a repeated `country` header, an excluded `fastq_ftp`
/// column and three runs of which two pass the default base-count threshold.
pub const GUT_REPORT_TSV: &str = "\
run_accession\tscientific_name\tbase_count\tcountry\tfastq_ftp\tcountry
SRR1\thuman gut metagenome\t500000000\tUSA\tftp1\tx
SRR2\thuman gut metagenome\t2000000000\tUSA\tftp2\ty
SRR3\thuman gut metagenome\t3000000000\tCanada\tftp3\tz
";

pub fn write_report(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

pub fn settings(config: &AppConfig) -> SessionSettings {
    SessionSettings::from_config(
        config,
        CategoryMapping::builtin().unwrap(),
        FieldCatalog::builtin().unwrap(),
    )
}

pub fn file_session(path: &Path, config: &AppConfig) -> Session {
    Session::new(Box::new(FileFetcher::new(path)), settings(config))
}
