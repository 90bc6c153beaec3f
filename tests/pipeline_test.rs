mod common;

use common::{file_session, write_report, GUT_REPORT_TSV};
use sracurate::{AppConfig, AppEvent, CellValue, EditEvent, NotificationLevel};
use std::fs;
use std::io::Write;
use tempfile::TempDir;

fn fetch(project_id: &str) -> AppEvent {
    AppEvent::Fetch {
        project_id: project_id.to_string(),
        detailed: false,
    }
}

fn column(session: &sracurate::Session, name: &str) -> usize {
    session
        .view()
        .columns()
        .iter()
        .position(|c| c == name)
        .unwrap()
}

#[test]
fn test_fetch_filter_edit_export() {
    let dir = TempDir::new().unwrap();
    let report = write_report(dir.path(), "PRJNA9.tsv", GUT_REPORT_TSV);
    let mut session = file_session(&report, &AppConfig::default());

    let n = session.event(fetch("PRJNA9")).unwrap();
    assert_eq!(n.level, NotificationLevel::Warning);
    assert_eq!(
        session.suggested_category(),
        Some("Host human; Host-associated gut")
    );
    assert_eq!(
        session.master().columns(),
        [
            "run_accession",
            "scientific_name",
            "base_count",
            "country",
            "country__1",
            "sample_accession",
            "library_strategy",
            "collection_date",
        ]
    );

    session.event(AppEvent::SetThresholdFilter(true));
    assert_eq!(session.view().row_count(), 2);
    session.event(AppEvent::SetColumnFilter(
        "country".into(),
        vec!["USA".into()],
    ));
    assert_eq!(session.view().row_count(), 1);

    let date = column(&session, "collection_date");
    assert!(session
        .event(AppEvent::EditCell(EditEvent::new(0, date, "2020-01-01")))
        .is_none());

    let out = dir.path().join("out");
    let n = session
        .event(AppEvent::Export {
            directory: Some(out.clone()),
        })
        .unwrap();
    assert_eq!(n.level, NotificationLevel::Success);

    let content = fs::read_to_string(out.join("PRJNA9_metadata.csv")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines,
        vec![
            "run_accession,scientific_name,base_count,country,country__1,sample_accession,library_strategy,collection_date",
            "SRR2,human gut metagenome,2000000000,USA,y,,,2020-01-01",
        ]
    );
}

#[test]
fn test_inject_then_clear_filters() {
    let dir = TempDir::new().unwrap();
    let report = write_report(dir.path(), "report.tsv", GUT_REPORT_TSV);
    let mut session = file_session(&report, &AppConfig::default());
    session.event(fetch("PRJNA9"));

    session.event(AppEvent::InjectFields(None));
    for field in ["host_subject_id", "host_sex", "host_diet", "antibiotic_regm"] {
        assert!(session.master().has_column(field), "missing {}", field);
    }
    let width = session.master().columns().len();
    session.event(AppEvent::InjectFields(Some(
        "Host human; Host-associated gut".into(),
    )));
    assert_eq!(session.master().columns().len(), width);

    session.event(AppEvent::SetThresholdFilter(true));
    session.event(AppEvent::ClearFilters);
    assert_eq!(session.view().row_count(), 3);
    assert_eq!(session.view().columns().len(), width);
}

#[test]
fn test_edit_targets_filtered_row() {
    let dir = TempDir::new().unwrap();
    let report = write_report(dir.path(), "report.tsv", GUT_REPORT_TSV);
    let mut session = file_session(&report, &AppConfig::default());
    session.event(fetch("PRJNA9"));
    session.event(AppEvent::SetColumnFilter(
        "country".into(),
        vec!["Canada".into()],
    ));
    let country = column(&session, "country");
    session.event(AppEvent::EditCell(EditEvent::new(0, country, "Mexico")));

    let srr3 = session.master().rows()[2].id;
    assert_eq!(
        session.master().cell(srr3, "country"),
        Some(&CellValue::from("Mexico"))
    );
    let srr1 = session.master().rows()[0].id;
    assert_eq!(
        session.master().cell(srr1, "country"),
        Some(&CellValue::from("USA"))
    );
    // the edited row no longer matches the filter
    assert_eq!(session.view().row_count(), 0);
}

#[test]
fn test_missing_source_keeps_previous_data() {
    let dir = TempDir::new().unwrap();
    let report = write_report(dir.path(), "report.tsv", GUT_REPORT_TSV);
    let mut session = file_session(&report, &AppConfig::default());
    session.event(fetch("PRJNA9"));
    let before = session.master().clone();

    fs::remove_file(&report).unwrap();
    let n = session.event(fetch("PRJNA10")).unwrap();
    assert_eq!(n.level, NotificationLevel::Error);
    assert!(n.message.contains("PRJNA10"));
    assert_eq!(session.master(), &before);
    assert_eq!(session.project_id(), Some("PRJNA9"));
}

#[test]
fn test_header_only_report_is_empty_result() {
    let dir = TempDir::new().unwrap();
    let report = write_report(dir.path(), "report.tsv", "run_accession\tbase_count\n");
    let mut session = file_session(&report, &AppConfig::default());
    let n = session.event(fetch("PRJNA9")).unwrap();
    assert_eq!(n.level, NotificationLevel::Error);
    assert!(session.master().is_empty());
    assert!(session.event(AppEvent::Export { directory: None }).is_none());
}

#[test]
fn test_gzip_report_and_compressed_export() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.tsv.gz");
    let mut encoder = flate2::write::GzEncoder::new(
        fs::File::create(&path).unwrap(),
        flate2::Compression::default(),
    );
    encoder.write_all(GUT_REPORT_TSV.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let mut config = AppConfig::default();
    config.export.compression = Some("gzip".into());
    config.export.directory = Some(dir.path().join("out"));
    let mut session = file_session(&path, &config);
    session.event(fetch("PRJNA9"));
    assert_eq!(session.master().row_count(), 3);

    session.event(AppEvent::Export { directory: None });
    let exported = dir.path().join("out/PRJNA9_metadata.csv.gz");
    let mut text = String::new();
    std::io::Read::read_to_string(
        &mut flate2::read::GzDecoder::new(fs::File::open(exported).unwrap()),
        &mut text,
    )
    .unwrap();
    assert_eq!(text.lines().count(), 4);
}

#[test]
fn test_filter_choices_include_no_restriction_marker() {
    let dir = TempDir::new().unwrap();
    let report = write_report(dir.path(), "report.tsv", GUT_REPORT_TSV);
    let mut session = file_session(&report, &AppConfig::default());
    session.event(fetch("PRJNA9"));
    let choices = session.filter_choices("country");
    assert_eq!(choices[0], "All");
    assert!(choices.contains(&"USA".to_string()));
    assert!(choices.contains(&"Canada".to_string()));

    session.event(AppEvent::SetColumnFilter(
        "country".into(),
        vec!["All".into()],
    ));
    assert_eq!(session.view().row_count(), 3);
}

#[test]
fn test_organism_name_only_report_is_classified() {
    let dir = TempDir::new().unwrap();
    let report = write_report(
        dir.path(),
        "report.tsv",
        "run_accession\torganism_name\tbase_count\nSRR1\tBacillus soil isolate\t2000000000\n",
    );
    let mut session = file_session(&report, &AppConfig::default());
    let n = session.event(fetch("PRJNA9")).unwrap();
    assert_eq!(n.level, NotificationLevel::Success);
    // scientific_name is added empty by normalization
    assert!(session.master().has_column("scientific_name"));
    assert_eq!(session.suggested_category(), Some("Terrestrial/ soil"));
    assert!(n.message.contains("Terrestrial/ soil"));
}

#[test]
fn test_export_stays_in_chosen_directory() {
    let dir = TempDir::new().unwrap();
    let report = write_report(dir.path(), "report.tsv", GUT_REPORT_TSV);
    let mut session = file_session(&report, &AppConfig::default());

    let n = session.event(fetch("../escaped")).unwrap();
    assert_eq!(n.level, NotificationLevel::Error);
    assert!(session.project_id().is_none());
    assert!(session
        .event(AppEvent::Export {
            directory: Some(dir.path().join("out")),
        })
        .is_none());
    assert!(!dir.path().join("escaped_metadata.csv").exists());
    assert!(!dir.path().join("out").exists());
}
