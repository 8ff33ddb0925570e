//! On-disk layout of a run's artifacts.

use chrono::NaiveDate;
use std::fs;
use tasman_data::{Panel, PanelColumn};
use tasman_output::{ArtifactKind, ArtifactStatus, ExportFormat, FileTableSink, RunReport, TableSink};

fn returns() -> Panel {
    Panel::new(
        vec![
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
        ],
        vec![PanelColumn::new(
            "AAPL",
            vec![Some(0.02), Some(-0.0098), Some(0.0396)],
        )],
    )
    .unwrap()
}

#[test]
fn writes_csv_under_processed() {
    let dir = tempfile::tempdir().unwrap();
    let sink = FileTableSink::new(dir.path(), ExportFormat::Csv);

    let written = sink.write_table(ArtifactKind::Returns, &returns()).unwrap();

    assert_eq!(written.path, dir.path().join("processed/daily_returns.csv"));
    assert_eq!(written.rows, 3);
    assert_eq!(written.columns, 2);

    let content = fs::read_to_string(&written.path).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some("date,AAPL"));
    assert_eq!(lines.next(), Some("2024-01-02,0.02"));
    assert_eq!(content.lines().count(), 4);
}

#[test]
fn leaves_no_temporary_files() {
    let dir = tempfile::tempdir().unwrap();
    let sink = FileTableSink::new(dir.path(), ExportFormat::Json);

    sink.write_table(ArtifactKind::Prices, &returns()).unwrap();
    sink.write_table(ArtifactKind::Prices, &returns()).unwrap();

    let entries: Vec<String> = fs::read_dir(dir.path().join("raw"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec!["prices.json".to_string()]);
}

#[test]
fn writes_report_at_root() {
    let dir = tempfile::tempdir().unwrap();
    let sink = FileTableSink::new(dir.path(), ExportFormat::Csv);

    let mut report = RunReport::new(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
    );
    let written = sink.write_table(ArtifactKind::Returns, &returns()).unwrap();
    report.record(ArtifactKind::Returns, written.into());
    report.record(ArtifactKind::Macro, ArtifactStatus::skipped("no credential"));

    let path = sink.write_report(&report).unwrap();
    assert_eq!(path, dir.path().join("run_report.json"));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(json["artifacts"][0]["status"], "written");
    assert_eq!(json["artifacts"][0]["rows"], 3);
    assert_eq!(json["artifacts"][1]["status"], "skipped");
}

#[test]
fn discard_removes_earlier_output() {
    let dir = tempfile::tempdir().unwrap();
    let sink = FileTableSink::new(dir.path(), ExportFormat::Csv);

    let written = sink.write_table(ArtifactKind::Macro, &returns()).unwrap();
    assert!(written.path.exists());

    sink.discard_table(ArtifactKind::Macro).unwrap();
    assert!(!written.path.exists());

    // nothing to remove is fine
    sink.discard_table(ArtifactKind::Macro).unwrap();
    sink.discard_table(ArtifactKind::Dataset).unwrap();
}

#[test]
fn unwritable_root_fails() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocked");
    fs::write(&blocker, b"not a directory").unwrap();

    let sink = FileTableSink::new(&blocker, ExportFormat::Csv);
    assert!(sink.write_table(ArtifactKind::Returns, &returns()).is_err());
}
