//! End-to-end runs against in-memory sources.

use approx::assert_relative_eq;
use chrono::{Datelike, Days, NaiveDate};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use tasman::data::{ApiKey, DataError, IndicatorSpec, MacroSeries, MacroSource, PriceSource};
use tasman::factors::FactorConfig;
use tasman::output::{ArtifactKind, ArtifactStatus, ExportFormat, FileTableSink};
use tasman::{DatasetConfig, Pipeline, PipelineError, RunConfig};

fn day(n: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .checked_add_days(Days::new(n - 1))
        .unwrap()
}

/// Ten days of prices for two instruments.
fn price_frame() -> DataFrame {
    let mut symbols = Vec::new();
    let mut days = Vec::new();
    let mut prices = Vec::new();
    for n in 1..=10u64 {
        for (symbol, base, step) in [("AAPL", 100.0, 1.0), ("MSFT", 50.0, 0.5)] {
            symbols.push(symbol);
            days.push(day(n).num_days_from_ce() - 719_163);
            prices.push(base + step * n as f64);
        }
    }
    DataFrame::new(vec![
        Series::new("symbol".into(), symbols).into(),
        Series::new("date".into(), days)
            .cast(&DataType::Date)
            .unwrap()
            .into(),
        Series::new("adjusted_close".into(), prices).into(),
    ])
    .unwrap()
}

struct StaticPrices {
    frame: Option<DataFrame>,
}

impl PriceSource for StaticPrices {
    async fn fetch_prices(
        &self,
        _symbols: &[String],
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> tasman::data::Result<DataFrame> {
        self.frame
            .clone()
            .ok_or_else(|| DataError::unavailable("prices", "provider down"))
    }
}

struct StaticMacro {
    fail: bool,
}

impl MacroSource for StaticMacro {
    async fn fetch_series(
        &self,
        spec: &IndicatorSpec,
        _credential: &ApiKey,
    ) -> tasman::data::Result<MacroSeries> {
        if self.fail {
            return Err(DataError::FredApi("HTTP 500".into()));
        }
        Ok(MacroSeries::new(
            spec.name.clone(),
            BTreeMap::from([(day(1), 5.25), (day(5), 5.5)]),
        ))
    }
}

fn config(root: &Path, with_key: bool) -> RunConfig {
    RunConfig {
        output_dir: root.to_path_buf(),
        start: day(1),
        end: Some(day(10)),
        universe: vec!["AAPL".into(), "MSFT".into()],
        indicators: vec![IndicatorSpec::new("FEDFUNDS", "fed_funds")],
        factors: FactorConfig {
            momentum_horizons: vec![2],
            volatility_windows: vec![3],
        },
        dataset: DatasetConfig {
            include_factors: true,
        },
        format: ExportFormat::Csv,
        fred_api_key: if with_key { ApiKey::new("test-key") } else { None },
    }
}

fn pipeline(
    root: &Path,
    with_key: bool,
    prices: Option<DataFrame>,
    macro_fails: bool,
) -> Pipeline<StaticPrices, StaticMacro, FileTableSink> {
    Pipeline::new(
        config(root, with_key),
        StaticPrices { frame: prices },
        StaticMacro { fail: macro_fails },
        FileTableSink::new(root, ExportFormat::Csv),
    )
}

fn is_written(status: Option<&ArtifactStatus>) -> bool {
    matches!(status, Some(ArtifactStatus::Written { .. }))
}

fn is_failed(status: Option<&ArtifactStatus>) -> bool {
    status.is_some_and(ArtifactStatus::is_failed)
}

#[tokio::test]
async fn full_run_writes_every_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let report = pipeline(dir.path(), true, Some(price_frame()), false)
        .run()
        .await
        .unwrap();

    for kind in ArtifactKind::ALL {
        assert!(is_written(report.status(kind)), "{kind} not written");
    }
    assert!(!report.has_failures());
    assert!(report.macro_included);
    assert!(report.coverage.as_ref().unwrap().is_complete());

    assert!(dir.path().join("raw/prices.csv").exists());
    assert!(dir.path().join("raw/macro.csv").exists());
    assert!(dir.path().join("processed/daily_returns.csv").exists());
    assert!(dir.path().join("processed/features_basic.csv").exists());
    assert!(dir.path().join("run_report.json").exists());

    let dataset = std::fs::read_to_string(dir.path().join("processed/dataset.csv")).unwrap();
    let header = dataset.lines().next().unwrap();
    assert_eq!(
        header,
        "date,AAPL,MSFT,AAPL_mom2,MSFT_mom2,AAPL_vol3,MSFT_vol3,fed_funds"
    );
    // Nine return rows plus the header.
    assert_eq!(dataset.lines().count(), 10);

    let first: Vec<&str> = dataset.lines().nth(1).unwrap().split(',').collect();
    assert_eq!(first[0], "2024-01-02");
    assert_relative_eq!(first[1].parse::<f64>().unwrap(), 102.0 / 101.0 - 1.0, epsilon = 1e-12);
    assert_relative_eq!(first[7].parse::<f64>().unwrap(), 5.25);
}

#[tokio::test]
async fn missing_credential_skips_macro_only() {
    let dir = tempfile::tempdir().unwrap();
    let report = pipeline(dir.path(), false, Some(price_frame()), false)
        .run()
        .await
        .unwrap();

    assert!(matches!(
        report.status(ArtifactKind::Macro),
        Some(ArtifactStatus::Skipped { .. })
    ));
    assert!(is_written(report.status(ArtifactKind::Dataset)));
    assert!(!report.macro_included);
    assert!(!report.has_failures());
    assert!(!dir.path().join("raw/macro.csv").exists());
}

#[tokio::test]
async fn skipped_artifact_replaces_earlier_output() {
    let dir = tempfile::tempdir().unwrap();
    pipeline(dir.path(), true, Some(price_frame()), false)
        .run()
        .await
        .unwrap();
    assert!(dir.path().join("raw/macro.csv").exists());

    let report = pipeline(dir.path(), false, Some(price_frame()), false)
        .run()
        .await
        .unwrap();
    assert!(matches!(
        report.status(ArtifactKind::Macro),
        Some(ArtifactStatus::Skipped { .. })
    ));
    assert!(!dir.path().join("raw/macro.csv").exists());
    assert!(dir.path().join("processed/dataset.csv").exists());
}

#[tokio::test]
async fn price_failure_still_writes_macro() {
    let dir = tempfile::tempdir().unwrap();
    let report = pipeline(dir.path(), true, None, false).run().await.unwrap();

    assert!(is_written(report.status(ArtifactKind::Macro)));
    for kind in [
        ArtifactKind::Prices,
        ArtifactKind::Returns,
        ArtifactKind::Features,
        ArtifactKind::Dataset,
    ] {
        assert!(is_failed(report.status(kind)), "{kind} should fail");
    }
    assert!(report.has_failures());
    assert!(report.coverage.is_none());
    assert!(dir.path().join("raw/macro.csv").exists());
    assert!(dir.path().join("run_report.json").exists());
}

#[tokio::test]
async fn macro_failure_falls_back_to_returns_only_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let report = pipeline(dir.path(), true, Some(price_frame()), true)
        .run()
        .await
        .unwrap();

    assert!(is_failed(report.status(ArtifactKind::Macro)));
    assert!(is_written(report.status(ArtifactKind::Dataset)));
    assert!(!report.macro_included);

    let dataset = std::fs::read_to_string(dir.path().join("processed/dataset.csv")).unwrap();
    assert!(!dataset.lines().next().unwrap().contains("fed_funds"));
}

#[tokio::test]
async fn invalid_config_aborts_before_fetching() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(
        RunConfig {
            universe: vec![],
            ..config(dir.path(), true)
        },
        StaticPrices {
            frame: Some(price_frame()),
        },
        StaticMacro { fail: false },
        FileTableSink::new(dir.path(), ExportFormat::Csv),
    );

    let result = pipeline.run().await;
    assert!(matches!(result, Err(PipelineError::Config(_))));
    assert!(!dir.path().join("run_report.json").exists());
}
