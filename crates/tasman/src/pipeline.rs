//! The batch run.
//!
//! Prices and macro indicators are fetched side by side. Each derived table is
//! computed only if its inputs were, and every table that was computed is
//! persisted at the end. A failed price fetch still lets the macro table
//! through; a failed or skipped macro fetch never blocks returns or factors.

use crate::assemble::{DatasetAssembler, FeatureDataset};
use crate::config::{ConfigError, RunConfig};
use chrono::NaiveDate;
use tasman_data::{
    CoverageReport, MacroAligner, MacroDaily, MacroSource, Panel, PriceMatrix,
    PriceSeriesNormalizer, PriceSource, ReturnComputer, ReturnMatrix,
};
use tasman_factors::{FactorDeriver, FactorTable};
use tasman_output::{ArtifactKind, ArtifactStatus, ExportError, RunReport, TableSink};
use thiserror::Error;
use tracing::{info, warn};

/// Errors that abort a run.
///
/// Stage failures do not abort; they are recorded in the [`RunReport`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The run report itself could not be written.
    #[error("Failed to write run report: {0}")]
    Report(#[source] ExportError),
}

/// A stage result: the value, or why it is absent.
type Stage<T> = Result<T, ArtifactStatus>;

/// Wires sources, computation and a sink together for one run.
#[derive(Debug)]
pub struct Pipeline<P, M, S> {
    config: RunConfig,
    prices: P,
    macro_source: M,
    sink: S,
}

impl<P, M, S> Pipeline<P, M, S>
where
    P: PriceSource,
    M: MacroSource,
    S: TableSink,
{
    /// Create a pipeline.
    pub const fn new(config: RunConfig, prices: P, macro_source: M, sink: S) -> Self {
        Self {
            config,
            prices,
            macro_source,
            sink,
        }
    }

    /// The run configuration.
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Execute the run and return its report.
    ///
    /// # Errors
    /// Only an invalid configuration or a failure to write the report itself;
    /// everything else lands in the report.
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        self.config.validate()?;
        let start = self.config.start;
        let end = self.config.end_date();
        let mut report = RunReport::new(start, end);

        info!(
            instruments = self.config.universe.len(),
            %start,
            %end,
            "starting run"
        );

        let (prices, macro_daily) =
            futures::join!(self.price_stage(start, end), self.macro_stage());

        let prices = prices.map(|(matrix, coverage)| {
            report.coverage = Some(coverage);
            matrix
        });
        let returns = self.return_stage(&prices);
        let factors = self.factor_stage(&prices, &returns);
        let dataset = self.dataset_stage(&returns, &factors, &macro_daily);
        report.macro_included = dataset.as_ref().is_ok_and(FeatureDataset::macro_included);

        self.persist(&mut report, ArtifactKind::Prices, prices.map(PriceMatrix::into_panel));
        self.persist(&mut report, ArtifactKind::Returns, returns.map(ReturnMatrix::into_panel));
        self.persist(&mut report, ArtifactKind::Macro, macro_daily.map(MacroDaily::into_panel));
        self.persist(&mut report, ArtifactKind::Features, factors.map(FactorTable::into_panel));
        self.persist(&mut report, ArtifactKind::Dataset, dataset.map(FeatureDataset::into_panel));

        self.sink.write_report(&report).map_err(PipelineError::Report)?;

        if report.has_failures() {
            warn!("run finished with failed artifacts");
        } else {
            info!("run finished");
        }
        Ok(report)
    }

    async fn price_stage(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Stage<(PriceMatrix, CoverageReport)> {
        let response = self
            .prices
            .fetch_prices(&self.config.universe, start, end)
            .await
            .map_err(|e| {
                warn!(error = %e, "price fetch failed");
                ArtifactStatus::failed(e)
            })?;

        PriceSeriesNormalizer::new()
            .normalize(&response, &self.config.universe)
            .map_err(|e| {
                warn!(error = %e, "price normalization failed");
                ArtifactStatus::failed(e)
            })
    }

    async fn macro_stage(&self) -> Stage<MacroDaily> {
        let result = MacroAligner::new()
            .run(
                &self.macro_source,
                self.config.fred_api_key.as_ref(),
                &self.config.indicators,
            )
            .await;

        match result {
            Ok(Some(daily)) => Ok(daily),
            Ok(None) => Err(ArtifactStatus::skipped("no macro credential supplied")),
            Err(e) => {
                warn!(error = %e, "macro stage failed");
                Err(ArtifactStatus::failed(e))
            }
        }
    }

    fn return_stage(&self, prices: &Stage<PriceMatrix>) -> Stage<ReturnMatrix> {
        let prices = prices.as_ref().map_err(upstream("prices"))?;
        ReturnComputer::new()
            .compute(prices)
            .map_err(ArtifactStatus::failed)
    }

    fn factor_stage(
        &self,
        prices: &Stage<PriceMatrix>,
        returns: &Stage<ReturnMatrix>,
    ) -> Stage<FactorTable> {
        let prices = prices.as_ref().map_err(upstream("prices"))?;
        let returns = returns.as_ref().map_err(upstream("returns"))?;
        FactorDeriver::new(self.config.factors.clone())
            .and_then(|deriver| deriver.derive(prices, returns))
            .map_err(|e| {
                warn!(error = %e, "factor derivation failed");
                ArtifactStatus::failed(e)
            })
    }

    fn dataset_stage(
        &self,
        returns: &Stage<ReturnMatrix>,
        factors: &Stage<FactorTable>,
        macro_daily: &Stage<MacroDaily>,
    ) -> Stage<FeatureDataset> {
        let returns = returns.as_ref().map_err(upstream("returns"))?;
        let factors = if self.config.dataset.include_factors {
            Some(factors.as_ref().map_err(upstream("features"))?)
        } else {
            None
        };
        let macro_daily = macro_daily.as_ref().ok();
        if macro_daily.is_none() {
            info!("assembling dataset without macro indicators");
        }

        DatasetAssembler::new()
            .assemble_with_factors(returns, factors, macro_daily)
            .map_err(ArtifactStatus::failed)
    }

    fn persist(&self, report: &mut RunReport, kind: ArtifactKind, table: Stage<Panel>) {
        let status = match table {
            Ok(panel) => match self.sink.write_table(kind, &panel) {
                Ok(written) => written.into(),
                Err(e) => {
                    warn!(artifact = %kind, error = %e, "failed to write artifact");
                    ArtifactStatus::failed(e)
                }
            },
            Err(status) => {
                if let ArtifactStatus::Skipped { reason } = &status {
                    info!(artifact = %kind, reason = %reason, "skipped artifact");
                }
                status
            }
        };
        if !matches!(status, ArtifactStatus::Written { .. })
            && let Err(e) = self.sink.discard_table(kind)
        {
            warn!(artifact = %kind, error = %e, "failed to remove stale artifact");
        }
        report.record(kind, status);
    }
}

/// Status of a table whose input is absent: skipped inputs skip it too,
/// failed inputs fail it.
fn upstream(input: &'static str) -> impl Fn(&ArtifactStatus) -> ArtifactStatus {
    move |status| match status {
        ArtifactStatus::Skipped { .. } => ArtifactStatus::skipped(format!("{input} unavailable")),
        _ => ArtifactStatus::failed(format!("{input} unavailable")),
    }
}
