use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::backbone::build_backbone;
use crate::config::Config;
use crate::counties::{select_counties, CountyRecord};
use crate::error::Result;
use crate::models::{fit_models, ModelReport};
use crate::reconcile::{
    reconcile, JoinIntegrityWarning, ReconciledRow, ReconciledTable, ReconcilerConfig, SourceFacts,
};
use crate::sources::{
    CpiReader, HomeValueReader, ListingsReader, MortgageReader, PopulationReader, SourceReader,
};

/// Result of a complete reconciliation run, persisted as the JSON run
/// report beside the exported tables.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub counties: usize,
    pub backbone_months: usize,
    pub complete_rows: usize,
    pub incomplete_rows: usize,
    pub cutoff: Option<String>,
    pub warnings: Vec<JoinIntegrityWarning>,
    pub output_file: String,
    pub diagnostic_file: String,
}

pub struct Pipeline;

impl Pipeline {
    /// Run ingestion, selection, and reconciliation, returning the table
    /// and the county set without touching disk.
    #[instrument(skip(config))]
    pub fn reconcile(config: &Config) -> Result<(ReconciledTable, Vec<CountyRecord>)> {
        info!("📡 Reading source datasets...");
        println!("📡 Reading source datasets...");

        let mortgage = MortgageReader.read(&config.inputs.mortgage)?;
        let cpi = CpiReader.read(&config.inputs.cpi)?;
        let listings = ListingsReader.read(&config.inputs.listings)?;
        let population_reader = PopulationReader::new(&config.inputs.population_later);
        let population = population_reader.read(&config.inputs.population_earlier)?;
        let home_value = HomeValueReader.read(&config.inputs.home_values)?;

        info!(
            mortgage = mortgage.len(),
            cpi = cpi.len(),
            listings = listings.len(),
            population_counties = population.len(),
            home_value = home_value.len(),
            "sources loaded"
        );

        println!("🗺️  Selecting counties...");
        let counties = select_counties(&population, config.counties.population_threshold);

        let backbone = build_backbone(config.window.start_month()?, config.window.end_month()?);
        println!(
            "📅 Backbone spans {} months ({} - {})",
            backbone.len(),
            config.window.start,
            config.window.end
        );

        let facts = SourceFacts {
            mortgage,
            cpi,
            listings,
            population: population.iter().flat_map(|c| c.year_facts()).collect(),
            home_value,
        };

        println!("🔗 Reconciling sources against the backbone...");
        let table = reconcile(
            &backbone,
            &counties,
            &facts,
            &ReconcilerConfig {
                min_non_null_rate: config.integrity.min_non_null_rate,
            },
        );

        for warning in &table.warnings {
            println!(
                "⚠️  Integrity warning: source '{}' non-null rate {:.1}% ({}/{})",
                warning.source,
                warning.rate * 100.0,
                warning.non_null,
                warning.total
            );
        }

        Ok((table, counties))
    }

    /// Full reconciliation run: build the table, export both partitions as
    /// CSV, and write the JSON run report.
    pub fn run(config: &Config) -> Result<RunReport> {
        let (table, counties) = Self::reconcile(config)?;
        Self::export(config, &table, &counties)
    }

    /// Reconcile, export, then hand the complete partition to the modeling
    /// collaborators.
    pub fn run_with_models(config: &Config) -> Result<(RunReport, ModelReport)> {
        let (table, counties) = Self::reconcile(config)?;
        let report = Self::export(config, &table, &counties)?;

        println!("\n🧮 Fitting models over {} complete rows...", report.complete_rows);
        let model_report = fit_models(&table.complete, &config.models)?;

        for summary in &model_report.summaries {
            match (&summary.county, summary.r_squared, summary.rmse) {
                (Some(county), _, Some(rmse)) => {
                    println!("   {} [{}]: rmse {:.2}", summary.model, county, rmse)
                }
                (None, Some(r2), Some(rmse)) => {
                    println!("   {}: r² {:.4}, rmse {:.2}", summary.model, r2, rmse)
                }
                _ => println!("   {}: fitted", summary.model),
            }
        }
        if !model_report.skipped_counties.is_empty() {
            warn!(
                skipped = model_report.skipped_counties.len(),
                "some counties were skipped by the ARIMA stage"
            );
            println!(
                "⚠️  Skipped counties: {}",
                model_report.skipped_counties.join(", ")
            );
        }

        let models_file = config.output.dir.join("model_report.json");
        fs::write(&models_file, serde_json::to_string_pretty(&model_report)?)?;
        println!("💾 Model report saved to {}", models_file.display());

        Ok((report, model_report))
    }

    fn export(
        config: &Config,
        table: &ReconciledTable,
        counties: &[CountyRecord],
    ) -> Result<RunReport> {
        fs::create_dir_all(&config.output.dir)?;
        let output_file = config.output.dir.join("reconciled.csv");
        let diagnostic_file = config.output.dir.join("incomplete_rows.csv");
        Self::export_csv(&table.complete, &output_file)?;
        Self::export_csv(&table.incomplete, &diagnostic_file)?;

        let report = RunReport {
            counties: counties.len(),
            backbone_months: build_backbone(
                config.window.start_month()?,
                config.window.end_month()?,
            )
            .len(),
            complete_rows: table.complete.len(),
            incomplete_rows: table.incomplete.len(),
            cutoff: table.cutoff.map(|c| c.to_string()),
            warnings: table.warnings.clone(),
            output_file: output_file.to_string_lossy().to_string(),
            diagnostic_file: diagnostic_file.to_string_lossy().to_string(),
        };

        let report_path = config.output.dir.join("run_report.json");
        fs::write(&report_path, serde_json::to_string_pretty(&report)?)?;

        info!(
            complete = report.complete_rows,
            incomplete = report.incomplete_rows,
            "pipeline run finished"
        );
        println!("\n📊 Pipeline results:");
        println!("   Counties in scope: {}", report.counties);
        println!("   Complete rows: {}", report.complete_rows);
        println!("   Incomplete rows (diagnostic): {}", report.incomplete_rows);
        if let Some(cutoff) = &report.cutoff {
            println!("   Validity cutoff: {cutoff}");
        }
        println!("   Output file: {}", report.output_file);

        Ok(report)
    }

    /// One CSV row per reconciled row, already sorted by county id then
    /// date; absent facts serialize as empty cells.
    fn export_csv(rows: &[ReconciledRow], path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}
