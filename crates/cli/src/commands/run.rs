use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use retailsense_core::analytics::pipeline::AnalyticsPipeline;
use retailsense_core::analytics::report::{category_rollups, insights};
use retailsense_core::config::{
    AppConfig, CollaboratorMode, ConfigOverrides, LoadOptions, LogFormat,
};
use retailsense_core::domain::event::RawEvent;
use retailsense_core::errors::ApplicationError;
use retailsense_db::{
    connect_with_settings, migrations, CustomerProfileRepository, ProductPerformanceRepository,
    SqlCustomerProfileRepository, SqlProductPerformanceRepository,
};
use retailsense_predict::{PredictionOutcome, PredictionRuntime};

use super::CommandResult;

#[derive(Debug, Default)]
pub struct RunOptions {
    pub predict: bool,
    pub output: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    command: String,
    status: String,
    products: usize,
    customers: usize,
    excluded_rows: u64,
    failed_predictions: u64,
    forecast_points: usize,
    output_path: Option<String>,
}

/// Full artifact written behind `--output`: the annotated collections plus
/// the derived reporting views.
#[derive(Debug, Serialize)]
struct RunArtifact<'a> {
    products: &'a [retailsense_predict::ClassifiedProduct],
    customers: &'a [retailsense_predict::SegmentedCustomer],
    forecast: &'a [retailsense_predict::ForecastPoint],
    categories: Vec<retailsense_core::analytics::report::CategoryRollup>,
    insights: retailsense_core::analytics::report::InsightsReport,
    exclusions: retailsense_core::analytics::normalize::ExclusionStats,
    warnings: retailsense_predict::PredictionWarnings,
}

pub fn run(options: RunOptions) -> CommandResult {
    let config = match AppConfig::load(LoadOptions {
        config_path: options.config_path.clone(),
        require_file: options.config_path.is_some(),
        overrides: ConfigOverrides::default(),
    }) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("run", "config_validation", error.to_string(), 2)
        }
    };

    init_logging(&config);

    let runtime = match super::runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "run",
                "runtime",
                format!("could not start async runtime: {error}"),
                3,
            )
        }
    };

    match runtime.block_on(execute(&config, &options)) {
        Ok(summary) => CommandResult::from_payload(0, &summary),
        Err(error) => {
            let exit_code = match error {
                ApplicationError::Configuration(_) => 2,
                _ => 3,
            };
            CommandResult::failure("run", error.error_class(), error.to_string(), exit_code)
        }
    }
}

async fn execute(config: &AppConfig, options: &RunOptions) -> Result<RunSummary, ApplicationError> {
    let pipeline = AnalyticsPipeline::from_config(config)?;

    let (rows, malformed_rows) = read_event_rows(&config.ingest.events_path).await?;
    let run = pipeline.run(rows);

    let prediction_runtime = build_prediction_runtime(config, options.predict)?;
    let outcome = prediction_runtime.annotate(&run, pipeline.window().start).await;

    persist(config, &run.products, &run.customers).await?;

    let output_path = match &options.output {
        Some(path) => Some(write_artifact(path, &run.exclusions, &outcome).await?),
        None => None,
    };

    let excluded_rows = run.exclusions.total() + malformed_rows;
    let failed_predictions = outcome.warnings.total();
    let status =
        if failed_predictions > 0 { "ok_with_warnings" } else { "ok" }.to_string();

    info!(
        event_name = "cli.run.finished",
        run_id = %run.run_id,
        products = run.products.len(),
        customers = run.customers.len(),
        excluded_rows,
        failed_predictions,
        "pipeline run complete"
    );

    Ok(RunSummary {
        command: "run".to_string(),
        status,
        products: run.products.len(),
        customers: run.customers.len(),
        excluded_rows,
        failed_predictions,
        forecast_points: outcome.forecast.len(),
        output_path,
    })
}

/// Reads the JSONL event feed. An unreadable feed is fatal configuration;
/// an unparseable line is a data-quality drop, counted and skipped.
async fn read_event_rows(path: &std::path::Path) -> Result<(Vec<RawEvent>, u64), ApplicationError> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|error| {
        ApplicationError::Configuration(format!(
            "event feed `{}` is unreadable: {error}",
            path.display()
        ))
    })?;

    let mut rows = Vec::new();
    let mut malformed_rows = 0;
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<RawEvent>(line) {
            Ok(row) => rows.push(row),
            Err(_) => malformed_rows += 1,
        }
    }
    Ok((rows, malformed_rows))
}

fn build_prediction_runtime(
    config: &AppConfig,
    predict: bool,
) -> Result<PredictionRuntime, ApplicationError> {
    let mut collaborators = config.collaborators.clone();
    if !predict {
        collaborators.mode = CollaboratorMode::Disabled;
    } else if collaborators.mode == CollaboratorMode::Disabled {
        // `--predict` with no configured collaborators falls back to the
        // deterministic offline stubs.
        collaborators.mode = CollaboratorMode::Stub;
    }

    PredictionRuntime::from_config(&collaborators)
        .map_err(|error| ApplicationError::Integration(error.to_string()))
}

async fn persist(
    config: &AppConfig,
    products: &[retailsense_core::domain::product::ProductAggregate],
    customers: &[retailsense_core::domain::customer::CustomerAggregate],
) -> Result<(), ApplicationError> {
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| ApplicationError::Persistence(error.to_string()))?;

    migrations::run_pending(&pool)
        .await
        .map_err(|error| ApplicationError::Persistence(error.to_string()))?;

    SqlProductPerformanceRepository::new(pool.clone())
        .replace_all(products)
        .await
        .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
    SqlCustomerProfileRepository::new(pool)
        .replace_all(customers)
        .await
        .map_err(|error| ApplicationError::Persistence(error.to_string()))?;

    Ok(())
}

async fn write_artifact(
    path: &std::path::Path,
    exclusions: &retailsense_core::analytics::normalize::ExclusionStats,
    outcome: &PredictionOutcome,
) -> Result<String, ApplicationError> {
    let aggregates: Vec<_> =
        outcome.products.iter().map(|product| product.aggregate.clone()).collect();
    let artifact = RunArtifact {
        products: &outcome.products,
        customers: &outcome.customers,
        forecast: &outcome.forecast,
        categories: category_rollups(&aggregates),
        insights: insights(&aggregates),
        exclusions: *exclusions,
        warnings: outcome.warnings,
    };

    let rendered = serde_json::to_string_pretty(&artifact)
        .map_err(|error| ApplicationError::Integration(error.to_string()))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|error| {
                ApplicationError::Configuration(format!(
                    "output directory `{}` is not writable: {error}",
                    parent.display()
                ))
            })?;
        }
    }
    tokio::fs::write(path, rendered).await.map_err(|error| {
        ApplicationError::Configuration(format!(
            "output path `{}` is not writable: {error}",
            path.display()
        ))
    })?;

    Ok(path.display().to_string())
}

fn init_logging(config: &AppConfig) {
    let log_level =
        config.logging.level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);

    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    // A second command in the same process keeps the first subscriber.
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
