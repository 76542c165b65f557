use serde_json::json;

use retailsense_core::config::{AppConfig, CollaboratorMode, LoadOptions, LogFormat};

use super::CommandResult;

/// Prints the effective configuration after defaults, file patch, and
/// environment overrides have been applied.
pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("config", "config_validation", error.to_string(), 2)
        }
    };

    let payload = json!({
        "command": "config",
        "status": "ok",
        "effective": {
            "database": {
                "url": config.database.url,
                "max_connections": config.database.max_connections,
                "timeout_secs": config.database.timeout_secs,
            },
            "ingest": {
                "events_path": config.ingest.events_path.display().to_string(),
                "start_date": config.ingest.start_date,
                "end_date": config.ingest.end_date,
                "min_activity_events": config.ingest.min_activity_events,
            },
            "trend": {
                "growing_threshold": config.trend.growing_threshold,
                "declining_threshold": config.trend.declining_threshold,
            },
            "scoring": {
                "conversion_weight": config.scoring.conversion_weight,
                "revenue_weight": config.scoring.revenue_weight,
                "reach_weight": config.scoring.reach_weight,
                "trend_bonus": config.scoring.trend_bonus,
                "revenue_per_view_divisor": config.scoring.revenue_per_view_divisor,
                "reach_saturation": config.scoring.reach_saturation,
            },
            "collaborators": {
                "mode": mode_label(config.collaborators.mode),
                "forecast_url": config.collaborators.forecast_url,
                "segmentation_url": config.collaborators.segmentation_url,
                "classification_url": config.collaborators.classification_url,
                "timeout_secs": config.collaborators.timeout_secs,
                "max_concurrent_requests": config.collaborators.max_concurrent_requests,
                "batch_size": config.collaborators.batch_size,
                "forecast_horizon_days": config.collaborators.forecast_horizon_days,
                "early_window_days": config.collaborators.early_window_days,
            },
            "logging": {
                "level": config.logging.level,
                "format": format_label(config.logging.format),
            },
        },
    });

    CommandResult::from_payload(0, &payload)
}

fn mode_label(mode: CollaboratorMode) -> &'static str {
    match mode {
        CollaboratorMode::Disabled => "disabled",
        CollaboratorMode::Stub => "stub",
        CollaboratorMode::Http => "http",
    }
}

fn format_label(format: LogFormat) -> &'static str {
    match format {
        LogFormat::Compact => "compact",
        LogFormat::Pretty => "pretty",
        LogFormat::Json => "json",
    }
}
