use serde::Serialize;

use retailsense_core::config::{AppConfig, CollaboratorMode, LoadOptions};
use retailsense_db::{connect_with_settings, migrations};

use super::CommandResult;

#[derive(Debug, Serialize)]
struct Check {
    name: &'static str,
    status: &'static str,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    command: String,
    status: String,
    checks: Vec<Check>,
}

impl Check {
    fn ok(name: &'static str, detail: impl Into<String>) -> Self {
        Self { name, status: "ok", detail: detail.into() }
    }

    fn failed(name: &'static str, detail: impl Into<String>) -> Self {
        Self { name, status: "failed", detail: detail.into() }
    }
}

pub fn run(json: bool) -> CommandResult {
    let mut checks = Vec::new();

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(Check::ok("config", "configuration loaded and validated"));
            Some(config)
        }
        Err(error) => {
            checks.push(Check::failed("config", error.to_string()));
            None
        }
    };

    if let Some(config) = &config {
        checks.push(check_events_feed(config));
        checks.push(check_collaborators(config));

        match super::runtime() {
            Ok(runtime) => checks.push(runtime.block_on(check_database(config))),
            Err(error) => {
                checks.push(Check::failed("database", format!("async runtime failed: {error}")))
            }
        }
    }

    let healthy = checks.iter().all(|check| check.status == "ok");
    let report = DoctorReport {
        command: "doctor".to_string(),
        status: if healthy { "ok" } else { "error" }.to_string(),
        checks,
    };

    let exit_code = u8::from(!healthy);
    if json {
        CommandResult::from_payload(exit_code, &report)
    } else {
        CommandResult { exit_code, output: render_text(&report) }
    }
}

fn check_events_feed(config: &AppConfig) -> Check {
    let path = &config.ingest.events_path;
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => {
            Check::ok("events_feed", format!("`{}` is readable", path.display()))
        }
        Ok(_) => Check::failed("events_feed", format!("`{}` is not a file", path.display())),
        Err(error) => {
            Check::failed("events_feed", format!("`{}` is unreadable: {error}", path.display()))
        }
    }
}

fn check_collaborators(config: &AppConfig) -> Check {
    match config.collaborators.mode {
        CollaboratorMode::Disabled => {
            Check::ok("collaborators", "disabled; prediction fields will stay null")
        }
        CollaboratorMode::Stub => Check::ok("collaborators", "deterministic offline stubs"),
        CollaboratorMode::Http => Check::ok(
            "collaborators",
            format!(
                "http mode with {}s timeout, {} max in flight",
                config.collaborators.timeout_secs, config.collaborators.max_concurrent_requests
            ),
        ),
    }
}

async fn check_database(config: &AppConfig) -> Check {
    let pool = match connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    {
        Ok(pool) => pool,
        Err(error) => return Check::failed("database", format!("connect failed: {error}")),
    };

    match migrations::run_pending(&pool).await {
        Ok(()) => Check::ok("database", "connected and schema is current"),
        Err(error) => Check::failed("database", format!("migrations failed: {error}")),
    }
}

fn render_text(report: &DoctorReport) -> String {
    let mut lines = vec![format!("doctor: {}", report.status)];
    for check in &report.checks {
        lines.push(format!("  [{}] {}: {}", check.status, check.name, check.detail));
    }
    lines.join("\n")
}
