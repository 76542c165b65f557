pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "retailsense",
    about = "RetailSense operator CLI",
    long_about = "Operate the RetailSense analytics pipeline: rebuild product and customer \
                  aggregates, inspect effective configuration, validate runtime readiness, and \
                  generate deterministic sample event feeds.",
    after_help = "Examples:\n  retailsense run --predict\n  retailsense run --output outputs/run.json\n  retailsense doctor --json\n  retailsense seed --path events.jsonl"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Rebuild the aggregate collections from the configured event feed and persist them"
    )]
    Run {
        #[arg(long, help = "Annotate aggregates through the prediction collaborators")]
        predict: bool,
        #[arg(long, help = "Also write the full run artifact (aggregates, forecast, report) as JSON")]
        output: Option<PathBuf>,
        #[arg(long, help = "Explicit config file path")]
        config: Option<PathBuf>,
    },
    #[command(about = "Inspect effective configuration values after file and env overrides")]
    Config,
    #[command(about = "Validate config, event feed readability, and database connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Write a deterministic sample event feed for offline runs")]
    Seed {
        #[arg(long, default_value = "events.jsonl", help = "Destination JSONL path")]
        path: PathBuf,
        #[arg(long, default_value_t = 50, help = "Number of sample products")]
        products: u32,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run { predict, output, config } => {
            commands::run::run(commands::run::RunOptions { predict, output, config_path: config })
        }
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Seed { path, products } => commands::seed::run(&path, products),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
