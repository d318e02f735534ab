//! oneapi-migrate CLI - migrate a one-hub database into one-api.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use oneapi_migrate::config::{rebuild_switch_from_env, DatabaseConfig, SOURCE_DSN_ENV, TARGET_DSN_ENV};
use oneapi_migrate::{Config, MigrateError, Orchestrator};
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "oneapi-migrate")]
#[command(about = "Migrate a one-hub database (MySQL, PostgreSQL or SQLite) into one-api")]
#[command(version)]
struct Cli {
    /// Source (one-hub) DSN
    #[arg(env = SOURCE_DSN_ENV)]
    source: Option<String>,

    /// Target (one-api) DSN
    #[arg(env = TARGET_DSN_ENV)]
    target: Option<String>,

    /// Path to YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Comma-separated list of tables to migrate, in order
    #[arg(long, value_delimiter = ',')]
    tables: Option<Vec<String>>,

    /// Do not rebuild abilities after the copy
    #[arg(long)]
    skip_abilities: bool,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let config = build_config(&cli)?;
    let output_json = cli.output_json;

    let orchestrator = Orchestrator::new(config).await?;
    let result = orchestrator.run().await?;

    if output_json {
        println!("{}", result.to_json()?);
    } else if result.has_failures() {
        warn!("Some steps failed; see the log above for details");
    }

    Ok(())
}

/// Merge the config file, positional DSNs, environment and flags.
fn build_config(cli: &Cli) -> Result<Config, MigrateError> {
    let mut config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => {
            let source = required_dsn(cli.source.as_deref(), "source", SOURCE_DSN_ENV)?;
            let target = required_dsn(cli.target.as_deref(), "target", TARGET_DSN_ENV)?;
            Config::from_dsns(source, target)?
        }
    };

    if cli.config.is_some() {
        if let Some(dsn) = &cli.source {
            config.source = DatabaseConfig::new(dsn.clone());
        }
        if let Some(dsn) = &cli.target {
            config.target = DatabaseConfig::new(dsn.clone());
        }
    }

    if let Some(tables) = &cli.tables {
        config.migration.tables = tables
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
    }

    if cli.skip_abilities || !rebuild_switch_from_env() {
        config.migration.rebuild_abilities = false;
    }

    config.validate()?;
    Ok(config)
}

fn required_dsn<'a>(value: Option<&'a str>, side: &str, env: &str) -> Result<&'a str, MigrateError> {
    match value.map(str::trim) {
        Some(dsn) if !dsn.is_empty() => Ok(dsn),
        _ => Err(MigrateError::Config(format!(
            "{} DSN is required: pass it as an argument or set {}",
            side, env
        ))),
    }
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
