//! Healthflow CLI: run the pipeline over local exports.
//!
//! Commands:
//! - `run` execute the five stages and write artifacts under the data dir
//! - `show-config` print the effective configuration as JSON

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use healthflow::config::PipelineConfig;
use healthflow::events::LoggingEventSink;
use healthflow::observability::{init_tracing, log_pipeline_summary};
use healthflow::pipeline::PipelineBuilder;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "healthflow",
    about = "Health data pipeline: fetch, extract, transform, aggregate, report"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline.
    Run(RunArgs),
    /// Print the effective configuration.
    ShowConfig(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    /// JSON configuration file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of days to process, ending on the end date.
    #[arg(long)]
    days: Option<u32>,

    /// Services to process (repeat or comma separate).
    #[arg(long, value_delimiter = ',')]
    services: Vec<String>,

    /// Directory of local exports, one sub-directory per service.
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Root directory for artifacts.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Do not persist intermediate artifacts.
    #[arg(long, default_value_t = false)]
    no_csv: bool,

    /// Skip the report stage.
    #[arg(long, default_value_t = false)]
    no_report: bool,

    /// Verbose diagnostics.
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Services fetched concurrently.
    #[arg(long)]
    concurrency: Option<usize>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Last day of the range (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<String>,

    /// Log as JSON lines.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(args),
        Commands::ShowConfig(args) => {
            let config = load_config(&args)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn load_config(args: &ConfigArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(days) = args.days {
        config = config.with_days(days);
    }
    if !args.services.is_empty() {
        config = config.with_services(args.services.iter().map(|s| s.trim().to_lowercase()));
    }
    if let Some(input_dir) = &args.input_dir {
        config = config.with_input_dir(input_dir);
    }
    if let Some(data_dir) = &args.data_dir {
        config = config.with_data_dir(data_dir);
    }
    if args.no_csv {
        config = config.with_csv(false);
    }
    if args.no_report {
        config = config.with_report(false);
    }
    if args.debug {
        config = config.with_debug(true);
    }
    if let Some(concurrency) = args.concurrency {
        let fetch = config.fetch.clone().with_max_concurrent_services(concurrency);
        config = config.with_fetch(fetch);
    }

    config.validate()?;
    Ok(config)
}

fn run(args: RunArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    init_tracing(config.debug_mode, args.json_logs);

    let end_date = args
        .end
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("--end must be YYYY-MM-DD")?
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let orchestrator = PipelineBuilder::local(&config)
        .with_event_sink(Arc::new(LoggingEventSink::debug()))
        .build();

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    let outcome = runtime.block_on(orchestrator.run_until(
        end_date,
        config.days,
        config.services.iter().cloned(),
        config.enable_csv,
        config.debug_mode,
    ));

    log_pipeline_summary(&outcome);

    if !outcome.success() {
        tracing::error!(
            "Pipeline finished with {}/{} stages completed",
            outcome.stages_completed(),
            outcome.total_stages()
        );
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_args(argv: &[&str]) -> ConfigArgs {
        let cli = Cli::parse_from(argv);
        match cli.command {
            Commands::ShowConfig(args) => args,
            Commands::Run(args) => args.config,
        }
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = config_args(&[
            "healthflow",
            "show-config",
            "--days",
            "3",
            "--services",
            "Whoop, hevy",
            "--no-csv",
            "--concurrency",
            "2",
        ]);
        let config = load_config(&args).unwrap();

        assert_eq!(config.days, 3);
        assert_eq!(config.services, vec!["whoop", "hevy"]);
        assert!(!config.enable_csv);
        assert!(config.include_report);
        assert_eq!(config.fetch.max_concurrent_services, 2);
    }

    #[test]
    fn test_invalid_days_rejected() {
        let args = config_args(&["healthflow", "run", "--days", "0"]);
        assert!(load_config(&args).is_err());
    }
}
