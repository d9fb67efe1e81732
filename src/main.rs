use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use wztools::command::{run_cmd, CommandOptions};
use wztools::config::ToolsConfig;
use wztools::datalake::{generate_data_path, PathLayout, RangeQuery};
use wztools::utils::fetch_nearest_point;

/// Utilities for time-partitioned Parquet data lakes
#[derive(Parser)]
#[command(name = "wztools")]
#[command(version)]
#[command(about = "Utilities for time-partitioned Parquet data lakes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print (and create the directory for) the data file holding a timestamp
    Path {
        #[arg(long, value_name = "TIME", value_parser = wztools::parse_time)]
        time: NaiveDateTime,
        #[command(flatten)]
        target: Target,
    },
    /// List existing data files between two timestamps (inclusive)
    Find {
        #[arg(long, value_name = "TIME", value_parser = wztools::parse_time)]
        start: NaiveDateTime,
        #[arg(long, value_name = "TIME", value_parser = wztools::parse_time)]
        end: NaiveDateTime,
        #[command(flatten)]
        target: Target,
        /// Directory layout to read: flat or dataset (overrides config)
        #[arg(long, value_name = "LAYOUT")]
        layout: Option<PathLayout>,
        /// Print a JSON array instead of one path per line
        #[arg(long)]
        json: bool,
    },
    /// Run a shell command, streaming its output into the log
    Run {
        /// Working directory (overrides config)
        #[arg(long, value_name = "DIR")]
        cwd: Option<PathBuf>,
        /// Kill the command after this many seconds (overrides config)
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
        /// Kill the command when an output line contains this keyword
        #[arg(long = "stop", value_name = "KEYWORD")]
        stop_keywords: Vec<String>,
        /// Command line to execute
        #[arg(last = true, required = true, value_name = "CMD")]
        cmd: Vec<String>,
    },
    /// Find the nearest point to a target, optionally beyond a minimum distance
    Nearest {
        #[arg(long, value_name = "LON,LAT", value_parser = wztools::parse_point)]
        target: (f64, f64),
        #[arg(long, value_name = "DIST", default_value_t = 0.0)]
        min_dis: f64,
        #[arg(
            long = "point",
            value_name = "LON,LAT",
            required = true,
            num_args = 1..,
            value_parser = wztools::parse_point
        )]
        points: Vec<(f64, f64)>,
    },
    /// Print the resolved configuration as TOML
    Config,
}

/// Dataset and special key, falling back to `[datalake]` config
#[derive(clap::Args)]
struct Target {
    #[arg(long, value_name = "NAME")]
    dataset: Option<String>,
    #[arg(long, value_name = "KEY")]
    key: Option<String>,
}

impl Target {
    fn resolve(&self, config: &ToolsConfig) -> Result<(String, String)> {
        let dataset = self
            .dataset
            .clone()
            .or_else(|| config.datalake.dataset.clone())
            .context("No dataset given: pass --dataset or set datalake.dataset")?;
        let key = self
            .key
            .clone()
            .or_else(|| config.datalake.special_key.clone())
            .context("No special key given: pass --key or set datalake.special_key")?;
        Ok((dataset, key))
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = if let Some(config_path) = &cli.config {
        ToolsConfig::load_from_path(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        ToolsConfig::load_or_default().context("Failed to load configuration")?
    };

    let logger = wztools::init_logging(&config.logging, cli.log_level.as_deref())?;
    tracing::debug!(
        root = %config.datalake.root.display(),
        read_layout = %config.datalake.read_layout,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Path { time, target } => {
            let (dataset, key) = target.resolve(&config)?;
            let path = generate_data_path(&config.datalake.root, &dataset, &key, time)?;
            println!("{}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Find {
            start,
            end,
            target,
            layout,
            json,
        } => {
            let (dataset, key) = target.resolve(&config)?;
            let layout = layout.unwrap_or_else(|| wztools::path_layout(config.datalake.read_layout));
            let paths = RangeQuery::new(&config.datalake.root, &dataset, &key)
                .layout(layout)
                .resolve(start, end)?;

            if json {
                let paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                println!("{}", serde_json::to_string_pretty(&paths)?);
            } else {
                for path in &paths {
                    println!("{}", path.display());
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run {
            cwd,
            timeout,
            stop_keywords,
            cmd,
        } => {
            let mut options = CommandOptions::new();
            options.cwd = cwd.or_else(|| config.command.cwd.clone());
            options.timeout = timeout
                .map(Duration::from_secs)
                .or_else(|| config.command.timeout());
            options.stop_keywords = if stop_keywords.is_empty() {
                config.command.stop_keywords.clone()
            } else {
                stop_keywords
            };
            wztools::check_stop_keywords(&options.stop_keywords)?;

            let output = run_cmd(&cmd.join(" "), &options, Some(&logger));
            Ok(ExitCode::from(wztools::exit_code(output.code())))
        }
        Commands::Nearest {
            target,
            min_dis,
            points,
        } => {
            let (lon, lat) = fetch_nearest_point(points, target, min_dis)?;
            println!("{},{}", lon, lat);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
