use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use ddleash::commands::{self, MonitorItem, METRICS_COUNT};
use ddleash::observability::{init_tracing, Metrics};
use ddleash::{LeashConfig, PipelineConfig, Result, WebClient};

#[derive(Parser)]
#[command(name = "ddleash")]
#[command(about = "Manipulate Datadog metrics to keep them on a leash")]
struct Cli {
    /// Config file (default is $HOME/.ddleash.toml, then ./.ddleash.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report a value to Datadog. Only "metrics-count" is supported.
    Monitor {
        #[arg(default_value = METRICS_COUNT)]
        item: String,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Print the total number of metric contexts
    Count {
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// List all metric names, sorted alphabetically
    List {
        /// Look-back window in seconds
        #[arg(long)]
        window: Option<u32>,
    },
}

#[derive(Args)]
struct PipelineArgs {
    /// Concurrent detail fetches
    #[arg(short, long)]
    workers: Option<usize>,

    /// Look-back window in seconds
    #[arg(long)]
    window: Option<u32>,

    /// Attempts per metric before giving up
    #[arg(long)]
    max_attempts: Option<u32>,
}

impl PipelineArgs {
    fn apply(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(window) = self.window {
            config = config.with_window(window);
        }
        if let Some(max_attempts) = self.max_attempts {
            config = config.with_max_attempts(max_attempts);
        }
        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_json) {
        eprintln!("failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = LeashConfig::discover(cli.config.as_deref())?;
    let client = Arc::new(WebClient::new(
        config.datadog.clone(),
        config.http.timeout(),
    )?);

    match cli.command {
        Command::Monitor { item, pipeline } => match MonitorItem::parse(&item)? {
            MonitorItem::MetricsCount => {
                let metrics = Metrics::new(&config.dogstatsd);
                commands::monitor_metrics_count(
                    client,
                    pipeline.apply(config.pipeline.clone()),
                    &config.datadog.team,
                    &metrics,
                )
                .await?;
            }
        },
        Command::Count { pipeline } => {
            let sum =
                commands::count_contexts(client, pipeline.apply(config.pipeline.clone())).await?;
            println!("Datadog handles {} contexts.", sum);
        }
        Command::List { window } => {
            let window = window.unwrap_or(config.pipeline.window);
            for name in commands::list_metric_names(&*client, window).await? {
                println!("{}", name);
            }
        }
    }

    Ok(())
}
