mod platforms;
mod run;
mod scheduler;
mod signals;

use beacon_core::{load_app_config, AppConfig, SignalStatus};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "beacon")]
#[command(about = "Poll platforms for paid-help signals and track them through the funnel")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Discover adapters and poll them until SIGINT or SIGTERM
    Run {
        /// Keep signals in memory instead of Postgres (nothing survives exit)
        #[arg(long)]
        memory: bool,
    },
    /// Show discovered adapters and the ones excluded from the rotation
    Platforms,
    /// List stored signals, newest first
    Signals {
        /// Only signals in this status (new, contacted, won, lost, delivered)
        #[arg(long)]
        status: Option<SignalStatus>,
        /// Only signals from this platform
        #[arg(long)]
        platform: Option<String>,
        /// Minimum urgency score
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        min_score: Option<u8>,
        /// Maximum rows to print
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
    /// Move a signal through the funnel
    Transition {
        fingerprint: String,
        status: SignalStatus,
        /// Revenue to record; only accepted on won and delivered
        #[arg(long)]
        revenue: Option<Decimal>,
    },
    /// Per-status counts and realised revenue
    Funnel,
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_app_config()?;
    init_tracing(&config)?;

    match cli.command {
        Commands::Run { memory } => run::run_engine(&config, memory).await?,
        Commands::Platforms => platforms::run_platforms(&config).await?,
        Commands::Signals {
            status,
            platform,
            min_score,
            limit,
        } => {
            let filter = beacon_core::SignalFilter {
                status,
                platform,
                min_score,
                limit: Some(limit),
            };
            signals::run_signals(&config, &filter).await?;
        }
        Commands::Transition {
            fingerprint,
            status,
            revenue,
        } => signals::run_transition(&config, &fingerprint, status, revenue).await?,
        Commands::Funnel => signals::run_funnel(&config).await?,
    }

    Ok(())
}
