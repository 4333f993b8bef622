use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use traffic_ga::bootstrap::{Backend, bootstrap_optimizer};
use traffic_ga::models::ServerModelConfig;
use traffic_ga::report::Report;
use traffic_ga::Configuration;

#[derive(Parser)]
#[command(name = "ga-controller")]
#[command(about = "Search for the traffic split that makes a server pool perform best", long_about = None)]
struct Cli {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Query in-process server models instead of the configured URLs
    #[arg(long)]
    simulate: bool,

    /// With --simulate, delay each query by the latency it reports
    #[arg(long, requires = "simulate")]
    simulate_latency: bool,

    /// Seed of the search, overriding the configuration
    #[arg(long)]
    seed: Option<u64>,

    /// Write the JSON report to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut configuration = Configuration::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if cli.seed.is_some() {
        configuration.seed = cli.seed;
    }

    let backend = if cli.simulate {
        Backend::Simulated {
            model: ServerModelConfig::default(),
            seed: configuration.seed,
            simulate_latency: cli.simulate_latency,
        }
    } else {
        Backend::Remote
    };

    info!(
        servers = configuration.servers.len(),
        simulate = cli.simulate,
        "Running genetic algorithm optimization"
    );
    let optimizer = bootstrap_optimizer(&configuration, &backend)?;
    let outcome = optimizer.run().await?;

    let report = Report::new(&configuration.servers, &outcome);
    println!("{report}");

    if let Some(path) = cli.report {
        tokio::fs::write(&path, report.to_json()?)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "Report written");
    }

    Ok(())
}
