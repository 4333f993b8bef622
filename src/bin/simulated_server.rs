use anyhow::Context;
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use traffic_ga::models::{ServerModel, ServerModelConfig};
use traffic_ga::server::{self, AppState};

#[derive(Parser)]
#[command(name = "simulated-server")]
#[command(about = "Backend server whose latency, throughput and errors degrade under load", long_about = None)]
struct Cli {
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(short, long, default_value_t = 80)]
    port: u16,

    /// Traffic beyond which every request fails
    #[arg(long, default_value_t = 80.0)]
    cap: f64,

    /// Seed of the throughput noise
    #[arg(long)]
    seed: Option<u64>,

    /// Delay each answer by the latency it reports
    #[arg(long)]
    simulate_latency: bool,
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to listen for shutdown signal");
    }
    info!("Received shutdown signal");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = ServerModelConfig::default().with_cap(cli.cap);
    config
        .validate()
        .with_context(|| format!("--cap {}", cli.cap))?;
    let model = match cli.seed {
        Some(seed) => ServerModel::seeded(config, seed),
        None => ServerModel::new(config, StdRng::from_os_rng()),
    };
    let state = AppState::new(model, cli.simulate_latency)?;

    let listener = TcpListener::bind((cli.host.as_str(), cli.port))
        .await
        .with_context(|| format!("binding {}:{}", cli.host, cli.port))?;

    server::serve(listener, state, shutdown_signal()).await?;

    info!("Simulated server stopped");
    Ok(())
}
