use anyhow::bail;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::ClientBuilder;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use traffic_ga::Configuration;

/// Background traffic range, in traffic units.
const MIN_LOAD: f64 = 10.0;
const MAX_LOAD: f64 = 80.0;

#[derive(Parser)]
#[command(name = "load-driver")]
#[command(about = "Keep servers busy with random background traffic", long_about = None)]
struct Cli {
    /// Server URLs to load
    servers: Vec<String>,

    /// Take the server list from a configuration file instead
    #[arg(short, long, conflicts_with = "servers")]
    config: Option<PathBuf>,

    /// Pause between rounds, in seconds
    #[arg(long, default_value_t = 5.0)]
    interval_secs: f64,

    #[arg(long, default_value_t = 2.0)]
    timeout_secs: f64,

    /// Stop after this many rounds
    #[arg(long)]
    rounds: Option<u64>,

    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let servers = match &cli.config {
        Some(path) => Configuration::load(path)?.servers,
        None => cli.servers.clone(),
    };
    if servers.is_empty() {
        bail!("no servers given");
    }

    let interval = Duration::try_from_secs_f64(cli.interval_secs)?;
    let client = ClientBuilder::new()
        .timeout(Duration::try_from_secs_f64(cli.timeout_secs)?)
        .build()?;
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut round = 0;
    loop {
        if cli.rounds.is_some_and(|rounds| round >= rounds) {
            break;
        }
        round += 1;

        for server in &servers {
            let traffic = rng.random_range(MIN_LOAD..MAX_LOAD);
            match client
                .post(server)
                .json(&json!({ "traffic_load": traffic }))
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    info!("[OK] {server} <- {traffic:.2}");
                }
                Ok(response) => {
                    warn!("[ERR] {server} <- {traffic:.2} ({})", response.status());
                }
                Err(err) => {
                    error!("[FAIL] {server}: {err}");
                }
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    Ok(())
}
