//! `outcrop-server` entry point: loads configuration, initializes logging,
//! and runs the accept loop + fixed-tick simulation until shutdown.

use outcrop::config::ServerConfig;
use outcrop::network;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::load();
    log::info!(
        "outcrop-server starting: port={} seed={} max_players={}",
        config.port, config.seed, config.max_players
    );

    network::run_server(config).await
}
