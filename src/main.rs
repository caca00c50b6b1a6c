use clap::Parser;
use ferrumkv::config::{CliArgs, Config};
use ferrumkv::server;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ferrumkv: {:#}", e);
            std::process::exit(2);
        }
    };

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("FerrumKV starting...");

    if let Err(e) = server::run(config).await {
        error!("Server error: {:#}", e);
        std::process::exit(1);
    }

    info!("FerrumKV stopped");
}
