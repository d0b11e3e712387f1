use log::{info, warn};
use marketfeed_client::{
    FeedNotice, MarketDataClient, WsTransport, load_config, load_default_config,
};
use std::time::Duration;

fn print_help() {
    eprintln!(
        r#"Marketfeed Monitor - live market data synchronization client

USAGE:
    marketfeed-monitor [OPTIONS]

OPTIONS:
    --config <PATH>     Load configuration from JSON file
    --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG            Log level filter (default: info)

EXAMPLES:
    # Run against the embedded default endpoint
    marketfeed-monitor

    # Run with config file
    marketfeed-monitor --config client.json
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                let Some(path) = args.get(i) else {
                    anyhow::bail!("--config requires a path argument");
                };
                config_path = Some(path.clone());
            }
            arg => {
                print_help();
                anyhow::bail!("Unknown argument: {}", arg);
            }
        }
        i += 1;
    }

    let file = match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            load_config(&path)?
        }
        None => load_default_config()?,
    };
    file.validate()?;
    let config = file.to_client_config()?;
    info!("Endpoint: {}", config.endpoint);
    info!("Topics: {:?}", config.topics);

    let client = MarketDataClient::spawn(config, WsTransport::new());
    let mut notices = client.notices();
    let mut summary = tokio::time::interval(Duration::from_secs(30));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
                break;
            }
            notice = notices.recv() => match notice {
                Ok(FeedNotice::SessionEstablished { client_id }) => {
                    info!("Session {} established", client_id);
                }
                Ok(FeedNotice::Error(message)) => warn!("Feed error: {}", message),
                Ok(FeedNotice::SnapshotComplete) => {
                    info!(
                        "Snapshot loaded: {} indicators, {} bars",
                        client.indicators().len(),
                        client.ohlcv().len()
                    );
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Monitor lagged behind {} notices", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            _ = summary.tick() => {
                let status = client.status();
                info!(
                    "{:?} ({:?}) | indicators={} bars={} minute={} predictions={} | last close={:?} | error={:?}",
                    status.state,
                    client.availability(),
                    client.indicators().len(),
                    client.ohlcv().len(),
                    client.minute_bars().len(),
                    client.predictions().len(),
                    client.latest_ohlcv().map(|b| b.close),
                    status.last_error,
                );
            }
        }
    }

    client.shutdown().await?;
    Ok(())
}
