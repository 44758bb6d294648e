// =============================================================================
// candle-feed — example host binary
// =============================================================================
//
// Loads the engine config, registers the built-in adapters, and exposes a
// small CLI (`list-exchanges`, `run`, `fetch`) plus, for `run`, a read-only
// status server (teacher's `api/rest.rs` pattern) so an operator can watch
// a feed fill without embedding the crate in a larger host.
// =============================================================================

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use candle_feed::config::EngineConfig;
use candle_feed::feed::FeedBuilder;
use candle_feed::interval::Interval;
use candle_feed::network::NetworkConfig;
use candle_feed::pair::TradingPair;
use candle_feed::strategy::StartMode;
use candle_feed::{adapters, registry, status, transport};

#[derive(Parser)]
#[command(name = "candle-feed", about = "Multi-venue candle ingestion engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every registered exchange adapter.
    ListExchanges,
    /// Run a single feed and serve its snapshot over HTTP.
    Run {
        #[arg(long)]
        exchange: String,
        #[arg(long)]
        pair: String,
        #[arg(long)]
        interval: String,
        #[arg(long, default_value_t = 150)]
        capacity: usize,
        #[arg(long, value_enum, default_value = "auto")]
        mode: CliStartMode,
        #[arg(long, default_value_t = 8089)]
        port: u16,
    },
    /// One-shot historical fetch, printed as JSON.
    Fetch {
        #[arg(long)]
        exchange: String,
        #[arg(long)]
        pair: String,
        #[arg(long)]
        interval: String,
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[derive(Clone, clap::ValueEnum)]
enum CliStartMode {
    Auto,
    Streaming,
    Polling,
}

impl From<CliStartMode> for StartMode {
    fn from(mode: CliStartMode) -> Self {
        match mode {
            CliStartMode::Auto => StartMode::Auto,
            CliStartMode::Streaming => StartMode::Streaming,
            CliStartMode::Polling => StartMode::Polling,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = EngineConfig::load_or_default("engine_config.json");
    adapters::register_all();

    let cli = Cli::parse();
    match cli.command {
        Command::ListExchanges => {
            for name in registry::list_exchanges() {
                println!("{name}");
            }
        }
        Command::Run { exchange, pair, interval, capacity, mode, port } => {
            run_feed(config, exchange, pair, interval, capacity, mode.into(), port).await?;
        }
        Command::Fetch { exchange, pair, interval, limit } => {
            fetch_once(exchange, pair, interval, limit).await?;
        }
    }

    Ok(())
}

async fn run_feed(
    config: EngineConfig,
    exchange: String,
    pair: String,
    interval: String,
    capacity: usize,
    mode: StartMode,
    port: u16,
) -> anyhow::Result<()> {
    let pair = TradingPair::parse(&pair)?;
    let interval = Interval::parse(&interval)?;

    let mut feed = FeedBuilder::new(&exchange, pair.clone(), interval)
        .capacity(capacity)
        .network_config(NetworkConfig::production())
        .http_config(transport::HttpConfig {
            total_timeout: config.http_timeout(),
            connect_timeout: (config.http_timeout() / 2).min(std::time::Duration::from_secs(5)),
            pool_max_idle_per_host: 8,
        })
        .connect_timeout(config.ws_connect_timeout())
        .shutdown_timeout(config.shutdown_timeout())
        .backoff(config.backoff.clone())
        .build()?;

    feed.start(mode)?;
    info!(%exchange, %pair, %interval, "feed started");

    let feed_registry = status::FeedRegistry::new();
    let label = format!("{exchange}:{pair}:{interval}");
    feed_registry.insert(label, Arc::new(Mutex::new(feed))).await;

    let app = status::router(feed_registry);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "status server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn fetch_once(exchange: String, pair: String, interval: String, limit: Option<u32>) -> anyhow::Result<()> {
    let pair = TradingPair::parse(&pair)?;
    let interval = Interval::parse(&interval)?;

    let feed = FeedBuilder::new(&exchange, pair, interval)
        .network_config(NetworkConfig::production())
        .build()?;

    match feed.fetch(None, None, limit).await {
        Ok(candles) => println!("{}", serde_json::to_string_pretty(&candles)?),
        Err(e) => {
            error!(error = %e, "fetch failed");
            return Err(e.into());
        }
    }
    Ok(())
}
