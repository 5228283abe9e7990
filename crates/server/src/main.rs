use std::net::SocketAddr;
use std::path::PathBuf;

use busline_server::{ServerState, StubServer};
use busline_transit::StaticRouteDataset;
use clap::Parser;
use eyre::{Context, Result};
use tracing::{Level, info};
use tracing_subscriber::filter::FilterFn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(
    name = "busline-server",
    version,
    about = "Serve the Routes and Stops resources from memory for local development"
)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8787)]
    port: u16,

    /// Seed from this dataset document instead of the bundled routes
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Answer every request with 503
    #[arg(long)]
    outage: bool,

    /// Verbose output (log every request)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = FilterFn::new(move |meta| {
        meta.module_path().unwrap_or_default().starts_with("busline") && *meta.level() <= level
    });
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().without_time())
        .with(filter)
        .init();

    let dataset = match &args.seed {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("reading {}", path.display()))?;
            StaticRouteDataset::from_json(&json).wrap_err("parsing seed dataset")?
        }
        None => StaticRouteDataset::bundled(),
    };

    let state = ServerState::seeded(&dataset);
    state.set_outage(args.outage);

    let _server = StubServer::bind(state, SocketAddr::from(([127, 0, 0, 1], args.port)))
        .await
        .wrap_err("binding listener")?;
    info!(routes = dataset.len(), "serving /routes and /stops, press ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    Ok(())
}
