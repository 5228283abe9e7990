use std::path::PathBuf;
use std::sync::Arc;

use busline_core::config::{ROUTES_URL_VAR, STOPS_URL_VAR};
use busline_core::transit::prelude::*;
use busline_core::{HttpRouteStore, MemoryRouteStore, SavePolicy, SessionConfig, StoreConfig};
use clap::{Parser, Subcommand};
use eyre::{Context, Result};
use tracing::{Level, debug};
use tracing_subscriber::filter::FilterFn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

use commands::{EditScript, StopAssignment};

#[derive(Parser, Debug)]
#[command(
    name = "busline",
    version,
    about = "Browse and edit the bus route catalog",
    long_about = "Browse and edit the bus route catalog.\n\n\
                  The remote store is configured with BUSLINE_ROUTES_URL and \
                  BUSLINE_STOPS_URL (a .env file in the working directory is read \
                  first). When the store cannot be reached, routes are served from \
                  the fallback dataset."
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Routes resource URL (overrides BUSLINE_ROUTES_URL)
    #[arg(long, global = true)]
    routes_url: Option<String>,

    /// Stops resource URL (overrides BUSLINE_STOPS_URL)
    #[arg(long, global = true)]
    stops_url: Option<String>,

    /// Fallback dataset document to use instead of the bundled one
    #[arg(long, global = true)]
    fallback: Option<PathBuf>,

    /// Do not contact the remote store; serve everything from the fallback dataset
    #[arg(long, global = true)]
    offline: bool,

    /// Verbose output (show debug messages)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List routes
    Routes {
        /// Only routes whose number, name or stops match
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show a route and its stops
    Show { number: String },

    /// Edit a route; changes are committed unless --dry-run is given
    Edit {
        number: String,

        /// New route name
        #[arg(long)]
        name: Option<String>,

        /// Append a stop, as NAME or NAME=TIME
        #[arg(long = "add-stop", value_name = "NAME[=TIME]")]
        add_stops: Vec<String>,

        /// Rename a stop, as ID=NAME
        #[arg(long = "rename-stop", value_name = "ID=NAME", value_parser = parse_assignment)]
        rename_stops: Vec<StopAssignment>,

        /// Change a stop's time label, as ID=TIME
        #[arg(long = "retime-stop", value_name = "ID=TIME", value_parser = parse_assignment)]
        retime_stops: Vec<StopAssignment>,

        /// Remove a stop
        #[arg(long = "remove-stop", value_name = "ID")]
        remove_stops: Vec<StopId>,

        /// Also write new and changed stops to the remote store
        #[arg(long)]
        persist_stops: bool,

        /// Print the edited route and discard it instead of committing
        #[arg(long)]
        dry_run: bool,
    },
}

fn parse_assignment(value: &str) -> Result<StopAssignment, String> {
    let (id, text) = value
        .split_once('=')
        .ok_or_else(|| format!("expected ID=VALUE, got {value:?}"))?;
    let id = id
        .trim()
        .parse()
        .map_err(|_| format!("invalid stop id {id:?}"))?;
    Ok(StopAssignment {
        id,
        value: text.to_owned(),
    })
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let filter = FilterFn::new(move |meta| {
        meta.module_path().unwrap_or_default().starts_with("busline") && *meta.level() <= level
    });
    let layer = tracing_subscriber::fmt::layer()
        .without_time()
        .with_writer(std::io::stderr);
    tracing_subscriber::registry().with(layer).with(filter).init();
}

fn store_config(args: &Args) -> Result<StoreConfig> {
    let mut config = match (&args.routes_url, &args.stops_url) {
        (Some(routes), Some(stops)) => StoreConfig::new(routes, stops),
        _ => StoreConfig::from_env().wrap_err_with(|| {
            format!(
                "set {ROUTES_URL_VAR} and {STOPS_URL_VAR}, \
                 pass --routes-url and --stops-url, or use --offline"
            )
        })?,
    };
    if let Some(routes) = &args.routes_url {
        config.routes_url = routes.clone();
    }
    if let Some(stops) = &args.stops_url {
        config.stops_url = stops.clone();
    }
    Ok(config)
}

fn dataset(args: &Args) -> Result<Arc<StaticRouteDataset>> {
    let dataset = match &args.fallback {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("reading {}", path.display()))?;
            StaticRouteDataset::from_json(&json).wrap_err("parsing fallback dataset")?
        }
        None => StaticRouteDataset::bundled(),
    };
    debug!(version = dataset.version(), routes = dataset.len(), "fallback dataset");
    Ok(Arc::new(dataset))
}

async fn run<S: RouteStore>(
    command: Command,
    store: Arc<S>,
    dataset: Arc<StaticRouteDataset>,
    position_base: PositionBase,
) -> Result<()> {
    match command {
        Command::Routes { search } => commands::routes(store, dataset, search.as_deref()).await,
        Command::Show { number } => {
            let config = SessionConfig {
                position_base,
                ..Default::default()
            };
            commands::show(store, dataset, &config, RouteNumber::new(number)).await
        }
        Command::Edit {
            number,
            name,
            add_stops,
            rename_stops,
            retime_stops,
            remove_stops,
            persist_stops,
            dry_run,
        } => {
            let config = SessionConfig {
                save_policy: if persist_stops {
                    SavePolicy::NameAndStops
                } else {
                    SavePolicy::NameOnly
                },
                position_base,
                ..Default::default()
            };
            let script = EditScript {
                name,
                add_stops,
                rename_stops,
                retime_stops,
                remove_stops,
                dry_run,
            };
            commands::edit(store, dataset, &config, RouteNumber::new(number), script).await
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let args = Args::parse();
    setup_logging(args.verbose);

    let dataset = dataset(&args)?;

    if args.offline {
        let store = Arc::new(MemoryRouteStore::default());
        store.fail_all();
        return run(args.command, store, dataset, PositionBase::default()).await;
    }

    let config = store_config(&args)?;
    let position_base = config.position_base;
    let store = Arc::new(HttpRouteStore::new(&config).wrap_err("invalid store configuration")?);
    run(args.command, store, dataset, position_base).await
}
