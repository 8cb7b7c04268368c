//! routesyncd - per-host-subnet route synchronization daemon
//!
//! Watches cluster topology from the metadata service and keeps the local
//! routing table converged on one route per peer subnet.

use clap::Parser;
use phs_routesyncd::{
    InterfaceResolver, MetadataClient, Reconciler, Result, RouteSyncError, RouteTableProvider,
    TopologyClient, TopologyWatcher, DEFAULT_METADATA_ADDRESS,
};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use tokio::time::Duration;
use tracing::{error, info, Level};

/// The only built-in route update strategy.
const HOSTGW_PROVIDER: &str = "hostgw";

/// Per-host-subnet route synchronization agent
#[derive(Parser, Debug)]
#[command(name = "routesyncd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging (env: RANCHER_DEBUG)
    #[arg(short, long)]
    debug: bool,

    /// Metadata service address (env: RANCHER_METADATA_ADDRESS)
    #[arg(long)]
    metadata_address: Option<String>,

    /// Apply route table updates (env: RANCHER_ENABLE_ROUTE_UPDATE)
    #[arg(long)]
    enable_route_update: bool,

    /// Route update strategy (env: RANCHER_ROUTE_UPDATE_PROVIDER)
    #[arg(long)]
    route_update_provider: Option<String>,

    /// Seconds between topology change checks
    #[arg(long, default_value_t = 5)]
    change_check_interval: u64,

    /// Seconds between full fallback resyncs
    #[arg(long, default_value_t = 300)]
    resync_interval: u64,
}

/// Effective daemon settings after merging flags and environment.
#[derive(Debug)]
struct Settings {
    debug: bool,
    metadata_address: String,
    enable_route_update: bool,
    route_update_provider: String,
    change_check_interval: Duration,
    resync_interval: Duration,
}

impl Settings {
    /// Flags win over environment variables, environment over defaults.
    fn resolve(args: Args) -> Self {
        Self {
            debug: args.debug || env_flag("RANCHER_DEBUG"),
            metadata_address: flag_or_env(
                args.metadata_address,
                "RANCHER_METADATA_ADDRESS",
                DEFAULT_METADATA_ADDRESS,
            ),
            enable_route_update: args.enable_route_update
                || env_flag("RANCHER_ENABLE_ROUTE_UPDATE"),
            route_update_provider: flag_or_env(
                args.route_update_provider,
                "RANCHER_ROUTE_UPDATE_PROVIDER",
                HOSTGW_PROVIDER,
            ),
            change_check_interval: Duration::from_secs(args.change_check_interval),
            resync_interval: Duration::from_secs(args.resync_interval),
        }
    }
}

fn flag_or_env(flag: Option<String>, var: &str, default: &str) -> String {
    flag.or_else(|| std::env::var(var).ok())
        .unwrap_or_else(|| default.to_string())
}

fn env_flag(var: &str) -> bool {
    matches!(std::env::var(var).as_deref(), Ok("true") | Ok("1"))
}

#[tokio::main]
async fn main() -> ExitCode {
    let settings = Settings::resolve(Args::parse());
    init_logging(settings.debug);

    info!("Starting routesyncd");

    match run(settings).await {
        Ok(()) => {
            info!("routesyncd exiting normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "routesyncd exiting with error");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .init();
}

async fn run(settings: Settings) -> Result<()> {
    let metadata = MetadataClient::connect_and_wait(&settings.metadata_address).await?;
    info!(address = %settings.metadata_address, "Metadata service connected");

    if !settings.enable_route_update {
        info!("Route update disabled, idling until shutdown");
        wait_for_shutdown().await?;
        return Ok(());
    }

    if settings.route_update_provider != HOSTGW_PROVIDER {
        // Unknown strategy is a startup misconfiguration, the one class of
        // error that is fatal to the process.
        return Err(RouteSyncError::internal(format!(
            "unknown route update provider '{}'",
            settings.route_update_provider
        )));
    }

    let (provider, resolver) = platform_route_table()?;
    let topology: Arc<dyn TopologyClient> = Arc::new(metadata);

    let reconciler = Arc::new(Reconciler::new(
        Arc::clone(&topology),
        resolver,
        provider,
    ));
    Arc::clone(&reconciler).start(settings.resync_interval)?;

    let watcher = TopologyWatcher::new(topology, settings.change_check_interval)
        .spawn(Arc::clone(&reconciler));

    wait_for_shutdown().await?;

    reconciler.stop().await;
    if let Err(e) = watcher.await {
        error!(error = %e, "Topology watcher task failed");
    }

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    signal::ctrl_c()
        .await
        .map_err(|e| RouteSyncError::internal(format!("waiting for shutdown signal: {}", e)))?;
    info!("Received shutdown signal");
    Ok(())
}

/// Creates the platform route table provider and interface resolver.
///
/// Route table access is a platform capability; a port to a concrete
/// target plugs its implementation in here. Without one, starting with
/// route updates enabled is a misconfiguration.
#[allow(clippy::type_complexity)]
fn platform_route_table() -> Result<(Arc<dyn RouteTableProvider>, Arc<dyn InterfaceResolver>)> {
    Err(RouteSyncError::provider(
        "init",
        "no route table provider is built in for this platform",
    ))
}
