use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use worldobjects::{
    broadcast::TracingBroadcaster,
    config::ConfigLoader,
    engine::{Engine, EngineSettings},
    region::SiteCustomizations,
    registry::ObjectRegistry,
    telemetry,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Global world object ticker")]
struct Cli {
    /// Path to the world config YAML file
    #[arg(long, default_value = "worlds/home.yaml")]
    config: PathBuf,

    /// Stop after this many ticks (runs until Ctrl-C when omitted)
    #[arg(long)]
    ticks: Option<u64>,

    /// Override the tick interval in milliseconds
    #[arg(long)]
    tick_interval_ms: Option<u64>,

    /// Print a JSON snapshot of the registry on exit
    #[arg(long)]
    report: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let loader = ConfigLoader::new(".");
    let config = loader.load(&cli.config)?;
    telemetry::init_tracing(&config.logging.level)?;

    let mut registry = ObjectRegistry::new(TracingBroadcaster::new())
        .with_visibility_radius(config.visibility_radius);
    let loaded = registry
        .load_definitions(&config.definitions)
        .with_context(|| format!("world '{}' failed to start", config.name))?;
    info!(
        world = %config.name,
        objects = loaded.loaded,
        skipped = loaded.skipped,
        "world objects ready"
    );

    let site = SiteCustomizations::from_config(&config.region);
    let cleared = site.clear_categories(&mut registry);
    info!(
        categories = ?config.region.removed_categories,
        prototypes = site.removed_ids().len(),
        cleared,
        "removed site categories"
    );

    let tick_interval = cli
        .tick_interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.tick_interval());
    let engine = Engine::new(
        registry,
        EngineSettings {
            world_name: config.name.clone(),
            tick_interval,
        },
    );

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(%err, "unable to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    let ticks = engine.run_until(cli.ticks, shutdown).await?;

    let registry = engine.lock()?;
    info!(
        world = %config.name,
        ticks,
        live = registry.len(),
        updates = registry.broadcaster().sent(),
        "world stopped"
    );
    if cli.report {
        println!("{}", registry.snapshot(&config.name).to_json()?);
    }
    Ok(())
}
