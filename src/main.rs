use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use feldspar::config::{Config, SeasonKind};
use feldspar::network::{self, Server};
use feldspar::terrain::{OrePopulator, PlayerFactory, TerrainPopulator, Winter};
use feldspar::web;
use feldspar_world::{Populator, Season, World};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    let pipeline: Vec<Arc<dyn Populator>> = vec![
        Arc::new(TerrainPopulator) as Arc<dyn Populator>,
        Arc::new(OrePopulator),
    ];
    let season: Option<Arc<dyn Season>> = match config.season {
        SeasonKind::None => None,
        SeasonKind::Winter => Some(Arc::new(Winter)),
    };

    let world = World::open(&config.world, pipeline, season, Arc::new(PlayerFactory))
        .await
        .context("failed to open world")?;
    info!(folder = %config.world.display(), seed = world.seed, "world ready");

    world.spawn_flush_loop();

    let server = Server::new(world, config.view_radius);
    network::spawn_time_loop(&server);

    let http = tokio::net::TcpListener::bind(config.http)
        .await
        .context("failed to bind http address")?;
    info!(addr = %config.http, "status pages listening");
    let app = web::router(Arc::clone(&server));
    tokio::spawn(async move {
        if let Err(e) = axum::serve(http, app).await {
            error!("http server failed: {e}");
        }
    });

    network::run(server, config.bind).await
}
