//! Command-line configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "feldspar", version, about = "An Alpha-protocol voxel world server")]
pub struct Config {
    /// World folder. Created on first run.
    #[arg(long, default_value = "world")]
    pub world: PathBuf,

    /// TCP address the game server listens on.
    #[arg(long, default_value = "0.0.0.0:25565")]
    pub bind: SocketAddr,

    /// HTTP address for the status and worldmap pages.
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub http: SocketAddr,

    /// Seasonal transform applied to every loaded chunk.
    #[arg(long, value_enum, default_value = "none")]
    pub season: SeasonKind,

    /// Radius, in chunks, of the square shipped to a player on login.
    #[arg(long, default_value_t = 2)]
    pub view_radius: i32,
}

#[derive(clap::ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum SeasonKind {
    None,
    Winter,
}
