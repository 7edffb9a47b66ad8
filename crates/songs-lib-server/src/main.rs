mod api;
mod auth;
mod config;
mod error;
mod models;
mod openapi;
mod song_db;
mod song_details;
mod song_service;
mod startup;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("SONGS_LIB_GIT_SHA"),
    ", ",
    env!("SONGS_LIB_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "songs-lib-server", version = VERSION)]
pub(crate) struct Args {
    #[command(subcommand)]
    pub cmd: Option<Command>,

    /// Server config file (TOML)
    #[arg(long, env = "SONGS_LIB_CONFIG")]
    pub config: Option<PathBuf>,

    /// HTTP bind address, e.g. 0.0.0.0:8080
    #[arg(long, env = "SONGS_LIB_BIND")]
    pub bind: Option<SocketAddr>,

    /// SQLite database file
    #[arg(long, env = "SONGS_LIB_DB_PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    /// Serve the songs HTTP API (default)
    Serve,
    /// Apply the database schema and exit
    Migrate,
}

#[actix_web::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    match args.cmd.unwrap_or(Command::Serve) {
        Command::Serve => startup::run(args).await,
        Command::Migrate => startup::migrate(args),
    }
}
