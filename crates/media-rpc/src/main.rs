//! Media RPC Server - JSON-RPC backend for catalog media.
//!
//! This binary wraps the catalog-media engine in a JSON-RPC 2.0 server so the
//! catalog admin can upload, reorder, and delete entity images.

mod handler;
mod server;

use anyhow::Result;
use catalog_media::{
    ConsistencyEngine, LocalFileOps, MediaConfig, MediaLayout, SqliteDescriptorSource,
    SqliteMediaStore,
};
use clap::Parser;
use server::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "media-rpc")]
#[command(about = "JSON-RPC server for catalog media")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Directory that holds the media type folders
    #[arg(long, default_value = "uploads")]
    root: PathBuf,

    /// URL prefix the root is published under
    #[arg(long, default_value = MediaConfig::DEFAULT_MOUNT)]
    mount: String,

    /// SQLite database (defaults to <root>/media.db)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Directory uploads are staged in (defaults to <root>/.staging)
    #[arg(long)]
    staging_dir: Option<PathBuf>,

    /// Per-operation timeout in seconds
    #[arg(long, default_value_t = MediaConfig::OPERATION_TIMEOUT.as_secs())]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins over --debug
    let default_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting Media RPC Server");

    let db_path = args
        .db
        .clone()
        .unwrap_or_else(|| args.root.join(MediaConfig::DB_FILENAME));
    let staging_dir = args
        .staging_dir
        .clone()
        .unwrap_or_else(|| args.root.join(MediaConfig::STAGING_DIRNAME));
    std::fs::create_dir_all(&staging_dir)?;
    info!("Media root: {}", args.root.display());
    info!("Database: {}", db_path.display());
    info!("Upload staging: {}", staging_dir.display());

    let store = SqliteMediaStore::new(&db_path)?;
    let descriptors = SqliteDescriptorSource::from_store(&store)?;
    let engine = ConsistencyEngine::new(
        MediaLayout::new(&args.root, &args.mount),
        Arc::new(store),
        Arc::new(LocalFileOps),
        Arc::new(descriptors),
    );

    let state = AppState::new(engine, staging_dir, Duration::from_secs(args.timeout_secs));
    let addr = server::start_server(state, &args.host, args.port).await?;

    // Read by the process supervisor
    println!("RPC_PORT={}", addr.port());

    info!("RPC server running on {}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
