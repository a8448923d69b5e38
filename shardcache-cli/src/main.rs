//! Bootstrap binary: parses peer topology and cache configuration from the
//! command line, wires a [`Registry`] group backed by an in-memory seed
//! table, and runs the peer-to-peer server plus an optional front-end
//! lookup endpoint.
//!
//! Shape is grounded on `original_source/ocache_test.go`'s `Test_Server`
//! harness (`startCacheServer`/`startAPIServer`): one process per peer,
//! `--self-addr` identifying this node on the ring, `--peers` giving the
//! full peer set, and an optional `--api-addr` standing in for the harness's
//! `-api` flag. CLI parsing style (derive `Parser`, `#[arg(...)]` per field)
//! follows `sigsegved-cache-rs`'s cache-simulator CLI, the one clap-derive
//! binary retrieved with a full `main.rs` to imitate.

mod frontend;
mod seed;

use std::sync::Arc;

use clap::Parser;
use shardcache_common::BackingFn;
use shardcache_core::Registry;
use shardcache_transport::PeerPool;
use tokio::net::TcpListener;

/// Runs one shardcache peer.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// This peer's own base URL, e.g. http://127.0.0.1:8001 — must also
    /// appear in `--peers` for the ring to recognize it as local.
    #[arg(long)]
    self_addr: String,

    /// Every peer's base URL, including this one's. Repeat the flag once
    /// per peer.
    #[arg(long = "peers", required = true)]
    peers: Vec<String>,

    /// Byte cap for this peer's local cache, e.g. "64MiB". Zero disables
    /// eviction.
    #[arg(long, default_value = "64MiB")]
    cache_cap: bytesize::ByteSize,

    /// Name of the group this peer serves.
    #[arg(long, default_value = "demo")]
    group: String,

    /// Optional JSON file of key/value strings to seed the backing source
    /// with; falls back to a small built-in demo table when omitted.
    #[arg(long)]
    seed_file: Option<std::path::PathBuf>,

    /// If set, also runs a plain HTTP front end at this address exposing
    /// `GET /api?key=...` for interactive lookups.
    #[arg(long)]
    api_addr: Option<String>,
}

fn strip_scheme(addr: &str) -> &str {
    addr.split_once("://").map(|(_, rest)| rest).unwrap_or(addr)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let args = Args::parse();
    let table = seed::load(args.seed_file.as_deref())?;

    let registry = Arc::new(Registry::new());
    let group = registry.new_group(
        args.group.clone(),
        args.cache_cap.as_u64() as usize,
        Arc::new(BackingFn(move |key: &str| {
            tracing::debug!(key, "backing source lookup");
            table.get(key).cloned().map(String::into_bytes).ok_or_else(|| {
                shardcache_common::ShardCacheError::backing(seed::NotFound(key.to_string()))
            })
        })),
    );

    let pool = Arc::new(PeerPool::new(args.self_addr.clone()));
    pool.set(&args.peers);
    group.register_peers(pool);

    if let Some(api_addr) = args.api_addr.clone() {
        let group = group.clone();
        tokio::spawn(async move {
            if let Err(err) = frontend::serve(strip_scheme(&api_addr).to_string(), group).await {
                tracing::error!(error = %err, "front-end server exited");
            }
        });
    }

    tracing::info!(self_addr = %args.self_addr, peers = ?args.peers, "shardcache peer starting");
    let listener = TcpListener::bind(strip_scheme(&args.self_addr)).await?;
    shardcache_transport::serve(listener, registry, shardcache_transport::DEFAULT_BASE_PATH).await?;
    Ok(())
}
