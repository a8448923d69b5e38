//! Three-peer walkthrough: starts three in-process peers sharing one group
//! over the HTTP transport, then drives lookups against a single peer and
//! shows requests getting proxied to whichever peer actually owns the key.
//!
//! Mirrors `original_source/ocache_test.go`'s `Test_Server` harness (three
//! fixed peer addresses, one shared demo dataset) collapsed into a single
//! process instead of three separately-launched ones, since a workspace
//! demo binary has no equivalent of `go test -run Test_Server -port=...`.

use std::sync::Arc;

use hashbrown::HashMap;
use shardcache_common::{BackingFn, ShardCacheError};
use shardcache_core::Registry;
use shardcache_transport::PeerPool;
use tokio::net::TcpListener;

const GROUP: &str = "scores";
const PEER_ADDRS: [&str; 3] = ["http://127.0.0.1:19001", "http://127.0.0.1:19002", "http://127.0.0.1:19003"];

fn demo_table() -> HashMap<String, String> {
    HashMap::from([
        ("Tom".to_string(), "630".to_string()),
        ("Jack".to_string(), "589".to_string()),
        ("Sam".to_string(), "567".to_string()),
    ])
}

async fn start_peer(self_addr: &'static str) -> anyhow::Result<Arc<Registry>> {
    let registry = Arc::new(Registry::new());
    let table = demo_table();
    let group = registry.new_group(
        GROUP,
        2 << 10,
        Arc::new(BackingFn(move |key: &str| {
            tracing::info!(peer = self_addr, key, "backing source lookup");
            table
                .get(key)
                .cloned()
                .map(String::into_bytes)
                .ok_or_else(|| ShardCacheError::backing(NotFound(key.to_string())))
        })),
    );

    let pool = Arc::new(PeerPool::new(self_addr));
    pool.set(&PEER_ADDRS);
    group.register_peers(pool);

    let bind_addr = self_addr.trim_start_matches("http://");
    let listener = TcpListener::bind(bind_addr).await?;
    let registry_for_server = registry.clone();
    tokio::spawn(async move {
        if let Err(err) = shardcache_transport::serve(listener, registry_for_server, shardcache_transport::DEFAULT_BASE_PATH).await {
            tracing::error!(peer = self_addr, error = %err, "peer server exited");
        }
    });

    Ok(registry)
}

#[derive(Debug)]
struct NotFound(String);

impl std::fmt::Display for NotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} not exist", self.0)
    }
}
impl std::error::Error for NotFound {}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let mut registries = Vec::with_capacity(PEER_ADDRS.len());
    for addr in PEER_ADDRS {
        registries.push(start_peer(addr).await?);
    }
    // Give the listeners a beat to come up before driving requests.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    // Every lookup goes through peer 0's registered group, regardless of
    // which peer actually owns the key on the ring — ownership is resolved
    // internally via the peer picker, and only a cache miss on the owning
    // peer calls the backing source.
    let entry_point = registries[0].get_group(GROUP).expect("group is registered on every peer");

    for key in ["Tom", "Jack", "Sam", "Tom"] {
        let value = entry_point.get(key).await?;
        tracing::info!(key, value = %value.to_string_lossy(), "lookup via peer 0");
    }

    Ok(())
}
