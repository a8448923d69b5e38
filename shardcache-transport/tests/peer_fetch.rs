//! End-to-end coverage of the peer wire protocol: a real HTTP server backed
//! by a registry, hit by a real `HttpPeerGetter` client.

use std::sync::Arc;

use shardcache_common::{BackingFn, ShardCacheError};
use shardcache_core::{PeerGetter, Registry};
use shardcache_transport::{serve, HttpPeerGetter, DEFAULT_BASE_PATH};
use tokio::net::TcpListener;

async fn spawn_server(registry: Arc<Registry>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        serve(listener, registry, DEFAULT_BASE_PATH).await.unwrap();
    });
    format!("http://{addr}{DEFAULT_BASE_PATH}")
}

#[tokio::test]
async fn fetch_returns_the_groups_value_for_a_known_key() {
    let registry = Arc::new(Registry::new());
    registry.new_group(
        "scores",
        1024,
        Arc::new(BackingFn(|key: &str| Ok::<_, ShardCacheError>(format!("value-for-{key}").into_bytes()))),
    );

    let base_url = spawn_server(registry).await;
    let getter = HttpPeerGetter::new(base_url);

    let bytes = getter.fetch("scores", "Tom").await.unwrap();
    assert_eq!(bytes, b"value-for-Tom");
}

#[tokio::test]
async fn fetch_against_an_unknown_group_surfaces_a_transport_error() {
    let registry = Arc::new(Registry::new());
    let base_url = spawn_server(registry).await;
    let getter = HttpPeerGetter::new(base_url);

    let err = getter.fetch("missing", "Tom").await.unwrap_err();
    assert!(err.to_string().contains("404") || err.to_string().contains("NOT_FOUND"));
}

#[tokio::test]
async fn keys_and_group_names_with_reserved_characters_round_trip() {
    let registry = Arc::new(Registry::new());
    registry.new_group(
        "my group",
        1024,
        Arc::new(BackingFn(|key: &str| Ok::<_, ShardCacheError>(key.as_bytes().to_vec()))),
    );

    let base_url = spawn_server(registry).await;
    let getter = HttpPeerGetter::new(base_url);

    let bytes = getter.fetch("my group", "a/b?c").await.unwrap();
    assert_eq!(bytes, b"a/b?c");
}
