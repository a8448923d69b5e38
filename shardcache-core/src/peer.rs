//! Capability interfaces the group orchestrator consumes to proxy a lookup
//! to whichever peer owns a key.
//!
//! Grounded on `original_source/ocache.go`'s `PeerPicker`/`PeerGetter`
//! interfaces: picking a peer is a synchronous ring lookup plus a
//! self-identity comparison, while fetching from a peer is the one
//! suspension point that must cross a network, hence `async`. The split
//! mirrors `rust-dd-tako`'s convention of expressing a transport boundary as
//! a small `#[async_trait]` capability trait injected at construction.

use std::sync::Arc;

use async_trait::async_trait;
use shardcache_common::ShardCacheError;

/// Maps a key to the peer that should serve it.
///
/// Returns `None` when no peer other than the local node owns `key` —
/// implementations must consult the hash ring and compare the result
/// against local identity themselves; a `None` here means "serve locally".
pub trait PeerPicker: Send + Sync {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>>;
}

/// A synchronous-looking request/reply fetch against one remote peer.
#[async_trait]
pub trait PeerGetter: Send + Sync {
    /// Fetches `key` from group `group` on the remote peer. The returned
    /// bytes are authoritative; errors are opaque to the caller, who treats
    /// any failure here as "fall back to the backing source".
    async fn fetch(&self, group: &str, key: &str) -> Result<Vec<u8>, ShardCacheError>;
}
