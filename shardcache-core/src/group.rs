//! The namespace/load orchestrator: a named cache with its own byte budget,
//! backing source, and (optionally) a shared peer topology.
//!
//! Grounded on `original_source/ocache.go`'s `Relation` type (renamed
//! `Group` here, "relation" being an odd name to carry into an idiomatic
//! Rust API) and its `Get`/`load` control flow, generalized from the
//! teacher's `foyer-memory::cache::Cache::entry` coalescing pattern: a
//! local-cache probe, then a singleflight-guarded miss path that tries a
//! peer before falling back to the backing source.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use shardcache_common::{ByteView, Getter, ShardCacheError};
use shardcache_lru::Lru;
use shardcache_singleflight::SingleFlight;

use crate::peer::PeerPicker;

/// The group's own cache: an `Lru` behind a single mutex covering both
/// `get` and `add`, per the design's note that `get`'s recency-list mutation
/// rules out a reader-writer lock here.
struct LocalCache {
    lru: Mutex<Lru<ByteView>>,
}

impl LocalCache {
    fn new(cap_bytes: usize) -> Self {
        Self { lru: Mutex::new(Lru::new(cap_bytes)) }
    }

    fn get(&self, key: &str) -> Option<ByteView> {
        self.lru.lock().get(key).cloned()
    }

    fn add(&self, key: String, value: ByteView, group: &str) {
        let mut lru = self.lru.lock();
        lru.add(key, value);
        metrics::gauge!("shardcache_local_cache_bytes", "group" => group.to_string()).set(lru.charge() as f64);
    }
}

/// A named cache with a backing source, a local byte-bounded cache, an
/// optional peer topology, and a singleflight coalescer guarding its miss
/// path.
///
/// Always held behind an `Arc` once registered — `get` needs to hand a
/// `'static` continuation to the singleflight coalescer, which runs it on a
/// spawned task.
pub struct Group {
    name: String,
    getter: Arc<dyn Getter>,
    local: LocalCache,
    peers: RwLock<Option<Arc<dyn PeerPicker>>>,
    flight: SingleFlight<String, ByteView, ShardCacheError>,
}

impl Group {
    pub(crate) fn new(name: String, cap_bytes: usize, getter: Arc<dyn Getter>) -> Arc<Self> {
        Arc::new(Self {
            name,
            getter,
            local: LocalCache::new(cap_bytes),
            peers: RwLock::new(None),
            flight: SingleFlight::new(),
        })
    }

    /// The group's name, as registered.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the peer picker. A second call is a programmer error: the spec
    /// treats this the way the Go original's `RegisterPeerPicker` does,
    /// fatally, rather than silently replacing the topology underneath
    /// in-flight lookups.
    pub fn register_peers(&self, picker: Arc<dyn PeerPicker>) {
        let mut slot = self.peers.write();
        assert!(slot.is_none(), "shardcache: register_peers called twice for group {:?}", self.name);
        *slot = Some(picker);
    }

    /// Looks up `key`: local cache, then a singleflight-coalesced miss path
    /// that tries a peer before falling back to the backing source.
    pub async fn get(self: &Arc<Self>, key: &str) -> Result<ByteView, ShardCacheError> {
        if key.is_empty() {
            return Err(ShardCacheError::EmptyKey);
        }

        if let Some(value) = self.local.get(key) {
            metrics::counter!("shardcache_local_hits_total", "group" => self.name.clone()).increment(1);
            return Ok(value);
        }
        metrics::counter!("shardcache_local_misses_total", "group" => self.name.clone()).increment(1);

        let this = Arc::clone(self);
        let key_for_call = key.to_string();
        let key_for_thunk = key_for_call.clone();
        self.flight
            .do_call(key_for_call, move || async move { this.load(key_for_thunk).await })
            .await
    }

    /// The miss path: try the owning peer (if any and not self), falling
    /// back to the backing source on any peer error. Only the
    /// locally-computed value is written back into the local cache — a
    /// peer-fetched value is left uncached here, so a non-owning node never
    /// grows its own copy of data another node already owns.
    async fn load(self: Arc<Self>, key: String) -> Result<ByteView, ShardCacheError> {
        let picker = self.peers.read().clone();
        if let Some(picker) = picker {
            if let Some(getter) = picker.pick_peer(&key) {
                match getter.fetch(&self.name, &key).await {
                    Ok(bytes) => {
                        metrics::counter!("shardcache_peer_fetches_total", "group" => self.name.clone()).increment(1);
                        return Ok(ByteView::from_network(bytes));
                    }
                    Err(err) => {
                        metrics::counter!("shardcache_peer_fetch_failures_total", "group" => self.name.clone())
                            .increment(1);
                        tracing::warn!(
                            group = %self.name,
                            key = %key,
                            error = %err,
                            "peer fetch failed, falling back to local load"
                        );
                    }
                }
            }
        }

        let bytes = self.getter.get(&key)?;
        metrics::counter!("shardcache_backing_calls_total", "group" => self.name.clone()).increment(1);
        let value = ByteView::from_backing(bytes);
        self.local.add(key, value.clone(), &self.name);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use shardcache_common::BackingFn;

    use super::*;
    use crate::Registry;

    fn counting_getter(counter: Arc<AtomicUsize>) -> Arc<dyn Getter> {
        Arc::new(BackingFn(move |key: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(key.as_bytes().to_vec())
        }))
    }

    #[tokio::test]
    async fn rejects_empty_keys() {
        let registry = Registry::new();
        let group = registry.new_group("g", 1024, counting_getter(Arc::new(AtomicUsize::new(0))));
        let err = group.get("").await.unwrap_err();
        assert!(matches!(err, ShardCacheError::EmptyKey));
    }

    #[tokio::test]
    async fn s6_repeated_get_hits_local_cache_after_first_load() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = Registry::new();
        let group = registry.new_group("g", 1024, counting_getter(calls.clone()));

        let first = group.get("Tom").await.unwrap();
        let second = group.get("Tom").await.unwrap();

        assert_eq!(first.as_slice(), second.as_slice());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_misses_for_the_same_key_call_the_backing_source_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = Registry::new();
        let group = registry.new_group("g", 1024, counting_getter(calls.clone()));

        let mut handles = Vec::with_capacity(16);
        for _ in 0..16 {
            let group = group.clone();
            handles.push(tokio::spawn(async move { group.get("Tom").await.unwrap() }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn s5_peer_fetch_error_falls_back_to_backing_source() {
        use async_trait::async_trait;
        use crate::PeerGetter;

        struct FailingPeer;
        #[async_trait]
        impl PeerGetter for FailingPeer {
            async fn fetch(&self, _group: &str, _key: &str) -> Result<Vec<u8>, ShardCacheError> {
                Err(ShardCacheError::Transport("peer unreachable".into()))
            }
        }

        struct AlwaysRemote;
        impl PeerPicker for AlwaysRemote {
            fn pick_peer(&self, _key: &str) -> Option<Arc<dyn PeerGetter>> {
                Some(Arc::new(FailingPeer))
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let registry = Registry::new();
        let group = registry.new_group("g", 1024, counting_getter(calls.clone()));
        group.register_peers(Arc::new(AlwaysRemote));

        let value = group.get("Tom").await.unwrap();
        assert_eq!(value.as_slice(), b"Tom");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // The locally-computed fallback value must now be in the local
        // cache (a second Get must not call the backing source again).
        group.get("Tom").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn register_peers_twice_panics() {
        struct NoPeers;
        impl PeerPicker for NoPeers {
            fn pick_peer(&self, _key: &str) -> Option<Arc<dyn crate::PeerGetter>> {
                None
            }
        }

        let registry = Registry::new();
        let group = registry.new_group("g", 1024, counting_getter(Arc::new(AtomicUsize::new(0))));
        group.register_peers(Arc::new(NoPeers));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            group.register_peers(Arc::new(NoPeers));
        }));
        assert!(result.is_err());
    }
}
