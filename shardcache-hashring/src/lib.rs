//! Consistent-hash ring mapping keys to peer identifiers via sorted
//! virtual-node hashes, binary search, and wraparound.
//!
//! Algorithm and defaults (50 replicas, CRC32/IEEE) are taken directly from
//! `original_source/consistenthash/consistenthash.go`: a peer's virtual
//! nodes are `peer ++ decimal(i)` for `i` in `[0, R)`, each hashed and
//! inserted into a sorted sequence; a lookup hashes the key and finds the
//! lowest-index virtual node whose hash is `>=` the key's hash, wrapping to
//! index 0 if none is found.

use hashbrown::HashMap;

const DEFAULT_REPLICAS: usize = 50;

/// `bytes -> 32-bit hash`. Implementations need not be cryptographic;
/// consistent-hash distribution only needs reasonable avalanche behavior.
pub type HashFn = Box<dyn Fn(&[u8]) -> u32 + Send + Sync>;

fn crc32_ieee(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// A consistent-hash ring over peer identifiers.
///
/// Not internally synchronized (spec: "caller-synchronized"); in
/// `shardcache-transport` the ring is owned by the peer pool, which guards
/// it with its own lock for `add`/`get`.
pub struct HashRing {
    replicas: usize,
    hash_fn: HashFn,
    ring: Vec<u32>,
    owners: HashMap<u32, String>,
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new(DEFAULT_REPLICAS, None)
    }
}

impl HashRing {
    /// Creates a ring with `replicas` virtual nodes per peer. `hash_fn`
    /// defaults to CRC32/IEEE when `None`, matching the Go original's
    /// default of `crc32.ChecksumIEEE`.
    pub fn new(replicas: usize, hash_fn: Option<HashFn>) -> Self {
        Self {
            replicas,
            hash_fn: hash_fn.unwrap_or_else(|| Box::new(crc32_ieee)),
            ring: Vec::new(),
            owners: HashMap::new(),
        }
    }

    /// Adds peers to the ring, replacing whatever peers were previously
    /// registered (this ring instance has no incremental-add use case in
    /// this workspace — `shardcache-transport::PeerPool::set` always
    /// rebuilds the ring wholesale from a fresh peer list, the same way the
    /// Go original's `HTTPPool.Set` does).
    pub fn set(&mut self, peers: &[impl AsRef<str>]) {
        self.ring.clear();
        self.owners.clear();
        for peer in peers {
            let peer = peer.as_ref();
            for i in 0..self.replicas {
                let vnode = format!("{peer}{i}");
                let hash = (self.hash_fn)(vnode.as_bytes());
                self.ring.push(hash);
                // Hash collisions across peers overwrite the map binding;
                // we tolerate but don't detect this, per spec.
                self.owners.insert(hash, peer.to_string());
            }
        }
        self.ring.sort_unstable();
    }

    /// Returns the peer that owns `key`, or `None` if the ring has no
    /// peers. `None` stands in for the Go original's empty-string sentinel;
    /// callers (the peer picker) treat it the same way: "serve locally."
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.ring.is_empty() {
            return None;
        }
        let hash = (self.hash_fn)(key.as_bytes());
        let idx = match self.ring.binary_search(&hash) {
            Ok(i) => i,
            Err(i) => i, // first index with ring[i] > hash
        };
        let idx = if idx >= self.ring.len() { 0 } else { idx };
        self.owners.get(&self.ring[idx]).map(String::as_str)
    }

    /// Number of distinct virtual nodes currently on the ring.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Whether the ring has no peers.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}
