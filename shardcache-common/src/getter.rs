use crate::ShardCacheError;

/// Loads the value for a key from whatever backs the group — a database, a
/// remote service, generated data, anything. Called on a local cache miss,
/// at most once per key across all concurrent callers (the singleflight
/// layer above this guarantees that).
pub trait Getter: Send + Sync + 'static {
    /// Loads the bytes for `key`. The returned buffer may still be
    /// referenced by the caller after this returns; `shardcache-core`
    /// clones it before inserting into the cache.
    fn get(&self, key: &str) -> Result<Vec<u8>, ShardCacheError>;
}

/// Adapts a plain closure to [`Getter`], mirroring the Go original's
/// `GetterFunc` wrapper so callers don't have to hand-write a trait impl
/// for a simple source.
pub struct BackingFn<F>(pub F);

impl<F> Getter for BackingFn<F>
where
    F: Fn(&str) -> Result<Vec<u8>, ShardCacheError> + Send + Sync + 'static,
{
    fn get(&self, key: &str) -> Result<Vec<u8>, ShardCacheError> {
        (self.0)(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backing_fn_delegates_to_the_closure() {
        let getter = BackingFn(|key: &str| Ok(key.as_bytes().to_vec()));
        assert_eq!(getter.get("key").unwrap(), b"key");
    }
}
