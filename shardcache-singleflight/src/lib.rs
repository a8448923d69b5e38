//! Coalesces concurrent calls for the same key into a single execution.
//!
//! Directly grounded on the teacher's own coalescing path
//! (`foyer-memory::cache::Cache::entry`, which keeps a
//! `HashMap<K, Vec<oneshot::Sender<..>>>` of waiters and runs the miss
//! future on a `tokio::spawn`ed task), generalized from "miss path of one
//! cache shard" to a standalone, reusable primitive so `shardcache-core`
//! can coalesce peer/backing-source loads independently of any particular
//! cache implementation.

use std::future::Future;
use std::hash::Hash;

use hashbrown::HashMap;
use hashbrown::hash_map::Entry as MapEntry;
use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Runs at most one `thunk` per key across all concurrent callers; callers
/// that arrive while a call for the same key is in flight wait on its
/// result instead of starting their own.
///
/// Running the thunk on a `tokio::spawn`ed task, rather than inline, is
/// what lets this guarantee hold even if the thunk panics: `JoinHandle`
/// always resolves (`Ok` or `Err`), so the barrier is signalled and the
/// table entry removed on every exit path, matching the requirement that a
/// coalescer never leave a key stuck "in flight" after a panicking load.
pub struct SingleFlight<K, V, E> {
    inflight: Mutex<HashMap<K, Vec<oneshot::Sender<Result<V, E>>>>>,
}

impl<K, V, E> Default for SingleFlight<K, V, E>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self { inflight: Mutex::new(HashMap::new()) }
    }
}

impl<K, V, E> SingleFlight<K, V, E>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
    E: Clone + Send + From<tokio::task::JoinError> + 'static,
{
    /// Creates an empty coalescer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a call for `key` is currently in flight. Exists
    /// mainly so tests can assert the "a key is in the table iff a call is
    /// running" invariant directly.
    pub fn is_in_flight(&self, key: &K) -> bool {
        self.inflight.lock().contains_key(key)
    }

    /// Runs `thunk` for `key`, or waits for an already-running call for the
    /// same key and returns its result. After the call completes the key is
    /// removed from the table, so the next `do_call` re-executes `thunk`
    /// rather than replaying a cached result or error.
    pub async fn do_call<F, Fut>(&self, key: K, thunk: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        enum Role<V, E> {
            Leader,
            Waiter(oneshot::Receiver<Result<V, E>>),
        }

        let role = {
            let mut table = self.inflight.lock();
            match table.entry(key.clone()) {
                MapEntry::Occupied(mut occupied) => {
                    let (tx, rx) = oneshot::channel();
                    occupied.get_mut().push(tx);
                    Role::Waiter(rx)
                }
                MapEntry::Vacant(vacant) => {
                    vacant.insert(Vec::new());
                    Role::Leader
                }
            }
        };

        match role {
            Role::Waiter(rx) => {
                tracing::trace!("singleflight: joining an in-flight call");
                metrics::counter!("shardcache_singleflight_coalesced_waits_total").increment(1);
                rx.await.expect("singleflight leader dropped its barrier without signalling")
            }
            Role::Leader => {
                let join = tokio::spawn(thunk());
                let result: Result<V, E> = match join.await {
                    Ok(result) => result,
                    Err(join_err) => Err(E::from(join_err)),
                };

                let waiters = {
                    let mut table = self.inflight.lock();
                    table.remove(&key).unwrap_or_default()
                };
                for tx in waiters {
                    // A waiter may have dropped its receiver (e.g. its own
                    // caller was cancelled); that must not affect delivery
                    // to anyone else.
                    let _ = tx.send(result.clone());
                }

                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    /// `anyhow::Error` isn't `Clone` (it boxes an arbitrary `dyn Error`), so
    /// these tests use a minimal stand-in that is — matching how
    /// `ShardCacheError` (the real `E` used by `shardcache-core`) derives
    /// `Clone` to satisfy the "deliver the same error to every waiter" rule.
    #[derive(Clone, Debug, PartialEq, Eq)]
    struct TestError(String);

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl std::error::Error for TestError {}

    impl From<tokio::task::JoinError> for TestError {
        fn from(e: tokio::task::JoinError) -> Self {
            TestError(e.to_string())
        }
    }

    #[tokio::test]
    async fn s3_concurrent_callers_share_one_execution() {
        let sf: Arc<SingleFlight<String, u32, TestError>> = Arc::new(SingleFlight::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(100);
        for _ in 0..100 {
            let sf = sf.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                sf.do_call("k".to_string(), move || async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    let n = counter.fetch_add(1, Ordering::SeqCst) as u32 + 1;
                    Ok(n)
                })
                .await
            }));
        }

        let mut results = Vec::with_capacity(100);
        for h in handles {
            results.push(h.await.unwrap().unwrap());
        }

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|&r| r == results[0]));
    }

    #[tokio::test]
    async fn key_is_removed_after_completion_so_later_calls_rerun() {
        let sf: SingleFlight<String, u32, TestError> = SingleFlight::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let c1 = counter.clone();
        sf.do_call("k".to_string(), move || async move {
            Ok(c1.fetch_add(1, Ordering::SeqCst) as u32)
        })
        .await
        .unwrap();
        assert!(!sf.is_in_flight(&"k".to_string()));

        let c2 = counter.clone();
        sf.do_call("k".to_string(), move || async move {
            Ok(c2.fetch_add(1, Ordering::SeqCst) as u32)
        })
        .await
        .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn error_is_delivered_verbatim_to_every_waiter() {
        let sf: Arc<SingleFlight<String, u32, TestError>> = Arc::new(SingleFlight::new());

        let mut handles = Vec::with_capacity(10);
        for _ in 0..10 {
            let sf = sf.clone();
            handles.push(tokio::spawn(async move {
                sf.do_call("k".to_string(), || async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Err(TestError("backing source exploded".to_string()))
                })
                .await
            }));
        }

        for h in handles {
            let result = h.await.unwrap();
            assert_eq!(result.unwrap_err().to_string(), "backing source exploded");
        }
    }

    #[tokio::test]
    async fn in_flight_invariant_holds_while_a_call_is_running() {
        let sf: Arc<SingleFlight<String, u32, TestError>> = Arc::new(SingleFlight::new());
        assert!(!sf.is_in_flight(&"k".to_string()));

        let sf2 = sf.clone();
        let handle = tokio::spawn(async move {
            sf2.do_call("k".to_string(), || async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(1u32)
            })
            .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(sf.is_in_flight(&"k".to_string()));

        handle.await.unwrap().unwrap();
        assert!(!sf.is_in_flight(&"k".to_string()));
    }
}
