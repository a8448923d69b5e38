use std::sync::Arc;

/// Errors surfaced by the read path.
///
/// Invalid input and backing-source failures are returned verbatim to every
/// caller; peer-fetch failures are never returned here directly — they are
/// logged and demoted to a local fallback (§7 of the design: "peer-fetch
/// errors never prevent a local fallback").
#[derive(Clone, Debug, thiserror::Error)]
pub enum ShardCacheError {
    /// `Group::get` was called with an empty key.
    #[error("key is required")]
    EmptyKey,

    /// The named group has not been registered.
    #[error("no such group: {0}")]
    UnknownGroup(String),

    /// The backing source failed to produce a value for the key.
    #[error("backing source error: {0}")]
    Backing(#[source] Arc<dyn std::error::Error + Send + Sync>),

    /// A peer responded with something other than a decodable value.
    #[error("peer transport error: {0}")]
    Transport(String),
}

impl ShardCacheError {
    /// Wraps an arbitrary backing-source error.
    pub fn backing<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backing(Arc::new(err))
    }
}

/// A singleflight thunk runs on a spawned task; a panic there surfaces as a
/// `JoinError`, which we fold into the same error type every other failure
/// in the read path takes, rather than adding a distinct "panicked" variant.
impl From<tokio::task::JoinError> for ShardCacheError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Transport(format!("load task panicked: {err}"))
    }
}
