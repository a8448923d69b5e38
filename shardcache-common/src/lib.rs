//! Shared types used across the `shardcache` workspace: the immutable byte
//! view handed out of caches, the error taxonomy, and the backing-source
//! trait every group is constructed with.

mod byteview;
mod error;
mod getter;

pub use byteview::ByteView;
pub use error::ShardCacheError;
pub use getter::{BackingFn, Getter};
