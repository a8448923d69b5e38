//! The load-through orchestrator: named groups backed by a local cache, a
//! singleflight-coalesced miss path, and an optional peer topology, kept in
//! a process-wide registry.

mod group;
mod peer;
mod registry;

pub use group::Group;
pub use peer::{PeerGetter, PeerPicker};
pub use registry::Registry;
