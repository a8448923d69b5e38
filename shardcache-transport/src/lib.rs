//! HTTP peer transport: the wire codec, the inbound peer server and ring
//! tracker ([`PeerPool`]), and the outbound fetch client
//! ([`HttpPeerGetter`]).

mod client;
mod server;
pub mod wire;

pub use client::HttpPeerGetter;
pub use server::{serve, PeerPool, DEFAULT_BASE_PATH};
