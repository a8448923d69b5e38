//! Inbound peer server: exposes a [`Registry`]'s groups to remote peers over
//! HTTP, and the [`PeerPool`] that tracks ring membership for the outbound
//! side.
//!
//! The accept loop is adapted from `rust-dd-tako::server::run` — bind,
//! accept, wrap each connection in `hyper_util::rt::TokioIo`, serve HTTP/1.1
//! on a spawned task per connection — generalized from dispatching through a
//! router to dispatching through the group registry. Path parsing, status
//! codes, and the default base path come directly from
//! `original_source/http.go`'s `HTTPPool.ServeHTTP`.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use hashbrown::HashMap;
use http::{Response, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use parking_lot::RwLock;
use percent_encoding::percent_decode_str;
use prost::Message;
use shardcache_core::{PeerGetter, PeerPicker, Registry};
use shardcache_hashring::HashRing;
use tokio::net::TcpListener;

use crate::client::HttpPeerGetter;
use crate::wire::FetchResponse;

/// Default peer-to-peer request path prefix, matching the Go original.
pub const DEFAULT_BASE_PATH: &str = "/_ocache/";

struct Inner {
    ring: HashRing,
    getters: HashMap<String, Arc<HttpPeerGetter>>,
}

/// Tracks ring membership for a pool of HTTP peers and picks the one that
/// should serve a given key, excluding `self_addr`.
///
/// `self_addr` and every peer identifier handed to [`PeerPool::set`] are
/// absolute base URLs (e.g. `http://10.0.0.2:8008`) — the same string used
/// both as a ring entry and as a key into the outbound-getter map, exactly
/// as the Go original's `HTTPPool` keys `httpGetters` by the raw peer
/// string.
pub struct PeerPool {
    self_addr: String,
    base_path: String,
    inner: RwLock<Inner>,
}

impl PeerPool {
    /// Creates a pool identifying itself as `self_addr`, using the default
    /// base path.
    pub fn new(self_addr: impl Into<String>) -> Self {
        Self::with_base_path(self_addr, DEFAULT_BASE_PATH)
    }

    /// Creates a pool with a custom base path.
    pub fn with_base_path(self_addr: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self {
            self_addr: self_addr.into(),
            base_path: base_path.into(),
            inner: RwLock::new(Inner { ring: HashRing::default(), getters: HashMap::new() }),
        }
    }

    /// This pool's own identity, as it appears on the ring.
    pub fn self_addr(&self) -> &str {
        &self.self_addr
    }

    /// The path prefix peer-to-peer requests are served under.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Resets the pool's peer set: rebuilds the ring from scratch and
    /// allocates one [`HttpPeerGetter`] per peer, keyed by its identifier.
    pub fn set(&self, peers: &[impl AsRef<str>]) {
        let mut ring = HashRing::default();
        ring.set(peers);

        let mut getters = HashMap::with_capacity(peers.len());
        for peer in peers {
            let peer = peer.as_ref();
            getters.insert(peer.to_string(), Arc::new(HttpPeerGetter::new(format!("{peer}{}", self.base_path))));
        }

        let mut inner = self.inner.write();
        inner.ring = ring;
        inner.getters = getters;
    }
}

impl PeerPicker for PeerPool {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>> {
        let inner = self.inner.read();
        let peer = inner.ring.get(key)?;
        if peer == self.self_addr {
            return None;
        }
        let getter = inner.getters.get(peer)?.clone();
        tracing::info!(self_addr = %self.self_addr, peer, "picked peer");
        Some(getter as Arc<dyn PeerGetter>)
    }
}

fn text_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder().status(status).body(Full::new(body.into())).expect("static response is well-formed")
}

async fn handle(req: Request<Incoming>, registry: Arc<Registry>, base_path: Arc<str>) -> Response<Full<Bytes>> {
    let path = req.uri().path();
    let Some(rest) = path.strip_prefix(base_path.as_ref()) else {
        tracing::warn!(path, base_path = %base_path, "peer server serving unexpected path");
        return text_response(StatusCode::BAD_REQUEST, "bad request");
    };
    let Some((relation_enc, key_enc)) = rest.split_once('/') else {
        return text_response(StatusCode::BAD_REQUEST, "bad request");
    };
    let relation = percent_decode_str(relation_enc).decode_utf8_lossy().into_owned();
    let key = percent_decode_str(key_enc).decode_utf8_lossy().into_owned();

    tracing::info!(method = %req.method(), %path, "peer server request");

    let Some(group) = registry.get_group(&relation) else {
        return text_response(StatusCode::NOT_FOUND, format!("no such group: {relation}"));
    };

    match group.get(&key).await {
        Ok(value) => {
            let body = FetchResponse { value: value.to_vec() }.encode_to_vec();
            Response::builder()
                .status(StatusCode::OK)
                .header(http::header::CONTENT_TYPE, "application/octet-stream")
                .body(Full::new(Bytes::from(body)))
                .expect("static response is well-formed")
        }
        Err(err) => text_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

/// Accepts connections on `listener` and serves peer requests against
/// `registry` until the process is killed; each connection runs on its own
/// spawned task.
pub async fn serve(listener: TcpListener, registry: Arc<Registry>, base_path: impl Into<String>) -> std::io::Result<()> {
    let base_path: Arc<str> = Arc::from(base_path.into());
    tracing::info!(addr = %listener.local_addr()?, "peer server listening");

    loop {
        let (stream, _addr) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let registry = registry.clone();
        let base_path = base_path.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let registry = registry.clone();
                let base_path = base_path.clone();
                async move { Ok::<_, Infallible>(handle(req, registry, base_path).await) }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                tracing::warn!(error = %err, "peer connection error");
            }
        });
    }
}
