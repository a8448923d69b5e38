//! Outbound peer fetch: a synchronous-looking GET against one peer's base
//! URL, decoding a [`FetchResponse`] on success.
//!
//! URL construction (percent-escaped relation and key, joined under the
//! peer's base URL) and status handling come directly from
//! `original_source/http.go`'s `httpGetter.Get`. The connection itself uses
//! `hyper_util`'s pooled legacy client rather than `rust-dd-tako`'s
//! single-persistent-connection `TakoClient`: a peer getter issues many
//! short-lived GETs to the same handful of peers over the life of the
//! process, which is exactly what the legacy client's connection pool is
//! for.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use prost::Message;
use shardcache_common::ShardCacheError;
use shardcache_core::PeerGetter;

use crate::wire::FetchResponse;

/// Fetches values from one specific remote peer over HTTP.
///
/// `base_url` already includes the base path (e.g.
/// `http://10.0.0.2:8008/_ocache/`), matching how [`crate::PeerPool::set`]
/// constructs one of these per configured peer.
pub struct HttpPeerGetter {
    base_url: String,
    client: Client<HttpConnector, Empty<Bytes>>,
}

impl HttpPeerGetter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), client: Client::builder(TokioExecutor::new()).build_http() }
    }
}

#[async_trait]
impl PeerGetter for HttpPeerGetter {
    async fn fetch(&self, group: &str, key: &str) -> Result<Vec<u8>, ShardCacheError> {
        let url = format!(
            "{}{}/{}",
            self.base_url,
            utf8_percent_encode(group, NON_ALPHANUMERIC),
            utf8_percent_encode(key, NON_ALPHANUMERIC),
        );

        let uri: hyper::Uri =
            url.parse().map_err(|err| ShardCacheError::Transport(format!("invalid peer url {url:?}: {err}")))?;

        let request = http::Request::builder()
            .method(http::Method::GET)
            .uri(uri)
            .body(Empty::<Bytes>::new())
            .map_err(|err| ShardCacheError::Transport(format!("building peer request: {err}")))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|err| ShardCacheError::Transport(format!("peer request failed: {err}")))?;

        if response.status() != hyper::StatusCode::OK {
            return Err(ShardCacheError::Transport(format!("peer returned: {}", response.status())));
        }

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|err| ShardCacheError::Transport(format!("reading peer response body: {err}")))?
            .to_bytes();

        let decoded = FetchResponse::decode(&body[..])
            .map_err(|err| ShardCacheError::Transport(format!("decoding peer response: {err}")))?;
        Ok(decoded.value)
    }
}
