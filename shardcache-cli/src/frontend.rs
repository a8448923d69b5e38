//! Optional front-end endpoint: `GET /api?key=...` resolves straight
//! through one group's `Get`, for interactive poking at a running peer.
//!
//! Grounded on `original_source/ocache_test.go`'s `startAPIServer`, built
//! the same way `shardcache-transport::server` builds the peer-to-peer
//! listener: one hyper HTTP/1.1 connection per accepted socket, served on
//! its own spawned task.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http::{Response, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use shardcache_core::Group;
use tokio::net::TcpListener;

async fn handle(req: Request<Incoming>, group: Arc<Group>) -> Response<Full<Bytes>> {
    let query = req.uri().query().unwrap_or("");
    let key = query
        .split('&')
        .find_map(|pair| pair.strip_prefix("key="))
        .map(|v| percent_encoding::percent_decode_str(v).decode_utf8_lossy().into_owned());

    let Some(key) = key else {
        return Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .body(Full::new(Bytes::from_static(b"missing ?key= query parameter")))
            .expect("static response is well-formed");
    };

    match group.get(&key).await {
        Ok(value) => Response::builder()
            .status(StatusCode::OK)
            .header(http::header::CONTENT_TYPE, "application/octet-stream")
            .body(Full::new(Bytes::from(value.to_vec())))
            .expect("static response is well-formed"),
        Err(err) => Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Full::new(Bytes::from(err.to_string())))
            .expect("static response is well-formed"),
    }
}

/// Serves the front-end endpoint on `bind_addr` (host:port, no scheme)
/// until the process is killed.
pub async fn serve(bind_addr: String, group: Arc<Group>) -> std::io::Result<()> {
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "front-end server listening");

    loop {
        let (stream, _addr) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let group = group.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let group = group.clone();
                async move { Ok::<_, Infallible>(handle(req, group).await) }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                tracing::warn!(error = %err, "front-end connection error");
            }
        });
    }
}
