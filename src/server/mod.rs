//! HTTP Transport
//!
//! hyper 1.x HTTP/1 server exposing the chunk store under `/api/chunk/*`,
//! plus `/healthz`, `/livez`, `/readyz` and `/metrics`.

mod routes;

pub use routes::{dispatch, ApiResponse};

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::monitoring::HealthCheck;
use crate::store::ChunkStore;

/// State shared by every connection
pub struct AppState {
    /// The chunk store
    pub store: Arc<ChunkStore>,
    /// Liveness / readiness flags
    pub health: HealthCheck,
    /// Transport limits
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(store: ChunkStore, config: ServerConfig) -> Self {
        Self {
            store: Arc::new(store),
            health: HealthCheck::new(),
            config,
        }
    }
}

/// Bind the configured address
pub async fn bind(config: &ServerConfig) -> Result<TcpListener> {
    TcpListener::bind(config.listen_addr).await.map_err(|e| {
        Error::Internal(format!(
            "Failed to bind chunk server on {}: {}",
            config.listen_addr, e
        ))
    })
}

/// Serve requests until `shutdown` resolves
///
/// Readiness flips on once the loop starts. On shutdown both readiness and
/// liveness flip off; connections already accepted run to completion on
/// their own tasks.
pub async fn run_server<F>(state: Arc<AppState>, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let addr = listener.local_addr()?;
    state.health.set_ready(true);
    info!("Chunk server listening on {}", addr);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("Chunk server accept error: {}", e);
                    continue;
                }
            },
            _ = &mut shutdown => break,
        };

        let io = TokioIo::new(stream);
        let state = Arc::clone(&state);

        tokio::spawn(async move {
            let service = service_fn(move |req| handle(Arc::clone(&state), req));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Connection error from {}: {}", peer, e);
            }
        });
    }

    state.health.set_ready(false);
    state.health.set_live(false);
    info!("Chunk server on {} stopped accepting connections", addr);
    Ok(())
}

async fn handle(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let body = match Limited::new(body, state.config.max_body_bytes).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            return Ok(ApiResponse::error(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!(
                    "Request body exceeds {} bytes",
                    state.config.max_body_bytes
                ),
            )
            .into_response());
        }
        Err(e) => {
            error!("Failed to read request body: {}", e);
            return Ok(
                ApiResponse::error(StatusCode::BAD_REQUEST, "Failed to read request body")
                    .into_response(),
            );
        }
    };

    let response = dispatch(
        &state,
        &parts.method,
        parts.uri.path(),
        parts.uri.query(),
        body,
    )
    .await;

    debug!(
        method = %parts.method,
        path = parts.uri.path(),
        status = response.status.as_u16(),
        "request handled"
    );
    Ok(response.into_response())
}
