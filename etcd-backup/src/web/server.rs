use crate::errors::{BackupError, Result};
use axum::extract::{Path as UrlPath, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use rustls::ServerConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct ServedSnapshot {
    name: String,
    path: PathBuf,
}

/// Router exposing exactly one file at `/<name>`
pub fn snapshot_router(name: impl Into<String>, path: impl Into<PathBuf>) -> Router {
    let served = Arc::new(ServedSnapshot {
        name: name.into(),
        path: path.into(),
    });

    Router::new()
        .route("/{name}", get(serve_snapshot))
        .with_state(served)
        .layer(TraceLayer::new_for_http())
}

async fn serve_snapshot(
    State(served): State<Arc<ServedSnapshot>>,
    UrlPath(requested): UrlPath<String>,
    request: Request,
) -> Response {
    if requested != served.name {
        debug!("Rejecting request for unknown snapshot {}", requested);
        return StatusCode::NOT_FOUND.into_response();
    }

    match ServeFile::new(&served.path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

/// One-shot HTTPS server requiring client certificates
pub struct SnapshotServer {
    listener: TcpListener,
    acceptor: TlsAcceptor,
    router: Router,
}

impl SnapshotServer {
    pub async fn bind(addr: SocketAddr, tls: Arc<ServerConfig>, router: Router) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|e| BackupError::Io {
            path: PathBuf::from(addr.to_string()),
            source: e,
        })?;

        Ok(Self {
            listener,
            acceptor: TlsAcceptor::from(tls),
            router,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(|e| BackupError::Io {
            path: PathBuf::from("listener"),
            source: e,
        })
    }

    /// Accept connections until the process is terminated
    pub async fn serve(self) -> Result<()> {
        info!("🌐 Serving snapshots on https://{}", self.local_addr()?);

        loop {
            let (tcp, peer) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let acceptor = self.acceptor.clone();
            let service = TowerToHyperService::new(self.router.clone());

            tokio::spawn(async move {
                let stream = match acceptor.accept(tcp).await {
                    Ok(stream) => stream,
                    Err(e) => {
                        warn!(%peer, error = %e, "TLS handshake rejected");
                        return;
                    }
                };

                if let Err(e) = auto::Builder::new(TokioExecutor::new())
                    .serve_connection(TokioIo::new(stream), service)
                    .await
                {
                    debug!(%peer, error = %e, "Connection closed with error");
                }
            });
        }
    }
}
