//! In-process static dev server backing `static` fixtures.
//!
//! Paths map onto files under the root directory; `/` and any path ending in
//! `/` map to `index.html`. Misses go to the optional fallback handler, then 404.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::errors::{FixtureError, FixtureResult};

/// Answers request paths that have no file behind them.
pub type FallbackHandler = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub struct DevServer {
    root: PathBuf,
    addr: SocketAddr,
    fallback: Option<FallbackHandler>,
}

impl std::fmt::Debug for DevServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevServer")
            .field("root", &self.root)
            .field("addr", &self.addr)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl DevServer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            fallback: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.addr.set_port(port);
        self
    }

    pub fn with_fallback(
        mut self,
        handler: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.fallback = Some(Arc::new(handler));
        self
    }

    /// Bind and start serving in the background.
    pub async fn listen(self) -> FixtureResult<DevServerListening> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|source| FixtureError::Bind {
                addr: self.addr,
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| FixtureError::Bind {
                addr: self.addr,
                source,
            })?;

        let site = Arc::new(Site {
            root: self.root,
            fallback: self.fallback,
        });
        info!(addr = %local_addr, root = %site.root.display(), "server listening");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(accept_loop(listener, site, shutdown_rx));

        Ok(DevServerListening {
            local_addr,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }
}

/// A bound, serving dev server. Dropping it stops the server.
#[derive(Debug)]
pub struct DevServerListening {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl DevServerListening {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Stop accepting, drop open connections and wait for the accept loop to exit.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "dev server task ended abnormally");
            }
        }
        debug!(addr = %self.local_addr, "server stopped");
    }
}

impl Drop for DevServerListening {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Site {
    root: PathBuf,
    fallback: Option<FallbackHandler>,
}

async fn accept_loop(listener: TcpListener, site: Arc<Site>, mut shutdown: oneshot::Receiver<()>) {
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        continue;
                    }
                };
                while connections.try_join_next().is_some() {}

                let site = site.clone();
                connections.spawn(async move {
                    let service = service_fn(move |request: Request<hyper::body::Incoming>| {
                        let site = site.clone();
                        async move { Ok::<_, Infallible>(site.respond(request.uri().path()).await) }
                    });
                    if let Err(e) = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        debug!(peer = %peer, error = %e, "connection closed with error");
                    }
                });
            }
        }
    }
    connections.shutdown().await;
}

impl Site {
    async fn respond(&self, path: &str) -> Response<Full<Bytes>> {
        let start = Instant::now();

        let (status, content_type, body) = match self.find_asset(path).await {
            Some((asset_path, content)) => (StatusCode::OK, content_type_for(&asset_path), content),
            None => match self.fallback.as_ref().and_then(|handler| handler(path)) {
                Some(content) => (
                    StatusCode::OK,
                    "text/html; charset=utf-8",
                    Bytes::from(content),
                ),
                None => (StatusCode::NOT_FOUND, "text/plain; charset=utf-8", Bytes::new()),
            },
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            status = status.as_u16(),
            path = %path,
            elapsed_ms,
            "[{}] {} ({}ms)",
            status.as_u16(),
            path,
            elapsed_ms
        );

        let mut response = Response::new(Full::new(body));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        response
    }

    async fn find_asset(&self, path: &str) -> Option<(String, Bytes)> {
        let asset_path = asset_path(path)?;
        let full = self.root.join(&asset_path);
        match tokio::fs::metadata(&full).await {
            Ok(meta) if meta.is_file() => {}
            _ => return None,
        }
        match tokio::fs::read(&full).await {
            Ok(content) => Some((asset_path, Bytes::from(content))),
            Err(e) => {
                warn!(path = %full.display(), error = %e, "failed to read asset");
                None
            }
        }
    }
}

/// Map a request path onto a path relative to the server root.
///
/// Returns `None` for paths that would escape the root.
pub fn asset_path(request_path: &str) -> Option<String> {
    let mut asset = request_path.strip_prefix('/').unwrap_or(request_path).to_string();
    if asset.is_empty() || asset.ends_with('/') {
        asset.push_str("index.html");
    }
    let escapes = asset
        .split(['/', '\\'])
        .any(|segment| segment == ".." || segment.contains(':'));
    if escapes || Path::new(&asset).is_absolute() {
        return None;
    }
    Some(asset)
}

fn content_type_for(asset_path: &str) -> &'static str {
    let ext = Path::new(asset_path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "json" | "map" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
