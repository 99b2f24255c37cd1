//! Fixture lifecycle: turn a source directory into a running application,
//! render routes against it, tear it down.
//!
//! A [`FixtureContext`] is owned by exactly one test group. Every case in the
//! group observes the same running instance. Teardown happens on
//! [`FixtureContext::teardown`] and, failing that, on drop (server task
//! aborted, child process killed), so a panicking or early-returning caller
//! never leaks the application.

mod process;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use tracing::{debug, info};

use crate::config::{FixtureConfig, FixtureKind, RunOptions};
use crate::errors::{FixtureError, FixtureResult, RenderError, RenderResult};
use crate::page::PageHandle;
use crate::server::{DevServer, DevServerListening};

use process::ProcessFixture;

/// User agent for render requests.
const USER_AGENT_VALUE: &str = concat!("pagecheck/", env!("CARGO_PKG_VERSION"));

/// Entry document a static fixture must contain.
pub const STATIC_ENTRY: &str = "index.html";

#[derive(Debug)]
enum Backend {
    Static(DevServerListening),
    Command(ProcessFixture),
    External,
}

/// Handle to a running application under test.
#[derive(Debug)]
pub struct FixtureContext {
    base_url: String,
    dir: Option<PathBuf>,
    client: reqwest::Client,
    backend: Backend,
}

/// Build/start the application described by `config`.
///
/// Fails fast: any error here is fatal for the group and is never retried.
pub async fn setup_fixture(
    config: &FixtureConfig,
    options: &RunOptions,
) -> FixtureResult<FixtureContext> {
    config.validate().map_err(|e| FixtureError::Config {
        message: e.to_string(),
    })?;
    let client = render_client(Duration::from_secs(options.render_timeout_secs))?;

    match config.kind {
        FixtureKind::Static => {
            let dir = check_dir(&config.dir)?;
            if !dir.join(STATIC_ENTRY).is_file() {
                return Err(FixtureError::MissingEntry {
                    dir,
                    entry: STATIC_ENTRY.to_string(),
                });
            }
            let server = DevServer::new(&dir)
                .with_addr(SocketAddr::from(([127, 0, 0, 1], config.port)))
                .listen()
                .await?;
            let base_url = server.url();
            info!(dir = %dir.display(), url = %base_url, "static fixture ready");
            Ok(FixtureContext {
                base_url,
                dir: Some(dir),
                client,
                backend: Backend::Static(server),
            })
        }
        FixtureKind::Command => {
            let dir = check_dir(&config.dir)?;
            if let Some(build) = config.build.as_deref() {
                process::run_build(&dir, build, &config.env).await?;
            }
            let port = match config.port {
                0 => process::free_port()?,
                port => port,
            };
            let base_url = format!("http://127.0.0.1:{}", port);
            let fixture = process::start(&dir, config, port, &base_url, &client).await?;
            info!(dir = %dir.display(), url = %base_url, "command fixture ready");
            Ok(FixtureContext {
                base_url,
                dir: Some(dir),
                client,
                backend: Backend::Command(fixture),
            })
        }
        FixtureKind::External => {
            let base_url = config
                .url
                .as_deref()
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string();
            info!(url = %base_url, "attached to external fixture");
            Ok(FixtureContext {
                base_url,
                dir: None,
                client,
                backend: Backend::External,
            })
        }
    }
}

impl FixtureContext {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Source directory, when the fixture was built from one.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    /// Request `route` and wait for the complete response.
    ///
    /// Non-2xx responses are render errors; they fail the case, not the fixture.
    pub async fn render(&self, route: &str) -> RenderResult<PageHandle> {
        if !route.starts_with('/') {
            return Err(RenderError::InvalidRoute {
                route: route.to_string(),
                message: "route must start with '/'".to_string(),
            });
        }
        let url = self.url(route);
        debug!(url = %url, "rendering");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RenderError::Network {
                route: route.to_string(),
                message: describe_request_error(&e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Status {
                route: route.to_string(),
                status: status.as_u16(),
            });
        }

        let markup = response.text().await.map_err(|e| RenderError::Body {
            route: route.to_string(),
            message: e.to_string(),
        })?;
        debug!(route = %route, bytes = markup.len(), "rendered");
        Ok(PageHandle::parse(route, status.as_u16(), markup))
    }

    /// Stop the application and release its port.
    pub async fn teardown(self) {
        match self.backend {
            Backend::Static(server) => server.shutdown().await,
            Backend::Command(fixture) => fixture.stop().await,
            Backend::External => {}
        }
        debug!(url = %self.base_url, "fixture torn down");
    }
}

fn render_client(timeout: Duration) -> FixtureResult<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
    headers.insert(ACCEPT, HeaderValue::from_static("text/html"));

    reqwest::Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(|e| FixtureError::Client {
            message: e.to_string(),
        })
}

fn check_dir(dir: &Path) -> FixtureResult<PathBuf> {
    if !dir.exists() {
        return Err(FixtureError::MissingDir {
            path: dir.to_path_buf(),
        });
    }
    if !dir.is_dir() {
        return Err(FixtureError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }
    Ok(dir.to_path_buf())
}

fn describe_request_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timed out: {}", err)
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    }
}
