//! Error taxonomy for page checks.
//!
//! Fixture errors are fatal for the whole group, render and assertion errors
//! only fail the case that hit them. Config errors never reach a fixture.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Fixture setup failed: the application could not be built or started.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// Source directory does not exist.
    #[error("fixture directory not found: {}", .path.display())]
    MissingDir { path: PathBuf },

    /// Source path exists but is not a directory.
    #[error("fixture path is not a directory: {}", .path.display())]
    NotADirectory { path: PathBuf },

    /// Static fixture directory has no entry document.
    #[error("fixture directory {} has no {entry}", .dir.display())]
    MissingEntry { dir: PathBuf, entry: String },

    /// Could not bind the fixture server or reserve a port.
    #[error("failed to bind fixture on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Build command exited unsuccessfully.
    #[error("build command `{command}` failed (exit code {code:?}): {stderr}")]
    Build {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// A build or start command could not be spawned.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Start command exited before the application answered.
    #[error("start command `{command}` exited before becoming ready (exit code {code:?}): {stderr}")]
    ExitedEarly {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Application never answered on its ready path.
    #[error("fixture not ready at {url} after {timeout:?}")]
    StartupTimeout { url: String, timeout: Duration },

    /// HTTP client for rendering could not be created.
    #[error("failed to create render client: {message}")]
    Client { message: String },

    /// Fixture configuration is unusable.
    #[error("invalid fixture config: {message}")]
    Config { message: String },
}

/// A route failed to produce a complete response.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("invalid route `{route}`: {message}")]
    InvalidRoute { route: String, message: String },

    #[error("network error rendering {route}: {message}")]
    Network { route: String, message: String },

    #[error("render of {route} returned HTTP {status}")]
    Status { route: String, status: u16 },

    #[error("failed to read response body for {route}: {message}")]
    Body { route: String, message: String },
}

/// Selection or containment check failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssertionError {
    #[error("invalid selector `{selector}`: {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("selector not found: no element matches `{selector}` on {route}")]
    SelectorNotFound { selector: String, route: String },

    #[error("text of `{selector}` does not contain expected value\n  expected to contain: {expected:?}\n  actual: {actual:?}")]
    TextMismatch {
        selector: String,
        expected: String,
        actual: String,
    },
}

/// Suite file or run option problems.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid config: {message}")]
    Invalid { message: String },
}

/// Top-level error for callers that do not care which stage failed.
#[derive(Debug, thiserror::Error)]
pub enum PagecheckError {
    #[error(transparent)]
    Fixture(#[from] FixtureError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Assertion(#[from] AssertionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PagecheckError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Fixture(_) | Self::Render(_) | Self::Assertion(_) => 1,
            Self::Config(_) => 2,
        }
    }
}

pub type FixtureResult<T> = Result<T, FixtureError>;
pub type RenderResult<T> = Result<T, RenderError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
