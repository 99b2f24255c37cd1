//! Fixture configuration, run options and suite file loading.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::case::TestGroup;
use crate::errors::{ConfigError, ConfigResult};

/// How a fixture directory becomes a running application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureKind {
    /// Directory holds built output; served by the in-process dev server.
    #[default]
    Static,
    /// Directory holds an application with build/start commands.
    Command,
    /// Application is already running at `url`; nothing to start.
    External,
}

/// Configuration for a single fixture (one per test group).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FixtureConfig {
    /// Source directory of the application under test.
    #[serde(default)]
    pub dir: PathBuf,

    #[serde(default)]
    pub kind: FixtureKind,

    /// Build command, run to completion inside `dir` (command fixtures).
    #[serde(default)]
    pub build: Option<String>,

    /// Start command, spawned inside `dir` with `PORT` set (command fixtures).
    #[serde(default)]
    pub start: Option<String>,

    /// Base URL of an already running application (external fixtures).
    #[serde(default)]
    pub url: Option<String>,

    /// Route polled until the application answers.
    #[serde(default = "default_ready_path")]
    pub ready_path: String,

    /// Port to listen on; 0 picks a free one.
    #[serde(default)]
    pub port: u16,

    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_secs: u64,

    /// Extra environment for build and start commands.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_ready_path() -> String {
    "/".to_string()
}

fn default_startup_timeout() -> u64 {
    60
}

fn default_render_timeout() -> u64 {
    30
}

fn default_max_concurrency() -> usize {
    4
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::new(),
            kind: FixtureKind::Static,
            build: None,
            start: None,
            url: None,
            ready_path: default_ready_path(),
            port: 0,
            startup_timeout_secs: default_startup_timeout(),
            env: BTreeMap::new(),
        }
    }
}

impl FixtureConfig {
    /// Serve `dir` as built static output.
    pub fn static_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    /// Start the application in `dir` with `start`.
    pub fn command(dir: impl Into<PathBuf>, start: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            kind: FixtureKind::Command,
            start: Some(start.into()),
            ..Self::default()
        }
    }

    /// Attach to an application that is already running.
    pub fn external(url: impl Into<String>) -> Self {
        Self {
            kind: FixtureKind::External,
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn with_build(mut self, build: impl Into<String>) -> Self {
        self.build = Some(build.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_ready_path(mut self, path: impl Into<String>) -> Self {
        self.ready_path = path.into();
        self
    }

    pub fn with_startup_timeout(mut self, secs: u64) -> Self {
        self.startup_timeout_secs = secs;
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !self.ready_path.starts_with('/') {
            return Err(invalid(format!(
                "ready_path must start with '/': {}",
                self.ready_path
            )));
        }
        if self.startup_timeout_secs == 0 {
            return Err(invalid("startup_timeout_secs must be > 0"));
        }
        match self.kind {
            FixtureKind::Static => {
                if self.dir.as_os_str().is_empty() {
                    return Err(invalid("static fixture requires `dir`"));
                }
            }
            FixtureKind::Command => {
                if self.dir.as_os_str().is_empty() {
                    return Err(invalid("command fixture requires `dir`"));
                }
                if self.start.as_deref().map_or(true, |s| s.trim().is_empty()) {
                    return Err(invalid("command fixture requires `start`"));
                }
            }
            FixtureKind::External => {
                let url = self.url.as_deref().unwrap_or_default().trim();
                if url.is_empty() {
                    return Err(invalid("external fixture requires `url`"));
                }
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(invalid(format!("external fixture url must be http(s): {url}")));
                }
            }
        }
        Ok(())
    }

    /// Resolve a relative `dir` against `base` (the suite file's directory).
    pub fn resolve_dir(&mut self, base: &Path) {
        if !self.dir.as_os_str().is_empty() && self.dir.is_relative() {
            self.dir = base.join(&self.dir);
        }
    }
}

/// Options that apply to a whole run rather than a single fixture.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Active bundler mode; groups listing it in `skip_modes` do not run.
    pub mode: Option<String>,
    pub render_timeout_secs: u64,
    /// Overrides every fixture's `startup_timeout_secs` when set.
    pub startup_timeout_secs: Option<u64>,
    pub max_concurrency: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: None,
            render_timeout_secs: default_render_timeout(),
            startup_timeout_secs: None,
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl RunOptions {
    /// Create options from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `PAGECHECK_MODE` | Active bundler mode |
    /// | `PAGECHECK_RENDER_TIMEOUT` | Render timeout in seconds (default: 30) |
    /// | `PAGECHECK_STARTUP_TIMEOUT` | Fixture startup timeout override in seconds |
    /// | `PAGECHECK_MAX_CONCURRENCY` | Groups run at once (default: 4) |
    pub fn from_env() -> Self {
        Self {
            mode: std::env::var("PAGECHECK_MODE")
                .ok()
                .filter(|m| !m.trim().is_empty()),
            render_timeout_secs: std::env::var("PAGECHECK_RENDER_TIMEOUT")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|n| *n > 0)
                .unwrap_or_else(default_render_timeout),
            startup_timeout_secs: std::env::var("PAGECHECK_STARTUP_TIMEOUT")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|n| *n > 0),
            max_concurrency: std::env::var("PAGECHECK_MAX_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or_else(default_max_concurrency),
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn with_render_timeout(mut self, secs: u64) -> Self {
        self.render_timeout_secs = secs.max(1);
        self
    }

    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n.max(1);
        self
    }

    /// Fixture config with run-level overrides applied.
    pub fn effective_fixture(&self, fixture: &FixtureConfig) -> FixtureConfig {
        let mut cfg = fixture.clone();
        if let Some(secs) = self.startup_timeout_secs {
            cfg.startup_timeout_secs = secs;
        }
        cfg
    }
}

/// A suite file: named groups, each with its own fixture.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Suite {
    pub suite: String,
    #[serde(default)]
    pub groups: Vec<TestGroup>,
}

impl Suite {
    /// Load a suite from YAML. Relative fixture dirs resolve against the file's directory.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_yaml_str(&content, &path.display().to_string(), base)
    }

    pub fn from_yaml_str(content: &str, origin: &str, base: &Path) -> ConfigResult<Self> {
        let mut suite: Suite = serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        for group in &mut suite.groups {
            group.fixture.resolve_dir(base);
        }
        suite.validate()?;
        Ok(suite)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.groups.is_empty() {
            return Err(invalid(format!("suite `{}` has no groups", self.suite)));
        }
        for group in &self.groups {
            group.fixture.validate().map_err(|e| {
                invalid(format!("group `{}`: {}", group.name, strip_prefix(&e)))
            })?;
            if group.cases.is_empty() {
                return Err(invalid(format!("group `{}` has no cases", group.name)));
            }
            for case in &group.cases {
                if !case.route.starts_with('/') {
                    return Err(invalid(format!(
                        "case `{}`: route must start with '/': {}",
                        case.name, case.route
                    )));
                }
                if case.checks.is_empty() {
                    return Err(invalid(format!("case `{}` has no checks", case.name)));
                }
                if case.checks.iter().any(|c| c.contains.is_empty()) {
                    return Err(invalid(format!(
                        "case `{}`: `contains` must not be empty",
                        case.name
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn case_count(&self) -> usize {
        self.groups.iter().map(|g| g.cases.len()).sum()
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        message: message.into(),
    }
}

fn strip_prefix(err: &ConfigError) -> String {
    match err {
        ConfigError::Invalid { message } => message.clone(),
        other => other.to_string(),
    }
}
