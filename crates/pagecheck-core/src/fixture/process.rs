//! Command fixtures: build inside the source directory, spawn the start
//! command and poll until it answers.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::FixtureConfig;
use crate::errors::{FixtureError, FixtureResult};

/// Cap on captured stderr kept for diagnostics.
const STDERR_TAIL_BYTES: usize = 4096;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Grace period for the child to exit after being killed.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// A running start command. It runs in its own process group, and the whole
/// group is killed on stop and on drop so servers it forked go down with it.
#[derive(Debug)]
pub(crate) struct ProcessFixture {
    command: String,
    child: Child,
    /// Process group of the start command; its pid, captured at spawn.
    pgid: Option<u32>,
    stopped: bool,
}

impl ProcessFixture {
    fn new(command: String, child: Child) -> Self {
        Self {
            pgid: child.id(),
            command,
            child,
            stopped: false,
        }
    }

    pub(crate) async fn stop(mut self) {
        self.kill_group();
        if let Err(e) = self.child.start_kill() {
            debug!(command = %self.command, error = %e, "kill failed (already exited?)");
        }
        match tokio::time::timeout(STOP_TIMEOUT, self.child.wait()).await {
            Ok(Ok(status)) => debug!(command = %self.command, ?status, "start command stopped"),
            Ok(Err(e)) => warn!(command = %self.command, error = %e, "failed to reap start command"),
            Err(_) => warn!(command = %self.command, "start command did not exit after kill"),
        }
        self.stopped = true;
    }

    #[cfg(unix)]
    fn kill_group(&mut self) {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        // the group outlives its leader, so the pgid stays valid after the shell is reaped
        let Some(pgid) = self.pgid.and_then(|id| i32::try_from(id).ok()) else {
            return;
        };
        if let Err(e) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
            debug!(command = %self.command, pgid, error = %e, "killpg failed");
        }
    }

    #[cfg(not(unix))]
    fn kill_group(&mut self) {
        let _ = self.child.start_kill();
    }
}

impl Drop for ProcessFixture {
    fn drop(&mut self) {
        if !self.stopped {
            self.kill_group();
        }
    }
}

/// Run `command` to completion in `dir`; non-zero exit is fatal.
pub(crate) async fn run_build(
    dir: &Path,
    command: &str,
    env: &BTreeMap<String, String>,
) -> FixtureResult<()> {
    info!(dir = %dir.display(), command = %command, "building fixture");
    let output = shell(command)
        .current_dir(dir)
        .envs(env)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| FixtureError::Spawn {
            command: command.to_string(),
            source,
        })?;

    if output.status.success() {
        debug!(command = %command, "build finished");
        return Ok(());
    }
    Err(FixtureError::Build {
        command: command.to_string(),
        code: output.status.code(),
        stderr: tail(&String::from_utf8_lossy(&output.stderr)),
    })
}

/// Spawn the start command and wait until `ready_path` answers.
pub(crate) async fn start(
    dir: &Path,
    config: &FixtureConfig,
    port: u16,
    base_url: &str,
    client: &reqwest::Client,
) -> FixtureResult<ProcessFixture> {
    let command = config.start.clone().unwrap_or_default();
    info!(dir = %dir.display(), command = %command, port, "starting fixture");

    let mut cmd = shell(&command);
    cmd.current_dir(dir)
        .envs(&config.env)
        .env("PORT", port.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let child = cmd.spawn().map_err(|source| FixtureError::Spawn {
        command: command.clone(),
        source,
    })?;
    // every early return below drops this and kills the group
    let mut fixture = ProcessFixture::new(command.clone(), child);

    let stderr_tail = Arc::new(Mutex::new(String::new()));
    if let Some(stderr) = fixture.child.stderr.take() {
        let sink = stderr_tail.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(target: "pagecheck::fixture::stderr", "{}", line);
                let mut buf = sink.lock().unwrap_or_else(|p| p.into_inner());
                buf.push_str(&line);
                buf.push('\n');
                if buf.len() > STDERR_TAIL_BYTES * 2 {
                    *buf = tail(&buf);
                }
            }
        });
    }

    let ready_url = format!("{}{}", base_url, config.ready_path);
    let timeout = Duration::from_secs(config.startup_timeout_secs);
    let deadline = Instant::now() + timeout;

    loop {
        match fixture.child.try_wait() {
            Ok(Some(status)) => {
                // give the stderr reader a moment to drain
                tokio::time::sleep(Duration::from_millis(50)).await;
                return Err(FixtureError::ExitedEarly {
                    command,
                    code: status.code(),
                    stderr: tail(&stderr_tail.lock().unwrap_or_else(|p| p.into_inner())),
                });
            }
            Ok(None) => {}
            Err(source) => {
                return Err(FixtureError::Spawn { command, source });
            }
        }

        // a single poll never outlives the startup deadline
        let remaining = deadline
            .saturating_duration_since(Instant::now())
            .max(READY_POLL_INTERVAL);
        match client.get(&ready_url).timeout(remaining).send().await {
            Ok(response) => {
                debug!(url = %ready_url, status = response.status().as_u16(), "fixture answered");
                return Ok(fixture);
            }
            Err(e) => debug!(url = %ready_url, error = %e, "fixture not ready yet"),
        }

        if Instant::now() >= deadline {
            return Err(FixtureError::StartupTimeout {
                url: ready_url,
                timeout,
            });
        }
        tokio::time::sleep(READY_POLL_INTERVAL).await;
    }
}

/// Reserve a free localhost port for a start command.
pub(crate) fn free_port() -> FixtureResult<u16> {
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], 0));
    let listener =
        std::net::TcpListener::bind(addr).map_err(|source| FixtureError::Bind { addr, source })?;
    listener
        .local_addr()
        .map(|a| a.port())
        .map_err(|source| FixtureError::Bind { addr, source })
}

fn shell(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    }
}

fn tail(text: &str) -> String {
    let text = text.trim_end();
    if text.len() <= STDERR_TAIL_BYTES {
        return text.to_string();
    }
    let mut start = text.len() - STDERR_TAIL_BYTES;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}
