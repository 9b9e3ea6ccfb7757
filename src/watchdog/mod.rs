//! Server process watchdog.
//!
//! Keeps one long-running server process alive:
//!
//! ```text
//! Stopped → Starting → Running → (Unhealthy | Crashed) → Restarting → Starting → …
//!                                                      ↘ StoppedPermanently
//! ```
//!
//! The child is restarted when it exits or when a periodic check fails (the
//! process must be alive, then the health endpoint and the data endpoint
//! must answer). Each failure counts toward a bounded restart budget; a
//! passing check resets the counter. There is no distinction between
//! transient and persistent failures.
//!
//! ## Usage
//!
//! ```no_run
//! use lifesync::watchdog::{CheckSchedule, HttpProbe, RestartPolicy, ServerCommand, Watchdog};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let probe = HttpProbe::new("http://localhost:3001")?;
//! let (watchdog, handle) = Watchdog::new(
//!     ServerCommand::new("npm").args(["run", "server"]),
//!     probe,
//!     RestartPolicy::default(),
//!     CheckSchedule::default(),
//! );
//! let task = tokio::spawn(watchdog.run());
//! // ...
//! handle.stop();
//! let exit = task.await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
mod probe;

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{Signal, killpg};
#[cfg(unix)]
use nix::unistd::Pid;

use crate::errors::WatchdogError;

pub use config::MonitorConfig;
pub use probe::{HealthProbe, HttpProbe};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    Stopped,
    Starting,
    Running,
    Unhealthy,
    Crashed,
    Restarting,
    /// Restart budget exhausted. Terminal.
    StoppedPermanently,
}

impl WatchdogState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Unhealthy => "unhealthy",
            Self::Crashed => "crashed",
            Self::Restarting => "restarting",
            Self::StoppedPermanently => "stopped-permanently",
        }
    }
}

impl std::fmt::Display for WatchdogState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot published on every state or counter change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogStatus {
    pub state: WatchdogState,
    /// Consecutive failures since the last passing check.
    pub restarts: u32,
}

/// How the watchdog ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogExit {
    /// `stop()` was requested.
    Stopped,
    /// The restart budget ran out.
    GaveUp { restarts: u32 },
}

type DelayFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Bounded restart budget plus the delay before each restart.
#[derive(Clone)]
pub struct RestartPolicy {
    pub max_restarts: u32,
    delay: DelayFn,
}

impl RestartPolicy {
    /// Same delay before every restart.
    pub fn fixed(max_restarts: u32, delay: Duration) -> Self {
        Self::with_delay(max_restarts, move |_| delay)
    }

    /// Delay computed from the restart number (1-based).
    pub fn with_delay(
        max_restarts: u32,
        delay: impl Fn(u32) -> Duration + Send + Sync + 'static,
    ) -> Self {
        Self {
            max_restarts,
            delay: Arc::new(delay),
        }
    }

    pub fn delay_for(&self, restart: u32) -> Duration {
        (self.delay)(restart)
    }
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self::fixed(10, Duration::from_secs(5))
    }
}

impl std::fmt::Debug for RestartPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestartPolicy")
            .field("max_restarts", &self.max_restarts)
            .field("first_delay", &self.delay_for(1))
            .finish()
    }
}

/// When health checks run after each start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckSchedule {
    pub initial_delay: Duration,
    pub interval: Duration,
}

impl Default for CheckSchedule {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(10),
            interval: Duration::from_secs(15),
        }
    }
}

/// How long a server gets to exit after SIGTERM before it is killed.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);

/// The server process to supervise.
///
/// On Unix the server runs in its own process group, so stopping it also
/// reaches anything it spawned (`npm run` leaves the real server as a
/// grandchild).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub stop_grace: Duration,
}

impl ServerCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn spawn(&self) -> Result<Child, WatchdogError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd.spawn().map_err(|source| WatchdogError::SpawnFailed {
            command: self.display(),
            source,
        })
    }
}

/// Control side of a running [`Watchdog`].
#[derive(Debug, Clone)]
pub struct WatchdogHandle {
    status: watch::Receiver<WatchdogStatus>,
    stop: watch::Sender<bool>,
}

impl WatchdogHandle {
    pub fn status(&self) -> WatchdogStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<WatchdogStatus> {
        self.status.clone()
    }

    /// Ask the watchdog to stop and kill the child.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }
}

enum Interrupt {
    Failed(WatchdogError),
    StopRequested,
}

enum RestartDecision {
    Restart,
    GiveUp,
    Stop,
}

pub struct Watchdog<P> {
    command: ServerCommand,
    probe: P,
    policy: RestartPolicy,
    schedule: CheckSchedule,
    restarts: u32,
    child: Option<Child>,
    status: watch::Sender<WatchdogStatus>,
    stop_rx: watch::Receiver<bool>,
    // Keeps the stop channel open when every handle has been dropped.
    _stop_tx: watch::Sender<bool>,
}

impl<P: HealthProbe> Watchdog<P> {
    pub fn new(
        command: ServerCommand,
        probe: P,
        policy: RestartPolicy,
        schedule: CheckSchedule,
    ) -> (Self, WatchdogHandle) {
        let (status, status_rx) = watch::channel(WatchdogStatus {
            state: WatchdogState::Stopped,
            restarts: 0,
        });
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = WatchdogHandle {
            status: status_rx,
            stop: stop_tx.clone(),
        };
        let watchdog = Self {
            command,
            probe,
            policy,
            schedule,
            restarts: 0,
            child: None,
            status,
            stop_rx,
            _stop_tx: stop_tx,
        };
        (watchdog, handle)
    }

    /// Supervise the server until stopped or out of restarts.
    pub async fn run(mut self) -> WatchdogExit {
        tracing::info!(
            command = %self.command.display(),
            max_restarts = self.policy.max_restarts,
            "Watchdog starting"
        );
        loop {
            if *self.stop_rx.borrow() {
                self.stop().await;
                return WatchdogExit::Stopped;
            }

            let interrupt = match self.start() {
                Ok(()) => self.supervise().await,
                Err(e) => Interrupt::Failed(e),
            };

            match interrupt {
                Interrupt::StopRequested => {
                    self.stop().await;
                    return WatchdogExit::Stopped;
                }
                Interrupt::Failed(e) => {
                    tracing::warn!(error = %e, restarts = self.restarts, "Server failure");
                    match self.schedule_restart().await {
                        RestartDecision::Restart => continue,
                        RestartDecision::GiveUp => {
                            return WatchdogExit::GaveUp {
                                restarts: self.restarts,
                            };
                        }
                        RestartDecision::Stop => {
                            self.stop().await;
                            return WatchdogExit::Stopped;
                        }
                    }
                }
            }
        }
    }

    fn start(&mut self) -> Result<(), WatchdogError> {
        self.set_state(WatchdogState::Starting);
        let mut child = self.command.spawn()?;
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(stdout, "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(stderr, "stderr"));
        }
        tracing::info!(pid = child.id(), "Server process started");
        self.child = Some(child);
        self.set_state(WatchdogState::Running);
        Ok(())
    }

    /// Wait for the first of: child exit, failed check, stop request.
    async fn supervise(&mut self) -> Interrupt {
        let mut ticker = tokio::time::interval_at(
            Instant::now() + self.schedule.initial_delay,
            self.schedule.interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let Some(child) = self.child.as_mut() else {
                return Interrupt::Failed(WatchdogError::NotAlive);
            };

            tokio::select! {
                status = child.wait() => {
                    self.child = None;
                    self.set_state(WatchdogState::Crashed);
                    let status = match status {
                        Ok(s) => s.to_string(),
                        Err(e) => e.to_string(),
                    };
                    return Interrupt::Failed(WatchdogError::Exited { status });
                }
                _ = ticker.tick() => {
                    match self.check().await {
                        Ok(()) => {
                            if self.restarts > 0 {
                                tracing::info!(previous = self.restarts, "Server healthy, restart counter reset");
                            }
                            self.restarts = 0;
                            self.publish();
                        }
                        Err(e) => {
                            self.set_state(WatchdogState::Unhealthy);
                            return Interrupt::Failed(e);
                        }
                    }
                }
                changed = self.stop_rx.changed() => {
                    if changed.is_err() || *self.stop_rx.borrow() {
                        return Interrupt::StopRequested;
                    }
                }
            }
        }
    }

    /// Process alive, then health endpoint, then data endpoint.
    async fn check(&mut self) -> Result<(), WatchdogError> {
        match self.child.as_mut().map(Child::try_wait) {
            Some(Ok(None)) => {}
            _ => return Err(WatchdogError::NotAlive),
        }
        self.probe.check_health().await?;
        self.probe.check_data().await?;
        tracing::debug!("Server passed health and data checks");
        Ok(())
    }

    async fn schedule_restart(&mut self) -> RestartDecision {
        self.kill_child().await;
        self.restarts += 1;
        if self.restarts >= self.policy.max_restarts {
            tracing::error!(
                restarts = self.restarts,
                "Maximum restarts reached, giving up on server"
            );
            self.set_state(WatchdogState::StoppedPermanently);
            return RestartDecision::GiveUp;
        }

        self.set_state(WatchdogState::Restarting);
        let delay = self.policy.delay_for(self.restarts);
        tracing::info!(
            attempt = self.restarts,
            max = self.policy.max_restarts,
            delay_ms = delay.as_millis() as u64,
            "Restarting server"
        );
        tokio::select! {
            _ = tokio::time::sleep(delay) => RestartDecision::Restart,
            _ = wait_for_stop(&mut self.stop_rx) => RestartDecision::Stop,
        }
    }

    async fn stop(&mut self) {
        self.kill_child().await;
        self.set_state(WatchdogState::Stopped);
        tracing::info!("Watchdog stopped");
    }

    async fn kill_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            terminate(&mut child, self.command.stop_grace).await;
        }
    }

    fn set_state(&mut self, state: WatchdogState) {
        let restarts = self.restarts;
        self.status.send_replace(WatchdogStatus { state, restarts });
    }

    fn publish(&self) {
        self.status.send_modify(|s| s.restarts = self.restarts);
    }
}

async fn wait_for_stop(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// SIGTERM the server's process group, give it `grace` to exit, then SIGKILL
/// whatever is left in the group.
#[cfg(unix)]
async fn terminate(child: &mut Child, grace: Duration) {
    let Some(pid) = child.id() else {
        return;
    };
    signal_group(pid, Signal::SIGTERM);
    let exited = match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => {
            tracing::debug!(%status, "Server process exited");
            true
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Failed to wait for server process");
            false
        }
        Err(_) => {
            tracing::warn!(
                grace_ms = grace.as_millis() as u64,
                "Server ignored SIGTERM, killing it"
            );
            false
        }
    };
    signal_group(pid, Signal::SIGKILL);
    if !exited {
        if let Err(e) = child.kill().await {
            tracing::warn!(error = %e, "Failed to kill server process");
        }
    }
}

#[cfg(not(unix))]
async fn terminate(child: &mut Child, _grace: Duration) {
    if let Err(e) = child.kill().await {
        tracing::warn!(error = %e, "Failed to kill server process");
    }
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: Signal) {
    let Ok(pgid) = i32::try_from(pid) else {
        return;
    };
    match killpg(Pid::from_raw(pgid), signal) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(error = %e, ?signal, "Failed to signal server process group"),
    }
}

async fn forward_output<R: AsyncRead + Unpin>(stream: R, stream_name: &'static str) {
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if stream_name == "stderr" => {
                tracing::warn!(target: "lifesync::child", stream = stream_name, "{}", line)
            }
            Ok(Some(line)) => tracing::info!(target: "lifesync::child", stream = stream_name, "{}", line),
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, stream = stream_name, "Stopped reading server output");
                break;
            }
        }
    }
}
