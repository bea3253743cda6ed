use crate::error::ScriptError;
use chrono::{DateTime, Local};
use std::fmt;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::process::Command;
use tokio::time::Instant;

/// At most this many scripts run at once, and the scheduler waits for each
/// one before it makes its next decision. A script that never exits stalls
/// every later transition; that is accepted rather than worked around.
pub const MAX_SCRIPTS_IN_FLIGHT: usize = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptKind {
    Online,
    Offline,
}

impl ScriptKind {
    pub fn for_state(any_online: bool) -> Self {
        if any_online { Self::Online } else { Self::Offline }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptPaths {
    pub online: PathBuf,
    pub offline: PathBuf,
}

impl ScriptPaths {
    pub fn path(&self, kind: ScriptKind) -> &Path {
        match kind {
            ScriptKind::Online => &self.online,
            ScriptKind::Offline => &self.offline,
        }
    }
}

/// Starts an executable and waits for it.
pub trait ScriptLauncher: Send + Sync {
    fn launch<'a>(
        &'a self,
        path: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<(), ScriptError>> + Send + 'a>>;
}

/// Runs the script as a child process with no arguments and echoes its
/// stdout to ours once it exits.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

impl ScriptLauncher for ProcessLauncher {
    fn launch<'a>(
        &'a self,
        path: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<(), ScriptError>> + Send + 'a>> {
        Box::pin(async move {
            let output = Command::new(path)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit())
                .output()
                .await
                .map_err(|source| ScriptError::Spawn {
                    path: path.to_path_buf(),
                    source,
                })?;

            if let Err(e) = echo(&mut std::io::stdout().lock(), &output.stdout) {
                tracing::warn!("Failed to echo output of {}: {e}", path.display());
            }

            if output.status.success() {
                Ok(())
            } else {
                Err(ScriptError::NonZeroExit {
                    path: path.to_path_buf(),
                    status: output.status.to_string(),
                })
            }
        })
    }
}

/// Copy a script's captured stdout to `out`.
fn echo(out: &mut impl Write, captured: &[u8]) -> std::io::Result<()> {
    if captured.is_empty() {
        return Ok(());
    }
    out.write_all(captured)?;
    out.flush()
}

/// What has run so far. At most one of `online_ran` / `offline_ran` is set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScriptExecutionState {
    pub online_ran: bool,
    pub offline_ran: bool,
    /// Monotonic time the last script finished, for cooldown math.
    pub last_run_at: Option<Instant>,
    /// Wall-clock time of the same moment, for logs.
    pub last_run_wall: Option<DateTime<Local>>,
    pub in_flight: bool,
}

impl ScriptExecutionState {
    pub fn nothing_ran(&self) -> bool {
        !self.online_ran && !self.offline_ran
    }

    pub fn ran_for(&self, kind: ScriptKind) -> bool {
        match kind {
            ScriptKind::Online => self.online_ran,
            ScriptKind::Offline => self.offline_ran,
        }
    }

    fn mark_started(&mut self, kind: ScriptKind) {
        self.online_ran = kind == ScriptKind::Online;
        self.offline_ran = kind == ScriptKind::Offline;
        self.in_flight = true;
    }

    fn mark_finished(&mut self) {
        self.in_flight = false;
        self.last_run_at = Some(Instant::now());
        self.last_run_wall = Some(Local::now());
    }
}

/// Outcome of [`ScriptRunner::run`].
#[derive(Debug)]
pub enum RunOutcome {
    Completed(Result<(), ScriptError>),
    /// Another script was still in flight.
    Skipped,
}

/// Runs the online/offline scripts and owns [`ScriptExecutionState`].
///
/// Flags are set before the process starts and are not rolled back if it
/// fails, so a failing script is not retried until the aggregate flips.
pub struct ScriptRunner {
    paths: ScriptPaths,
    launcher: Arc<dyn ScriptLauncher>,
    state: Mutex<ScriptExecutionState>,
}

impl ScriptRunner {
    pub fn new(paths: ScriptPaths, launcher: Arc<dyn ScriptLauncher>) -> Self {
        Self {
            paths,
            launcher,
            state: Mutex::new(ScriptExecutionState::default()),
        }
    }

    pub fn paths(&self) -> &ScriptPaths {
        &self.paths
    }

    pub fn state(&self) -> ScriptExecutionState {
        *self.lock_state()
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, ScriptExecutionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn run(&self, kind: ScriptKind) -> RunOutcome {
        {
            let mut state = self.lock_state();
            if usize::from(state.in_flight) >= MAX_SCRIPTS_IN_FLIGHT {
                tracing::warn!("Not running {kind} script: another script is still running");
                return RunOutcome::Skipped;
            }
            state.mark_started(kind);
        }

        let path = self.paths.path(kind);
        tracing::info!("Running {kind} script {}", path.display());
        let result = self.launcher.launch(path).await;

        let finished_at = {
            let mut state = self.lock_state();
            state.mark_finished();
            state.last_run_wall
        };

        match &result {
            Ok(()) => {
                if let Some(at) = finished_at {
                    tracing::info!("{kind} script finished at {}", at.format("%a %b %e %T %Y"));
                }
            }
            Err(e) => tracing::warn!("Error running script {}: {e}", path.display()),
        }
        RunOutcome::Completed(result)
    }
}

impl fmt::Debug for ScriptRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptRunner")
            .field("paths", &self.paths)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
