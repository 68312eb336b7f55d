//! Supervisor runner for a proxied Unity build.
//!
//! Starts the log watcher, launches Unity, waits for it to exit, drains the
//! log and turns everything into a [`Verdict`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use crate::config::ProxyConfig;
use crate::display;
use crate::status::{StatusEvent, StatusSink};
use crate::supervisor::{save_log, Verdict};
use crate::unity::{self, SpawnError, UnityProcess, UnityProcessBuilder};
use crate::watcher::{FailureState, LineClassifier, LogTailer, WatchLoop, WatcherError};

/// Build parameter that receives the Unity process id.
pub const PID_PARAMETER: &str = "unityPID";

/// Error type for supervisor operations.
#[derive(thiserror::Error, Debug)]
pub enum SupervisorError {
    /// Unity could not be started.
    #[error("Failed to start Unity: {0}")]
    Spawn(#[from] SpawnError),
    /// Waiting for Unity failed.
    #[error("Failed to wait for Unity: {0}")]
    Wait(#[source] std::io::Error),
    /// The log watcher failed.
    #[error("Log watcher failed: {0}")]
    Watcher(#[from] WatcherError),
    /// The log watcher ended before it was asked to.
    #[error("Log watcher exited while Unity was still running")]
    WatcherExited,
    /// The log file could not be created or emptied before the run.
    #[error("Failed to prepare log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The log artifact could not be written.
    #[error("Failed to save log artifact to {path}: {source}")]
    Artifacts {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What to run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Path to the Unity executable.
    pub unity_path: PathBuf,
    /// Arguments forwarded to Unity.
    pub unity_args: Vec<String>,
    /// Directory receiving a copy of the log.
    pub artifacts_dir: Option<PathBuf>,
    /// Log file for Unity; a fresh temporary path when unset.
    pub log_file: Option<PathBuf>,
    /// Working directory for Unity.
    pub working_dir: Option<PathBuf>,
}

impl RunRequest {
    #[must_use]
    pub fn new(unity_path: impl Into<PathBuf>) -> Self {
        Self {
            unity_path: unity_path.into(),
            unity_args: Vec::new(),
            artifacts_dir: None,
            log_file: None,
            working_dir: None,
        }
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unity_args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// Result of a supervised run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Final decision.
    pub verdict: Verdict,
    /// Exit code Unity reported.
    pub child_exit_code: i32,
    /// Failure latched from the log.
    pub failure: FailureState,
    /// Log file Unity wrote. `None` when the proxy picked a temporary file,
    /// which is removed once the run is over.
    pub log_file: Option<PathBuf>,
    /// Saved copy of the log, if an artifacts directory was given.
    pub artifact: Option<PathBuf>,
}

/// Supervises one Unity run at a time.
pub struct Supervisor {
    config: ProxyConfig,
    sink: Arc<dyn StatusSink>,
}

impl Supervisor {
    #[must_use]
    pub fn new(config: ProxyConfig, sink: Arc<dyn StatusSink>) -> Self {
        Self { config, sink }
    }

    /// Run Unity to completion and decide the verdict.
    ///
    /// The log file is emptied before Unity starts, so text from an earlier
    /// run can never count towards this one.
    ///
    /// # Errors
    ///
    /// Returns an error if the log file cannot be prepared, if Unity cannot
    /// be started or waited on, if the log watcher fails, or if the log
    /// artifact cannot be written. A failed build is not an error; it is
    /// reported through the verdict.
    pub async fn run(&self, request: RunRequest) -> Result<RunOutcome, SupervisorError> {
        let temporary = request.log_file.is_none();
        let log_file = request.log_file.clone().unwrap_or_else(temp_log_path);

        let mut builder = UnityProcessBuilder::new(&request.unity_path, log_file)
            .args(request.unity_args.iter().cloned());
        if let Some(dir) = &request.working_dir {
            builder = builder.working_dir(dir);
        }

        let result = self.supervise(&request, &builder).await;
        if !temporary {
            return result;
        }

        remove_temp_log(builder.log_file()).await;
        result.map(|outcome| RunOutcome {
            log_file: None,
            ..outcome
        })
    }

    async fn supervise(
        &self,
        request: &RunRequest,
        builder: &UnityProcessBuilder,
    ) -> Result<RunOutcome, SupervisorError> {
        let log_file = builder.log_file();
        tokio::fs::File::create(log_file)
            .await
            .map_err(|source| SupervisorError::LogFile {
                path: log_file.to_path_buf(),
                source,
            })?;

        let classifier = LineClassifier::with_markers(self.config.markers.clone());
        let tailer = LogTailer::new(log_file.to_path_buf(), classifier, Arc::clone(&self.sink));
        let watcher =
            WatchLoop::new(tailer, Arc::clone(&self.sink), self.config.poll_interval()).spawn();

        let banner = display::launch_line(builder.binary(), &builder.build_args());
        self.sink.log_output(&format!("{banner}\n"));

        let mut process = match UnityProcess::spawn(builder) {
            Ok(process) => process,
            Err(e) => {
                watcher.stop();
                if let Err(watch_err) = watcher.join().await {
                    tracing::warn!(error = %watch_err, "Log watcher failed during shutdown");
                }
                return Err(e.into());
            }
        };

        if let Some(pid) = process.id() {
            tracing::info!(pid, log_file = %log_file.display(), "Unity started");
            self.sink.emit(StatusEvent::SetParameter {
                name: PID_PARAMETER.to_string(),
                value: pid.to_string(),
            });
        }

        let status = tokio::select! {
            status = process.wait() => status.map_err(SupervisorError::Wait)?,
            () = watcher.terminated() => {
                tracing::error!("Log watcher exited early, terminating Unity");
                if let Err(e) = process.graceful_terminate(self.config.terminate_timeout()).await {
                    tracing::warn!(error = %e, "Failed to terminate Unity");
                }
                return Err(match watcher.join().await {
                    Err(e) => SupervisorError::Watcher(e),
                    Ok(_) => SupervisorError::WatcherExited,
                });
            }
        };

        let child_exit_code = unity::exit_code(status);
        tracing::info!(exit_code = child_exit_code, "Unity exited");

        watcher.stop();
        let report = watcher.join().await?;

        let artifact = match &request.artifacts_dir {
            Some(dir) => Some(
                save_log(dir, &self.config.artifact_log_name, &report.full_log)
                    .await
                    .map_err(|source| SupervisorError::Artifacts {
                        path: dir.join(&self.config.artifact_log_name),
                        source,
                    })?,
            ),
            None => None,
        };

        let verdict = Verdict::decide(
            child_exit_code,
            &report.full_log,
            report.failure.failed(),
            &self.config.success_marker,
        );
        tracing::info!(
            ok = verdict.ok,
            exit_code = verdict.exit_code,
            reason = report.failure.reason().unwrap_or_default(),
            "Build finished"
        );
        self.sink.emit(StatusEvent::Finished { ok: verdict.ok });

        Ok(RunOutcome {
            verdict,
            child_exit_code,
            failure: report.failure,
            log_file: Some(log_file.to_path_buf()),
            artifact,
        })
    }
}

async fn remove_temp_log(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed temporary log file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "Failed to remove temporary log file"
        ),
    }
}

/// Fresh log path in the system temp directory.
#[must_use]
pub fn temp_log_path() -> PathBuf {
    std::env::temp_dir().join(format!("unity-proxy-{}.log", Uuid::new_v4()))
}
