//! Final success/failure decision.

/// Outcome of a run and the exit code to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the build succeeded.
    pub ok: bool,
    /// Exit code for the proxy process.
    pub exit_code: i32,
}

impl Verdict {
    /// Combine Unity's exit code, the log and the failure latch.
    ///
    /// A run succeeds only if Unity exited with 0, the log contains the
    /// success marker and no failure was detected. A detected failure always
    /// reports 1; otherwise Unity's own exit code is passed through, so a
    /// zero exit without the success marker still reports 0.
    #[must_use]
    pub fn decide(
        child_exit_code: i32,
        full_log: &str,
        failed: bool,
        success_marker: &str,
    ) -> Self {
        let ok = child_exit_code == 0 && full_log.contains(success_marker) && !failed;

        let exit_code = if ok {
            0
        } else if failed {
            1
        } else {
            child_exit_code
        };

        Self { ok, exit_code }
    }
}
