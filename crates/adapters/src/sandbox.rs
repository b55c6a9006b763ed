// Copyright 2025 LLM Codebench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Subprocess verifier for generated code.
//!
//! The candidate code and the task's test fragment are joined with a newline
//! and run as `<interpreter> -c <program>` in a fresh process. The process is
//! killed when it outlives the timeout. Only a zero exit status counts as a
//! pass; spawn failures, non-zero exits and timeouts are all failures, never
//! errors.

use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Default interpreter.
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Default wall-clock limit for one verification.
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

const STDERR_LOG_LIMIT: usize = 2000;

/// Outcome of one verification run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// Process exited with status 0.
    pub passed: bool,
    /// Process was killed for exceeding the timeout.
    pub timed_out: bool,
    /// Exit code, when the process exited on its own.
    pub exit_code: Option<i32>,
    /// Wall-clock time spent.
    pub elapsed: Duration,
    /// Captured stderr (or the spawn error).
    pub stderr: String,
}

impl Verification {
    fn failed(elapsed: Duration, stderr: String) -> Self {
        Self {
            passed: false,
            timed_out: false,
            exit_code: None,
            elapsed,
            stderr,
        }
    }
}

/// Runs candidate code against test assertions.
#[derive(Debug, Clone)]
pub struct Verifier {
    interpreter: String,
    timeout: Duration,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new(DEFAULT_INTERPRETER, DEFAULT_VERIFY_TIMEOUT)
    }
}

impl Verifier {
    /// Verifier using `interpreter -c` with the given timeout.
    pub fn new(interpreter: impl Into<String>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
        }
    }

    /// Interpreter command.
    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// Per-run timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `true` iff `code` followed by `test_fragment` exits with status 0.
    pub async fn verify(&self, code: &str, test_fragment: &str) -> bool {
        self.run(code, test_fragment).await.passed
    }

    /// Run the program and report the full outcome.
    pub async fn run(&self, code: &str, test_fragment: &str) -> Verification {
        let program = format!("{code}\n{test_fragment}");
        let start = Instant::now();

        let child = Command::new(&self.interpreter)
            .arg("-c")
            .arg(&program)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                warn!(interpreter = %self.interpreter, error = %e, "Failed to spawn verifier");
                return Verification::failed(start.elapsed(), e.to_string());
            }
        };

        // Dropping the wait future on timeout drops the child, which kills it.
        let verification = match tokio::time::timeout(self.timeout, child.wait_with_output()).await
        {
            Ok(Ok(output)) => Verification {
                passed: output.status.success(),
                timed_out: false,
                exit_code: output.status.code(),
                elapsed: start.elapsed(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to collect verifier output");
                Verification::failed(start.elapsed(), e.to_string())
            }
            Err(_) => Verification {
                passed: false,
                timed_out: true,
                exit_code: None,
                elapsed: start.elapsed(),
                stderr: String::new(),
            },
        };

        if verification.timed_out {
            debug!(timeout = ?self.timeout, "Verifier killed after timeout");
        } else if !verification.passed {
            let stderr: String = verification.stderr.chars().take(STDERR_LOG_LIMIT).collect();
            debug!(exit_code = ?verification.exit_code, stderr = %stderr, "Verification failed");
        }

        verification
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh() -> Verifier {
        Verifier::new("sh", Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_passing_program() {
        let verifier = sh();
        assert!(verifier.verify("x=1", "[ \"$x\" = 1 ]").await);
    }

    #[tokio::test]
    async fn test_code_and_test_are_joined_with_newline() {
        // Without the separator this would be `add() { echo 3; }[ ...` and fail to parse.
        let verifier = sh();
        let code = "add() { echo $(($1 + $2)); }";
        let test = "[ \"$(add 1 2)\" = 3 ]";
        assert!(verifier.verify(code, test).await);
    }

    #[tokio::test]
    async fn test_failing_assertion() {
        let verification = sh().run("x=1", "[ \"$x\" = 2 ]").await;
        assert!(!verification.passed);
        assert!(!verification.timed_out);
        assert_eq!(verification.exit_code, Some(1));
    }

    #[tokio::test]
    async fn test_stderr_does_not_change_outcome() {
        let verification = sh().run("echo noisy >&2", "true").await;
        assert!(verification.passed);
        assert!(verification.stderr.contains("noisy"));
    }

    #[tokio::test]
    async fn test_timeout_yields_false() {
        let verifier = Verifier::new("sh", Duration::from_millis(200));
        let verification = verifier.run("while :; do :; done", "true").await;
        assert!(!verification.passed);
        assert!(verification.timed_out);
        assert!(verification.elapsed < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_missing_interpreter_yields_false() {
        let verifier = Verifier::new("codebench-no-such-interpreter", Duration::from_secs(1));
        assert!(!verifier.verify("print(1)", "").await);
    }

    #[test]
    fn test_defaults() {
        let verifier = Verifier::default();
        assert_eq!(verifier.interpreter(), "python3");
        assert_eq!(verifier.timeout(), Duration::from_secs(10));
    }
}
