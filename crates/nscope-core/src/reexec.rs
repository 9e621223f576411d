//! Running work inside other namespaces by re-executing the current binary.
//!
//! A multi-threaded process cannot switch its mount or user namespace, so
//! the discovering process spawns a fresh copy of its own executable. The
//! copy joins the requested namespaces first thing in `main`, via
//! [`handle_reexec`], runs the requested action, writes the JSON-encoded
//! findings to stdout and exits. The exit code tells a failed join apart
//! from other failures.
//!
//! Any binary using namespace discovery must call [`handle_reexec`] at the
//! very beginning of `main`.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use nscope_common::constants::{
    BINDMOUNTS_ACTION, REEXEC_ACTION_ENV, REEXEC_NAMESPACES_ENV, WORKER_EXIT_ACTION_FAILED,
    WORKER_EXIT_JOIN_FAILED, WORKER_EXIT_UNKNOWN_ACTION,
};
use nscope_common::error::{NscopeError, Result};

use crate::namespace::join::{JoinTarget, join_namespaces};
use crate::procfs::ProcFs;

/// Capability to run a named unit of work inside a set of namespaces and
/// return its serialized output.
///
/// Each call is a synchronous round trip without timeout.
pub trait Reexecutor: Send + Sync {
    /// Runs `action` in a worker that first joins `namespaces`, in order.
    ///
    /// # Errors
    ///
    /// Returns [`NscopeError::Join`] if the worker could not join the
    /// namespaces, and [`NscopeError::Worker`] for any other worker failure.
    fn run(&self, action: &str, namespaces: &[JoinTarget]) -> Result<Vec<u8>>;
}

/// Re-executes the current executable as an isolated worker process.
#[derive(Debug, Clone)]
pub struct ProcessReexecutor {
    program: PathBuf,
}

impl ProcessReexecutor {
    /// Creates a re-executor for the currently running executable.
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("/proc/self/exe"),
        }
    }

    /// Creates a re-executor spawning `program` instead of the current
    /// executable. The program must call [`handle_reexec`] on startup.
    #[must_use]
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for ProcessReexecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "linux")]
impl Reexecutor for ProcessReexecutor {
    fn run(&self, action: &str, namespaces: &[JoinTarget]) -> Result<Vec<u8>> {
        if std::env::var_os(REEXEC_ACTION_ENV).is_some() {
            return Err(NscopeError::Worker {
                action: action.into(),
                message: "refusing to re-execute from within a worker".into(),
            });
        }
        let joins = serde_json::to_string(namespaces)?;
        tracing::debug!(action, program = %self.program.display(), namespaces = %joins, "re-executing");

        let output = Command::new(&self.program)
            .env(REEXEC_ACTION_ENV, action)
            .env(REEXEC_NAMESPACES_ENV, &joins)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| NscopeError::io(&self.program, e))?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        match output.status.code() {
            Some(0) => Ok(output.stdout),
            Some(WORKER_EXIT_JOIN_FAILED) => Err(NscopeError::Join {
                reference: namespaces
                    .iter()
                    .map(|t| t.path.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                message: stderr,
            }),
            _ => Err(NscopeError::Worker {
                action: action.into(),
                message: format!("{}: {stderr}", output.status),
            }),
        }
    }
}

#[cfg(not(target_os = "linux"))]
impl Reexecutor for ProcessReexecutor {
    fn run(&self, _action: &str, _namespaces: &[JoinTarget]) -> Result<Vec<u8>> {
        Err(NscopeError::Unsupported {
            message: "namespace re-execution requires Linux".into(),
        })
    }
}

/// Worker entry point: when this process was spawned by a
/// [`ProcessReexecutor`], joins the requested namespaces, runs the
/// requested action and exits; otherwise returns immediately.
pub fn handle_reexec() {
    let Some(action) = std::env::var_os(REEXEC_ACTION_ENV) else {
        return;
    };
    let code = run_worker(&action.to_string_lossy());
    std::process::exit(code);
}

fn run_worker(action: &str) -> i32 {
    let targets = match std::env::var(REEXEC_NAMESPACES_ENV)
        .map_err(|e| e.to_string())
        .and_then(|json| serde_json::from_str::<Vec<JoinTarget>>(&json).map_err(|e| e.to_string()))
    {
        Ok(targets) => targets,
        Err(e) => {
            report(&format!("invalid {REEXEC_NAMESPACES_ENV}: {e}"));
            return WORKER_EXIT_ACTION_FAILED;
        }
    };
    if let Err(e) = join_namespaces(&targets) {
        report(&e.to_string());
        return WORKER_EXIT_JOIN_FAILED;
    }
    let payload = match action {
        BINDMOUNTS_ACTION => bindmounts_payload(),
        _ => {
            report(&format!("unknown action {action}"));
            return WORKER_EXIT_UNKNOWN_ACTION;
        }
    };
    let written = payload.and_then(|bytes| {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(&bytes)
            .and_then(|()| stdout.flush())
            .map_err(|e| NscopeError::io("<stdout>", e))
    });
    match written {
        Ok(()) => 0,
        Err(e) => {
            report(&e.to_string());
            WORKER_EXIT_ACTION_FAILED
        }
    }
}

fn bindmounts_payload() -> Result<Vec<u8>> {
    let found = crate::bindmount::local_bindmounts(ProcFs::default().own_mountinfo_path())?;
    Ok(serde_json::to_vec(&found)?)
}

fn report(message: &str) {
    let _ = writeln!(std::io::stderr(), "{message}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_reexec_returns_outside_of_workers() {
        // The test harness is never started as a worker.
        handle_reexec();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn failing_program_reports_worker_error() {
        let reexec = ProcessReexecutor::with_program("/bin/false");
        let err = reexec.run(BINDMOUNTS_ACTION, &[]).unwrap_err();
        assert!(matches!(err, NscopeError::Worker { .. }), "{err}");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn missing_program_reports_io_error() {
        let reexec = ProcessReexecutor::with_program("/nonexistent/nscope");
        let err = reexec.run(BINDMOUNTS_ACTION, &[]).unwrap_err();
        assert!(matches!(err, NscopeError::Io { .. }), "{err}");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn worker_output_is_returned_verbatim() {
        let reexec = ProcessReexecutor::with_program("/bin/true");
        assert!(reexec.run(BINDMOUNTS_ACTION, &[]).unwrap().is_empty());
    }
}
