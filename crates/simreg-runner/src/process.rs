//! Launching the process under test.

use crate::case::{Case, ExecutionKind};
use crate::error::{RegressionError, RegressionResult};
use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Variable the library path is prepended to
pub const SEARCH_PATH_VAR: &str = "PATH";

/// Environment changes for one child, applied on top of the inherited environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvOverlay {
    vars: Vec<(String, OsString)>,
}

impl EnvOverlay {
    /// Overlay that prepends `lib_path` to the search path, read from `ambient`
    pub fn with_lib_path(lib_path: Option<&Path>, ambient: Option<OsString>) -> RegressionResult<Self> {
        let Some(lib_path) = lib_path else {
            return Ok(Self::default());
        };
        let mut entries = vec![lib_path.to_path_buf()];
        if let Some(ambient) = ambient {
            entries.extend(std::env::split_paths(&ambient));
        }
        let joined = std::env::join_paths(entries).map_err(|e| {
            RegressionError::config(format!("invalid lib_path {}: {e}", lib_path.display()))
        })?;
        Ok(Self { vars: vec![(SEARCH_PATH_VAR.to_string(), joined)] })
    }

    /// Overlay for a case, reading the current search path without modifying it
    pub fn for_case(case: &Case) -> RegressionResult<Self> {
        Self::with_lib_path(case.lib_path.as_deref(), std::env::var_os(SEARCH_PATH_VAR))
    }

    pub fn get(&self, key: &str) -> Option<&OsString> {
        self.vars.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    fn apply(&self, command: &mut Command) {
        for (key, value) in &self.vars {
            command.env(key, value);
        }
    }
}

/// Fully resolved command line for one case
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub cwd: PathBuf,
    pub env: EnvOverlay,
}

impl CommandSpec {
    /// `[executable, input_file]` or `[interpreter, script, input_file]`, run from the run dir
    pub fn for_case(case: &Case) -> RegressionResult<Self> {
        let input_file = OsString::from(&case.input_file);
        let (program, args) = match &case.execution {
            ExecutionKind::Executable { path } => (path.clone().into_os_string(), vec![input_file]),
            ExecutionKind::Script { interpreter, script } => {
                (OsString::from(interpreter), vec![script.clone().into_os_string(), input_file])
            }
        };
        Ok(Self { program, args, cwd: case.run_path.clone(), env: EnvOverlay::for_case(case)? })
    }

    /// Space-joined command line for progress output
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|s| s.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How a child process ended
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutcome {
    /// `None` when the child could not be started or was killed by a signal
    pub ret_code: Option<i32>,
    pub elapsed: Duration,
    /// Launch failure description, if any
    pub error: Option<String>,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.ret_code == Some(0)
    }
}

/// Run `spec` to completion with stdout and stderr both written to `log_path`
///
/// Only failing to create the log file is an error; a child that cannot be
/// spawned is reported through [`ProcessOutcome::error`].
pub fn run_logged(spec: &CommandSpec, log_path: &Path) -> RegressionResult<ProcessOutcome> {
    let log = File::create(log_path).map_err(|e| RegressionError::io(log_path, e))?;
    let log_err = log.try_clone().map_err(|e| RegressionError::io(log_path, e))?;

    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .current_dir(&spec.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err));
    spec.env.apply(&mut command);

    debug!(cmd = %spec.display(), cwd = %spec.cwd.display(), "spawning");
    let start = Instant::now();
    let status = command.status();
    let elapsed = start.elapsed();

    match status {
        Ok(status) => Ok(ProcessOutcome { ret_code: status.code(), elapsed, error: None }),
        Err(e) => {
            warn!(cmd = %spec.display(), error = %e, "failed to launch");
            Ok(ProcessOutcome {
                ret_code: None,
                elapsed,
                error: Some(format!("failed to launch '{}': {e}", spec.display())),
            })
        }
    }
}
