//! Case model: one configured simulation run plus its comparison parameters.
//!
//! A `Case` is produced once by the config resolver, then only the executor
//! (staging and execution) and the comparison step write to it. Status moves
//! forward only; see [`CaseStatus::advance`].

use crate::error::{RegressionError, RegressionResult};
use serde::{Deserialize, Serialize};
use simreg_compare::Tolerance;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Lifecycle of a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    Pending,
    Running,
    Failed,
    Passed,
    NotImpl,
}

impl CaseStatus {
    fn rank(self) -> u8 {
        match self {
            CaseStatus::Pending => 0,
            CaseStatus::Running => 1,
            CaseStatus::Failed | CaseStatus::Passed | CaseStatus::NotImpl => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.rank() == 2
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CaseStatus::Pending => "PENDING",
            CaseStatus::Running => "RUNNING",
            CaseStatus::Failed => "FAILED",
            CaseStatus::Passed => "PASSED",
            CaseStatus::NotImpl => "NOT_IMPL",
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // pad() so width specifiers in table rows apply
        f.pad(self.as_str())
    }
}

/// How the process under test is launched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionKind {
    /// `[executable, input_file]`
    Executable { path: PathBuf },
    /// `[interpreter, script, input_file]`
    Script { interpreter: String, script: PathBuf },
}

/// What a baseline file holds, decided by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineKind {
    /// Sampled channel output (`.out`, `.outb`)
    TimeSeries,
    /// Anything numeric comparison is not implemented for (e.g. `.lin`)
    Unsupported,
}

impl BaselineKind {
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "out" | "outb" => BaselineKind::TimeSeries,
            _ => BaselineKind::Unsupported,
        }
    }
}

/// Shared input subtree ("turbine" directory) reused by several cases
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SharedFixture {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// One regression test case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub name: String,
    pub driver: String,
    /// Directory holding the case inputs and baselines
    pub input_path: PathBuf,
    /// Directory the case is staged into and run from
    pub run_path: PathBuf,
    /// Input file name, relative to `run_path`
    pub input_file: String,
    pub execution: ExecutionKind,
    /// Prepended to the child's `PATH`
    pub lib_path: Option<PathBuf>,
    pub fixture: Option<SharedFixture>,
    pub baseline_file_ext: String,
    /// File names, filled in during staging
    pub baseline_files: Vec<String>,
    pub tolerance: Tolerance,
    pub labels: Vec<String>,
    pub log_path: PathBuf,

    pub status: CaseStatus,
    pub run_ok: bool,
    pub check_ok: bool,
    pub ret_code: Option<i32>,
    pub run_time: Option<Duration>,

    index: Option<usize>,
    total: usize,
}

impl Case {
    #[allow(clippy::too_many_arguments)]
    pub fn new<S: Into<String>>(
        name: S,
        driver: S,
        input_path: impl Into<PathBuf>,
        run_path: impl Into<PathBuf>,
        input_file: S,
        execution: ExecutionKind,
        baseline_file_ext: S,
        tolerance: Tolerance,
    ) -> Self {
        let name = name.into();
        let run_path = run_path.into();
        let log_path = run_path.join(format!("{name}.log"));
        Self {
            name,
            driver: driver.into(),
            input_path: input_path.into(),
            run_path,
            input_file: input_file.into(),
            execution,
            lib_path: None,
            fixture: None,
            baseline_file_ext: baseline_file_ext.into(),
            baseline_files: Vec::new(),
            tolerance,
            labels: Vec::new(),
            log_path,
            status: CaseStatus::Pending,
            run_ok: false,
            check_ok: false,
            ret_code: None,
            run_time: None,
            index: None,
            total: 0,
        }
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_fixture(mut self, source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        self.fixture = Some(SharedFixture { source: source.into(), destination: destination.into() });
        self
    }

    pub fn with_lib_path(mut self, lib_path: impl Into<PathBuf>) -> Self {
        self.lib_path = Some(lib_path.into());
        self
    }

    /// Submission index (1-based) once assigned
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Assign the submission index; a second, different assignment is rejected
    pub fn assign_index(&mut self, index: usize, total: usize) -> RegressionResult<()> {
        match self.index {
            Some(existing) if existing != index => Err(RegressionError::config(format!(
                "case '{}' already has submission index {existing}",
                self.name
            ))),
            _ => {
                self.index = Some(index);
                self.total = total;
                Ok(())
            }
        }
    }

    /// `"i/N"` label used in progress output
    pub fn index_label(&self) -> String {
        match self.index {
            Some(index) => format!("{index}/{}", self.total),
            None => "-".to_string(),
        }
    }

    pub fn input_file_path(&self) -> PathBuf {
        self.run_path.join(&self.input_file)
    }

    pub fn baseline_kind(&self) -> BaselineKind {
        BaselineKind::from_extension(&self.baseline_file_ext)
    }

    pub fn baseline_path(&self, file: &str) -> PathBuf {
        self.input_path.join(file)
    }

    pub fn output_path(&self, file: &str) -> PathBuf {
        self.run_path.join(file)
    }

    /// Move the status forward; moving backwards or out of a terminal state fails
    pub fn advance(&mut self, next: CaseStatus) -> RegressionResult<()> {
        if next.rank() <= self.status.rank() {
            return Err(RegressionError::StatusTransition {
                case: self.name.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Paths that must exist before anything runs
    pub fn required_paths(&self) -> Vec<&Path> {
        let mut paths = vec![self.input_path.as_path()];
        match &self.execution {
            ExecutionKind::Executable { path } => paths.push(path),
            ExecutionKind::Script { script, .. } => paths.push(script),
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case() -> Case {
        Case::new(
            "AWT_YFix_WSt",
            "openfast",
            "/r-test/openfast/AWT_YFix_WSt",
            "/build/openfast/AWT_YFix_WSt",
            "AWT_YFix_WSt.fst",
            ExecutionKind::Executable { path: "/build/bin/openfast".into() },
            ".outb",
            Tolerance::new(2.0, 1.9),
        )
    }

    #[test]
    fn log_path_is_derived_from_name() {
        assert_eq!(case().log_path, PathBuf::from("/build/openfast/AWT_YFix_WSt/AWT_YFix_WSt.log"));
    }

    #[test]
    fn status_only_moves_forward() {
        let mut case = case();
        case.advance(CaseStatus::Running).unwrap();
        case.advance(CaseStatus::Passed).unwrap();
        assert!(case.advance(CaseStatus::Running).is_err());
        assert!(case.advance(CaseStatus::Failed).is_err());
        assert_eq!(case.status, CaseStatus::Passed);
    }

    #[test]
    fn index_cannot_be_reassigned() {
        let mut case = case();
        assert_eq!(case.index_label(), "-");
        case.assign_index(3, 7).unwrap();
        case.assign_index(3, 7).unwrap();
        assert!(case.assign_index(4, 7).is_err());
        assert_eq!(case.index_label(), "3/7");
    }

    #[test]
    fn baseline_kind_from_extension() {
        assert_eq!(BaselineKind::from_extension(".outb"), BaselineKind::TimeSeries);
        assert_eq!(BaselineKind::from_extension("out"), BaselineKind::TimeSeries);
        assert_eq!(BaselineKind::from_extension(".lin"), BaselineKind::Unsupported);
    }

    #[test]
    fn status_display_pads() {
        assert_eq!(format!("{:<8}|", CaseStatus::Passed), "PASSED  |");
        assert_eq!(CaseStatus::NotImpl.to_string(), "NOT_IMPL");
    }
}
