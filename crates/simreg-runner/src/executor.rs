//! Bounded-parallel case execution.
//!
//! The [`Executor`] owns the case list. [`Executor::run`] performs the
//! run-wide preflight (baseline discovery and shared fixture copies) on the
//! calling thread, then hands each case to a fixed rayon pool. Workers own
//! their case outright and send a [`CaseReport`] back over an mpsc channel;
//! the calling thread is the only consumer and re-sorts the reports by
//! submission index once every case is accounted for.

use crate::case::{BaselineKind, Case, CaseStatus, ExecutionKind};
use crate::error::{RegressionError, RegressionResult};
use crate::loader::OutputLoader;
use crate::pool::{available_cores, build_pool, resolve_jobs};
use crate::process::{CommandSpec, run_logged};
use crate::report::{CaseReport, FileCheck, RunSummary, write_case_summary};
use crate::staging::{FixturePlan, discover_baselines, stage_case};
use simreg_compare::{calculate_norms, passing_channels};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::time::Instant;
use tracing::{debug, info, info_span, warn};

/// Knobs for one run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// `-1` for "all cores but one", otherwise a positive worker count
    pub jobs: i64,
    /// Echo each case log above its progress block
    pub verbose: bool,
    /// List the cases and exit without running anything
    pub show_only: bool,
    /// Stop starting new cases after the first non-passing one
    pub stop_on_failure: bool,
    /// Write `<run_dir>/<name>.summary.json` for every compared case
    pub write_summaries: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { jobs: -1, verbose: false, show_only: false, stop_on_failure: false, write_summaries: false }
    }
}

/// Runs a finalized list of cases
pub struct Executor {
    cases: Vec<Case>,
    options: RunOptions,
    loader: Arc<dyn OutputLoader>,
    workers: usize,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("cases", &self.cases.len())
            .field("options", &self.options)
            .field("workers", &self.workers)
            .finish()
    }
}

fn validate_case(case: &Case) -> RegressionResult<()> {
    if !case.input_path.is_dir() {
        return Err(RegressionError::config(format!(
            "input directory for case '{}' does not exist: {}",
            case.name,
            case.input_path.display()
        )));
    }
    match &case.execution {
        ExecutionKind::Executable { path } => {
            if !path.is_file() {
                return Err(RegressionError::config(format!(
                    "executable for case '{}' not found: {}",
                    case.name,
                    path.display()
                )));
            }
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let mode = std::fs::metadata(path).map_err(|e| RegressionError::io(path, e))?.permissions().mode();
                if mode & 0o111 == 0 {
                    return Err(RegressionError::config(format!(
                        "executable for case '{}' is not executable: {}",
                        case.name,
                        path.display()
                    )));
                }
            }
        }
        ExecutionKind::Script { script, .. } => {
            if !script.is_file() {
                return Err(RegressionError::config(format!(
                    "script for case '{}' not found: {}",
                    case.name,
                    script.display()
                )));
            }
        }
    }
    Ok(())
}

impl Executor {
    /// Validate every case and fix the worker count; touches nothing on disk
    pub fn new(mut cases: Vec<Case>, options: RunOptions, loader: Arc<dyn OutputLoader>) -> RegressionResult<Self> {
        let workers = resolve_jobs(options.jobs, available_cores(), cases.len())?;
        for case in &cases {
            validate_case(case)?;
        }

        let total = cases.len();
        for (i, case) in cases.iter_mut().enumerate() {
            case.assign_index(i + 1, total)?;
        }

        debug!(cases = total, workers, "executor ready");
        Ok(Self { cases, options, loader, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn cases(&self) -> &[Case] {
        &self.cases
    }

    /// `Test i: name` lines plus the total
    pub fn listing(&self) -> String {
        let mut lines: Vec<String> = self
            .cases
            .iter()
            .map(|case| format!("  Test {}: {}", case.index().unwrap_or_default(), case.name))
            .collect();
        lines.push(format!("\nTotal Tests: {}", self.cases.len()));
        lines.join("\n")
    }

    /// Baseline discovery and shared fixture copies, before any process starts
    ///
    /// A case without baselines aborts the whole run.
    fn preflight(&mut self) -> RegressionResult<()> {
        for case in &mut self.cases {
            case.baseline_files = discover_baselines(&case.name, &case.input_path, &case.baseline_file_ext)?;
        }
        let copied = FixturePlan::from_cases(&self.cases).execute()?;
        debug!(copied, "shared fixtures staged");
        Ok(())
    }

    /// Run every case and return the reports in submission order
    pub fn run(mut self) -> RegressionResult<RunSummary> {
        let start = Instant::now();

        if self.options.show_only {
            println!("{}", self.listing());
            let reports = self.cases.into_iter().map(CaseReport::new).collect();
            return Ok(RunSummary { reports, workers: self.workers, elapsed: start.elapsed() });
        }

        self.preflight()?;

        let pool = build_pool(self.workers)?;
        info!(cases = self.cases.len(), workers = self.workers, "dispatching cases");

        let halt = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel::<CaseReport>();
        let mut snapshots: BTreeMap<usize, Case> = BTreeMap::new();

        for case in std::mem::take(&mut self.cases) {
            let index = case.index().unwrap_or_default();
            snapshots.insert(index, case.clone());

            let tx = tx.clone();
            let halt = Arc::clone(&halt);
            let loader = Arc::clone(&self.loader);
            let options = self.options.clone();
            pool.spawn(move || {
                if halt.load(Ordering::SeqCst) {
                    let _ = tx.send(CaseReport::skipped(case));
                    return;
                }
                let report = run_case(case, loader.as_ref(), &options);
                if options.stop_on_failure && !report.passed() {
                    halt.store(true, Ordering::SeqCst);
                }
                let _ = tx.send(report);
            });
        }
        drop(tx);

        let mut reports = Vec::with_capacity(snapshots.len());
        for report in rx {
            let log = if self.options.verbose && !report.skipped {
                std::fs::read_to_string(&report.case.log_path).ok()
            } else {
                None
            };
            println!("{}", report.progress_block(log.as_deref()));
            snapshots.remove(&report.index());
            reports.push(report);
        }

        // Anything left never reported back: its worker panicked
        for (_, mut case) in snapshots {
            warn!(case = %case.name, "worker ended without a report");
            case.status = CaseStatus::Failed;
            let mut report = CaseReport::new(case);
            report.note = Some("worker panicked before reporting".into());
            println!("{}", report.progress_block(None));
            reports.push(report);
        }

        reports.sort_by_key(CaseReport::index);
        Ok(RunSummary { reports, workers: self.workers, elapsed: start.elapsed() })
    }
}

fn settle(report: &mut CaseReport, status: CaseStatus) {
    if let Err(e) = report.case.advance(status) {
        warn!(error = %e, "status not updated");
    }
}

fn fail(mut report: CaseReport, note: String) -> CaseReport {
    warn!(case = %report.case.name, %note, "case failed");
    report.note = Some(note);
    settle(&mut report, CaseStatus::Failed);
    report
}

/// Stage, execute and compare one case on the current worker thread
fn run_case(mut case: Case, loader: &dyn OutputLoader, options: &RunOptions) -> CaseReport {
    let span = info_span!("case", name = %case.name, index = %case.index_label());
    let _guard = span.enter();

    if let Err(e) = case.advance(CaseStatus::Running) {
        return fail(CaseReport::new(case), e.to_string());
    }
    if let Err(e) = stage_case(&case) {
        return fail(CaseReport::new(case), format!("staging failed: {e}"));
    }
    let spec = match CommandSpec::for_case(&case) {
        Ok(spec) => spec,
        Err(e) => return fail(CaseReport::new(case), e.to_string()),
    };
    let outcome = match run_logged(&spec, &case.log_path) {
        Ok(outcome) => outcome,
        Err(e) => return fail(CaseReport::new(case), e.to_string()),
    };

    case.ret_code = outcome.ret_code;
    case.run_time = Some(outcome.elapsed);
    case.run_ok = outcome.success();
    let mut report = CaseReport::new(case);

    if !report.case.run_ok {
        let note = outcome.error.unwrap_or_else(|| format!("see {}", report.case.log_path.display()));
        return fail(report, note);
    }

    report.files = report.case.baseline_files.iter().map(|file| compare_file(&report.case, file, loader)).collect();
    report.case.check_ok = report.files.iter().all(FileCheck::passed);

    let status = if report.case.check_ok {
        CaseStatus::Passed
    } else if report.files.iter().any(|f| f.kind == BaselineKind::TimeSeries && !f.passed()) {
        CaseStatus::Failed
    } else {
        CaseStatus::NotImpl
    };
    settle(&mut report, status);

    if options.write_summaries
        && let Err(e) = write_case_summary(&report)
    {
        warn!(error = %e, "could not write case summary");
    }
    debug!(status = %report.case.status, "case finished");
    report
}

/// Compare the freshly written output against its baseline
fn compare_file(case: &Case, file: &str, loader: &dyn OutputLoader) -> FileCheck {
    if case.baseline_kind() == BaselineKind::Unsupported {
        return FileCheck::not_implemented(file);
    }

    let test = match loader.load(&case.output_path(file)) {
        Ok(out) => out,
        Err(e) => return FileCheck::errored(file, e.to_string()),
    };
    let baseline = match loader.load(&case.baseline_path(file)) {
        Ok(out) => out,
        Err(e) => return FileCheck::errored(file, e.to_string()),
    };

    let verdicts = passing_channels(&test.data, &baseline.data, case.tolerance);
    let norms = calculate_norms(&test.data, &baseline.data);
    let error = (!test.data.same_shape(&baseline.data)).then(|| {
        format!(
            "shape mismatch: {}x{} vs baseline {}x{}",
            test.data.samples(),
            test.data.channels(),
            baseline.data.samples(),
            baseline.data.channels()
        )
    });

    FileCheck {
        baseline_file: file.to_string(),
        kind: BaselineKind::TimeSeries,
        channels: baseline.info.names,
        units: baseline.info.units,
        verdicts,
        norms: Some(norms),
        error,
    }
}
