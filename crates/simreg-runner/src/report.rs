//! Per-case results, progress lines and the run summary.
//!
//! Rendering a rich document (plots, HTML) is left to an external renderer;
//! this module produces the console output and a JSON summary per case that
//! such a renderer can consume.

use crate::case::{BaselineKind, Case, CaseStatus};
use crate::error::{RegressionError, RegressionResult};
use console::style;
use serde::Serialize;
use simreg_compare::{NormKind, NormResult};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

/// Width of the dotted name column in progress lines
const NAME_WIDTH: usize = 42;

/// Comparison outcome for one baseline file
#[derive(Debug, Clone, Serialize)]
pub struct FileCheck {
    pub baseline_file: String,
    pub kind: BaselineKind,
    pub channels: Vec<String>,
    pub units: Vec<String>,
    /// One entry per channel; kept even after the case-level reduction
    pub verdicts: Vec<bool>,
    pub norms: Option<NormResult>,
    pub error: Option<String>,
}

impl FileCheck {
    /// A file whose kind cannot be compared numerically
    pub fn not_implemented(baseline_file: impl Into<String>) -> Self {
        Self {
            baseline_file: baseline_file.into(),
            kind: BaselineKind::Unsupported,
            channels: Vec::new(),
            units: Vec::new(),
            verdicts: Vec::new(),
            norms: None,
            error: None,
        }
    }

    /// A time-series file that could not be compared at all
    pub fn errored(baseline_file: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            baseline_file: baseline_file.into(),
            kind: BaselineKind::TimeSeries,
            channels: Vec::new(),
            units: Vec::new(),
            verdicts: Vec::new(),
            norms: None,
            error: Some(error.into()),
        }
    }

    pub fn passed(&self) -> bool {
        self.kind == BaselineKind::TimeSeries
            && self.error.is_none()
            && self.verdicts.iter().all(|ok| *ok)
    }

    fn label(&self) -> &'static str {
        match self.kind {
            BaselineKind::Unsupported => "NOT_IMPL",
            BaselineKind::TimeSeries if self.passed() => "PASSED",
            BaselineKind::TimeSeries => "FAILED",
        }
    }
}

/// Everything a worker sends back for one case
#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
    pub case: Case,
    pub files: Vec<FileCheck>,
    /// Never dispatched because the run was halted
    pub skipped: bool,
    pub note: Option<String>,
}

impl CaseReport {
    pub fn new(case: Case) -> Self {
        Self { case, files: Vec::new(), skipped: false, note: None }
    }

    pub fn skipped(case: Case) -> Self {
        Self { case, files: Vec::new(), skipped: true, note: Some("not run: halted after an earlier failure".into()) }
    }

    pub fn index(&self) -> usize {
        self.case.index().unwrap_or(usize::MAX)
    }

    pub fn passed(&self) -> bool {
        self.case.check_ok
    }

    fn status_text(status: CaseStatus) -> String {
        match status {
            CaseStatus::Passed => style(format!("{status:<8}")).green().to_string(),
            CaseStatus::Failed => style(format!("{status:<8}")).red().bold().to_string(),
            _ => format!("{status:<8}"),
        }
    }

    /// Lines printed when the case completes
    pub fn progress_block(&self, log_excerpt: Option<&str>) -> String {
        let case = &self.case;
        let ix = case.index_label();
        let mut out = String::new();

        if let Some(log) = log_excerpt {
            for line in log.lines() {
                let _ = writeln!(out, "{ix:>8}    Log: {line}");
            }
        }

        if self.skipped {
            let _ = write!(out, "{ix:>8}   Skip: {}", dotted(&case.name));
            return out;
        }

        let code = case.ret_code.map_or_else(|| "none".to_string(), |c| c.to_string());
        let secs = case.run_time.unwrap_or_default().as_secs_f64();
        let run_status = if case.run_ok { "COMPLETE" } else { "FAILED" };
        let _ = write!(
            out,
            "{ix:>8}    Run: {} {run_status:<8} with code {code} {secs:>8.3} seconds",
            dotted(&case.name)
        );
        if let Some(note) = &self.note {
            let _ = write!(out, "\n{ix:>8}   Note: {note}");
        }
        if !case.run_ok {
            return out;
        }

        for file in &self.files {
            let _ = write!(out, "\n{ix:>8}  Check: {:<NAME_WIDTH$} {:<8}", file.baseline_file, file.label());
            if let Some(error) = &file.error {
                let _ = write!(out, " ({error})");
            }
        }
        let _ = write!(out, "\n{ix:>8}    End: {} {}", dotted(&case.name), Self::status_text(case.status));
        out
    }
}

fn dotted(name: &str) -> String {
    let mut padded = name.to_string();
    while padded.chars().count() < NAME_WIDTH {
        padded.push('.');
    }
    padded
}

/// Ordered outcome of a whole run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Sorted by submission index
    pub reports: Vec<CaseReport>,
    pub workers: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn all_passed(&self) -> bool {
        self.reports.iter().all(CaseReport::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseReport> {
        self.reports.iter().filter(|r| !r.passed())
    }

    pub fn cases(&self) -> impl Iterator<Item = &Case> {
        self.reports.iter().map(|r| &r.case)
    }

    /// The "Case Summary" table
    pub fn render_table(&self) -> String {
        let mut out = String::from("Case Summary:\n");
        let _ = writeln!(
            out,
            "{:>8}  {:<16}  {:<42}  {:<6}  {:<6}  {:<8}",
            "Number", "Driver", "Case Name", "Run", "Check", "Status"
        );
        for case in self.cases() {
            let _ = writeln!(
                out,
                "{:>8}  {:<16}  {:<42}  {:<6}  {:<6}  {:<8}",
                case.index_label(),
                case.driver,
                case.name,
                case.run_ok,
                case.check_ok,
                case.status
            );
        }
        let failed = self.failures().count();
        let _ = write!(
            out,
            "\n{} of {} cases passed ({} workers, {:.3} seconds)",
            self.reports.len() - failed,
            self.reports.len(),
            self.workers,
            self.elapsed.as_secs_f64()
        );
        out
    }
}

#[derive(Serialize)]
struct ChannelSummary<'a> {
    name: &'a str,
    units: Option<&'a str>,
    passing: bool,
    max_norm_over_range: Option<f64>,
    relative_l2_norm: Option<f64>,
    max_norm: Option<f64>,
}

#[derive(Serialize)]
struct FileSummary<'a> {
    baseline_file: &'a str,
    kind: BaselineKind,
    passed: bool,
    error: Option<&'a str>,
    channels: Vec<ChannelSummary<'a>>,
}

#[derive(Serialize)]
struct CaseSummaryDoc<'a> {
    case: &'a str,
    driver: &'a str,
    status: CaseStatus,
    run_ok: bool,
    check_ok: bool,
    ret_code: Option<i32>,
    run_time_secs: Option<f64>,
    files: Vec<FileSummary<'a>>,
}

/// Write `<run_dir>/<name>.summary.json` for one case
///
/// Incomparable norms serialise as `null`.
pub fn write_case_summary(report: &CaseReport) -> RegressionResult<PathBuf> {
    let case = &report.case;
    let files = report
        .files
        .iter()
        .map(|file| FileSummary {
            baseline_file: &file.baseline_file,
            kind: file.kind,
            passed: file.passed(),
            error: file.error.as_deref(),
            channels: file
                .verdicts
                .iter()
                .enumerate()
                .map(|(i, passing)| {
                    let norm = |kind: NormKind| {
                        file.norms
                            .as_ref()
                            .filter(|n| i < n.channels())
                            .map(|n| n.get(i, kind))
                            .filter(|v| v.is_finite())
                    };
                    ChannelSummary {
                        name: file.channels.get(i).map_or("", String::as_str),
                        units: file.units.get(i).map(String::as_str),
                        passing: *passing,
                        max_norm_over_range: norm(NormKind::MaxNormOverRange),
                        relative_l2_norm: norm(NormKind::RelativeL2Norm),
                        max_norm: norm(NormKind::MaxNorm),
                    }
                })
                .collect(),
        })
        .collect();

    let doc = CaseSummaryDoc {
        case: &case.name,
        driver: &case.driver,
        status: case.status,
        run_ok: case.run_ok,
        check_ok: case.check_ok,
        ret_code: case.ret_code,
        run_time_secs: case.run_time.map(|d| d.as_secs_f64()),
        files,
    };

    let path = case.run_path.join(format!("{}.summary.json", case.name));
    let json = serde_json::to_string_pretty(&doc)?;
    std::fs::write(&path, json).map_err(|e| RegressionError::io(&path, e))?;
    Ok(path)
}
