#![cfg(unix)]

use simreg_compare::Tolerance;
use simreg_runner::{
    BaselineKind, Case, CaseStatus, ExecutionKind, Executor, LoadedOutput, OutputLoader, RegressionResult,
    RunOptions, TextOutputLoader,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Case layout under a sandbox: `in/<name>` holds inputs, `out/<name>` is the run dir
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self { dir: TempDir::new().unwrap() }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn input_dir(&self, name: &str) -> PathBuf {
        self.root().join("in").join(name)
    }

    fn run_dir(&self, name: &str) -> PathBuf {
        self.root().join("out").join(name)
    }

    /// A case whose input file is a shell script run by `/bin/sh`
    fn case(&self, name: &str, script: &str) -> Case {
        let input = self.input_dir(name);
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("run.sh"), script).unwrap();
        Case::new(
            name,
            "shell",
            input,
            self.run_dir(name),
            "run.sh",
            ExecutionKind::Executable { path: "/bin/sh".into() },
            ".out",
            Tolerance::new(2.0, 2.0),
        )
    }

    fn baseline(&self, name: &str, file: &str, text: &str) {
        fs::write(self.input_dir(name).join(file), text).unwrap();
    }
}

fn output(rows: &[(f64, f64)]) -> String {
    let mut text = String::from("Simulated output\n\nTime   GenPwr\n(s)    (kW)\n");
    for (t, p) in rows {
        text.push_str(&format!("{t:.4}  {p:.6E}\n"));
    }
    text
}

fn writes(file: &str, text: &str) -> String {
    format!("cat > {file} <<'EOF'\n{text}EOF\n")
}

fn ramp() -> String {
    output(&[(0.0, 100.0), (0.05, 150.0), (0.1, 200.0)])
}

fn options(jobs: i64) -> RunOptions {
    RunOptions { jobs, ..RunOptions::default() }
}

#[test]
fn passing_case_compares_every_channel() {
    let sb = Sandbox::new();
    let case = sb.case("steady", &writes("steady.out", &ramp()));
    sb.baseline("steady", "steady.out", &ramp());

    let summary = Executor::new(vec![case], options(1), Arc::new(TextOutputLoader)).unwrap().run().unwrap();
    let report = &summary.reports[0];

    assert!(summary.all_passed());
    assert_eq!(report.case.status, CaseStatus::Passed);
    assert_eq!(report.case.ret_code, Some(0));
    assert!(report.case.run_time.is_some());
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.files[0].verdicts, [true, true]);
    assert_eq!(report.files[0].channels, ["Time", "GenPwr"]);
    assert!(sb.run_dir("steady").join("steady.log").exists());
}

#[test]
fn nonzero_exit_fails_without_comparison() {
    let sb = Sandbox::new();
    let case = sb.case("crash", "echo 'diverged' >&2\nexit 3\n");
    sb.baseline("crash", "crash.out", &ramp());

    let summary = Executor::new(vec![case], options(1), Arc::new(TextOutputLoader)).unwrap().run().unwrap();
    let report = &summary.reports[0];

    assert_eq!(report.case.status, CaseStatus::Failed);
    assert_eq!(report.case.ret_code, Some(3));
    assert!(!report.case.run_ok && !report.case.check_ok);
    assert!(report.files.is_empty());
    let log = fs::read_to_string(sb.run_dir("crash").join("crash.log")).unwrap();
    assert!(log.contains("diverged"));
}

#[test]
fn stale_baseline_copy_cannot_pass() {
    let sb = Sandbox::new();
    // exits cleanly without producing output; the staged baseline copy must be gone
    let case = sb.case("silent", "exit 0\n");
    sb.baseline("silent", "silent.out", &ramp());

    let summary = Executor::new(vec![case], options(1), Arc::new(TextOutputLoader)).unwrap().run().unwrap();
    let report = &summary.reports[0];

    assert!(report.case.run_ok);
    assert_eq!(report.case.status, CaseStatus::Failed);
    assert!(report.files[0].error.is_some());
}

#[test]
fn drifted_channel_fails_but_keeps_per_channel_verdicts() {
    let sb = Sandbox::new();
    let drifted = output(&[(0.0, 100.0), (0.05, 190.0), (0.1, 200.0)]);
    let case = sb.case("drift", &writes("drift.out", &drifted));
    sb.baseline("drift", "drift.out", &ramp());

    let summary = Executor::new(vec![case], options(1), Arc::new(TextOutputLoader)).unwrap().run().unwrap();
    let report = &summary.reports[0];

    assert_eq!(report.case.status, CaseStatus::Failed);
    assert!(report.case.run_ok);
    assert_eq!(report.files[0].verdicts, [true, false]);
    assert!(!summary.all_passed());
}

#[test]
fn reports_come_back_in_submission_order() {
    let sb = Sandbox::new();
    let slow = format!("sleep 0.3\n{}", writes("slow.out", &ramp()));
    let cases = vec![
        sb.case("slow", &slow),
        sb.case("fast", &writes("fast.out", &ramp())),
        sb.case("broken", "exit 1\n"),
    ];
    for name in ["slow", "fast", "broken"] {
        sb.baseline(name, &format!("{name}.out"), &ramp());
    }

    let summary = Executor::new(cases, options(3), Arc::new(TextOutputLoader)).unwrap().run().unwrap();
    let names: Vec<_> = summary.cases().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["slow", "fast", "broken"]);

    let statuses: Vec<_> = summary.cases().map(|c| c.status).collect();
    assert_eq!(statuses, [CaseStatus::Passed, CaseStatus::Passed, CaseStatus::Failed]);
}

#[test]
fn missing_baselines_abort_before_any_process_starts() {
    let sb = Sandbox::new();
    let good = sb.case("good", &writes("good.out", &ramp()));
    sb.baseline("good", "good.out", &ramp());
    let orphan = sb.case("orphan", &writes("orphan.out", &ramp()));

    let err = Executor::new(vec![good, orphan], options(2), Arc::new(TextOutputLoader)).unwrap().run().unwrap_err();

    assert!(err.is_fatal());
    assert!(err.to_string().contains("orphan"));
    assert!(!sb.run_dir("good").exists());
}

#[test]
fn shared_fixture_is_staged_for_every_case() {
    let sb = Sandbox::new();
    let turbine = sb.root().join("in").join("AWT27");
    fs::create_dir_all(&turbine).unwrap();
    fs::write(turbine.join("tower.dat"), "stiffness 1e9\n").unwrap();

    let check = "test -f ../AWT27/tower.dat || exit 9\n";
    let cases: Vec<Case> = ["yaw", "pitch"]
        .iter()
        .map(|name| {
            let script = format!("{check}{}", writes(&format!("{name}.out"), &ramp()));
            sb.case(name, &script).with_fixture(&turbine, sb.root().join("out").join("AWT27"))
        })
        .collect();
    for name in ["yaw", "pitch"] {
        sb.baseline(name, &format!("{name}.out"), &ramp());
    }

    let summary = Executor::new(cases, options(2), Arc::new(TextOutputLoader)).unwrap().run().unwrap();
    assert!(summary.all_passed(), "{}", summary.render_table());
    assert!(sb.root().join("out/AWT27/tower.dat").exists());
}

#[test]
fn stop_on_failure_leaves_later_cases_pending() {
    let sb = Sandbox::new();
    let cases = vec![sb.case("first", "exit 2\n"), sb.case("second", &writes("second.out", &ramp()))];
    sb.baseline("first", "first.out", &ramp());
    sb.baseline("second", "second.out", &ramp());

    let options = RunOptions { jobs: 1, stop_on_failure: true, ..RunOptions::default() };
    let summary = Executor::new(cases, options, Arc::new(TextOutputLoader)).unwrap().run().unwrap();

    assert_eq!(summary.reports[0].case.status, CaseStatus::Failed);
    assert!(summary.reports[1].skipped);
    assert_eq!(summary.reports[1].case.status, CaseStatus::Pending);
    assert!(!sb.run_dir("second").exists());
}

#[test]
fn unsupported_baselines_are_not_implemented() {
    let sb = Sandbox::new();
    let mut case = sb.case("linear", "exit 0\n");
    case.baseline_file_ext = ".lin".into();
    sb.baseline("linear", "linear.1.lin", "A matrix\n");

    let summary = Executor::new(vec![case], options(1), Arc::new(TextOutputLoader)).unwrap().run().unwrap();
    let report = &summary.reports[0];

    assert_eq!(report.case.status, CaseStatus::NotImpl);
    assert!(!report.case.check_ok);
    assert_eq!(report.files[0].kind, BaselineKind::Unsupported);
    assert!(!summary.all_passed());
}

struct PanickingLoader;

impl OutputLoader for PanickingLoader {
    fn load(&self, path: &Path) -> RegressionResult<LoadedOutput> {
        panic!("decoder blew up on {}", path.display());
    }
}

#[test]
fn worker_panic_is_recorded_as_failure() {
    let sb = Sandbox::new();
    let cases = vec![sb.case("boom", &writes("boom.out", &ramp())), sb.case("crash", "exit 4\n")];
    sb.baseline("boom", "boom.out", &ramp());
    sb.baseline("crash", "crash.out", &ramp());

    let summary = Executor::new(cases, options(2), Arc::new(PanickingLoader)).unwrap().run().unwrap();

    assert_eq!(summary.reports.len(), 2);
    assert_eq!(summary.reports[0].case.name, "boom");
    assert_eq!(summary.reports[0].case.status, CaseStatus::Failed);
    assert!(summary.reports[0].note.as_deref().unwrap_or_default().contains("panicked"));
    assert_eq!(summary.reports[1].case.ret_code, Some(4));
}

#[test]
fn summary_json_is_written_next_to_the_run() {
    let sb = Sandbox::new();
    let case = sb.case("steady", &writes("steady.out", &ramp()));
    sb.baseline("steady", "steady.out", &ramp());

    let options = RunOptions { jobs: 1, write_summaries: true, ..RunOptions::default() };
    Executor::new(vec![case], options, Arc::new(TextOutputLoader)).unwrap().run().unwrap();

    let text = fs::read_to_string(sb.run_dir("steady").join("steady.summary.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(doc["status"], "PASSED");
    assert_eq!(doc["files"][0]["channels"][1]["name"], "GenPwr");
    assert_eq!(doc["files"][0]["channels"][1]["max_norm"], 0.0);
}

#[test]
fn show_only_runs_nothing() {
    let sb = Sandbox::new();
    let case = sb.case("listed", "exit 1\n");

    let options = RunOptions { show_only: true, ..RunOptions::default() };
    let summary = Executor::new(vec![case], options, Arc::new(TextOutputLoader)).unwrap().run().unwrap();

    assert_eq!(summary.reports[0].case.status, CaseStatus::Pending);
    assert!(!sb.run_dir("listed").exists());
}
