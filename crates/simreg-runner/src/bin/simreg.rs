use anyhow::{Context, Result};
use clap::Parser;
use simreg_runner::exit::{EXIT_CHECK_FAILED, EXIT_CONFIG, EXIT_SUCCESS};
use simreg_runner::{
    CaseFilter, Executor, LogFormat, RunOptions, TextOutputLoader, init_logging, load_cases,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Run simulation regression cases and compare their outputs against baselines
#[derive(Parser, Debug)]
#[command(name = "simreg", version)]
struct Cli {
    /// Worker count; -1 uses all cores but one
    #[arg(short = 'j', long = "parallel", value_name = "N", default_value_t = -1, allow_negative_numbers = true)]
    jobs: i64,

    /// List the selected cases without running them
    #[arg(short = 'N', long)]
    show_only: bool,

    /// Echo each case log as it completes
    #[arg(short, long)]
    verbose: bool,

    /// Run only cases whose name matches
    #[arg(short = 'R', long = "test-regex", value_name = "REGEX")]
    test_regex: Option<String>,

    /// Skip cases whose name matches
    #[arg(short = 'E', long = "exclude-regex", value_name = "REGEX")]
    exclude_regex: Option<String>,

    /// Run only cases with a matching label
    #[arg(short = 'L', long = "label-regex", value_name = "REGEX")]
    label_regex: Option<String>,

    /// Skip cases with a matching label
    #[arg(long = "label-exclude", value_name = "REGEX")]
    label_exclude: Option<String>,

    /// Test configuration file, relative to the repo root
    #[arg(short = 'c', long = "test-config", value_name = "PATH", default_value = "test_config.yaml")]
    test_config: PathBuf,

    /// Base directory for every relative path in the config
    #[arg(long, value_name = "DIR", default_value = ".")]
    repo_root: PathBuf,

    /// Do not start new cases after the first failure
    #[arg(long)]
    stop_on_failure: bool,

    /// Write <run_dir>/<case>.summary.json for each compared case
    #[arg(long)]
    summary_json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

fn run(cli: Cli) -> Result<i32> {
    init_logging(&cli.log_level, cli.log_format)?;

    let config_path = cli.repo_root.join(&cli.test_config);
    let cases = load_cases(&cli.repo_root, &config_path)
        .with_context(|| format!("failed to load test config {}", config_path.display()))?;

    let filter = CaseFilter::new(
        cli.test_regex.as_deref(),
        cli.label_regex.as_deref(),
        cli.exclude_regex.as_deref(),
        cli.label_exclude.as_deref(),
    )?;
    let cases = filter.apply(cases);
    info!(selected = cases.len(), "cases selected");

    let options = RunOptions {
        jobs: cli.jobs,
        verbose: cli.verbose,
        show_only: cli.show_only,
        stop_on_failure: cli.stop_on_failure,
        write_summaries: cli.summary_json,
    };
    let executor = Executor::new(cases, options, Arc::new(TextOutputLoader))?;
    let summary = executor.run()?;

    if cli.show_only {
        return Ok(EXIT_SUCCESS);
    }

    println!("\n{}", summary.render_table());
    if summary.all_passed() {
        Ok(EXIT_SUCCESS)
    } else {
        println!("FAILED");
        Ok(EXIT_CHECK_FAILED)
    }
}

fn main() {
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            EXIT_CONFIG
        }
    };
    std::process::exit(code);
}
