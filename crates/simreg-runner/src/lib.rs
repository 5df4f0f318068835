//! Regression test orchestration for simulation executables.
//!
//! Cases come from a layered YAML config ([`config`]), are narrowed by
//! [`filter`], and run by the [`executor`] on a bounded worker pool. Each
//! worker stages the case, launches the simulation, and compares every
//! produced output against its baseline with `simreg-compare`.
//!
//! ```no_run
//! use simreg_runner::{CaseFilter, Executor, RunOptions, TextOutputLoader, load_cases};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cases = load_cases(Path::new("."), Path::new("test_config.yaml"))?;
//! let cases = CaseFilter::new(Some("AWT"), None, None, None)?.apply(cases);
//! let summary = Executor::new(cases, RunOptions::default(), Arc::new(TextOutputLoader))?.run()?;
//! println!("{}", summary.render_table());
//! # Ok(())
//! # }
//! ```

pub mod case;
pub mod config;
pub mod error;
pub mod executor;
pub mod exit;
pub mod filter;
pub mod loader;
pub mod logging;
pub mod pool;
pub mod process;
pub mod report;
pub mod staging;

pub use case::{BaselineKind, Case, CaseStatus, ExecutionKind, SharedFixture};
pub use config::{CaseLayer, load_cases, parse_cases};
pub use error::{RegressionError, RegressionResult};
pub use executor::{Executor, RunOptions};
pub use filter::CaseFilter;
pub use loader::{LoadedOutput, OutputLoader, TextOutputLoader};
pub use logging::{LogFormat, init_logging};
pub use pool::resolve_jobs;
pub use report::{CaseReport, FileCheck, RunSummary, write_case_summary};
