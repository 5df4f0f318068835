//! Layered test configuration.
//!
//! The YAML document holds an optional `default_case` section and one section
//! per driver. A driver section carries driver-wide defaults and a `cases`
//! mapping:
//!
//! ```yaml
//! default_case:
//!   relative_tolerance: 2
//!   absolute_tolerance: 1.9
//!   baseline_file_ext: .outb
//! openfast:
//!   input_path: reg_tests/r-test/glue-codes/openfast
//!   run_path: build/reg_tests/glue-codes/openfast
//!   executable_path: build/glue-codes/openfast/openfast
//!   input_file_ext: .fst
//!   cases:
//!     AWT_YFix_WSt:
//!       labels: [aerodyn14, elastodyn, servodyn]
//!       turbine_directory: AWT27
//!       absolute_tolerance: 1.5
//! ```
//!
//! Each field resolves with precedence case > driver > default, once, into an
//! immutable [`Case`]. Document order is submission order.

use crate::case::{Case, ExecutionKind};
use crate::error::{RegressionError, RegressionResult};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use simreg_compare::Tolerance;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Interpreter used for script cases that do not name one
pub const DEFAULT_INTERPRETER: &str = "python";

const DEFAULT_SECTION: &str = "default_case";

/// One configuration layer; every field is optional on every layer
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CaseLayer {
    pub input_path: Option<PathBuf>,
    pub run_path: Option<PathBuf>,
    pub executable_path: Option<PathBuf>,
    pub script_path: Option<PathBuf>,
    pub interpreter: Option<String>,
    pub lib_path: Option<PathBuf>,
    pub input_directory: Option<String>,
    pub input_file: Option<String>,
    pub input_file_ext: Option<String>,
    pub baseline_file_ext: Option<String>,
    pub turbine_directory: Option<String>,
    pub relative_tolerance: Option<f64>,
    pub absolute_tolerance: Option<f64>,
    pub labels: Option<Vec<String>>,
}

macro_rules! overlay_fields {
    ($lower:expr, $upper:expr, $($field:ident),+ $(,)?) => {
        CaseLayer { $($field: $upper.$field.clone().or_else(|| $lower.$field.clone())),+ }
    };
}

impl CaseLayer {
    /// Fields set on `upper` win over fields set on `self`
    pub fn overlay(&self, upper: &CaseLayer) -> CaseLayer {
        let lower = self;
        overlay_fields!(
            lower,
            upper,
            input_path,
            run_path,
            executable_path,
            script_path,
            interpreter,
            lib_path,
            input_directory,
            input_file,
            input_file_ext,
            baseline_file_ext,
            turbine_directory,
            relative_tolerance,
            absolute_tolerance,
            labels,
        )
    }
}

#[derive(Debug, Default, Deserialize)]
struct DriverSection {
    #[serde(flatten)]
    layer: CaseLayer,
    #[serde(default)]
    cases: Mapping,
}

fn layer_from_value(value: Value, what: &str) -> RegressionResult<CaseLayer> {
    if value.is_null() {
        return Ok(CaseLayer::default());
    }
    serde_yaml::from_value(value)
        .map_err(|e| RegressionError::config(format!("invalid section '{what}': {e}")))
}

fn key_name(key: &Value) -> RegressionResult<String> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(RegressionError::config(format!("unsupported section key {other:?}"))),
    }
}

/// Read and resolve a test configuration file
pub fn load_cases(root: &Path, config_path: &Path) -> RegressionResult<Vec<Case>> {
    let text =
        std::fs::read_to_string(config_path).map_err(|e| RegressionError::io(config_path, e))?;
    parse_cases(root, &text)
}

/// Resolve every case in a YAML document, in document order
///
/// Relative paths are joined onto `root`.
pub fn parse_cases(root: &Path, text: &str) -> RegressionResult<Vec<Case>> {
    let root = std::path::absolute(root).map_err(|e| RegressionError::io(root, e))?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut document: Mapping = match serde_yaml::from_str::<Option<Mapping>>(text)? {
        Some(document) => document,
        None => return Ok(Vec::new()),
    };

    let default = match document.shift_remove(DEFAULT_SECTION) {
        Some(value) => layer_from_value(value, DEFAULT_SECTION)?,
        None => CaseLayer::default(),
    };

    let mut cases = Vec::new();
    for (key, value) in document {
        let driver_name = key_name(&key)?;
        let section: DriverSection = if value.is_null() {
            DriverSection::default()
        } else {
            serde_yaml::from_value(value).map_err(|e| {
                RegressionError::config(format!("invalid driver '{driver_name}': {e}"))
            })?
        };
        let driver_layer = default.overlay(&section.layer);

        for (case_key, case_value) in section.cases {
            let case_name = key_name(&case_key)?;
            let case_layer = layer_from_value(case_value, &case_name)?;
            let merged = driver_layer.overlay(&case_layer);
            let case = resolve_case(&root, &driver_name, &case_name, merged)?;
            debug!(case = %case.name, driver = %case.driver, "resolved case");
            cases.push(case);
        }
    }

    Ok(cases)
}

fn required<T>(value: Option<T>, case: &str, field: &str) -> RegressionResult<T> {
    value.ok_or_else(|| RegressionError::config(format!("case '{case}' missing '{field}'")))
}

/// Turn a fully merged layer into a case with absolute paths
pub fn resolve_case(
    root: &Path,
    driver: &str,
    name: &str,
    merged: CaseLayer,
) -> RegressionResult<Case> {
    let base_input = root.join(required(merged.input_path, name, "input_path")?);
    let base_run = root.join(required(merged.run_path, name, "run_path")?);

    let input_path = base_input.join(merged.input_directory.as_deref().unwrap_or(name));
    let run_path = base_run.join(name);

    let input_file = match (merged.input_file, merged.input_file_ext) {
        (Some(file), _) => file,
        (None, Some(ext)) => format!("{name}{ext}"),
        (None, None) => {
            return Err(RegressionError::config(format!(
                "case '{name}' missing 'input_file' or 'input_file_ext'"
            )));
        }
    };

    let execution = match (merged.executable_path, merged.script_path) {
        (Some(path), None) => ExecutionKind::Executable { path: root.join(path) },
        (None, Some(script)) => ExecutionKind::Script {
            interpreter: merged.interpreter.unwrap_or_else(|| DEFAULT_INTERPRETER.to_string()),
            script: root.join(script),
        },
        (Some(_), Some(_)) => {
            return Err(RegressionError::config(format!(
                "case '{name}' sets both 'executable_path' and 'script_path'"
            )));
        }
        (None, None) => {
            return Err(RegressionError::config(format!("no executable specified for case '{name}'")));
        }
    };

    let tolerance = Tolerance::new(
        required(merged.relative_tolerance, name, "relative_tolerance")?,
        required(merged.absolute_tolerance, name, "absolute_tolerance")?,
    );
    let baseline_file_ext = required(merged.baseline_file_ext, name, "baseline_file_ext")?;

    let mut case = Case::new(
        name.to_string(),
        driver.to_string(),
        input_path,
        run_path,
        input_file,
        execution,
        baseline_file_ext,
        tolerance,
    )
    .with_labels(merged.labels.unwrap_or_default());

    if let Some(turbine) = merged.turbine_directory {
        case = case.with_fixture(base_input.join(&turbine), base_run.join(&turbine));
    }
    if let Some(lib_path) = merged.lib_path {
        case = case.with_lib_path(root.join(lib_path));
    }

    Ok(case)
}
