//! Staging of case directories and shared fixtures.

use crate::case::{Case, SharedFixture};
use crate::error::{RegressionError, RegressionResult};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Recursively copy `src` into `dst`, overwriting files that already exist
///
/// Returns the number of files copied.
pub fn copy_tree(src: &Path, dst: &Path) -> RegressionResult<usize> {
    let mut copied = 0;
    fs::create_dir_all(dst).map_err(|e| RegressionError::io(dst, e))?;

    for entry in WalkDir::new(src).min_depth(1).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| src.to_path_buf());
            RegressionError::io(path, e.into())
        })?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| RegressionError::config(format!("{} escapes {}", entry.path().display(), src.display())))?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| RegressionError::io(&target, e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| RegressionError::io(entry.path(), e))?;
            copied += 1;
        }
    }

    debug!(src = %src.display(), dst = %dst.display(), copied, "copied tree");
    Ok(copied)
}

/// Baseline files (names only) in `input_dir` with extension `ext`, sorted
///
/// Finding none is a configuration error that names the case.
pub fn discover_baselines(case_name: &str, input_dir: &Path, ext: &str) -> RegressionResult<Vec<String>> {
    let entries = fs::read_dir(input_dir).map_err(|e| RegressionError::io(input_dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| RegressionError::io(input_dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if is_file && !ext.is_empty() && name.ends_with(ext) {
            files.push(name);
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(RegressionError::config(format!(
            "no baseline files found for case '{case_name}' ({}*{ext})",
            input_dir.display()
        )));
    }
    Ok(files)
}

/// Delete staged copies of the baselines so a stale copy cannot pass
pub fn remove_stale_baselines(run_dir: &Path, files: &[String]) -> RegressionResult<()> {
    for file in files {
        let path = run_dir.join(file);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(RegressionError::io(&path, e)),
        }
    }
    Ok(())
}

/// Copy the case's input tree into its run directory and drop staged baselines
pub fn stage_case(case: &Case) -> RegressionResult<()> {
    copy_tree(&case.input_path, &case.run_path)?;
    remove_stale_baselines(&case.run_path, &case.baseline_files)
}

/// Shared fixture copies for a run, one per destination path
#[derive(Debug, Default)]
pub struct FixturePlan {
    fixtures: Vec<SharedFixture>,
}

impl FixturePlan {
    /// Collect fixtures in submission order; later cases sharing a destination are skipped
    pub fn from_cases<'a, I: IntoIterator<Item = &'a Case>>(cases: I) -> Self {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let fixtures = cases
            .into_iter()
            .filter_map(|case| case.fixture.as_ref())
            .filter(|fixture| seen.insert(fixture.destination.clone()))
            .cloned()
            .collect();
        Self { fixtures }
    }

    pub fn fixtures(&self) -> &[SharedFixture] {
        &self.fixtures
    }

    /// Perform every planned copy; returns the number of fixtures copied
    pub fn execute(&self) -> RegressionResult<usize> {
        for fixture in &self.fixtures {
            copy_tree(&fixture.source, &fixture.destination)?;
        }
        Ok(self.fixtures.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::ExecutionKind;
    use simreg_compare::Tolerance;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn copy_tree_overwrites_and_recurses() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write(&src.join("a.txt"), "new");
        write(&src.join("nested/b.txt"), "b");
        write(&dst.join("a.txt"), "old");

        assert_eq!(copy_tree(&src, &dst).unwrap(), 2);
        assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "new");
        assert_eq!(fs::read_to_string(dst.join("nested/b.txt")).unwrap(), "b");

        // idempotent
        assert_eq!(copy_tree(&src, &dst).unwrap(), 2);
    }

    #[test]
    fn discovers_baselines_by_extension() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("b.outb"), "");
        write(&tmp.path().join("a.outb"), "");
        write(&tmp.path().join("a.fst"), "");

        let files = discover_baselines("case", tmp.path(), ".outb").unwrap();
        assert_eq!(files, ["a.outb", "b.outb"]);
    }

    #[test]
    fn zero_baselines_is_a_config_error() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("a.fst"), "");
        let err = discover_baselines("lonely", tmp.path(), ".outb").unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("lonely"));
    }

    #[test]
    fn stale_baselines_are_removed() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("a.outb"), "stale");
        remove_stale_baselines(tmp.path(), &["a.outb".into(), "missing.outb".into()]).unwrap();
        assert!(!tmp.path().join("a.outb").exists());
    }

    #[test]
    fn fixture_plan_dedupes_by_destination() {
        let make = |name: &str, dest: &str| {
            Case::new(
                name,
                "openfast",
                "/in",
                "/out",
                "x.fst",
                ExecutionKind::Executable { path: "/bin/true".into() },
                ".outb",
                Tolerance::new(2.0, 2.0),
            )
            .with_fixture("/in/AWT27", dest)
        };
        let cases = vec![make("a", "/out/AWT27"), make("b", "/out/AWT27"), make("c", "/out/5MW")];
        let plan = FixturePlan::from_cases(&cases);
        let dests: Vec<_> = plan.fixtures().iter().map(|f| f.destination.clone()).collect();
        assert_eq!(dests, [PathBuf::from("/out/AWT27"), PathBuf::from("/out/5MW")]);
    }
}
