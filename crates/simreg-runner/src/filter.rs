//! Name and label filters for case selection.

use crate::case::Case;
use crate::error::RegressionResult;
use regex::{Regex, RegexBuilder};

/// Case-insensitive include/exclude filters; unset filters match everything
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    name_include: Option<Regex>,
    label_include: Option<Regex>,
    name_exclude: Option<Regex>,
    label_exclude: Option<Regex>,
}

fn compile(pattern: Option<&str>) -> RegressionResult<Option<Regex>> {
    match pattern.filter(|p| !p.is_empty()) {
        Some(p) => Ok(Some(RegexBuilder::new(p).case_insensitive(true).build()?)),
        None => Ok(None),
    }
}

impl CaseFilter {
    pub fn new(
        name_include: Option<&str>,
        label_include: Option<&str>,
        name_exclude: Option<&str>,
        label_exclude: Option<&str>,
    ) -> RegressionResult<Self> {
        Ok(Self {
            name_include: compile(name_include)?,
            label_include: compile(label_include)?,
            name_exclude: compile(name_exclude)?,
            label_exclude: compile(label_exclude)?,
        })
    }

    fn any_label(re: &Regex, case: &Case) -> bool {
        case.labels.iter().any(|label| re.is_match(label))
    }

    pub fn matches(&self, case: &Case) -> bool {
        if let Some(re) = &self.name_include
            && !re.is_match(&case.name)
        {
            return false;
        }
        if let Some(re) = &self.label_include
            && !Self::any_label(re, case)
        {
            return false;
        }
        if let Some(re) = &self.name_exclude
            && re.is_match(&case.name)
        {
            return false;
        }
        if let Some(re) = &self.label_exclude
            && Self::any_label(re, case)
        {
            return false;
        }
        true
    }

    /// Keep matching cases, preserving their relative order
    pub fn apply(&self, cases: Vec<Case>) -> Vec<Case> {
        cases.into_iter().filter(|case| self.matches(case)).collect()
    }
}
