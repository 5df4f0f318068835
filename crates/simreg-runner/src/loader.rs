//! Output loading.
//!
//! The executor only needs `(data, channel info, header)` from an output
//! file. [`TextOutputLoader`] reads the plain-text tabular format; other
//! encodings plug in through [`OutputLoader`].

use crate::error::{RegressionError, RegressionResult};
use simreg_compare::{ChannelInfo, TimeSeries};
use std::path::Path;

/// Decoded contents of one output file
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedOutput {
    pub data: TimeSeries,
    pub info: ChannelInfo,
    pub header: Option<String>,
}

/// Source of decoded simulation outputs
pub trait OutputLoader: Send + Sync {
    fn load(&self, path: &Path) -> RegressionResult<LoadedOutput>;
}

/// Loader for whitespace-separated text output
///
/// Layout: any number of free-form header lines, one line of channel names,
/// one line of units where every token is parenthesised (`(s)`, `(kN-m)`,
/// `(-)`), then one row of numbers per sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextOutputLoader;

fn is_units_line(tokens: &[&str]) -> bool {
    !tokens.is_empty() && tokens.iter().all(|t| t.starts_with('(') && t.ends_with(')'))
}

impl TextOutputLoader {
    /// Parse text already read into memory; `path` only labels errors
    pub fn parse(&self, path: &Path, text: &str) -> RegressionResult<LoadedOutput> {
        let lines: Vec<&str> = text.lines().collect();

        let names_at = lines
            .windows(2)
            .position(|pair| {
                let names: Vec<&str> = pair[0].split_whitespace().collect();
                let units: Vec<&str> = pair[1].split_whitespace().collect();
                !names.is_empty() && names.len() == units.len() && is_units_line(&units)
            })
            .ok_or_else(|| RegressionError::load(path, "no channel name/unit header found"))?;

        let names: Vec<String> = lines[names_at].split_whitespace().map(str::to_string).collect();
        let units: Vec<String> =
            lines[names_at + 1].split_whitespace().map(str::to_string).collect();
        let channels = names.len();

        let header = lines[..names_at]
            .iter()
            .map(|l| l.trim_end())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        let mut data = Vec::new();
        let mut samples = 0;
        for (offset, line) in lines[names_at + 2..].iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let line_no = names_at + 3 + offset;
            let mut width = 0;
            for token in line.split_whitespace() {
                let value = token.parse::<f64>().map_err(|e| {
                    RegressionError::load(path, format!("line {line_no}: '{token}': {e}"))
                })?;
                data.push(value);
                width += 1;
            }
            if width != channels {
                return Err(RegressionError::load(
                    path,
                    format!("line {line_no}: {width} values for {channels} channels"),
                ));
            }
            samples += 1;
        }

        let data = TimeSeries::new(samples, channels, data)
            .map_err(|e| RegressionError::load(path, e.to_string()))?;

        Ok(LoadedOutput {
            data,
            info: ChannelInfo::new(names, units),
            header: if header.is_empty() { None } else { Some(header) },
        })
    }
}

impl OutputLoader for TextOutputLoader {
    fn load(&self, path: &Path) -> RegressionResult<LoadedOutput> {
        let bytes = std::fs::read(path).map_err(|e| RegressionError::io(path, e))?;
        let text = String::from_utf8(bytes).map_err(|_| {
            RegressionError::load(path, "not a text output; use a loader for this encoding")
        })?;
        self.parse(path, &text)
    }
}
