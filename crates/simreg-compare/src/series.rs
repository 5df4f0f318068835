//! Two-dimensional time-series container.
//!
//! Rows are samples, columns are channels. Storage is a single row-major
//! buffer so a loader can hand over its parse result without reshaping.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building a [`TimeSeries`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeriesError {
    #[error("Shape mismatch: {samples} x {channels} needs {expected} values, got {actual}")]
    ShapeMismatch { samples: usize, channels: usize, expected: usize, actual: usize },

    #[error("Row {row} has {actual} values, expected {expected}")]
    RaggedRow { row: usize, expected: usize, actual: usize },
}

/// Result type for series construction
pub type SeriesResult<T> = Result<T, SeriesError>;

/// Sampled channel data, `samples × channels`, row-major
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeSeries {
    samples: usize,
    channels: usize,
    data: Vec<f64>,
}

impl TimeSeries {
    /// Build a series from a row-major buffer
    pub fn new(samples: usize, channels: usize, data: Vec<f64>) -> SeriesResult<Self> {
        let expected = samples * channels;
        if data.len() != expected {
            return Err(SeriesError::ShapeMismatch {
                samples,
                channels,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { samples, channels, data })
    }

    /// Build a series from rows, all of which must have the same width
    pub fn from_rows(rows: Vec<Vec<f64>>) -> SeriesResult<Self> {
        let channels = rows.first().map_or(0, Vec::len);
        let samples = rows.len();
        let mut data = Vec::with_capacity(samples * channels);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != channels {
                return Err(SeriesError::RaggedRow { row, expected: channels, actual: values.len() });
            }
            data.extend(values);
        }
        Ok(Self { samples, channels, data })
    }

    /// Build a single-channel series
    pub fn from_channel(values: Vec<f64>) -> Self {
        Self { samples: values.len(), channels: 1, data: values }
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Total number of stored values
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Same sample and channel counts
    pub fn same_shape(&self, other: &TimeSeries) -> bool {
        self.samples == other.samples && self.channels == other.channels
    }

    pub fn get(&self, sample: usize, channel: usize) -> Option<f64> {
        if sample < self.samples && channel < self.channels {
            Some(self.data[sample * self.channels + channel])
        } else {
            None
        }
    }

    /// Iterate over one channel's samples in time order
    ///
    /// # Panics
    ///
    /// Panics if `channel` is out of range
    pub fn column(&self, channel: usize) -> impl Iterator<Item = f64> + '_ {
        assert!(
            channel < self.channels,
            "channel {channel} out of range for series with {} channels",
            self.channels
        );
        self.data.iter().skip(channel).step_by(self.channels).copied()
    }

    /// Iterate over every stored value, row-major
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().copied()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// Column metadata reported by an output loader
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub names: Vec<String>,
    pub units: Vec<String>,
}

impl ChannelInfo {
    pub fn new(names: Vec<String>, units: Vec<String>) -> Self {
        Self { names, units }
    }

    /// Channel name, or a positional placeholder when the loader gave none
    pub fn name(&self, channel: usize) -> String {
        self.names.get(channel).cloned().unwrap_or_else(|| format!("channel_{channel}"))
    }
}
