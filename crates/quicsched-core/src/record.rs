//! Per-flow log records.

use std::fmt;
use std::str::FromStr;

/// The coarse size bucket a flow was generated in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    /// Short flows.
    Short,
    /// Medium flows.
    Medium,
    /// Long flows.
    Long,
}

impl SizeClass {
    /// The label used in logs and summaries.
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeClass::Short => "short",
            SizeClass::Medium => "medium",
            SizeClass::Long => "long",
        }
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a raw log.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FlowRecord {
    /// The flow's size class.
    #[serde(rename = "class")]
    pub size_class: SizeClass,
    /// Bytes transferred.
    pub bytes: f64,
    /// Stream completion time. Non-positive values mark incomplete flows.
    pub sct_ms: f64,
    /// Start offset of the flow.
    pub time_ms: f64,
    /// End-to-end time, if the log has it.
    #[serde(default)]
    pub e2e_ms: Option<f64>,
}

impl FlowRecord {
    /// Creates a record without an end-to-end time.
    pub fn new(size_class: SizeClass, bytes: f64, sct_ms: f64, time_ms: f64) -> Self {
        Self {
            size_class,
            bytes,
            sct_ms,
            time_ms,
            e2e_ms: None,
        }
    }

    /// Returns true if the flow completed.
    pub fn is_valid(&self) -> bool {
        self.sct_ms > 0.0
    }

    /// Bytes per millisecond, or `None` for incomplete flows.
    pub fn throughput(&self) -> Option<f64> {
        self.is_valid().then(|| self.bytes / self.sct_ms)
    }
}

/// A per-flow quantity that distributions can be built over. Incomplete flows never contribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// [`FlowRecord::throughput`].
    Throughput,
    /// The stream completion time.
    Sct,
    /// The end-to-end time. Flows without one are skipped.
    E2e,
}

impl Metric {
    /// The metric's name on the command line and in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Throughput => "throughput",
            Metric::Sct => "sct",
            Metric::E2e => "e2e",
        }
    }

    /// Extracts this metric from a record.
    pub fn sample(&self, record: &FlowRecord) -> Option<f64> {
        if !record.is_valid() {
            return None;
        }
        match self {
            Metric::Throughput => record.throughput(),
            Metric::Sct => Some(record.sct_ms),
            Metric::E2e => record.e2e_ms,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = ParseMetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Metric::Throughput, Metric::Sct, Metric::E2e]
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ParseMetricError(s.to_owned()))
    }
}

/// Error parsing a [`Metric`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric `{0}` (expected throughput, sct or e2e)")]
pub struct ParseMetricError(String);
