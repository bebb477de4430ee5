//! Per-experiment reports: a decoded identifier joined with the statistics of its log.

use crate::codec::{self, ExperimentConfig};
use crate::record::{FlowRecord, Metric};
use crate::stats::{self, ClassSummary};
use crate::trim::{self, ClassDistribution};

/// Everything computed for one experiment log.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExperimentReport {
    /// The identifier the log was named with.
    pub label: String,
    /// The decoded experiment parameters.
    pub config: ExperimentConfig,
    /// Throughput moments, [`stats::FULL_LABEL`] first, then classes by label.
    pub summaries: Vec<ClassSummary>,
    /// Trimmed distributions of the chosen metric in the same order as `summaries`.
    pub distributions: Vec<ClassDistribution>,
}

impl ExperimentReport {
    /// Builds the report for the log named `identifier` (with or without extension). Summaries
    /// are always of throughput; `metric` selects what the distributions are drawn from.
    pub fn new(identifier: &str, records: &[FlowRecord], metric: Metric) -> Self {
        let codec::LabeledConfig { label, config } = codec::decode(identifier);
        Self {
            label,
            config,
            summaries: stats::summarize_experiment(records),
            distributions: trim::class_distributions(records, metric),
        }
    }

    /// Flattens the summaries into table rows.
    pub fn rows(&self) -> Vec<SummaryRow> {
        let c = &self.config;
        self.summaries
            .iter()
            .map(|s| SummaryRow {
                label: self.label.clone(),
                scenario: c.scenario.clone(),
                delay_ms: c.delay_ms,
                bandwidth_mbps: c.bandwidth_mbps,
                queue_pkts: c.queue_pkts,
                scheduler: c.scheduler.clone(),
                quantum: c.quantum.map(|q| q.to_string()),
                concurrency: c.concurrency,
                class: s.class_label.clone(),
                count: s.count,
                mean: s.mean,
                std: s.std,
                skewness: s.skewness,
                kurtosis: s.kurtosis,
            })
            .collect()
    }
}

/// One summary tagged with its experiment's parameters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SummaryRow {
    pub label: String,
    pub scenario: Option<String>,
    pub delay_ms: Option<u64>,
    pub bandwidth_mbps: Option<u64>,
    pub queue_pkts: Option<u64>,
    pub scheduler: Option<String>,
    /// The quantum as `q0-q1-q2`.
    pub quantum: Option<String>,
    pub concurrency: Option<u64>,
    pub class: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub skewness: Option<f64>,
    pub kurtosis: Option<f64>,
}
