//! Parameter grids for experiment sweeps.

use itertools::iproduct;

use crate::codec::{ExperimentConfig, Quantum, DRR};

/// A sweep over network and scheduler parameters. Every combination becomes one experiment.
///
/// Quanta are only crossed in for [`DRR`]; other schedulers run each network configuration
/// once.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SweepGrid {
    /// The topology every experiment runs on.
    pub scenario: String,
    /// Stream schedulers.
    pub schedulers: Vec<String>,
    /// Link delays.
    pub delays_ms: Vec<u64>,
    /// Link bandwidths.
    pub bandwidths_mbps: Vec<u64>,
    /// Switch queue lengths in packets.
    pub queue_lengths: Vec<u64>,
    /// DRR quanta.
    pub quanta: Vec<Quantum>,
    /// Stream concurrency levels.
    pub concurrency: Vec<u64>,
}

const MTU: u64 = 1200;

impl Default for SweepGrid {
    fn default() -> Self {
        Self {
            scenario: "simple-p2p".into(),
            schedulers: ["drr", "abs", "wfq", "rr"].map(String::from).to_vec(),
            delays_ms: vec![20],
            bandwidths_mbps: vec![8],
            queue_lengths: vec![5, 20],
            quanta: vec![
                Quantum::new(MTU, 8 * MTU, 128 * MTU),
                Quantum::new(MTU, 8 * MTU, 64 * MTU),
                Quantum::new(MTU, 8 * MTU, 32 * MTU),
            ],
            concurrency: vec![40, 60],
        }
    }
}

impl SweepGrid {
    /// Restricts the sweep to a single scheduler.
    pub fn with_scheduler(mut self, scheduler: impl Into<String>) -> Self {
        self.schedulers = vec![scheduler.into()];
        self
    }

    /// Sets the scenario, resolving short aliases (see [`resolve_scenario`]).
    pub fn with_scenario(mut self, scenario: &str) -> Self {
        self.scenario = resolve_scenario(scenario).to_owned();
        self
    }

    /// Enumerates the experiments of this sweep, scheduler by scheduler. Within a scheduler,
    /// the last parameter varies fastest, in the order delay, bandwidth, queue length, quantum,
    /// concurrency.
    pub fn configs(&self) -> Vec<ExperimentConfig> {
        self.schedulers
            .iter()
            .flat_map(|scheduler| self.configs_for(scheduler))
            .collect()
    }

    fn configs_for(&self, scheduler: &str) -> Vec<ExperimentConfig> {
        let quanta: Vec<Option<Quantum>> = if scheduler == DRR {
            self.quanta.iter().copied().map(Some).collect()
        } else {
            vec![None]
        };
        iproduct!(
            &self.delays_ms,
            &self.bandwidths_mbps,
            &self.queue_lengths,
            &quanta,
            &self.concurrency
        )
        .map(|(&delay, &bw, &qlen, &quantum, &con)| ExperimentConfig {
            scenario: Some(self.scenario.clone()),
            delay_ms: Some(delay),
            bandwidth_mbps: Some(bw),
            queue_pkts: Some(qlen),
            scheduler: Some(scheduler.to_owned()),
            quantum,
            concurrency: Some(con),
        })
        .collect()
    }
}

/// Maps topology shorthands to scenario names: `b` is the simple bottleneck (`simple-p2p`) and
/// `d` the datacenter. Anything else is taken as a scenario name.
pub fn resolve_scenario(alias: &str) -> &str {
    match alias {
        "b" => "simple-p2p",
        "d" => "datacenter",
        other => other,
    }
}
