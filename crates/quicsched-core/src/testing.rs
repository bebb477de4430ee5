//! Fixtures shared by tests across the workspace.

use crate::codec::{ExperimentConfig, Quantum};
use crate::record::{FlowRecord, SizeClass};

/// A completed or incomplete flow starting at time zero.
pub fn record(size_class: SizeClass, bytes: f64, sct_ms: f64) -> FlowRecord {
    FlowRecord::new(size_class, bytes, sct_ms, 0.0)
}

/// A fully populated DRR experiment.
pub fn drr_config() -> ExperimentConfig {
    ExperimentConfig::builder()
        .scenario("datacenter")
        .delay_ms(20)
        .bandwidth_mbps(8)
        .queue_pkts(5)
        .scheduler("drr")
        .quantum(Quantum::new(1200, 9600, 153_600))
        .concurrency(40)
        .build()
}

/// A fully populated WFQ experiment.
pub fn wfq_config() -> ExperimentConfig {
    ExperimentConfig::builder()
        .scenario("simple-p2p")
        .delay_ms(20)
        .bandwidth_mbps(8)
        .queue_pkts(20)
        .scheduler("wfq")
        .concurrency(60)
        .build()
}

/// A small log with all three classes, one incomplete flow per class and one heavy straggler.
pub fn mixed_log() -> Vec<FlowRecord> {
    const KB: f64 = 1024.0;
    let mut records = Vec::new();
    for (i, sct) in [12.0, 14.0, 11.5, 13.0, 15.5, 12.5, -1.0].into_iter().enumerate() {
        let mut rec = record(SizeClass::Short, 100.0 * KB, sct);
        rec.time_ms = i as f64 * 3.0;
        records.push(rec);
    }
    for sct in [40.0, 44.0, 0.0, 39.0] {
        records.push(record(SizeClass::Medium, 300.0 * KB, sct));
    }
    for sct in [120.0, 118.0, 410.0, 125.0, -1.0] {
        records.push(record(SizeClass::Long, 1024.0 * KB, sct));
    }
    records
}
