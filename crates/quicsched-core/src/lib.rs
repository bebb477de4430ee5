#![warn(unreachable_pub, missing_debug_implementations)]

//! The core `quicsched` library: the [experiment-identity codec](codec) that names logs after
//! their parameters, and the [class statistics engine](stats) that summarizes a log per flow
//! size class.
//!
//! Nothing in this crate performs I/O. Loading logs and running experiments live in
//! `quicsched-utils` and `compose-frontend`.

pub mod codec;
pub mod grid;
pub mod record;
pub mod report;
pub mod stats;
pub mod trim;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use codec::{decode, encode, CodecError, ExperimentConfig, LabeledConfig, Quantum};
pub use grid::SweepGrid;
pub use record::{FlowRecord, Metric, SizeClass};
pub use report::{ExperimentReport, SummaryRow};
pub use stats::{summarize_experiment, throughput_moments, ClassSummary};
pub use trim::{class_distributions, trim_outliers, ClassDistribution, Density};
