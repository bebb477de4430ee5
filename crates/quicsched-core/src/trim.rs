//! Outlier trimming and per-class distributions for visualization.
//!
//! Everything here is for display. The moments reported by [`crate::stats`] are always computed
//! over the untrimmed population.

use ndarray::Array1;
use ndarray_stats::{interpolate::Linear, Quantile1dExt};
use noisy_float::types::{n64, N64};

use crate::record::{FlowRecord, Metric};
use crate::stats::{self, FULL_LABEL};

/// Multiple of the interquartile range beyond the quartiles at which values are outliers.
pub const IQR_FENCE: f64 = 1.5;

/// The fewest points a density estimate is drawn from.
pub const MIN_DENSITY_POINTS: usize = 2;

/// Returns the first and third quartiles of `samples`, interpolating linearly between ranks.
/// NaNs are ignored. Returns `None` if nothing is left.
pub fn quartiles(samples: &[f64]) -> Option<(f64, f64)> {
    let [q1, q3] = quantiles(samples, [0.25, 0.75])?;
    Some((q1, q3))
}

/// Keeps the values of `samples` within [`IQR_FENCE`] interquartile ranges of the quartiles,
/// bounds included, in their original order.
pub fn trim_outliers(samples: &[f64]) -> Vec<f64> {
    let Some((q1, q3)) = quartiles(samples) else {
        return Vec::new();
    };
    let iqr = q3 - q1;
    let fence = (q1 - IQR_FENCE * iqr)..=(q3 + IQR_FENCE * iqr);
    samples
        .iter()
        .copied()
        .filter(|x| fence.contains(x))
        .collect()
}

/// Tail percentiles of an untrimmed sample.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Percentiles {
    /// The median.
    pub p50: f64,
    /// The 95th percentile.
    pub p95: f64,
    /// The 99th percentile.
    pub p99: f64,
}

impl Percentiles {
    /// Computes percentiles with linear interpolation. Returns `None` for an empty sample.
    pub fn of(samples: &[f64]) -> Option<Self> {
        let [p50, p95, p99] = quantiles(samples, [0.50, 0.95, 0.99])?;
        Some(Self { p50, p95, p99 })
    }
}

fn quantiles<const N: usize>(samples: &[f64], qs: [f64; N]) -> Option<[f64; N]> {
    let mut data = samples
        .iter()
        .filter(|x| !x.is_nan())
        .map(|&x| n64(x))
        .collect::<Array1<N64>>();
    let mut out = [0.0; N];
    for (slot, q) in out.iter_mut().zip(qs) {
        *slot = data.quantile_mut(n64(q), &Linear).ok()?.raw();
    }
    Some(out)
}

/// A trimmed sample, ready for density estimation, or the reason it is not.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase", tag = "status")]
pub enum Density {
    /// The trimmed sample.
    Ready {
        /// Trimmed values in log order.
        samples: Vec<f64>,
    },
    /// Too few points survived trimming to estimate a density.
    Insufficient {
        /// How many points survived.
        retained: usize,
    },
}

impl Density {
    /// Trims `samples` and checks that enough points are left.
    pub fn from_samples(samples: &[f64]) -> Self {
        let trimmed = trim_outliers(samples);
        if trimmed.len() < MIN_DENSITY_POINTS {
            Density::Insufficient {
                retained: trimmed.len(),
            }
        } else {
            Density::Ready { samples: trimmed }
        }
    }

    /// The trimmed sample, if there is enough data.
    pub fn samples(&self) -> Option<&[f64]> {
        match self {
            Density::Ready { samples } => Some(samples),
            Density::Insufficient { .. } => None,
        }
    }
}

/// The display distribution of one metric over one class of one experiment.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClassDistribution {
    /// A size class label, or [`FULL_LABEL`].
    pub class_label: String,
    /// The metric the samples are drawn from.
    pub metric: Metric,
    /// Number of samples before trimming.
    pub total: usize,
    /// The trimmed sample.
    pub density: Density,
    /// Percentiles of the untrimmed sample.
    pub percentiles: Option<Percentiles>,
}

impl ClassDistribution {
    /// Builds the distribution of `metric` over `records`.
    pub fn new<'a>(
        class_label: impl Into<String>,
        metric: Metric,
        records: impl IntoIterator<Item = &'a FlowRecord>,
    ) -> Self {
        let samples = records
            .into_iter()
            .filter_map(|rec| metric.sample(rec))
            .collect::<Vec<_>>();
        Self {
            class_label: class_label.into(),
            metric,
            total: samples.len(),
            density: Density::from_samples(&samples),
            percentiles: Percentiles::of(&samples),
        }
    }
}

/// Builds distributions of `metric` in the same order as [`stats::summarize_experiment`]: the
/// [`FULL_LABEL`] aggregate first, then each class present in `records` by ascending label.
pub fn class_distributions(records: &[FlowRecord], metric: Metric) -> Vec<ClassDistribution> {
    let full = ClassDistribution::new(FULL_LABEL, metric, records);
    let classes = stats::by_class(records)
        .into_iter()
        .map(|(label, members)| ClassDistribution::new(label, metric, members));
    std::iter::once(full).chain(classes).collect()
}
