//! The class statistics engine. Turns a table of [`FlowRecord`]s into throughput moments for
//! the whole experiment and for each size class.
//!
//! Moments are the bias-corrected sample estimators (Bessel-corrected standard deviation,
//! adjusted Fisher-Pearson skewness, bias-corrected excess kurtosis). A statistic that is not
//! defined for the sample at hand is `None`.

use std::collections::BTreeMap;

use ndarray::Array1;
use ndarray_stats::SummaryStatisticsExt;

use crate::record::FlowRecord;

/// The class label of the whole-experiment aggregate.
pub const FULL_LABEL: &str = "full";

/// Throughput statistics of one class of one experiment.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClassSummary {
    /// A size class label, or [`FULL_LABEL`].
    pub class_label: String,
    /// Number of completed flows.
    pub count: usize,
    /// Mean throughput.
    pub mean: Option<f64>,
    /// Sample standard deviation. Needs two flows.
    pub std: Option<f64>,
    /// Sample skewness. Needs three flows and nonzero variance.
    pub skewness: Option<f64>,
    /// Sample excess kurtosis. Needs four flows and nonzero variance.
    pub kurtosis: Option<f64>,
}

impl ClassSummary {
    fn empty(class_label: String) -> Self {
        Self {
            class_label,
            count: 0,
            mean: None,
            std: None,
            skewness: None,
            kurtosis: None,
        }
    }

    /// Returns true if no flow of this class completed.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Computes throughput moments over the completed flows in `records`.
///
/// Incomplete flows (`sct_ms <= 0`) are excluded from every statistic, including the count.
pub fn throughput_moments<'a>(
    class_label: impl Into<String>,
    records: impl IntoIterator<Item = &'a FlowRecord>,
) -> ClassSummary {
    let class_label = class_label.into();
    let samples = records
        .into_iter()
        .filter_map(FlowRecord::throughput)
        .collect::<Array1<f64>>();
    match Moments::of(&samples) {
        Some(m) => ClassSummary {
            class_label,
            count: samples.len(),
            mean: Some(m.mean),
            std: m.std,
            skewness: m.skewness,
            kurtosis: m.kurtosis,
        },
        None => ClassSummary::empty(class_label),
    }
}

/// Summarizes an experiment: the [`FULL_LABEL`] aggregate first, then one summary per size
/// class present in `records`, in ascending label order.
pub fn summarize_experiment(records: &[FlowRecord]) -> Vec<ClassSummary> {
    let full = throughput_moments(FULL_LABEL, records);
    let classes = by_class(records)
        .into_iter()
        .map(|(label, members)| throughput_moments(label, members));
    std::iter::once(full).chain(classes).collect()
}

/// Groups records by class label. The map iterates in ascending label order.
pub(crate) fn by_class(records: &[FlowRecord]) -> BTreeMap<&'static str, Vec<&FlowRecord>> {
    let mut classes: BTreeMap<_, Vec<_>> = BTreeMap::new();
    for rec in records {
        classes.entry(rec.size_class.as_str()).or_default().push(rec);
    }
    classes
}

/// Relative precision below which a sample's spread is indistinguishable from rounding.
const VARIANCE_RESOLUTION: f64 = 1e-15;

#[derive(Debug, Clone, Copy)]
struct Moments {
    mean: f64,
    std: Option<f64>,
    skewness: Option<f64>,
    kurtosis: Option<f64>,
}

impl Moments {
    fn of(samples: &Array1<f64>) -> Option<Self> {
        let mean = samples.mean()?;
        let n = samples.len();
        // Population central moments, corrected below.
        let m2 = samples.central_moment(2).ok()?;
        // Variance below the rounding error of the mean is zero.
        if m2 <= (VARIANCE_RESOLUTION * mean).powi(2) {
            return Some(Self {
                mean,
                std: (n >= 2).then_some(0.0),
                skewness: None,
                kurtosis: None,
            });
        }
        let std = (n >= 2).then(|| samples.std(1.0));
        let m3 = samples.central_moment(3).ok()?;
        let m4 = samples.central_moment(4).ok()?;
        let nf = n as f64;
        let skewness = (n >= 3).then(|| {
            let g1 = m3 / m2.powf(1.5);
            g1 * (nf * (nf - 1.0)).sqrt() / (nf - 2.0)
        });
        let kurtosis = (n >= 4).then(|| {
            let g2 = m4 / (m2 * m2) - 3.0;
            (nf - 1.0) / ((nf - 2.0) * (nf - 3.0)) * ((nf + 1.0) * g2 + 6.0)
        });
        Some(Self {
            mean,
            std,
            skewness,
            kurtosis,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::record::SizeClass;
    use crate::testing;

    const EPS: f64 = 1e-9;

    fn assert_close(got: Option<f64>, expected: f64) {
        let got = got.expect("statistic should be defined");
        assert!(
            (got - expected).abs() < EPS * expected.abs().max(1.0),
            "got {got}, expected {expected}"
        );
    }

    // One short flow per throughput value, sct fixed at 1ms.
    fn with_throughputs(values: &[f64]) -> Vec<FlowRecord> {
        values
            .iter()
            .map(|&v| testing::record(SizeClass::Short, v, 1.0))
            .collect()
    }

    #[test]
    fn empty_input() {
        let summary = throughput_moments("long", &Vec::new());
        assert_eq!(summary, ClassSummary::empty("long".into()));
        assert!(summary.is_empty());
    }

    #[test]
    fn only_incomplete_flows() {
        let records = [
            testing::record(SizeClass::Long, 100.0, 0.0),
            testing::record(SizeClass::Long, 100.0, -3.0),
        ];
        let summary = throughput_moments("long", &records);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.mean, None);
        assert_eq!(summary.kurtosis, None);
    }

    #[test]
    fn incomplete_flows_are_excluded() {
        let records = [
            testing::record(SizeClass::Short, 1000.0, 10.0),
            testing::record(SizeClass::Short, 2000.0, -1.0),
        ];
        let summary = throughput_moments(FULL_LABEL, &records);
        assert_eq!(summary.count, 1);
        assert_eq!(summary.mean, Some(100.0));
        assert_eq!(summary.std, None);
        assert_eq!(summary.skewness, None);
        assert_eq!(summary.kurtosis, None);
    }

    #[test]
    fn undefined_moments_by_sample_size() {
        let summary = throughput_moments("short", &with_throughputs(&[1.0, 3.0]));
        assert_close(summary.std, 2f64.sqrt());
        assert_eq!(summary.skewness, None);

        let summary = throughput_moments("short", &with_throughputs(&[1.0, 2.0, 6.0]));
        assert!(summary.skewness.is_some());
        assert_eq!(summary.kurtosis, None);
    }

    #[test]
    fn constant_sample() {
        let summary = throughput_moments("short", &with_throughputs(&[0.1; 8]));
        assert_eq!(summary.count, 8);
        assert_eq!(summary.std, Some(0.0));
        assert_eq!(summary.skewness, None);
        assert_eq!(summary.kurtosis, None);
    }

    #[test]
    fn nearly_constant_sample() {
        let values = [0.1, 0.1, 0.1, 0.1, 0.1 + 1e-16];
        let summary = throughput_moments("short", &with_throughputs(&values));
        assert_eq!(summary.count, 5);
        assert_eq!(summary.std, Some(0.0));
        assert_eq!(summary.skewness, None);
        assert_eq!(summary.kurtosis, None);

        // A spread well above rounding is still measured.
        let summary = throughput_moments("short", &with_throughputs(&[0.1, 0.1, 0.1, 0.2]));
        assert!(summary.skewness.is_some());
        assert!(summary.kurtosis.is_some());
    }

    #[test]
    fn symmetric_sample_has_zero_skew() {
        let values = (1..=31).map(f64::from).collect::<Vec<_>>();
        let summary = throughput_moments("short", &with_throughputs(&values));
        assert_eq!(summary.count, 31);
        assert_close(summary.mean, 16.0);
        assert!(summary.skewness.unwrap().abs() < EPS);
        // Sample variance of 1..=n is n(n+1)/12.
        assert_close(summary.std, (31.0 * 32.0 / 12.0f64).sqrt());
        let manual = {
            let ss = values.iter().map(|v| (v - 16.0).powi(2)).sum::<f64>();
            (ss / 30.0).sqrt()
        };
        assert_close(summary.std, manual);
    }

    #[test]
    fn unbiased_reference_values() {
        // Reference values from scipy.stats.skew / kurtosis with bias=False.
        let summary = throughput_moments("short", &with_throughputs(&[1.0, 2.0, 3.0, 4.0, 10.0]));
        assert_close(summary.mean, 4.0);
        assert_close(summary.std, 3.5355339059327378);
        assert_close(summary.skewness, 1.6970562748477143);
        assert_close(summary.kurtosis, 3.152000000000001);

        let values = [100.0, 120.0, 130.0, 95.0, 400.0, 110.0, 105.0];
        let summary = throughput_moments("short", &with_throughputs(&values));
        assert_close(summary.mean, 151.42857142857142);
        assert_close(summary.std, 110.25403566741846);
        assert_close(summary.skewness, 2.582026807444898);
        assert_close(summary.kurtosis, 6.738681632652395);
    }

    #[test]
    fn throughput_divides_bytes_by_sct() {
        let records = [
            testing::record(SizeClass::Medium, 1000.0, 10.0),
            testing::record(SizeClass::Medium, 3000.0, 10.0),
        ];
        let summary = throughput_moments("medium", &records);
        assert_eq!(summary.mean, Some(200.0));
    }

    #[test]
    fn summaries_are_ordered() {
        let records = [
            testing::record(SizeClass::Short, 1000.0, 10.0),
            testing::record(SizeClass::Long, 8000.0, 20.0),
            testing::record(SizeClass::Short, 500.0, 10.0),
        ];
        let labels = summarize_experiment(&records)
            .into_iter()
            .map(|s| s.class_label)
            .collect::<Vec<_>>();
        assert_eq!(labels, ["full", "long", "short"]);
    }

    #[test]
    fn summaries_of_mixed_log() {
        let records = testing::mixed_log();
        let summaries = summarize_experiment(&records);
        let labels = summaries
            .iter()
            .map(|s| s.class_label.as_str())
            .collect::<Vec<_>>();
        assert_eq!(labels, ["full", "long", "medium", "short"]);
        let full = &summaries[0];
        let per_class = summaries[1..].iter().map(|s| s.count).sum::<usize>();
        assert_eq!(full.count, per_class);
        assert_eq!(full.count, records.iter().filter(|r| r.is_valid()).count());
    }

    #[test]
    fn class_with_only_incomplete_flows_is_reported() {
        let records = [
            testing::record(SizeClass::Short, 1000.0, 10.0),
            testing::record(SizeClass::Long, 8000.0, -1.0),
        ];
        let summaries = summarize_experiment(&records);
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[1].class_label, "long");
        assert!(summaries[1].is_empty());
    }

    #[test]
    fn empty_experiment() {
        let summaries = summarize_experiment(&[]);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].class_label, FULL_LABEL);
        assert!(summaries[0].is_empty());
    }
}
