//! The experiment-identity codec. An [`ExperimentConfig`] is encoded into a filesystem-safe
//! identifier such as `sc-datacenter_d20_bw8_ql5_sch-drr_q1200-9600-153600_con40`, and any
//! identifier decodes back into the configuration it came from.
//!
//! Decoding is permissive: logs named by older, less complete naming schemes still decode, just
//! with fewer fields populated.

use std::fmt;
use std::str::FromStr;

/// The scheduler family that uses per-class quanta.
pub const DRR: &str = "drr";

const SEP: &str = "_";

/// The extension of experiment logs. It is the only suffix [`decode`] strips, so values
/// containing `.` still round-trip.
pub const LOG_EXTENSION: &str = ".csv";

/// The parameters identifying one experiment.
#[derive(
    Debug,
    Default,
    Clone,
    PartialEq,
    Eq,
    Hash,
    typed_builder::TypedBuilder,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct ExperimentConfig {
    /// The simulated topology, e.g. `simple-p2p` or `datacenter`.
    #[builder(default, setter(strip_option, into))]
    pub scenario: Option<String>,
    /// One-way link delay.
    #[builder(default, setter(strip_option))]
    pub delay_ms: Option<u64>,
    /// Bottleneck bandwidth.
    #[builder(default, setter(strip_option))]
    pub bandwidth_mbps: Option<u64>,
    /// Switch queue length in packets.
    #[builder(default, setter(strip_option))]
    pub queue_pkts: Option<u64>,
    /// The stream scheduler, e.g. `drr`, `wfq`, `abs` or `rr`.
    #[builder(default, setter(strip_option, into))]
    pub scheduler: Option<String>,
    /// Per-class quanta. Only meaningful with [`DRR`].
    #[builder(default, setter(strip_option))]
    pub quantum: Option<Quantum>,
    /// Number of concurrently open streams.
    #[builder(default, setter(strip_option))]
    pub concurrency: Option<u64>,
}

impl ExperimentConfig {
    /// Returns the identifier of this configuration. See [`encode`].
    pub fn identifier(&self) -> Result<String, CodecError> {
        encode(self)
    }

    /// Returns true if the scheduler is [`DRR`].
    pub fn is_drr(&self) -> bool {
        self.scheduler.as_deref() == Some(DRR)
    }
}

/// Byte allotments for the short, medium and long classes of a DRR scheduler.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    derive_new::new,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Quantum {
    /// Quantum of the short class (`q0`).
    pub short: u64,
    /// Quantum of the medium class (`q1`).
    pub medium: u64,
    /// Quantum of the long class (`q2`).
    pub long: u64,
}

impl fmt::Display for Quantum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.short, self.medium, self.long)
    }
}

impl FromStr for Quantum {
    type Err = ParseQuantumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s.split('-').collect::<Vec<_>>();
        match parts[..] {
            [q0, q1, q2] => Ok(Self::new(q0.parse()?, q1.parse()?, q2.parse()?)),
            _ => Err(ParseQuantumError::WrongNrParts(parts.len())),
        }
    }
}

/// Error parsing a [`Quantum`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseQuantumError {
    /// The quantum does not have exactly three parts.
    #[error("expected 3 quantum parts, got {0}")]
    WrongNrParts(usize),

    /// A part is not an integer.
    #[error("failed to parse quantum part")]
    ParseInt(#[from] std::num::ParseIntError),
}

/// A decoded identifier.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LabeledConfig {
    /// The identifier without its file extension. This is the join key back to the log file.
    pub label: String,
    /// The decoded parameters.
    pub config: ExperimentConfig,
}

/// The error type for [`encode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// A quantum was given for a scheduler that does not use one.
    #[error("quantum {quantum} given for scheduler {scheduler:?}, which does not use quanta")]
    InvalidConfiguration {
        /// The configured scheduler.
        scheduler: Option<String>,
        /// The offending quantum.
        quantum: Quantum,
    },
}

/// Encodes a configuration as `sc-<scenario>_d<delay>_bw<bw>_ql<queue>_sch-<scheduler>`,
/// followed by `_q<q0>-<q1>-<q2>` and `_con<concurrency>` when those are present. Tokens of
/// absent fields are left out.
///
/// Values must not contain `_`; they are not escaped.
pub fn encode(config: &ExperimentConfig) -> Result<String, CodecError> {
    if let Some(quantum) = config.quantum {
        if !config.is_drr() {
            return Err(CodecError::InvalidConfiguration {
                scheduler: config.scheduler.clone(),
                quantum,
            });
        }
    }
    let tokens = [
        config.scenario.as_ref().map(|s| format!("sc-{s}")),
        config.delay_ms.map(|d| format!("d{d}")),
        config.bandwidth_mbps.map(|bw| format!("bw{bw}")),
        config.queue_pkts.map(|ql| format!("ql{ql}")),
        config.scheduler.as_ref().map(|s| format!("sch-{s}")),
        config.quantum.map(|q| format!("q{q}")),
        config.concurrency.map(|con| format!("con{con}")),
    ];
    Ok(tokens
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(SEP))
}

/// Decodes an identifier, optionally carrying [`LOG_EXTENSION`], into its configuration.
///
/// Every token is matched against [`DECODE_RULES`] in order and the first rule that claims it
/// fills its field. Unrecognized tokens and unparseable values are skipped, so this never fails.
pub fn decode(identifier: &str) -> LabeledConfig {
    let label = strip_extension(identifier);
    let mut config = ExperimentConfig::default();
    for token in label.split(SEP) {
        if let Some(rule) = DECODE_RULES.iter().find(|rule| (rule.matches)(token)) {
            (rule.extract)(token, &mut config);
        }
    }
    LabeledConfig {
        label: label.to_owned(),
        config,
    }
}

fn strip_extension(identifier: &str) -> &str {
    identifier
        .strip_suffix(LOG_EXTENSION)
        .unwrap_or(identifier)
}

/// A decoding rule. `matches` decides whether the rule claims a token, `extract` fills the
/// configuration from a claimed token.
#[derive(Debug, Clone, Copy)]
pub struct DecodeRule {
    /// The field this rule fills.
    pub field: &'static str,
    /// Whether the rule claims a token.
    pub matches: fn(&str) -> bool,
    /// Fills the configuration from a claimed token.
    pub extract: fn(&str, &mut ExperimentConfig),
}

/// Decoding rules in priority order. The first rule matching a token wins.
pub const DECODE_RULES: &[DecodeRule] = &[
    DecodeRule {
        field: "scenario",
        matches: is_scenario,
        extract: extract_scenario,
    },
    DecodeRule {
        field: "delay_ms",
        matches: is_delay,
        extract: extract_delay,
    },
    DecodeRule {
        field: "bandwidth_mbps",
        matches: is_bandwidth,
        extract: extract_bandwidth,
    },
    DecodeRule {
        field: "queue_pkts",
        matches: is_queue,
        extract: extract_queue,
    },
    DecodeRule {
        field: "scheduler",
        matches: is_scheduler,
        extract: extract_scheduler,
    },
    DecodeRule {
        field: "quantum",
        matches: is_quantum,
        extract: extract_quantum,
    },
    DecodeRule {
        field: "concurrency",
        matches: is_concurrency,
        extract: extract_concurrency,
    },
];

fn is_scenario(token: &str) -> bool {
    token.starts_with("sc-")
}

fn extract_scenario(token: &str, config: &mut ExperimentConfig) {
    config.scenario = token.strip_prefix("sc-").map(str::to_owned);
}

// `d` alone is not enough: the remainder must be all digits.
fn is_delay(token: &str) -> bool {
    token
        .strip_prefix('d')
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

fn extract_delay(token: &str, config: &mut ExperimentConfig) {
    set_parsed(&mut config.delay_ms, token.strip_prefix('d'));
}

fn is_bandwidth(token: &str) -> bool {
    token.starts_with("bw")
}

fn extract_bandwidth(token: &str, config: &mut ExperimentConfig) {
    set_parsed(&mut config.bandwidth_mbps, token.strip_prefix("bw"));
}

fn is_queue(token: &str) -> bool {
    token.starts_with("ql")
}

fn extract_queue(token: &str, config: &mut ExperimentConfig) {
    set_parsed(&mut config.queue_pkts, token.strip_prefix("ql"));
}

fn is_scheduler(token: &str) -> bool {
    token.starts_with("sch-")
}

fn extract_scheduler(token: &str, config: &mut ExperimentConfig) {
    config.scheduler = token.strip_prefix("sch-").map(str::to_owned);
}

fn is_quantum(token: &str) -> bool {
    token.starts_with('q')
}

// Anything but exactly three integer parts is ignored.
fn extract_quantum(token: &str, config: &mut ExperimentConfig) {
    set_parsed(&mut config.quantum, token.strip_prefix('q'));
}

fn is_concurrency(token: &str) -> bool {
    token.starts_with("con")
}

fn extract_concurrency(token: &str, config: &mut ExperimentConfig) {
    set_parsed(&mut config.concurrency, token.strip_prefix("con"));
}

fn set_parsed<T: FromStr>(slot: &mut Option<T>, value: Option<&str>) {
    if let Some(parsed) = value.and_then(|v| v.parse().ok()) {
        *slot = Some(parsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing;

    #[test]
    fn encode_full_config() -> anyhow::Result<()> {
        let id = encode(&testing::drr_config())?;
        assert_eq!(
            id,
            "sc-datacenter_d20_bw8_ql5_sch-drr_q1200-9600-153600_con40"
        );
        Ok(())
    }

    #[test]
    fn encode_omits_absent_tokens() -> anyhow::Result<()> {
        let config = ExperimentConfig::builder()
            .scenario("simple-p2p")
            .delay_ms(20)
            .bandwidth_mbps(8)
            .queue_pkts(20)
            .scheduler("wfq")
            .build();
        assert_eq!(encode(&config)?, "sc-simple-p2p_d20_bw8_ql20_sch-wfq");
        Ok(())
    }

    #[test]
    fn encode_rejects_quantum_without_drr() {
        let config = ExperimentConfig::builder()
            .scheduler("wfq")
            .quantum(Quantum::new(1, 2, 3))
            .build();
        assert!(matches!(
            encode(&config),
            Err(CodecError::InvalidConfiguration { .. })
        ));
        let config = ExperimentConfig::builder()
            .quantum(Quantum::new(1, 2, 3))
            .build();
        assert!(encode(&config).is_err());
    }

    #[test]
    fn round_trip() -> anyhow::Result<()> {
        for config in [testing::drr_config(), testing::wfq_config()] {
            let decoded = decode(&encode(&config)?);
            assert_eq!(decoded.config, config);
        }
        Ok(())
    }

    #[test]
    fn round_trip_partial_config() -> anyhow::Result<()> {
        let config = ExperimentConfig::builder()
            .delay_ms(0)
            .scheduler("drr")
            .quantum(Quantum::new(3600, 2400, 1200))
            .build();
        assert_eq!(decode(&encode(&config)?).config, config);
        Ok(())
    }

    #[test]
    fn decode_strips_extension() {
        let decoded = decode("sc-datacenter_d20_bw8_ql5_sch-rr_con60.csv");
        assert_eq!(decoded.label, "sc-datacenter_d20_bw8_ql5_sch-rr_con60");
        assert_eq!(decoded.config.concurrency, Some(60));
        assert_eq!(decoded.config.scheduler.as_deref(), Some("rr"));
    }

    #[test]
    fn dotted_values_round_trip() -> anyhow::Result<()> {
        let config = ExperimentConfig::builder().scenario("fat.tree").build();
        assert_eq!(decode(&encode(&config)?).config, config);

        let config = ExperimentConfig::builder()
            .delay_ms(20)
            .scheduler("drr2.1")
            .build();
        let decoded = decode(&encode(&config)?);
        assert_eq!(decoded.config, config);
        assert_eq!(decoded.label, "d20_sch-drr2.1");

        let decoded = decode("sc-fat.tree_con40.csv");
        assert_eq!(decoded.label, "sc-fat.tree_con40");
        assert_eq!(decoded.config.scenario.as_deref(), Some("fat.tree"));
        Ok(())
    }

    #[test]
    fn decode_is_order_invariant() {
        let a = decode("sc-datacenter_d20_bw8_ql5_sch-drr_q1200-9600-153600_con40");
        let b = decode("con40_q1200-9600-153600_sch-drr_ql5_bw8_d20_sc-datacenter");
        assert_eq!(a.config, b.config);
        assert_eq!(a.config, testing::drr_config());
    }

    #[test]
    fn decode_ignores_malformed_quantum() {
        let decoded = decode("sch-drr_q100-200");
        assert_eq!(decoded.config.scheduler.as_deref(), Some("drr"));
        assert_eq!(decoded.config.quantum, None);

        let decoded = decode("sch-drr_q1-2-3-4");
        assert_eq!(decoded.config.quantum, None);
    }

    #[test]
    fn decode_delay_requires_digits() {
        // `drr` starts with `d` but is not a delay; it is also no other known token.
        let decoded = decode("drr_d15");
        assert_eq!(decoded.config.delay_ms, Some(15));
        let decoded = decode("dx20");
        assert_eq!(decoded.config, ExperimentConfig::default());
    }

    #[test]
    fn decode_unknown_tokens() {
        let decoded = decode("scts_drr");
        assert_eq!(decoded.label, "scts_drr");
        assert_eq!(decoded.config, ExperimentConfig::default());
        assert_eq!(decode("").config, ExperimentConfig::default());
    }

    #[test]
    fn decode_bad_integer_leaves_field_empty() {
        let decoded = decode("bwfast_ql20");
        assert_eq!(decoded.config.bandwidth_mbps, None);
        assert_eq!(decoded.config.queue_pkts, Some(20));
    }

    #[test]
    fn rule_order() {
        let fields = DECODE_RULES.iter().map(|r| r.field).collect::<Vec<_>>();
        assert_eq!(
            fields,
            [
                "scenario",
                "delay_ms",
                "bandwidth_mbps",
                "queue_pkts",
                "scheduler",
                "quantum",
                "concurrency"
            ]
        );
        // `ql` outranks `q`.
        let rule = DECODE_RULES.iter().find(|r| (r.matches)("ql5")).unwrap();
        assert_eq!(rule.field, "queue_pkts");
    }

    #[test]
    fn quantum_parses() {
        assert_eq!("1-2-3".parse::<Quantum>(), Ok(Quantum::new(1, 2, 3)));
        assert_eq!(
            "1-2".parse::<Quantum>(),
            Err(ParseQuantumError::WrongNrParts(2))
        );
        assert!("1-x-3".parse::<Quantum>().is_err());
    }
}
