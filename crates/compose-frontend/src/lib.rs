//! An interface to the docker-compose experiment setup.
//!
//! This crate is tightly coupled to the environment variables read by the compose file and to
//! the flags of the simulated client and server.

#![warn(unreachable_pub, missing_debug_implementations, missing_docs)]

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use std::str::FromStr;

use derivative::Derivative;
use log::{debug, info};
use quicsched_core::codec::{self, CodecError, ExperimentConfig, Quantum, DRR};

/// The image used for both client and server unless told otherwise.
pub const DEFAULT_IMAGE: &str = "quic-go-datacenter";

/// Address of the server as seen from the client container.
const SERVER_ADDR: &str = "server4:4242";

/// Where the server container's log directory is mounted.
const CONTAINER_LOG_DIR: &str = "/logs";

/// One experiment run through docker-compose.
#[derive(Debug, typed_builder::TypedBuilder)]
pub struct ComposeExperiment {
    /// The directory containing the compose file.
    #[builder(setter(into))]
    pub compose_dir: PathBuf,
    /// The host directory mounted as the server's log directory.
    #[builder(setter(into))]
    pub log_dir: PathBuf,
    /// The client image.
    #[builder(default = DEFAULT_IMAGE.into(), setter(into))]
    pub client_image: String,
    /// The server image.
    #[builder(default = DEFAULT_IMAGE.into(), setter(into))]
    pub server_image: String,
    /// The client workload.
    #[builder(default)]
    pub workload: Workload,
    /// The experiment parameters.
    pub config: ExperimentConfig,
}

impl ComposeExperiment {
    /// Translates the experiment into the compose environment.
    ///
    /// This fails if the configuration cannot be encoded, if a required parameter is missing,
    /// or if a DRR experiment has no quantum.
    pub fn plan(&self) -> Result<ComposePlan, Error> {
        let name = codec::encode(&self.config)?;
        let params = Params::new(&self.config)?;
        let log_file = format!("{name}{}", codec::LOG_EXTENSION);
        let env = [
            ("CLIENT", self.client_image.clone()),
            ("SERVER", self.server_image.clone()),
            ("SCENARIO", translate_scenario(&params)),
            (
                "SERVER_PARAMS",
                translate_server_params(&params, &self.workload, &log_file),
            ),
            (
                "CLIENT_PARAMS",
                translate_client_params(&params, &self.workload),
            ),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect();
        Ok(ComposePlan {
            name,
            log_file,
            env,
        })
    }

    /// Run the experiment, returning the path of the log on the host.
    ///
    /// A stale log of the same experiment is removed first, and leftovers of earlier runs are
    /// torn down before the containers are started.
    pub fn run(&self) -> Result<PathBuf, Error> {
        let plan = self.plan()?;
        fs::create_dir_all(&self.log_dir)?;
        let log_path = self.log_dir.join(&plan.log_file);
        if log_path.exists() {
            debug!("removing stale log {}", log_path.display());
            fs::remove_file(&log_path)?;
        }

        info!("running experiment {}", plan.name);
        self.invoke_compose(&plan, &["down", "-v"])?;
        let status = self.invoke_compose(&plan, &["up", "--abort-on-container-exit"])?;
        if !status.success() {
            return Err(Error::ComposeFailed {
                name: plan.name,
                status,
            });
        }
        Ok(log_path)
    }

    fn invoke_compose(&self, plan: &ComposePlan, args: &[&str]) -> io::Result<ExitStatus> {
        debug!("docker-compose {}", args.join(" "));
        Command::new("docker-compose")
            .args(args)
            .current_dir(&self.compose_dir)
            .envs(&plan.env)
            .status()
    }
}

/// The compose invocation of one experiment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposePlan {
    /// The experiment identifier.
    pub name: String,
    /// The log file name, relative to the log directory.
    pub log_file: String,
    /// Environment variables read by the compose file.
    pub env: BTreeMap<String, String>,
}

/// The client workload.
#[derive(Debug, Clone, PartialEq, Derivative, serde::Serialize, serde::Deserialize)]
#[derivative(Default)]
pub struct Workload {
    /// Number of streams.
    #[derivative(Default(value = "300"))]
    pub nr_flows: usize,
    /// Fraction of short streams.
    #[derivative(Default(value = "0.9"))]
    pub short_frac: f64,
    /// Size of a short stream in bytes.
    #[derivative(Default(value = "100 * 1024"))]
    pub short_size: u64,
    /// Size of a long stream in bytes.
    #[derivative(Default(value = "1024 * 1024"))]
    pub long_size: u64,
    /// How stream sizes are sampled.
    pub data_type: DataType,
}

/// The synthetic size sampling method of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Derivative, serde::Serialize, serde::Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    /// Three fixed sizes.
    #[derivative(Default)]
    ThreePoints,
    /// Log-uniformly distributed sizes.
    LogUniform,
}

impl DataType {
    fn as_str(&self) -> &'static str {
        match self {
            DataType::ThreePoints => "threePoints",
            DataType::LogUniform => "logUniform",
        }
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "threePoints" => Ok(DataType::ThreePoints),
            "logUniform" => Ok(DataType::LogUniform),
            _ => Err(Error::UnknownDataType(s.to_owned())),
        }
    }
}

// The parameters every experiment needs, taken out of their `Option`s.
#[derive(Debug)]
struct Params<'a> {
    scenario: &'a str,
    delay_ms: u64,
    bandwidth_mbps: u64,
    queue_pkts: u64,
    scheduler: &'a str,
    quantum: Option<Quantum>,
    concurrency: u64,
}

impl<'a> Params<'a> {
    fn new(config: &'a ExperimentConfig) -> Result<Self, Error> {
        let params = Params {
            scenario: required(config.scenario.as_deref(), "scenario")?,
            delay_ms: required(config.delay_ms, "delay_ms")?,
            bandwidth_mbps: required(config.bandwidth_mbps, "bandwidth_mbps")?,
            queue_pkts: required(config.queue_pkts, "queue_pkts")?,
            scheduler: required(config.scheduler.as_deref(), "scheduler")?,
            quantum: config.quantum,
            concurrency: required(config.concurrency, "concurrency")?,
        };
        if params.scheduler == DRR && params.quantum.is_none() {
            return Err(Error::MissingQuantum);
        }
        Ok(params)
    }
}

fn required<T>(value: Option<T>, name: &'static str) -> Result<T, Error> {
    value.ok_or(Error::MissingParameter(name))
}

fn translate_scenario(p: &Params<'_>) -> String {
    format!(
        "{} --delay={}ms --bandwidth={}Mbps --queue={}",
        p.scenario, p.delay_ms, p.bandwidth_mbps, p.queue_pkts
    )
}

fn translate_server_params(p: &Params<'_>, w: &Workload, log_file: &str) -> String {
    format!(
        "-scheduler {} -shortSize {} -longSize {} -logfile {CONTAINER_LOG_DIR}/{log_file}",
        p.scheduler, w.short_size, w.long_size
    )
}

fn translate_client_params(p: &Params<'_>, w: &Workload) -> String {
    let mut s = format!(
        "-ip {SERVER_ADDR} -nflows {} -shortFrac {} -shortSize {} -longSize {} \
         -scheduler {} -concurrency {} -dataType {}",
        w.nr_flows,
        w.short_frac,
        w.short_size,
        w.long_size,
        p.scheduler,
        p.concurrency,
        w.data_type.as_str()
    );
    if let Some(q) = p.quantum {
        s.push_str(&format!(
            " -quantum0 {} -quantum1 {} -quantum2 {}",
            q.short, q.medium, q.long
        ));
    }
    s
}

/// The error type for [ComposeExperiment::plan] and [ComposeExperiment::run].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration cannot be encoded.
    #[error("invalid experiment configuration")]
    Codec(#[from] CodecError),

    /// A parameter needed to run the experiment is missing.
    #[error("missing experiment parameter `{0}`")]
    MissingParameter(&'static str),

    /// A DRR experiment has no quantum.
    #[error("quantum is not defined when scheduler is DRR")]
    MissingQuantum,

    /// Unknown client data type.
    #[error("unknown data type `{0}` (expected threePoints or logUniform)")]
    UnknownDataType(String),

    /// docker-compose exited unsuccessfully.
    #[error("experiment {name} failed: docker-compose {status}")]
    ComposeFailed {
        /// The experiment identifier.
        name: String,
        /// The exit status of `docker-compose up`.
        status: ExitStatus,
    },

    /// IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
