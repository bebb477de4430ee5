//! Runs scheduler experiment sweeps and summarizes their logs.

#![warn(unreachable_pub, missing_debug_implementations)]

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use compose_frontend::{ComposeExperiment, DataType, Workload, DEFAULT_IMAGE};
use indicatif::ProgressBar;
use log::{info, warn};
use quicsched_core::{codec, ExperimentReport, Metric, SweepGrid};
use rayon::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the identifier of every experiment in a sweep
    Plan(GridArgs),

    /// Run every experiment in a sweep through docker-compose, one at a time
    Run {
        #[command(flatten)]
        grid: GridArgs,

        /// Synthetic stream size sampling (threePoints or logUniform)
        #[arg(short, long, default_value = "threePoints")]
        dtype: DataType,

        /// Directory containing the compose file
        #[arg(long, default_value = ".")]
        compose_dir: PathBuf,

        /// Host directory the server writes its logs to
        #[arg(long, default_value = "logs/server")]
        log_dir: PathBuf,

        /// Client image
        #[arg(long, default_value = DEFAULT_IMAGE)]
        client_image: String,

        /// Server image
        #[arg(long, default_value = DEFAULT_IMAGE)]
        server_image: String,

        /// Continue with the next experiment when one fails
        #[arg(long)]
        keep_going: bool,
    },

    /// Summarize every log in a directory
    Analyze {
        /// Directory of logs named by experiment identifier
        #[arg(short, long, default_value = "logs/server")]
        logs: PathBuf,

        /// Summary table, CSV or JSON by extension
        #[arg(short, long)]
        out: PathBuf,

        /// Also write full reports with trimmed distributions as JSON
        #[arg(long)]
        distributions: Option<PathBuf>,

        /// Per-flow quantity the distributions are drawn from (throughput, sct or e2e)
        #[arg(short, long, default_value = "throughput")]
        metric: Metric,
    },

    /// Decode experiment identifiers or log file names into JSON
    Decode {
        #[arg(required = true)]
        identifiers: Vec<String>,
    },
}

#[derive(Args, Debug)]
struct GridArgs {
    /// Sweep grid in JSON or Dhall (the built-in sweep otherwise)
    #[arg(short, long)]
    grid: Option<PathBuf>,

    /// Topology: `b` (simple bottleneck), `d` (datacenter) or a scenario name
    #[arg(short, long)]
    topo: Option<String>,

    /// Only run this scheduler (drr, abs, wfq, rr)
    #[arg(short, long)]
    sched: Option<String>,
}

impl GridArgs {
    fn sweep(&self) -> anyhow::Result<SweepGrid> {
        let mut grid = match &self.grid {
            Some(path) => quicsched_utils::read_sweep_grid(path)
                .with_context(|| format!("failed to read grid {}", path.display()))?,
            None => SweepGrid::default(),
        };
        if let Some(topo) = &self.topo {
            grid = grid.with_scenario(topo);
        }
        if let Some(sched) = &self.sched {
            grid = grid.with_scheduler(sched.clone());
        }
        Ok(grid)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match cli.command {
        Command::Plan(grid) => {
            for config in grid.sweep()?.configs() {
                println!("{}", codec::encode(&config)?);
            }
        }
        Command::Run {
            grid,
            dtype,
            compose_dir,
            log_dir,
            client_image,
            server_image,
            keep_going,
        } => {
            let workload = Workload {
                data_type: dtype,
                ..Default::default()
            };
            let configs = grid.sweep()?.configs();
            let total = configs.len();
            let mut failed = 0;
            for (i, config) in configs.into_iter().enumerate() {
                info!("Running experiment {} of {total}", i + 1);
                let experiment = ComposeExperiment::builder()
                    .compose_dir(compose_dir.clone())
                    .log_dir(log_dir.clone())
                    .client_image(client_image.clone())
                    .server_image(server_image.clone())
                    .workload(workload.clone())
                    .config(config)
                    .build();
                match experiment.run() {
                    Ok(log) => info!("Wrote {}", log.display()),
                    Err(e) if keep_going => {
                        warn!("{e}");
                        failed += 1;
                    }
                    Err(e) => return Err(e).context("experiment failed"),
                }
            }
            anyhow::ensure!(failed == 0, "{failed} of {total} experiments failed");
        }
        Command::Analyze {
            logs,
            out,
            distributions,
            metric,
        } => analyze(&logs, &out, distributions.as_deref(), metric)?,
        Command::Decode { identifiers } => {
            for id in identifiers {
                println!("{}", serde_json::to_string(&codec::decode(&id))?);
            }
        }
    }
    Ok(())
}

fn analyze(
    logs: &Path,
    out: &Path,
    distributions: Option<&Path>,
    metric: Metric,
) -> anyhow::Result<()> {
    let paths = quicsched_utils::find_logs(logs)
        .with_context(|| format!("failed to list logs in {}", logs.display()))?;
    if paths.is_empty() {
        warn!("No logs found in {}", logs.display());
    }
    info!("Analyzing {} logs", paths.len());
    let bar = ProgressBar::new(paths.len() as u64);
    let reports = paths
        .par_iter()
        .map(|path| {
            let report = quicsched_utils::analyze_log(path, metric)
                .with_context(|| format!("failed to analyze {}", path.display()));
            bar.inc(1);
            report
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    bar.finish_and_clear();

    let rows = reports
        .iter()
        .flat_map(ExperimentReport::rows)
        .collect::<Vec<_>>();
    quicsched_utils::write_summary_rows(out, &rows)
        .with_context(|| format!("failed to write {}", out.display()))?;
    info!("Wrote {} summary rows to {}", rows.len(), out.display());

    if let Some(path) = distributions {
        quicsched_utils::write_reports(path, &reports)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("Wrote distributions to {}", path.display());
    }
    Ok(())
}
