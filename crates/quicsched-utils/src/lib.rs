//! Utilities for reading experiment logs and sweep grids, and for writing summaries.

#![warn(unreachable_pub, missing_debug_implementations, missing_docs)]

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use quicsched_core::{ExperimentReport, FlowRecord, Metric, SummaryRow, SweepGrid};

/// Columns every log must have. `e2e_ms` is optional.
pub const REQUIRED_COLUMNS: [&str; 4] = ["class", "bytes", "sct_ms", "time_ms"];

/// Reads the [`FlowRecord`]s of a CSV log.
///
/// The file is read completely and closed before this returns.
pub fn read_flow_log(path: impl AsRef<Path>) -> Result<Vec<FlowRecord>, Error> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|e| unavailable(e, path))?;
    read_flow_records(BufReader::new(f), path)
}

/// Reads [`FlowRecord`]s from CSV data. `source` names the data in errors.
pub fn read_flow_records(reader: impl io::Read, source: &Path) -> Result<Vec<FlowRecord>, Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    if let Some(&column) = REQUIRED_COLUMNS
        .iter()
        .find(|&&column| !headers.iter().any(|h| h == column))
    {
        return Err(Error::MissingColumn {
            column,
            path: source.into(),
        });
    }
    let records = rdr
        .deserialize()
        .collect::<Result<Vec<FlowRecord>, _>>()?;
    Ok(records)
}

/// Reads a log and builds its report, with distributions of `metric`. The log's file name is
/// decoded into the experiment parameters.
pub fn analyze_log(path: impl AsRef<Path>, metric: Metric) -> Result<ExperimentReport, Error> {
    let path = path.as_ref();
    let records = read_flow_log(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(ExperimentReport::new(&name, &records, metric))
}

/// Lists the `.csv` files directly inside `dir`, sorted by path.
pub fn find_logs(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, Error> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|e| unavailable(e, dir))?;
    let mut logs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
            logs.push(path);
        }
    }
    logs.sort();
    Ok(logs)
}

/// Reads a [`SweepGrid`] from a file in JSON or Dhall format. Fields left out take their
/// default values in JSON.
pub fn read_sweep_grid(path: impl AsRef<Path>) -> Result<SweepGrid, Error> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| unavailable(e, path))?;
    let grid: SweepGrid = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&contents)?,
        Some("dhall") => serde_dhall::from_str(&contents).parse().map_err(Box::new)?,
        _ => return Err(Error::UnknownFileType(path.into())),
    };
    Ok(grid)
}

/// Writes summary rows as CSV or JSON, depending on the file extension.
pub fn write_summary_rows(path: impl AsRef<Path>, rows: &[SummaryRow]) -> Result<(), Error> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("csv") => {
            let mut wtr = csv::Writer::from_path(path)?;
            for row in rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
        }
        Some("json") => {
            let f = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(f, rows)?;
        }
        _ => return Err(Error::UnknownFileType(path.into())),
    }
    Ok(())
}

/// Writes full reports, including trimmed distributions, as JSON.
pub fn write_reports(path: impl AsRef<Path>, reports: &[ExperimentReport]) -> Result<(), Error> {
    let f = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(f, reports)?;
    Ok(())
}

fn unavailable(e: io::Error, path: &Path) -> Error {
    match e.kind() {
        io::ErrorKind::NotFound => Error::DataUnavailable(path.into()),
        _ => Error::Io(e),
    }
}

/// Error kinds for logs, grids and I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown file type.
    #[error("unknown file type: {0}")]
    UnknownFileType(PathBuf),

    /// The file or directory does not exist.
    #[error("data unavailable: {0}")]
    DataUnavailable(PathBuf),

    /// A log lacks a required column.
    #[error("{path}: missing column `{column}`")]
    MissingColumn {
        /// The missing column.
        column: &'static str,
        /// The log.
        path: PathBuf,
    },

    /// Error reading or writing CSV.
    #[error("CSV error")]
    Csv(#[from] csv::Error),

    /// Error serializing/deserializing Dhall.
    #[error("Dhall error")]
    Dhall(#[from] Box<serde_dhall::Error>),

    /// Error serializing/deserializing JSON.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error")]
    Io(#[from] std::io::Error),
}
