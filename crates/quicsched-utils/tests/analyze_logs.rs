use std::fs;

use quicsched_core::{encode, testing, Metric, SizeClass};
use quicsched_utils::{analyze_log, find_logs, read_sweep_grid, write_summary_rows};

fn write_log(dir: &std::path::Path, name: &str) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(dir.join(name))?;
    for rec in testing::mixed_log() {
        wtr.serialize(rec)?;
    }
    wtr.flush()?;
    Ok(())
}

#[test]
fn analyze_named_logs() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let drr = testing::drr_config();
    let wfq = testing::wfq_config();
    write_log(dir.path(), &format!("{}.csv", encode(&drr)?))?;
    write_log(dir.path(), &format!("{}.csv", encode(&wfq)?))?;
    fs::write(dir.path().join("notes.txt"), "not a log")?;

    let logs = find_logs(dir.path())?;
    assert_eq!(logs.len(), 2);

    let reports = logs
        .iter()
        .map(|log| analyze_log(log, Metric::Throughput))
        .collect::<Result<Vec<_>, _>>()?;
    let configs = reports.iter().map(|r| r.config.clone()).collect::<Vec<_>>();
    assert!(configs.contains(&drr));
    assert!(configs.contains(&wfq));

    let report = &reports[0];
    let labels = report
        .summaries
        .iter()
        .map(|s| s.class_label.as_str())
        .collect::<Vec<_>>();
    assert_eq!(labels, ["full", "long", "medium", "short"]);
    let short = &report.summaries[3];
    let expected = testing::mixed_log()
        .iter()
        .filter(|r| r.size_class == SizeClass::Short && r.is_valid())
        .count();
    assert_eq!(short.count, expected);

    let rows = reports.iter().flat_map(|r| r.rows()).collect::<Vec<_>>();
    let out = dir.path().join("summary.csv");
    write_summary_rows(&out, &rows)?;
    let written = fs::read_to_string(&out)?;
    let mut lines = written.lines();
    assert_eq!(
        lines.next(),
        Some(
            "label,scenario,delay_ms,bandwidth_mbps,queue_pkts,scheduler,quantum,concurrency,\
             class,count,mean,std,skewness,kurtosis"
        )
    );
    assert_eq!(lines.count(), 8);

    let out = dir.path().join("summary.json");
    write_summary_rows(&out, &rows)?;
    let back: Vec<quicsched_core::SummaryRow> = serde_json::from_str(&fs::read_to_string(&out)?)?;
    assert_eq!(back, rows);
    Ok(())
}

#[test]
fn read_partial_json_grid() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("grid.json");
    fs::write(
        &path,
        r#"{ "scenario": "datacenter", "schedulers": ["drr"], "queue_lengths": [10],
             "quanta": [{ "short": 3600, "medium": 2400, "long": 1200 }] }"#,
    )?;
    let grid = read_sweep_grid(&path)?;
    let configs = grid.configs();
    assert_eq!(configs.len(), 2);
    assert_eq!(
        encode(&configs[0])?,
        "sc-datacenter_d20_bw8_ql10_sch-drr_q3600-2400-1200_con40"
    );
    assert!(read_sweep_grid(dir.path().join("grid.yaml")).is_err());
    Ok(())
}
