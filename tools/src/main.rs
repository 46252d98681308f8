//! riskcheck-ingest: periodic batch reconciliation of risk-check log files.
//!
//! Usage:
//!   riskcheck-ingest --log-dir ./logs --db riskchecks.db --config ./config/cogs.json
//!   riskcheck-ingest --log-dir ./logs --db :memory: --json
//!
//! Exactly one ingestion process should run against a database at a time.

use anyhow::{Context, Result};
use riskcheck_core::{
    config::CostConfig,
    engine::{IngestReport, ReconciliationEngine},
    file_store::DirFileStore,
    store::SqliteStore,
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let log_dir = arg_value(&args, "--log-dir").unwrap_or("./logs");
    let db = arg_value(&args, "--db").unwrap_or("riskchecks.db");
    let config_path = arg_value(&args, "--config").unwrap_or("./config/cogs.json");
    let json = args.iter().any(|a| a == "--json");

    if !json {
        println!("riskcheck-ingest");
        println!("  log_dir:   {log_dir}");
        println!("  db:        {db}");
        println!("  config:    {config_path}");
        println!();
    }

    // Configuration problems abort before any file is touched.
    let config = CostConfig::load(config_path)
        .with_context(|| format!("loading payment configuration from {config_path}"))?;
    let store = SqliteStore::open(db).with_context(|| format!("opening {db}"))?;
    store.migrate()?;

    let engine = ReconciliationEngine::new(config, store)?;
    let files = DirFileStore::new(log_dir);
    let report = engine.run(&files)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&engine, &report)?;
    }

    if !report.is_clean() {
        log::warn!("{} file(s) failed and were rolled back", report.failed.len());
        std::process::exit(2);
    }
    Ok(())
}

fn print_summary(engine: &ReconciliationEngine<SqliteStore>, report: &IngestReport) -> Result<()> {
    println!("=== Ingestion summary ===");
    for s in &report.processed {
        println!(
            "  {:<40} {:<24} rc+{:<5} pay+{:<5} to+{}",
            s.filename,
            format!("{:?}", s.action),
            s.risk_checks_inserted,
            s.associations_inserted,
            s.timeouts_inserted,
        );
    }
    for f in &report.failed {
        println!("  {:<40} FAILED: {}", f.filename, f.error);
    }
    println!();
    println!("  files processed:      {}", report.processed.len());
    println!("  files failed:         {}", report.failed.len());
    println!("  risk checks inserted: {}", report.risk_checks_inserted());
    println!("  timeouts inserted:    {}", report.timeouts_inserted());
    println!("  files in store:       {}", engine.store.file_count()?);
    println!("  risk checks in store: {}", engine.store.risk_check_count()?);
    Ok(())
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
