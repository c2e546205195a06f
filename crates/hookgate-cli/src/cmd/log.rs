use crate::output::print_json;
use anyhow::Context;
use chrono::Utc;
use hookgate_core::audit::{summarize, AuditLog};
use hookgate_core::paths::parse_log_date;
use std::path::PathBuf;

pub fn run(log_dir: Option<PathBuf>, date: Option<&str>, limit: usize, json: bool) -> anyhow::Result<()> {
    let log = AuditLog::resolve(log_dir);
    let day = match date {
        Some(d) => parse_log_date(d)?,
        None => Utc::now().date_naive(),
    };
    let records = log
        .read_day(day)
        .with_context(|| format!("failed to read audit log for {}", day.format("%Y%m%d")))?;
    let summary = summarize(&records, limit);

    if json {
        let value = serde_json::json!({
            "date": day.format("%Y%m%d").to_string(),
            "path": log.path_for(day).map(|p| p.display().to_string()),
            "summary": summary,
        });
        return print_json(&value);
    }

    if let Some(path) = log.path_for(day) {
        println!("{}", path.display());
    }
    if summary.records == 0 {
        println!("No hook invocations recorded.");
        return Ok(());
    }
    println!(
        "invocations: {}  failures: {}  denies: {}",
        summary.records, summary.failures, summary.denies
    );
    println!(
        "duration: mean {}ms  max {}ms",
        summary.mean_duration_ms, summary.max_duration_ms
    );
    if !summary.recent.is_empty() {
        println!();
        println!("Recent:");
        for line in &summary.recent {
            println!("  {line}");
        }
    }
    Ok(())
}
