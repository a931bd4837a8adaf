// Example usage of the summary reader
//
//   cargo run --example dump_summary -- path/to/CASE.SMSPEC [options.json] [pattern]

use anyhow::{Context, Result};
use ecl_reader::{ReaderOptions, SummaryCase};
use serde_json::json;
use std::io;
use tracing::{info, Level};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let mut args = std::env::args().skip(1);
    let case_path = args.next().context("usage: dump_summary CASE[.SMSPEC] [options.json] [pattern]")?;
    let options = match args.next() {
        Some(path) => ReaderOptions::from_json_file(&path).with_context(|| format!("reading {}", path))?,
        None => ReaderOptions::default(),
    };
    let pattern = args.next().unwrap_or_else(|| "*".to_string());

    let case = SummaryCase::open_with(&case_path, &options)
        .with_context(|| format!("opening {}", case_path))?;

    info!("Restart chain:");
    for root in case.restart_chain() {
        info!("  {}", root.display());
    }

    let keys = case
        .keys_matching(&pattern)
        .with_context(|| format!("bad key pattern {:?}", pattern))?;
    info!("{} vectors match {:?}", keys.len(), pattern);
    for key in &keys {
        let values = case.get(key)?;
        let unit = case.params().unit(case.params().resolve_name(key)?)?;
        info!(
            "  {:<24} {:>10} first={:?} last={:?}",
            key,
            unit,
            values.first(),
            values.last()
        );
    }

    case.summarize(&mut io::stdout())?;

    let description = json!({
        "case": case.root().display().to_string(),
        "start_date": case.start_date(),
        "report_steps": case.report_steps(),
        "segments": case.series().segments().iter().map(|s| &s.name).collect::<Vec<_>>(),
        "vectors": keys,
    });
    println!("{}", serde_json::to_string_pretty(&description)?);

    Ok(())
}
