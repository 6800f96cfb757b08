//! Pass generator binary
//!
//! Reads granule paths from stdin (one per line), re-segments their records
//! into passes and writes each pass to the selected backend.
//!
//! ## Usage
//!
//! ```bash
//! ls data/*_GDR_*.json | cargo run --release --bin altipass -- --cycles 10,12
//! ```
//!
//! ## Environment Variables
//!
//! - ALTIPASS_OUTPUT_PATH - JSONL output directory (default: data/passes)
//! - ALTIPASS_DB_PATH - SQLite database path (default: data/passes.db) - used when --backend sqlite
//! - ALTIPASS_BUFFER_CAPACITY - Max buffered 1 Hz records (default: 30000)
//! - ALTIPASS_PHASE_TAG - Output version tag (default: a)
//! - RUST_LOG - Logging level (optional, overrides -v)

use altipass::args::Args;
use altipass::epoch::format_iso;
use altipass::{MissionSpec, NominalOrbit, PassGenerator, PassWriter, RunConfig};
use clap::Parser;
use std::io::{self, BufRead};
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_filter()))
        .target(env_logger::Target::Stderr)
        .init();

    let config = RunConfig::from_env(args.backend)?;
    let selection = args.selection();

    log::info!("🚀 Starting pass generator");
    log::info!("   Backend: {}", config.backend.as_str());
    log::info!("   Output: {}", config.writer_path().display());
    log::info!("   Buffer capacity: {} records", config.buffer_capacity);
    if let Some(cycles) = selection.cycles {
        log::info!("   Cycles: {}..={}", cycles.first, cycles.last);
    }
    if let Some(times) = selection.equator_times {
        log::info!(
            "   Equator time: {} → {}",
            format_iso(times.start),
            if times.end.is_finite() { format_iso(times.end) } else { "open".to_string() }
        );
    }

    let orbit = NominalOrbit::new(MissionSpec::reference())?;
    let writer = PassWriter::new(config.backend, config.writer_path())?;

    let mut generator = PassGenerator::new(
        orbit,
        writer,
        config.buffer_capacity,
        selection,
        &config.phase_tag,
    )?;

    for line in io::stdin().lock().lines() {
        let line = line?;
        let path = line.trim();
        if path.is_empty() {
            continue;
        }
        if let Err(e) = generator.process_path(&PathBuf::from(path)) {
            log::error!("❌ Aborting at {}: {}", path, e);
            return Err(e.into());
        }
    }

    let summary = generator.finish()?;

    log::info!("✅ Done");
    log::info!(
        "   Files: {} read, {} skipped",
        summary.files_read,
        summary.files_skipped
    );
    log::info!(
        "   Records: {} overlap-trimmed, {} dropped by time checks",
        summary.records_trimmed,
        summary.records_dropped
    );
    log::info!(
        "   Passes: {} written, {} outside selection",
        summary.passes_written,
        summary.passes_skipped
    );

    Ok(())
}
