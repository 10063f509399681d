use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use humansize::{format_size, BINARY};
use serde_json::json;

use lynkeus::extract;
use lynkeus::worker::{Response, TriageReport, WorkerHandle};
use lynkeus_core::codec::{self, CodecFamily};
use lynkeus_core::engine::EngineConfig;

#[derive(Parser, Debug)]
#[command(name = "lynkeus")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File to triage.
    input: Option<PathBuf>,

    /// Emit the report as JSON instead of text.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Write carved resources into this directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// List codec providers and their availability, then exit.
    #[arg(long, default_value_t = false)]
    probe_codecs: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.probe_codecs {
        probe_codecs();
        return Ok(());
    }

    let Some(input) = args.input else {
        bail!("no input file given (or use --probe-codecs)");
    };

    let payload = std::fs::read(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;

    let worker = WorkerHandle::spawn();
    let response = worker.process(payload)?;

    let report = match response {
        Response::Completed(report) => report,
        Response::Failed { error } => {
            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "succeeded": false,
                        "error": error,
                    }))?
                );
            } else {
                eprintln!("triage failed: {}", error);
            }
            std::process::exit(1);
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if let Some(output_dir) = args.output {
        let written = extract::write_resources(&report.triaged_bytes, &report.resources, &output_dir)?;
        if !args.json {
            println!();
            println!("Wrote {} resource file(s) to {}", written.len(), output_dir.display());
        }
    }

    Ok(())
}

/// Runs acquisition over the default provider lists and prints one line per
/// candidate tried.
fn probe_codecs() {
    let config = EngineConfig::default();
    let deflate = codec::acquire(CodecFamily::Deflate, &config.deflate_sources);
    let frame = codec::acquire(CodecFamily::Lz4Frame, &config.frame_sources);

    for report in [&deflate.report, &frame.report] {
        println!("{}:", report.family);
        if report.attempts.is_empty() {
            println!("  (no providers configured)");
        }
        for attempt in &report.attempts {
            match &attempt.error {
                None => println!(
                    "  {} [{}] - ok",
                    attempt.candidate.name, attempt.candidate.mechanism
                ),
                Some(err) => println!(
                    "  {} [{}] - {}",
                    attempt.candidate.name, attempt.candidate.mechanism, err
                ),
            }
        }
    }
}

fn print_report(report: &TriageReport) {
    println!("=== Decompression ===");
    match (&report.compression, report.decompressed_size) {
        (Some(kind), Some(size)) => {
            println!("Method:     {}", kind.label());
            println!("Output:     {}", format_size(size, BINARY));
        }
        _ => println!("Method:     none (buffer used as-is)"),
    }
    if let Some(chosen) = &report.deflate_acquisition.chosen {
        println!("Deflate:    {} [{}]", chosen.name, chosen.mechanism);
    }
    if let Some(chosen) = &report.frame_acquisition.chosen {
        println!("LZ4:        {} [{}]", chosen.name, chosen.mechanism);
    }
    for attempt in &report.attempts {
        println!("  - {}", attempt);
    }

    println!();
    println!("=== Container ===");
    println!("{}", report.header_summary);
    if report.directory.entries.is_empty() {
        println!("(no entries: {})", report.directory.note);
    } else {
        println!("Entries ({}):", report.directory.note);
        for entry in &report.directory.entries {
            println!("  ~0x{:08x}  {}", entry.approx_offset, entry.name);
        }
    }

    println!();
    println!("=== Embedded resources ===");
    if report.resources.is_empty() {
        println!("(none found)");
    } else {
        for hint in &report.resources {
            println!(
                "  0x{:08x}..0x{:08x}  {:>10}  {}",
                hint.start,
                hint.end,
                format_size(hint.len(), BINARY),
                hint.kind
            );
        }
    }
}
