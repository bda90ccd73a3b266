//! hephead: copy the first N records of an event log.
//!
//! Every record is passed through the event composer on its own, so the
//! output carries the composed attribute set of each signal event.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: pretty)
//!
//! ## Usage
//!
//! ```bash
//! hephead events.hepmc3 -o head.hepmc3 -n 25
//! ```

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use event_overlay::{write_head, AttributePolicy};

/// Copy the first N records of an event log.
#[derive(Parser, Debug)]
#[command(name = "hephead", version, about)]
struct Cli {
    /// The input file
    #[arg(value_name = "I")]
    input: PathBuf,

    /// The output file
    #[arg(short = 'o', long = "output-file", value_name = "O")]
    output_file: PathBuf,

    /// The number of events to be taken
    #[arg(short = 'n', value_name = "N", default_value_t = 10)]
    n: usize,

    /// JSON attribute policy replacing the default attribute table
    #[arg(long, value_name = "FILE")]
    attribute_policy: Option<PathBuf>,
}

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "hephead=info,event_overlay=info".into());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .flatten_event(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    let policy = match &cli.attribute_policy {
        Some(path) => AttributePolicy::from_json(&std::fs::read_to_string(path)?)?,
        None => AttributePolicy::default(),
    };

    let start = Instant::now();
    let summary = write_head(&cli.input, &cli.output_file, cli.n, &policy).map_err(|e| {
        tracing::error!(error = %e, "extraction failed");
        e
    })?;

    info!(
        output = %cli.output_file.display(),
        written = summary.written,
        total = summary.total,
        unattached_production = summary.unattached_production,
        unattached_end = summary.unattached_end,
        latency_ms = start.elapsed().as_millis() as u64,
        "extraction complete"
    );
    Ok(())
}
