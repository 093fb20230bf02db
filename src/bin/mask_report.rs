// src/bin/mask_report.rs

//! Summarise artifact masks into CSV reports.

use std::path::PathBuf;

use clap::Parser;
use slidewatch::cli::LogLevel;
use slidewatch::logging::init_console_logging;
use slidewatch::report::{generate_report, TISSUE_CLASSES};

#[derive(Debug, Parser)]
#[command(
    name = "mask-report",
    version,
    about = "Compute per-class artifact percentages from *_mask.png files."
)]
struct Args {
    /// Directory containing `<slide>_mask.png` files.
    #[arg(value_name = "MASK_DIR")]
    mask_dir: PathBuf,

    /// Directory receiving the CSV reports (created if missing).
    #[arg(value_name = "OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SLIDEWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    log_level: Option<LogLevel>,
}

fn main() {
    let args = Args::parse();

    if let Err(err) = init_console_logging(args.log_level) {
        eprintln!("mask-report: {err:?}");
    }

    let report = match generate_report(&args.mask_dir, &args.output_dir) {
        Ok(r) => r,
        Err(err) => {
            eprintln!("mask-report error: {:?}", anyhow::Error::from(err));
            std::process::exit(1);
        }
    };

    println!("\nAnalysis Summary:");
    println!("{}", "-".repeat(50));
    println!("Total slides analyzed: {}", report.slides.len());
    println!("\nMean artifact percentages:");
    for (class, stats) in TISSUE_CLASSES.iter().zip(report.stats.iter()) {
        match stats.mean {
            Some(mean) => println!("{}: {:.2}%", class.label(), mean),
            None => println!("{}: n/a", class.label()),
        }
    }
    println!("\nWrote {}", report.analysis_csv.display());
    println!("Wrote {}", report.summary_csv.display());
    println!("Wrote {}", report.box_plot.display());
}
