// src/report/mod.rs

//! Batch report over finished artifact masks.
//!
//! Reads every `<slide>_mask.png` in a directory, computes the share of each
//! artifact class among tissue pixels, and writes `artifact_analysis.csv`
//! (one row per slide), `summary_statistics.csv` (mean/std/min/max per
//! class) and the `artifact_distribution.png` box plot. Stateless; runs on
//! demand via the `mask-report` binary.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info};

use crate::errors::Result;

pub mod mask;
pub mod plot;
pub mod summary;

pub use mask::{analyze_mask_file, analyze_pixels, ClassPercentages};
pub use summary::{summarize, ClassStats};

/// Suffix identifying mask files; the slide name is what precedes it.
pub const MASK_SUFFIX: &str = "_mask.png";
pub const ANALYSIS_CSV: &str = "artifact_analysis.csv";
pub const SUMMARY_CSV: &str = "summary_statistics.csv";
pub const BOX_PLOT: &str = "artifact_distribution.png";

/// Pixel classes written by the artifact-detection stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactClass {
    NormalTissue,
    TissueFold,
    DarkSpot,
    PenMarking,
    AirBubble,
    OutOfFocus,
    Background,
}

impl ArtifactClass {
    /// Pixel value of this class in a mask.
    pub fn index(self) -> u8 {
        match self {
            ArtifactClass::NormalTissue => 1,
            ArtifactClass::TissueFold => 2,
            ArtifactClass::DarkSpot => 3,
            ArtifactClass::PenMarking => 4,
            ArtifactClass::AirBubble => 5,
            ArtifactClass::OutOfFocus => 6,
            ArtifactClass::Background => 7,
        }
    }

    /// Column header used in the CSV reports.
    pub fn label(self) -> &'static str {
        match self {
            ArtifactClass::NormalTissue => "Normal Tissue",
            ArtifactClass::TissueFold => "Tissue Fold",
            ArtifactClass::DarkSpot => "Dark Spot/Foreign",
            ArtifactClass::PenMarking => "Pen Marking",
            ArtifactClass::AirBubble => "Air Bubble/Edge",
            ArtifactClass::OutOfFocus => "Out of Focus",
            ArtifactClass::Background => "Background",
        }
    }
}

pub const BACKGROUND: ArtifactClass = ArtifactClass::Background;

/// Every class except background, in report column order.
pub const TISSUE_CLASSES: [ArtifactClass; 6] = [
    ArtifactClass::NormalTissue,
    ArtifactClass::TissueFold,
    ArtifactClass::DarkSpot,
    ArtifactClass::PenMarking,
    ArtifactClass::AirBubble,
    ArtifactClass::OutOfFocus,
];

#[derive(Debug, Clone, PartialEq)]
pub struct SlideResult {
    pub slide: String,
    pub percentages: ClassPercentages,
}

/// Everything a report run produced.
#[derive(Debug, Clone)]
pub struct Report {
    pub slides: Vec<SlideResult>,
    pub stats: [ClassStats; 6],
    pub analysis_csv: PathBuf,
    pub summary_csv: PathBuf,
    pub box_plot: PathBuf,
}

/// Analyse all masks in `mask_dir` (non-recursive), sorted by slide name.
pub fn analyze_directory(mask_dir: &Path) -> Result<Vec<SlideResult>> {
    let mut masks: Vec<(String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(mask_dir).with_context(|| format!("reading dir {:?}", mask_dir))? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(slide) = name.strip_suffix(MASK_SUFFIX) {
            if path.is_file() {
                masks.push((slide.to_string(), path.clone()));
            }
        }
    }
    masks.sort();

    let mut results = Vec::with_capacity(masks.len());
    for (slide, path) in masks {
        debug!(?path, "analysing mask");
        let percentages =
            analyze_mask_file(&path).with_context(|| format!("analysing mask {:?}", path))?;
        results.push(SlideResult { slide, percentages });
    }
    Ok(results)
}

/// Analyse `mask_dir` and write the CSV files and box plot into `output_dir`.
pub fn generate_report(mask_dir: &Path, output_dir: &Path) -> Result<Report> {
    let slides = analyze_directory(mask_dir)?;
    let stats = summarize(&slides);

    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating dir {:?}", output_dir))?;

    let analysis_csv = output_dir.join(ANALYSIS_CSV);
    write_analysis_csv(&analysis_csv, &slides)?;

    let summary_csv = output_dir.join(SUMMARY_CSV);
    write_summary_csv(&summary_csv, &stats)?;

    let box_plot = output_dir.join(BOX_PLOT);
    plot::write_box_plot(&box_plot, &slides)?;

    info!(slides = slides.len(), ?analysis_csv, ?summary_csv, ?box_plot, "report written");

    Ok(Report {
        slides,
        stats,
        analysis_csv,
        summary_csv,
        box_plot,
    })
}

fn write_analysis_csv(path: &Path, slides: &[SlideResult]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["Slide"];
    header.extend(TISSUE_CLASSES.iter().map(|c| c.label()));
    writer.write_record(&header)?;

    for result in slides {
        let mut row = vec![result.slide.clone()];
        row.extend(result.percentages.values().iter().map(|v| format_value(*v)));
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

fn write_summary_csv(path: &Path, stats: &[ClassStats; 6]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec![""];
    header.extend(TISSUE_CLASSES.iter().map(|c| c.label()));
    writer.write_record(&header)?;

    let rows: [(&str, fn(&ClassStats) -> Option<f64>); 4] = [
        ("mean", |s: &ClassStats| s.mean),
        ("std", |s: &ClassStats| s.std),
        ("min", |s: &ClassStats| s.min),
        ("max", |s: &ClassStats| s.max),
    ];
    for (label, pick) in rows {
        let mut row = vec![label.to_string()];
        row.extend(stats.iter().map(|s| pick(s).map(format_value).unwrap_or_default()));
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Shortest round-trip float text, always with a fractional part
/// (`50.0`, `33.33`).
pub fn format_value(v: f64) -> String {
    format!("{v:?}")
}
