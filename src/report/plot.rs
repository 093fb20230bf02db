// src/report/plot.rs

//! Box plot of per-class percentages across slides.
//!
//! Rendered straight into an RGB buffer: one box per tissue class on a fixed
//! 0–100 % axis with grid lines every 25 %. Whiskers reach the furthest value
//! within 1.5 × IQR of the box; anything beyond is drawn as an outlier dot.
//! No text is rendered, columns follow `TISSUE_CLASSES` order.

use std::path::Path;

use image::{Rgb, RgbImage};

use crate::errors::Result;

use super::{SlideResult, TISSUE_CLASSES};

pub const WIDTH: u32 = 960;
pub const HEIGHT: u32 = 480;
const MARGIN: u32 = 40;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
const INK: Rgb<u8> = Rgb([0, 0, 0]);
const BOX_FILL: Rgb<u8> = Rgb([198, 219, 239]);
const MEDIAN: Rgb<u8> = Rgb([255, 127, 14]);

/// Five-number summary plus outliers for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_lo: f64,
    pub whisker_hi: f64,
    pub outliers: Vec<f64>,
}

/// `None` for an empty column.
pub fn box_stats(values: &[f64]) -> Option<BoxStats> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let q1 = quantile(&sorted, 0.25);
    let median = quantile(&sorted, 0.5);
    let q3 = quantile(&sorted, 0.75);
    let reach = 1.5 * (q3 - q1);
    let (lo_fence, hi_fence) = (q1 - reach, q3 + reach);

    let whisker_lo = sorted.iter().copied().find(|v| *v >= lo_fence).unwrap_or(q1);
    let whisker_hi = sorted.iter().copied().rev().find(|v| *v <= hi_fence).unwrap_or(q3);
    let outliers = sorted
        .iter()
        .copied()
        .filter(|v| *v < lo_fence || *v > hi_fence)
        .collect();

    Some(BoxStats {
        q1,
        median,
        q3,
        whisker_lo,
        whisker_hi,
        outliers,
    })
}

/// Linear-interpolated quantile of sorted, non-empty data.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Render the plot for `slides`.
pub fn render(slides: &[SlideResult]) -> RgbImage {
    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);

    for tick in [0.0, 25.0, 50.0, 75.0, 100.0] {
        hline(&mut img, MARGIN, WIDTH - MARGIN, y_of(tick), GRID);
    }
    vline(&mut img, MARGIN, y_of(100.0), y_of(0.0), INK);
    hline(&mut img, MARGIN, WIDTH - MARGIN, y_of(0.0), INK);

    let slot = (WIDTH - 2 * MARGIN) / TISSUE_CLASSES.len() as u32;
    let half_box = slot / 4;

    for col in 0..TISSUE_CLASSES.len() {
        let values: Vec<f64> = slides.iter().map(|s| s.percentages.0[col]).collect();
        let Some(stats) = box_stats(&values) else {
            continue;
        };
        let cx = MARGIN + slot * col as u32 + slot / 2;
        let (left, right) = (cx - half_box, cx + half_box);

        // Whiskers with caps.
        vline(&mut img, cx, y_of(stats.whisker_hi), y_of(stats.q3), INK);
        vline(&mut img, cx, y_of(stats.q1), y_of(stats.whisker_lo), INK);
        hline(&mut img, cx - half_box / 2, cx + half_box / 2, y_of(stats.whisker_hi), INK);
        hline(&mut img, cx - half_box / 2, cx + half_box / 2, y_of(stats.whisker_lo), INK);

        let (top, bottom) = (y_of(stats.q3), y_of(stats.q1));
        fill_rect(&mut img, left, top, right, bottom, BOX_FILL);
        outline_rect(&mut img, left, top, right, bottom, INK);
        hline(&mut img, left, right, y_of(stats.median), MEDIAN);

        for v in &stats.outliers {
            let y = y_of(*v);
            fill_rect(&mut img, cx - 2, y.saturating_sub(2), cx + 2, y + 2, INK);
        }
    }

    img
}

/// Render and save as PNG.
pub fn write_box_plot(path: &Path, slides: &[SlideResult]) -> Result<()> {
    render(slides).save(path)?;
    Ok(())
}

/// Pixel row for a percentage, clamped to the plot area.
fn y_of(pct: f64) -> u32 {
    let plot_h = (HEIGHT - 2 * MARGIN) as f64;
    let frac = 1.0 - pct.clamp(0.0, 100.0) / 100.0;
    MARGIN + (frac * plot_h).round() as u32
}

fn hline(img: &mut RgbImage, x0: u32, x1: u32, y: u32, color: Rgb<u8>) {
    fill_rect(img, x0, y, x1, y, color);
}

fn vline(img: &mut RgbImage, x: u32, y0: u32, y1: u32, color: Rgb<u8>) {
    fill_rect(img, x, y0.min(y1), x, y0.max(y1), color);
}

fn outline_rect(img: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    hline(img, x0, x1, y0, color);
    hline(img, x0, x1, y1, color);
    vline(img, x0, y0, y1, color);
    vline(img, x1, y0, y1, color);
}

/// Inclusive on both corners; clipped to the image.
fn fill_rect(img: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    let x1 = x1.min(img.width() - 1);
    let y1 = y1.min(img.height() - 1);
    for y in y0..=y1 {
        for x in x0..=x1 {
            img.put_pixel(x, y, color);
        }
    }
}
