// src/report/mask.rs

//! Per-slide class percentages from one mask image.

use std::path::Path;

use crate::errors::Result;

use super::{ArtifactClass, BACKGROUND, TISSUE_CLASSES};

/// Percentage of tissue (non-background) pixels in each class 1–6,
/// rounded to two decimals. Indexed like [`TISSUE_CLASSES`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClassPercentages(pub [f64; 6]);

impl ClassPercentages {
    pub fn get(&self, class: ArtifactClass) -> f64 {
        TISSUE_CLASSES
            .iter()
            .position(|c| *c == class)
            .map(|i| self.0[i])
            .unwrap_or(0.0)
    }

    pub fn values(&self) -> &[f64; 6] {
        &self.0
    }
}

/// Count classes in a raw 8-bit mask buffer.
///
/// Pixels equal to the background index are excluded from the denominator;
/// values outside 1–7 count as tissue but belong to no class. A mask without
/// tissue yields all zeros.
pub fn analyze_pixels(pixels: &[u8]) -> ClassPercentages {
    let mut counts = [0u64; 256];
    for &p in pixels {
        counts[p as usize] += 1;
    }

    let total = pixels.len() as u64 - counts[BACKGROUND.index() as usize];
    if total == 0 {
        return ClassPercentages::default();
    }

    let mut out = [0.0; 6];
    for (slot, class) in out.iter_mut().zip(TISSUE_CLASSES) {
        let pct = counts[class.index() as usize] as f64 / total as f64 * 100.0;
        *slot = round2(pct);
    }
    ClassPercentages(out)
}

/// Decode a mask PNG as 8-bit luma and analyse it.
pub fn analyze_mask_file(path: &Path) -> Result<ClassPercentages> {
    let img = image::open(path)?.into_luma8();
    Ok(analyze_pixels(img.as_raw()))
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
