//! Band boundary resolution around a seam column
//!
//! A narrow vertical strip is taken around the seam. Its outer columns on
//! each side are averaged into per-row colour profiles, rows that look red
//! are collected per side, and the red rows are grouped into one band per
//! target. Comparing where the left and right bands start gives the
//! alignment offset and the row the shift ROI is anchored on.

use crate::config::{BoundaryConfig, RatioSource};
use crate::detection::locator::SeamTarget;
use crate::error::{InspectionError, Result};
use crate::region::Region;
use opencv::{
    core::{Mat, Vec3b},
    prelude::*,
};
use serde::{Deserialize, Serialize};

/// Mean (b, g, r) of a row segment
type Bgr = [f64; 3];

/// A resolved band boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryPoint {
    /// Zone index (0-2), ordered top to bottom
    pub zone: usize,
    /// Row the shift ROI is anchored on
    pub y: i32,
    /// Band height used to size the colour ROI
    pub height: i32,
    /// Absolute difference between the left and right band starts
    pub alignment_offset: i32,
    /// Right band starts more than the trigger below the left band
    pub needs_calibration: bool,
}

/// Contiguous group of red rows on one side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub start: i32,
    pub run_length: i32,
}

#[derive(Debug, Clone, Default)]
pub struct BoundaryResolver {
    config: BoundaryConfig,
}

impl BoundaryResolver {
    pub fn new(config: BoundaryConfig) -> Self {
        Self { config }
    }

    /// Resolve up to `max_boundaries` boundaries for a located target
    ///
    /// Returns an empty list when either side has no red rows, or when the
    /// strip around the seam lies outside the image.
    pub fn resolve(&self, image: &Mat, target: &SeamTarget) -> Result<Vec<BoundaryPoint>> {
        let (left, right) = self.side_profiles(image, target.expected_x)?;
        if left.is_empty() {
            tracing::warn!(seam_x = target.expected_x, "seam strip outside image");
            return Ok(Vec::new());
        }

        let (left_rows, right_rows) = self.red_rows(&left, &right);
        tracing::debug!(
            left = left_rows.len(),
            right = right_rows.len(),
            "red rows per side"
        );

        let left_bands = group_bands(&left_rows, self.config.band_gap);
        let right_bands = group_bands(&right_rows, self.config.band_gap);
        Ok(self.pair_bands(&left_bands, &right_bands))
    }

    /// Per-row mean colour of the outer columns on each side of the seam
    fn side_profiles(&self, image: &Mat, seam_x: i32) -> Result<(Vec<Bgr>, Vec<Bgr>)> {
        let half = self.config.strip_half_width;
        let strip = Region::from_bounds(seam_x - half, 0, seam_x + half, image.rows()).clip_to(image);
        if strip.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        let side = (half - self.config.strip_inset).clamp(1, strip.width) as usize;
        let x0 = strip.x as usize;
        let x1 = strip.right() as usize;

        let mut left = Vec::with_capacity(strip.height as usize);
        let mut right = Vec::with_capacity(strip.height as usize);
        for row in strip.y..strip.bottom() {
            let pixels = image
                .at_row::<Vec3b>(row)
                .map_err(|e| InspectionError::opencv("seam strip row", e))?;
            left.push(mean_bgr(&pixels[x0..x0 + side]));
            right.push(mean_bgr(&pixels[x1 - side..x1]));
        }
        Ok((left, right))
    }

    /// Row indices classified red on the left and right side
    pub fn red_rows(&self, left: &[Bgr], right: &[Bgr]) -> (Vec<i32>, Vec<i32>) {
        let mut left_rows = Vec::new();
        let mut right_rows = Vec::new();
        for (row, (l, r)) in left.iter().zip(right).enumerate() {
            let row = row as i32;
            let left_reference = match self.config.ratio_source {
                RatioSource::OwnSide => l,
                RatioSource::RightSide => r,
            };
            if self.is_red_row(row, l, left_reference) {
                left_rows.push(row);
            }
            if self.is_red_row(row, r, r) {
                right_rows.push(row);
            }
        }
        (left_rows, right_rows)
    }

    /// `reference` gates the colour ratios, `own` the red level
    fn is_red_row(&self, row: i32, own: &Bgr, reference: &Bgr) -> bool {
        let cfg = &self.config;
        let [rb, rg, rr] = *reference;
        rr > 0.0
            && rg / rr < cfg.green_red_ratio
            && rb / rr < cfg.blue_red_ratio
            && own[2] > cfg.red_threshold
            && row > cfg.valid_row_min
            && row < cfg.valid_row_max
    }

    /// Combine the per-side bands into boundary points
    pub fn pair_bands(&self, left: &[Band], right: &[Band]) -> Vec<BoundaryPoint> {
        left.iter()
            .zip(right)
            .take(self.config.max_boundaries)
            .enumerate()
            .map(|(zone, (l, r))| {
                let earlier = if l.start < r.start { l } else { r };
                BoundaryPoint {
                    zone,
                    y: earlier.start - earlier.run_length,
                    height: earlier.run_length.max(self.config.min_band_height(zone)),
                    alignment_offset: (l.start - r.start).abs(),
                    needs_calibration: r.start - l.start > self.config.calibration_trigger,
                }
            })
            .collect()
    }
}

/// Group sorted red row indices into bands separated by gaps over `gap`.
///
/// The first band starts at the first row directly followed by another red
/// row; without any such pair a single zero-length band at the first row is
/// returned. Rows listed before that start are ignored, so later bands are
/// only split off after it. A run length counts every red row from the start
/// of its group.
pub fn group_bands(rows: &[i32], gap: i32) -> Vec<Band> {
    let Some(&first) = rows.first() else {
        return Vec::new();
    };
    let Some(first_index) = rows.windows(2).position(|w| w[1] - w[0] == 1) else {
        return vec![Band { start: first, run_length: 0 }];
    };
    let rows = &rows[first_index..];

    let mut starts = vec![rows[0]];
    let mut split_indices = Vec::new();
    for (i, pair) in rows.windows(2).enumerate() {
        if pair[1] - pair[0] > gap {
            starts.push(pair[1]);
            split_indices.push(i + 1);
        }
    }
    split_indices.push(rows.len());

    let mut previous = 0;
    starts
        .into_iter()
        .zip(split_indices)
        .map(|(start, end)| {
            let band = Band {
                start,
                run_length: (end - previous) as i32,
            };
            previous = end;
            band
        })
        .collect()
}

fn mean_bgr(pixels: &[Vec3b]) -> Bgr {
    let mut sums = [0.0; 3];
    for px in pixels {
        for (channel, sum) in sums.iter_mut().enumerate() {
            *sum += px[channel] as f64;
        }
    }
    let count = pixels.len() as f64;
    sums.map(|s| s / count)
}
