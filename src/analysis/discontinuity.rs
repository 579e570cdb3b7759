//! Brightness and per-channel discontinuity across a seam
//!
//! The colour ROI covers the five calibration bands below a boundary. Row
//! means are taken separately left and right of the seam column; each side is
//! summarised by the mean of its brightest rows, and the two summaries are
//! compared as a normalised difference. Optionally the band ratios are
//! tightened with small point patches sampled at the band centres.

use crate::analysis::profile::{discontinuity_ratio, top_n_mean};
use crate::config::DiscontinuityConfig;
use crate::constants::verdict::SENTINEL_DISCONTINUITY;
use crate::error::{InspectionError, Result};
use crate::region::{crop, to_gray, Region};
use opencv::{
    core::{self, Mat, Vec3b},
    prelude::*,
};
use serde::{Deserialize, Serialize};

/// Band index of each measured channel inside the colour ROI
const RED_BAND: i32 = 1;
const GREEN_BAND: i32 = 2;
const BLUE_BAND: i32 = 3;
const WHITE_BAND: i32 = 4;

/// Normalised left/right differences of one seam zone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelRatios {
    pub white: f64,
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl ChannelRatios {
    /// Fail-forcing value used when a region could not be measured
    pub fn sentinel() -> Self {
        Self {
            white: SENTINEL_DISCONTINUITY,
            red: SENTINEL_DISCONTINUITY,
            green: SENTINEL_DISCONTINUITY,
            blue: SENTINEL_DISCONTINUITY,
        }
    }

    /// Channel-wise minimum
    pub fn min(self, other: Self) -> Self {
        Self {
            white: self.white.min(other.white),
            red: self.red.min(other.red),
            green: self.green.min(other.green),
            blue: self.blue.min(other.blue),
        }
    }

    /// Attach the zone index
    pub fn into_measurement(self, zone: usize) -> DiscontinuityMeasurement {
        DiscontinuityMeasurement {
            zone,
            white: self.white,
            red: self.red,
            green: self.green,
            blue: self.blue,
        }
    }
}

/// Terminal output of the Discontinuity Analyzer for one zone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscontinuityMeasurement {
    pub zone: usize,
    pub white: f64,
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl DiscontinuityMeasurement {
    pub fn ratios(&self) -> ChannelRatios {
        ChannelRatios {
            white: self.white,
            red: self.red,
            green: self.green,
            blue: self.blue,
        }
    }
}

/// Where to sample the refinement patches of one zone, in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchSite {
    /// Seam column
    pub seam_x: i32,
    /// Resolved boundary row (top of the colour ROI)
    pub top_y: i32,
    pub band_height: i32,
    /// Rows the left patches are moved down to follow a lagging left image
    pub left_drop: i32,
    /// Rows the right patches are moved down to follow a lagging right image
    pub right_drop: i32,
}

/// Per-row channel means of one side of the seam
#[derive(Debug, Default)]
struct SideMeans {
    blue: Vec<f64>,
    green: Vec<f64>,
    red: Vec<f64>,
    white: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct DiscontinuityAnalyzer {
    config: DiscontinuityConfig,
}

impl DiscontinuityAnalyzer {
    pub fn new(config: DiscontinuityConfig) -> Self {
        Self { config }
    }

    /// Measure the four ratios of a BGR colour ROI whose top row is the
    /// resolved boundary
    ///
    /// # Errors
    ///
    /// Returns `InspectionError::DegenerateInput` when the colour or grayscale
    /// row range is empty for this ROI.
    pub fn measure(&self, color_roi: &Mat, band_height: i32) -> Result<ChannelRatios> {
        let rows = color_roi.rows();
        let width = color_roi.cols();
        if width == 0 || rows == 0 {
            return Err(InspectionError::degenerate("colour roi", "empty region"));
        }

        let cfg = &self.config;
        let color_start = cfg.top_inset;
        let color_end = ((cfg.roi_bands - 1) * band_height - cfg.bottom_inset)
            .max(color_start + 1)
            .min(rows);
        let gray_start = cfg.gray_top_inset;
        if color_start >= color_end || gray_start >= rows {
            return Err(InspectionError::degenerate(
                "colour roi",
                format!("{} rows cannot hold the sampled bands (band height {})", rows, band_height),
            ));
        }

        let half = width / 2;
        let left_cols = 0..(half - cfg.seam_gap).max(1) as usize;
        let right_cols = (half + cfg.seam_gap).min(width - 1) as usize..width as usize;

        let mut left = SideMeans::default();
        let mut right = SideMeans::default();
        for r in color_start..color_end {
            let row = color_roi
                .at_row::<Vec3b>(r)
                .map_err(|e| InspectionError::opencv("colour roi row", e))?;
            push_channel_means(&mut left, &row[left_cols.clone()]);
            push_channel_means(&mut right, &row[right_cols.clone()]);
        }

        let gray = to_gray(color_roi)?;
        for r in gray_start..rows {
            let row = gray
                .at_row::<u8>(r)
                .map_err(|e| InspectionError::opencv("gray roi row", e))?;
            left.white.push(mean_u8(&row[left_cols.clone()]));
            right.white.push(mean_u8(&row[right_cols.clone()]));
        }

        let limit = cfg.blue_saturation_limit;
        left.blue.retain(|&v| v <= limit);
        right.blue.retain(|&v| v <= limit);

        let n = cfg.top_n;
        let ratio = |l: &[f64], r: &[f64]| discontinuity_ratio(top_n_mean(l, n), top_n_mean(r, n));
        Ok(ChannelRatios {
            white: ratio(&left.white, &right.white),
            red: ratio(&left.red, &right.red),
            green: ratio(&left.green, &right.green),
            blue: ratio(&left.blue, &right.blue),
        })
    }

    /// Tighten `band` with point patches at the band centres, when enabled
    ///
    /// Every channel keeps the smaller of its band ratio and patch ratio. If
    /// any patch falls outside the image the band ratios are returned as is.
    pub fn refine(&self, image: &Mat, site: &PatchSite, band: ChannelRatios) -> Result<ChannelRatios> {
        if !self.config.patch_refinement {
            return Ok(band);
        }

        let Some(patches) = self.patch_ratios(image, site)? else {
            tracing::debug!(?site, "refinement patch outside image, band ratios kept");
            return Ok(band);
        };
        Ok(band.min(patches))
    }

    fn patch_ratios(&self, image: &Mat, site: &PatchSite) -> Result<Option<ChannelRatios>> {
        let offset = self.config.patch_offset;
        let (Some(red), Some(green), Some(blue), Some(white)) = (
            self.patch_pair(image, site, RED_BAND, offset)?,
            self.patch_pair(image, site, GREEN_BAND, offset)?,
            self.patch_pair(image, site, BLUE_BAND, offset)?,
            self.patch_pair(image, site, WHITE_BAND, offset)?,
        ) else {
            return Ok(None);
        };

        Ok(Some(ChannelRatios {
            white: discontinuity_ratio(white.0.gray, white.1.gray),
            red: discontinuity_ratio(red.0.bgr[2], red.1.bgr[2]),
            green: discontinuity_ratio(green.0.bgr[1], green.1.bgr[1]),
            blue: discontinuity_ratio(blue.0.bgr[0], blue.1.bgr[0]),
        }))
    }

    /// Left and right patch means at the centre of band `band`
    fn patch_pair(
        &self,
        image: &Mat,
        site: &PatchSite,
        band: i32,
        offset: i32,
    ) -> Result<Option<(PatchMean, PatchMean)>> {
        let center_y = site.top_y + site.band_height * (2 * band + 1) / 2;
        let left = self.patch_mean(image, site.seam_x - offset, center_y + site.left_drop)?;
        let right = self.patch_mean(image, site.seam_x + offset, center_y + site.right_drop)?;
        Ok(left.zip(right))
    }

    fn patch_mean(&self, image: &Mat, cx: i32, cy: i32) -> Result<Option<PatchMean>> {
        let half = self.config.patch_half_size;
        let region = Region::from_bounds(cx - half, cy - half, cx + half, cy + half);
        if region.clip_to(image) != region || region.is_empty() {
            return Ok(None);
        }

        let patch = crop::<Vec3b>(image, &region)?;
        let bgr = core::mean(&patch, &Mat::default())
            .map_err(|e| InspectionError::opencv("patch mean", e))?;
        let gray = core::mean(&to_gray(&patch)?, &Mat::default())
            .map_err(|e| InspectionError::opencv("patch gray mean", e))?;

        Ok(Some(PatchMean {
            bgr: [bgr[0], bgr[1], bgr[2]],
            gray: gray[0],
        }))
    }
}

#[derive(Debug, Clone, Copy)]
struct PatchMean {
    bgr: [f64; 3],
    gray: f64,
}

fn push_channel_means(side: &mut SideMeans, pixels: &[Vec3b]) {
    let count = pixels.len() as f64;
    let mut sums = [0.0f64; 3];
    for px in pixels {
        for (channel, sum) in sums.iter_mut().enumerate() {
            *sum += px[channel] as f64;
        }
    }
    side.blue.push(sums[0] / count);
    side.green.push(sums[1] / count);
    side.red.push(sums[2] / count);
}

fn mean_u8(values: &[u8]) -> f64 {
    values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64
}
