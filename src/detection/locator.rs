//! Calibration target localisation
//!
//! One search window is placed per horizontal quadrant of the panel around
//! the nominal target row. Inside each window red-dominant pixels are kept,
//! binarised and traced as contours; the first contour with the size of a
//! marker bar identifies the target and is mapped onto the calibration
//! column of its seam.
//!
//! Algorithm tag: `algo-red-marker-localisation`

use crate::config::LocatorConfig;
use crate::error::{InspectionError, Result};
use crate::region::{crop, Region};
use opencv::{
    core::{self, Mat, Point, Rect, Scalar, Vec3b, Vector, CMP_LT, CV_32F, CV_8UC1},
    imgproc::{self, CHAIN_APPROX_SIMPLE, RETR_LIST, THRESH_BINARY},
    prelude::*,
};
use serde::{Deserialize, Serialize};

/// Number of horizontal quadrants scanned for markers
pub const QUADRANTS: i32 = 4;

/// A located seam calibration target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeamTarget {
    /// Quadrant whose search window contained the marker (0-3)
    pub quadrant: usize,
    /// Calibration column of the seam the marker belongs to
    pub expected_x: i32,
    /// Top row of the marker contour
    pub found_y: i32,
    /// Height of the marker contour
    pub band_height: i32,
    /// Absolute column of the marker centre
    pub center_x: i32,
}

/// Target locator scanning the four quadrant windows
#[derive(Debug, Clone, Default)]
pub struct TargetLocator {
    config: LocatorConfig,
}

impl TargetLocator {
    pub fn new(config: LocatorConfig) -> Self {
        Self { config }
    }

    /// Locate up to one target per quadrant, in quadrant order
    ///
    /// # Arguments
    ///
    /// * `image` - full BGR panel photograph
    ///
    /// # Returns
    ///
    /// The targets found; an empty list when no quadrant holds a marker.
    ///
    /// # Errors
    ///
    /// Only OpenCV failures are returned.
    pub fn locate(&self, image: &Mat) -> Result<Vec<SeamTarget>> {
        let quarter = image.cols() / QUADRANTS;
        let mut targets = Vec::new();

        for quadrant in 0..QUADRANTS {
            let window = self.search_window(quadrant, quarter).clip_to(image);
            if window.is_empty() {
                tracing::debug!(quadrant, "search window outside image");
                continue;
            }

            if let Some(target) = self.scan_window(image, &window, quadrant as usize)? {
                tracing::debug!(
                    quadrant,
                    expected_x = target.expected_x,
                    found_y = target.found_y,
                    band_height = target.band_height,
                    "marker located"
                );
                targets.push(target);
            }
        }

        Ok(targets)
    }

    /// Search window of a quadrant before clipping to the image
    pub fn search_window(&self, quadrant: i32, quarter_width: i32) -> Region {
        let cfg = &self.config;
        let center_x = cfg.first_column + quarter_width * quadrant;
        Region::from_bounds(
            (center_x - cfg.window_half_width).max(0),
            cfg.nominal_row - cfg.window_above,
            center_x + cfg.window_half_width,
            cfg.nominal_row + cfg.window_below,
        )
    }

    fn scan_window(&self, image: &Mat, window: &Region, quadrant: usize) -> Result<Option<SeamTarget>> {
        let pixels = crop::<Vec3b>(image, window)?;
        let red = self.red_mask(&pixels)?;
        let padded = self.pad_left(&red)?;

        let mut binary = Mat::default();
        imgproc::threshold(&padded, &mut binary, self.config.binary_threshold, 255.0, THRESH_BINARY)
            .map_err(|e| InspectionError::opencv("marker threshold", e))?;

        let mut contours = Vector::<Vector<Point>>::new();
        imgproc::find_contours(
            &binary,
            &mut contours,
            RETR_LIST,
            CHAIN_APPROX_SIMPLE,
            Point::new(0, 0),
        )
        .map_err(|e| InspectionError::opencv("marker contours", e))?;
        tracing::debug!(quadrant, contours = contours.len(), "quadrant scanned");

        for contour in contours.iter() {
            let rect = imgproc::bounding_rect(&contour)
                .map_err(|e| InspectionError::opencv("marker bounding rect", e))?;
            if !self.is_marker(&rect) {
                tracing::trace!(
                    quadrant,
                    x = rect.x - self.config.pad_columns + window.x,
                    y = rect.y + window.y,
                    width = rect.width,
                    height = rect.height,
                    min_width = self.config.min_marker_width,
                    min_height = self.config.min_marker_height,
                    max_height = self.config.max_marker_height,
                    "contour rejected"
                );
                continue;
            }

            let center_x = (rect.x - self.config.pad_columns) + window.x + rect.width / 2;
            let target = self.config.calibration_column(center_x).map(|expected_x| SeamTarget {
                quadrant,
                expected_x,
                found_y: rect.y + window.y,
                band_height: rect.height,
                center_x,
            });
            if target.is_none() {
                tracing::debug!(quadrant, center_x, "marker right of the last breakpoint");
            }
            return Ok(target);
        }

        Ok(None)
    }

    fn is_marker(&self, rect: &Rect) -> bool {
        let cfg = &self.config;
        rect.width > cfg.min_marker_width
            && rect.height > cfg.min_marker_height
            && rect.height < cfg.max_marker_height
    }

    /// Red channel where the pixel is red-dominant, 0 elsewhere
    fn red_mask(&self, bgr: &Mat) -> Result<Mat> {
        let mut channels = Vector::<Mat>::new();
        core::split(bgr, &mut channels).map_err(|e| InspectionError::opencv("channel split", e))?;
        let channel = |index: usize| {
            channels
                .get(index)
                .map_err(|e| InspectionError::opencv("channel access", e))
        };
        let (blue, green, red) = (channel(0)?, channel(1)?, channel(2)?);

        let green_limit = to_f32(&red, self.config.green_red_ratio)?;
        let blue_limit = to_f32(&red, self.config.blue_red_ratio)?;

        let mut green_ok = Mat::default();
        core::compare(&to_f32(&green, 1.0)?, &green_limit, &mut green_ok, CMP_LT)
            .map_err(|e| InspectionError::opencv("green ratio compare", e))?;
        let mut blue_ok = Mat::default();
        core::compare(&to_f32(&blue, 1.0)?, &blue_limit, &mut blue_ok, CMP_LT)
            .map_err(|e| InspectionError::opencv("blue ratio compare", e))?;

        let mut mask = Mat::default();
        core::bitwise_and(&green_ok, &blue_ok, &mut mask, &Mat::default())
            .map_err(|e| InspectionError::opencv("red mask", e))?;

        let mut out = Mat::new_rows_cols_with_default(bgr.rows(), bgr.cols(), CV_8UC1, Scalar::all(0.0))
            .map_err(|e| InspectionError::opencv("red mask allocation", e))?;
        red.copy_to_masked(&mut out, &mask)
            .map_err(|e| InspectionError::opencv("red mask copy", e))?;
        Ok(out)
    }

    /// Prepend black columns so markers touching the window edge close into contours
    fn pad_left(&self, gray: &Mat) -> Result<Mat> {
        if self.config.pad_columns == 0 {
            return gray
                .try_clone()
                .map_err(|e| InspectionError::opencv("mask copy", e));
        }
        let pad = Mat::new_rows_cols_with_default(
            gray.rows(),
            self.config.pad_columns,
            CV_8UC1,
            Scalar::all(0.0),
        )
        .map_err(|e| InspectionError::opencv("pad allocation", e))?;

        let mut padded = Mat::default();
        core::hconcat2(&pad, gray, &mut padded).map_err(|e| InspectionError::opencv("pad concat", e))?;
        Ok(padded)
    }
}

fn to_f32(channel: &Mat, scale: f64) -> Result<Mat> {
    let mut out = Mat::default();
    channel
        .convert_to(&mut out, CV_32F, scale, 0.0)
        .map_err(|e| InspectionError::opencv("channel conversion", e))?;
    Ok(out)
}
