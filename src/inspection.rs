//! Inspection orchestration
//!
//! Chains the pipeline for one panel photograph: locate the seam target,
//! resolve its band boundaries, measure shift and discontinuity per zone and
//! aggregate the pass/fail verdict. Per-image conditions (no target, regions
//! outside the image) are recovered here with fail-forcing sentinel values so
//! every inspected image yields a complete, reportable result.

use crate::analysis::{
    ChannelRatios, DiscontinuityAnalyzer, DiscontinuityMeasurement, PatchSite, ShiftAnalyzer,
    ShiftMeasurement, ShiftOutcome,
};
use crate::config::InspectionConfig;
use crate::constants::verdict::{SENTINEL_SHIFT, SENTINEL_ZONE_SPACING, ZONE_COUNT};
use crate::detection::{distortion, BoundaryPoint, BoundaryResolver, DistortionReport, SeamTarget, TargetLocator};
use crate::error::{InspectionError, Result};
use crate::image_loader::load_image;
use crate::region::{crop, to_gray, Region};
use opencv::{
    core::{Mat, Point, Scalar, Vec3b, CV_8UC3},
    imgproc::{self, LINE_8},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Height of a sentinel zone's placeholder rectangle
const SENTINEL_ZONE_HEIGHT: i32 = 30;

/// Size of the blank debug crop shown for zones that were not measured
const PLACEHOLDER_ROWS: i32 = 100;
const PLACEHOLDER_COLS: i32 = 280;

/// Pipeline stage, reported in debug traces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectionStage {
    Locating,
    Resolving,
    Measuring(usize),
    Aggregating,
    Done,
}

impl fmt::Display for InspectionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InspectionStage::Locating => write!(f, "locating"),
            InspectionStage::Resolving => write!(f, "resolving"),
            InspectionStage::Measuring(zone) => write!(f, "measuring zone {}", zone),
            InspectionStage::Aggregating => write!(f, "aggregating"),
            InspectionStage::Done => write!(f, "done"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneStatus {
    /// Zone was measured from a resolved boundary
    Measured,
    /// No target or boundary was found; values are fail-forcing sentinels
    RoiError,
}

/// Measurements and verdict of one seam zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneResult {
    pub shift: ShiftMeasurement,
    pub discontinuity: DiscontinuityMeasurement,
    pub passed: bool,
    pub status: ZoneStatus,
    /// Shift ROI in image coordinates, before clipping
    pub rect: Region,
    /// Strongest left edge row inside the clipped shift ROI (0 when none)
    pub left_edge: i32,
    /// Strongest right edge row inside the clipped shift ROI (0 when none)
    pub right_edge: i32,
}

impl ZoneResult {
    fn sentinel(zone: usize, rect: Region) -> Self {
        Self {
            shift: ShiftMeasurement {
                zone,
                pixel_shift: SENTINEL_SHIFT,
            },
            discontinuity: ChannelRatios::sentinel().into_measurement(zone),
            passed: false,
            status: ZoneStatus::RoiError,
            rect,
            left_edge: 0,
            right_edge: 0,
        }
    }
}

/// Complete result of inspecting one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionResult {
    pub zones: Vec<ZoneResult>,
    /// Target the zones were measured on
    pub target: Option<SeamTarget>,
    /// Present when the distortion check is enabled
    pub distortion: Option<DistortionReport>,
    pub passed: bool,
}

impl InspectionResult {
    /// Per-zone pixel shifts, in zone order
    pub fn shifts(&self) -> Vec<ShiftMeasurement> {
        self.zones.iter().map(|z| z.shift).collect()
    }

    /// Per-zone discontinuity ratios, in zone order
    pub fn discontinuities(&self) -> Vec<DiscontinuityMeasurement> {
        self.zones.iter().map(|z| z.discontinuity).collect()
    }

    /// Largest zone shift, 0 without zones
    pub fn max_shift(&self) -> i32 {
        self.zones.iter().map(|z| z.shift.pixel_shift).max().unwrap_or(0)
    }

    /// True if the result carries sentinel zones
    pub fn is_roi_error(&self) -> bool {
        self.zones.iter().any(|z| z.status == ZoneStatus::RoiError)
    }
}

/// Seam inspector holding a validated configuration snapshot
#[derive(Debug, Clone)]
pub struct Inspector {
    config: InspectionConfig,
    locator: TargetLocator,
    resolver: BoundaryResolver,
    shift: ShiftAnalyzer,
    discontinuity: DiscontinuityAnalyzer,
}

impl Inspector {
    /// Create an inspector from a configuration
    ///
    /// # Errors
    ///
    /// Returns `InspectionError::InvalidParameter` if the configuration does
    /// not validate.
    pub fn new(config: InspectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            locator: TargetLocator::new(config.locator.clone()),
            resolver: BoundaryResolver::new(config.boundary.clone()),
            shift: ShiftAnalyzer::with_config(
                config.diff_threshold,
                config.rate_threshold,
                config.shift.clone(),
            ),
            discontinuity: DiscontinuityAnalyzer::new(config.discontinuity.clone()),
            config,
        })
    }

    pub fn config(&self) -> &InspectionConfig {
        &self.config
    }

    /// Inspect one BGR panel photograph
    ///
    /// Target and region problems never fail the call; they produce
    /// `ZoneStatus::RoiError` zones and a failing verdict.
    ///
    /// # Errors
    ///
    /// Returns `InspectionError::InvalidParameter` for an empty or non-BGR
    /// image, and propagates OpenCV failures.
    pub fn inspect(&self, image: &Mat) -> Result<InspectionResult> {
        ensure_bgr(image)?;

        trace_stage(InspectionStage::Locating);
        let targets = self.locator.locate(image)?;
        let distortion = self
            .config
            .check_distortion
            .then(|| distortion::evaluate(&targets, self.config.distortion_threshold));

        let Some(target) = targets.first().copied() else {
            tracing::warn!("no calibration target found, reporting ROI error");
            return Ok(self.finish(self.sentinel_zones(self.config.locator.first_column), None, distortion));
        };

        trace_stage(InspectionStage::Resolving);
        let boundaries = self.resolver.resolve(image, &target)?;
        if boundaries.is_empty() {
            tracing::warn!(seam_x = target.expected_x, "no band boundary resolved, reporting ROI error");
            return Ok(self.finish(self.sentinel_zones(target.expected_x), Some(target), distortion));
        }

        let mut zones = Vec::with_capacity(boundaries.len());
        for boundary in &boundaries {
            trace_stage(InspectionStage::Measuring(boundary.zone));
            zones.push(self.measure_zone(image, target.expected_x, boundary)?);
        }

        Ok(self.finish(zones, Some(target), distortion))
    }

    fn finish(
        &self,
        zones: Vec<ZoneResult>,
        target: Option<SeamTarget>,
        distortion: Option<DistortionReport>,
    ) -> InspectionResult {
        trace_stage(InspectionStage::Aggregating);
        let distortion_ok = distortion.as_ref().map_or(true, |d| d.passed);
        let passed = !zones.is_empty() && zones.iter().all(|z| z.passed) && distortion_ok;

        tracing::info!(
            zones = zones.len(),
            max_shift = zones.iter().map(|z| z.shift.pixel_shift).max().unwrap_or(0),
            passed,
            "inspection finished"
        );
        trace_stage(InspectionStage::Done);

        InspectionResult {
            zones,
            target,
            distortion,
            passed,
        }
    }

    fn sentinel_zones(&self, seam_x: i32) -> Vec<ZoneResult> {
        let half = self.config.shift.roi_half_width;
        let first_row = self.config.locator.nominal_row - SENTINEL_ZONE_SPACING;
        (0..ZONE_COUNT)
            .map(|zone| {
                let top = first_row + zone as i32 * SENTINEL_ZONE_SPACING;
                let rect = Region::from_bounds(seam_x - half, top, seam_x + half, top + SENTINEL_ZONE_HEIGHT);
                ZoneResult::sentinel(zone, rect)
            })
            .collect()
    }

    /// Shift ROI of a boundary, before clipping
    pub fn shift_region(&self, seam_x: i32, boundary: &BoundaryPoint) -> Region {
        let cfg = &self.config.shift;
        Region::from_bounds(
            seam_x - cfg.roi_half_width,
            boundary.y - cfg.roi_above,
            seam_x + cfg.roi_half_width,
            boundary.y + cfg.roi_below,
        )
    }

    /// Colour ROI of a boundary, before clipping
    pub fn color_region(&self, seam_x: i32, boundary: &BoundaryPoint) -> Region {
        let cfg = &self.config.discontinuity;
        Region::from_bounds(
            seam_x - cfg.roi_half_width,
            boundary.y,
            seam_x + cfg.roi_half_width,
            boundary.y + boundary.height * cfg.roi_bands,
        )
    }

    fn measure_zone(&self, image: &Mat, seam_x: i32, boundary: &BoundaryPoint) -> Result<ZoneResult> {
        let rect = self.shift_region(seam_x, boundary);
        let outcome = recover(self.raw_shift(image, &rect), "shift", ShiftOutcome::default())?;
        let pixel_shift = self.shift.finalize_shift(outcome.raw_shift, boundary);

        let band = recover(
            crop::<Vec3b>(image, &self.color_region(seam_x, boundary))
                .and_then(|roi| self.discontinuity.measure(&roi, boundary.height)),
            "discontinuity",
            ChannelRatios::sentinel(),
        )?;

        let (left_drop, right_drop) = match outcome.left_edge.cmp(&outcome.right_edge) {
            std::cmp::Ordering::Greater => (pixel_shift, 0),
            std::cmp::Ordering::Less => (0, pixel_shift),
            std::cmp::Ordering::Equal => (0, 0),
        };
        let site = PatchSite {
            seam_x,
            top_y: boundary.y,
            band_height: boundary.height,
            left_drop,
            right_drop,
        };
        let ratios = self.discontinuity.refine(image, &site, band)?;

        let passed = pixel_shift < self.config.fail_threshold_px;
        tracing::info!(
            zone = boundary.zone,
            pixel_shift,
            alignment_offset = boundary.alignment_offset,
            white = ratios.white,
            passed,
            "zone measured"
        );

        Ok(ZoneResult {
            shift: ShiftMeasurement {
                zone: boundary.zone,
                pixel_shift,
            },
            discontinuity: ratios.into_measurement(boundary.zone),
            passed,
            status: ZoneStatus::Measured,
            rect,
            left_edge: outcome.left_edge,
            right_edge: outcome.right_edge,
        })
    }

    fn raw_shift(&self, image: &Mat, rect: &Region) -> Result<ShiftOutcome> {
        let roi = crop::<Vec3b>(image, rect)?;
        self.shift.measure_shift(&to_gray(&roi)?)
    }
}

/// Inspect a BGR image with a configuration
pub fn inspect_image(image: &Mat, config: &InspectionConfig) -> Result<InspectionResult> {
    Inspector::new(config.clone())?.inspect(image)
}

/// Load and inspect an image file
///
/// # Errors
///
/// Returns `InspectionError::ImageLoadError` if the file cannot be decoded,
/// in addition to the errors of [`Inspector::inspect`].
pub fn inspect_file(path: &Path, config: &InspectionConfig) -> Result<InspectionResult> {
    let image = load_image(path)?;
    inspect_image(&image, config)
}

/// Shift ROI of a zone with the detected edges drawn in
///
/// The strongest left edge is marked green across the left half and the
/// strongest right edge red across the right half. Zones without a measured
/// ROI give a blank placeholder.
pub fn debug_crop(image: &Mat, zone: &ZoneResult) -> Result<Mat> {
    let placeholder = || {
        Mat::new_rows_cols_with_default(PLACEHOLDER_ROWS, PLACEHOLDER_COLS, CV_8UC3, Scalar::all(0.0))
            .map_err(|e| InspectionError::opencv("placeholder allocation", e))
    };
    if zone.status == ZoneStatus::RoiError {
        return placeholder();
    }

    let mut view = match crop::<Vec3b>(image, &zone.rect) {
        Ok(view) => view,
        Err(e) if e.is_recoverable() => return placeholder(),
        Err(e) => return Err(e),
    };

    let width = view.cols();
    let mid = width / 2;
    if zone.left_edge > 0 {
        imgproc::line(
            &mut view,
            Point::new(0, zone.left_edge),
            Point::new(mid, zone.left_edge),
            Scalar::new(0.0, 255.0, 0.0, 0.0),
            1,
            LINE_8,
            0,
        )
        .map_err(|e| InspectionError::opencv("left edge overlay", e))?;
    }
    if zone.right_edge > 0 {
        imgproc::line(
            &mut view,
            Point::new(mid, zone.right_edge),
            Point::new(width, zone.right_edge),
            Scalar::new(0.0, 0.0, 255.0, 0.0),
            1,
            LINE_8,
            0,
        )
        .map_err(|e| InspectionError::opencv("right edge overlay", e))?;
    }
    Ok(view)
}

fn ensure_bgr(image: &Mat) -> Result<()> {
    if image.empty() || image.typ() != CV_8UC3 {
        return Err(InspectionError::invalid_parameter(
            "image",
            format!("{}x{} type {}", image.cols(), image.rows(), image.typ()),
        ));
    }
    Ok(())
}

/// Replace a recoverable per-region error with `fallback`
fn recover<T>(result: Result<T>, stage: &str, fallback: T) -> Result<T> {
    match result {
        Err(e) if e.is_recoverable() => {
            tracing::warn!(stage, error = %e, "region not measurable, using fallback");
            Ok(fallback)
        }
        other => other,
    }
}

fn trace_stage(stage: InspectionStage) {
    tracing::debug!(%stage, "inspection stage");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundary(y: i32, height: i32) -> BoundaryPoint {
        BoundaryPoint {
            zone: 1,
            y,
            height,
            alignment_offset: 0,
            needs_calibration: false,
        }
    }

    #[test]
    fn test_inspector_rejects_invalid_config() {
        let config = InspectionConfig {
            fail_threshold_px: 0,
            ..InspectionConfig::default()
        };
        assert!(matches!(
            Inspector::new(config).unwrap_err(),
            InspectionError::InvalidParameter { .. }
        ));
    }

    #[test]
    fn test_roi_geometry() {
        let inspector = Inspector::new(InspectionConfig::default()).unwrap();
        assert_eq!(
            inspector.shift_region(2008, &boundary(1414, 26)),
            Region::from_bounds(1978, 1406, 2038, 1434)
        );
        assert_eq!(
            inspector.color_region(2008, &boundary(1414, 26)),
            Region::from_bounds(1978, 1414, 2038, 1544)
        );
    }

    #[test]
    fn test_sentinel_zones_layout() {
        let inspector = Inspector::new(InspectionConfig::default()).unwrap();
        let zones = inspector.sentinel_zones(88);
        assert_eq!(zones.len(), 3);
        for (i, zone) in zones.iter().enumerate() {
            assert_eq!(zone.shift.pixel_shift, 100);
            assert_eq!(zone.discontinuity.ratios(), ChannelRatios::sentinel());
            assert_eq!(zone.status, ZoneStatus::RoiError);
            assert!(!zone.passed);
            assert_eq!(zone.rect, Region::new(58, 1040 + 400 * i as i32, 60, 30));
        }
    }

    #[test]
    fn test_rejects_empty_image() {
        let inspector = Inspector::new(InspectionConfig::default()).unwrap();
        assert!(inspector.inspect(&Mat::default()).is_err());
    }

    #[test]
    fn test_blank_image_reports_roi_error() {
        let inspector = Inspector::new(InspectionConfig::default()).unwrap();
        let image = Mat::new_rows_cols_with_default(600, 800, CV_8UC3, Scalar::all(255.0)).unwrap();
        let result = inspector.inspect(&image).unwrap();
        assert!(!result.passed);
        assert!(result.is_roi_error());
        assert_eq!(result.max_shift(), 100);
        assert!(result.target.is_none());
        assert!(result.distortion.is_none());
    }

    #[test]
    fn test_short_colour_roi_falls_back_to_sentinel_ratios() {
        let inspector = Inspector::new(InspectionConfig::default()).unwrap();
        let image = Mat::new_rows_cols_with_default(600, 800, CV_8UC3, Scalar::all(255.0)).unwrap();
        // three rows left below the boundary, fewer than the colour inset
        let point = boundary(image.rows() - 3, 26);

        let zone = inspector.measure_zone(&image, 400, &point).unwrap();
        assert_eq!(zone.status, ZoneStatus::Measured);
        assert_eq!(zone.discontinuity.ratios(), ChannelRatios::sentinel());
        for ratio in [
            zone.discontinuity.white,
            zone.discontinuity.red,
            zone.discontinuity.green,
            zone.discontinuity.blue,
        ] {
            assert_eq!(ratio, 1.0);
        }
        assert_eq!(zone.shift.pixel_shift, 0);
        assert!(zone.passed);
    }

    #[test]
    fn test_debug_crop_placeholder_for_roi_error() {
        let image = Mat::new_rows_cols_with_default(600, 800, CV_8UC3, Scalar::all(255.0)).unwrap();
        let zone = ZoneResult::sentinel(0, Region::new(58, 1040, 60, 30));
        let crop = debug_crop(&image, &zone).unwrap();
        assert_eq!((crop.rows(), crop.cols()), (100, 280));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(InspectionStage::Measuring(2).to_string(), "measuring zone 2");
        assert_eq!(InspectionStage::Done.to_string(), "done");
    }
}
