//! Configuration structures for the seam inspection pipeline.
//!
//! The top-level [`InspectionConfig`] carries the operator-facing thresholds
//! (the values exposed as sliders on the station UI) plus one section of
//! geometry and colour constants per pipeline stage.
//!
//! # Configuration Loading
//!
//! ```no_run
//! use seam_inspect::InspectionConfig;
//! use std::path::Path;
//!
//! // Load from file (validated on load)
//! let config = InspectionConfig::from_json_file(Path::new("station.json"))?;
//!
//! // Or build from the operator thresholds, keeping station defaults elsewhere
//! let config = InspectionConfig::new(18.0, 0.18, 5, 0.2, false)?;
//! # Ok::<(), seam_inspect::InspectionError>(())
//! ```
//!
//! A config is a snapshot: an [`crate::Inspector`] copies it at construction,
//! so adjusting thresholds while a batch is running never affects an
//! inspection that has already started.

use crate::constants;
use crate::error::{InspectionError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete inspection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectionConfig {
    /// Minimum intensity drop (per row) for an edge to survive noise suppression
    pub diff_threshold: f64,

    /// Valley strength ratio under which two valleys are two distinct edges (0.0-1.0)
    pub rate_threshold: f64,

    /// Zones with a pixel shift at or above this value fail
    pub fail_threshold_px: i32,

    /// Maximum per-quadrant distortion ratio
    pub distortion_threshold: f64,

    /// Evaluate the coarse distortion check
    pub check_distortion: bool,

    /// Target Locator parameters
    pub locator: LocatorConfig,

    /// Boundary Resolver parameters
    pub boundary: BoundaryConfig,

    /// Shift Analyzer geometry
    pub shift: ShiftConfig,

    /// Discontinuity Analyzer parameters
    pub discontinuity: DiscontinuityConfig,
}

/// Target Locator parameters.
///
/// The locator scans one window per horizontal quadrant for a red marker
/// contour of plausible size and maps its position onto a calibration column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Calibration column of the first seam; quadrant windows are centred at
    /// `first_column + k * width / 4`
    pub first_column: i32,

    /// Calibration columns reported for a marker, one per breakpoint
    pub calibration_columns: Vec<i32>,

    /// A marker centred at or left of `column_breakpoints[k]` (and right of the
    /// previous breakpoint) maps to `calibration_columns[k]`
    pub column_breakpoints: Vec<i32>,

    /// Row the search windows are centred on
    pub nominal_row: i32,

    /// Half-width of a search window
    pub window_half_width: i32,

    /// Window extent above the nominal row
    pub window_above: i32,

    /// Window extent below the nominal row
    pub window_below: i32,

    /// Maximum green/red ratio of a red-like pixel
    pub green_red_ratio: f64,

    /// Maximum blue/red ratio of a red-like pixel
    pub blue_red_ratio: f64,

    /// Binarisation threshold (0-255)
    pub binary_threshold: f64,

    /// Black columns prepended to the mask before contour extraction
    pub pad_columns: i32,

    /// Minimum contour width (exclusive)
    pub min_marker_width: i32,

    /// Minimum contour height (exclusive)
    pub min_marker_height: i32,

    /// Maximum contour height (exclusive)
    pub max_marker_height: i32,
}

/// Which side's colour ratios gate the red-row classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioSource {
    /// Each side is classified with its own green/red and blue/red ratios
    OwnSide,
    /// Both sides are gated by the right side's ratios (legacy station behaviour)
    RightSide,
}

/// Boundary Resolver parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Half-width of the strip around the seam column
    pub strip_half_width: i32,

    /// Columns dropped next to the seam on each side
    pub strip_inset: i32,

    /// Maximum green/red ratio of a red row
    pub green_red_ratio: f64,

    /// Maximum blue/red ratio of a red row
    pub blue_red_ratio: f64,

    /// Minimum mean red value of a red row (exclusive)
    pub red_threshold: f64,

    /// Lower row bound (exclusive)
    pub valid_row_min: i32,

    /// Upper row bound (exclusive)
    pub valid_row_max: i32,

    /// Gap between red rows that starts a new target
    pub band_gap: i32,

    /// Maximum boundaries reported
    pub max_boundaries: usize,

    /// Per-zone floor for the measured band height
    pub min_band_heights: Vec<i32>,

    /// Right-over-left lead that triggers the sampling-bias correction
    pub calibration_trigger: i32,

    /// Ratio source for the red-row classification
    pub ratio_source: RatioSource,
}

/// Shift Analyzer geometry and output limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftConfig {
    /// Minimum valley height in the negated difference sequence
    pub valley_min_height: f64,

    /// Half-width of the shift ROI
    pub roi_half_width: i32,

    /// ROI rows above the boundary
    pub roi_above: i32,

    /// ROI rows below the boundary
    pub roi_below: i32,

    /// Columns averaged on each side of a centre line
    pub side_band_width: i32,

    /// Cap applied to the aggregated shift
    pub max_shift: i32,

    /// Correction subtracted when the boundary needs calibration
    pub calibration_correction: i32,
}

/// Discontinuity Analyzer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscontinuityConfig {
    /// Half-width of the colour ROI
    pub roi_half_width: i32,

    /// Colour ROI height in band heights
    pub roi_bands: i32,

    /// Rows skipped at the top of the colour region
    pub top_inset: i32,

    /// Rows skipped at the bottom of the colour region
    pub bottom_inset: i32,

    /// Rows skipped at the top of the grayscale region
    pub gray_top_inset: i32,

    /// Columns skipped on each side of the split
    pub seam_gap: i32,

    /// Blue row means above this are discarded
    pub blue_saturation_limit: f64,

    /// Number of brightest row means averaged
    pub top_n: usize,

    /// Refine each ratio with point patches at the band centres
    pub patch_refinement: bool,

    /// Horizontal patch distance from the seam
    pub patch_offset: i32,

    /// Half-size of a patch
    pub patch_half_size: i32,
}

impl Default for InspectionConfig {
    fn default() -> Self {
        Self {
            diff_threshold: constants::shift::DIFF_THRESHOLD,
            rate_threshold: constants::shift::RATE_THRESHOLD,
            fail_threshold_px: constants::verdict::FAIL_THRESHOLD_PX,
            distortion_threshold: constants::verdict::DISTORTION_THRESHOLD,
            check_distortion: false,
            locator: LocatorConfig::default(),
            boundary: BoundaryConfig::default(),
            shift: ShiftConfig::default(),
            discontinuity: DiscontinuityConfig::default(),
        }
    }
}

impl Default for LocatorConfig {
    fn default() -> Self {
        use constants::locator::*;
        Self {
            first_column: FIRST_COLUMN,
            calibration_columns: CALIBRATION_COLUMNS.to_vec(),
            column_breakpoints: COLUMN_BREAKPOINTS.to_vec(),
            nominal_row: NOMINAL_ROW,
            window_half_width: WINDOW_HALF_WIDTH,
            window_above: WINDOW_ABOVE,
            window_below: WINDOW_BELOW,
            green_red_ratio: GREEN_RED_RATIO,
            blue_red_ratio: BLUE_RED_RATIO,
            binary_threshold: BINARY_THRESHOLD,
            pad_columns: PAD_COLUMNS,
            min_marker_width: MIN_MARKER_WIDTH,
            min_marker_height: MIN_MARKER_HEIGHT,
            max_marker_height: MAX_MARKER_HEIGHT,
        }
    }
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        use constants::boundary::*;
        Self {
            strip_half_width: STRIP_HALF_WIDTH,
            strip_inset: STRIP_INSET,
            green_red_ratio: GREEN_RED_RATIO,
            blue_red_ratio: BLUE_RED_RATIO,
            red_threshold: RED_THRESHOLD,
            valid_row_min: VALID_ROW_MIN,
            valid_row_max: VALID_ROW_MAX,
            band_gap: BAND_GAP,
            max_boundaries: MAX_BOUNDARIES,
            min_band_heights: MIN_BAND_HEIGHTS.to_vec(),
            calibration_trigger: CALIBRATION_TRIGGER,
            ratio_source: RatioSource::OwnSide,
        }
    }
}

impl Default for ShiftConfig {
    fn default() -> Self {
        use constants::shift::*;
        Self {
            valley_min_height: VALLEY_MIN_HEIGHT,
            roi_half_width: ROI_HALF_WIDTH,
            roi_above: ROI_ABOVE,
            roi_below: ROI_BELOW,
            side_band_width: SIDE_BAND_WIDTH,
            max_shift: MAX_SHIFT,
            calibration_correction: CALIBRATION_CORRECTION,
        }
    }
}

impl Default for DiscontinuityConfig {
    fn default() -> Self {
        use constants::discontinuity::*;
        Self {
            roi_half_width: ROI_HALF_WIDTH,
            roi_bands: ROI_BANDS,
            top_inset: TOP_INSET,
            bottom_inset: BOTTOM_INSET,
            gray_top_inset: GRAY_TOP_INSET,
            seam_gap: SEAM_GAP,
            blue_saturation_limit: BLUE_SATURATION_LIMIT,
            top_n: TOP_N,
            patch_refinement: false,
            patch_offset: PATCH_OFFSET,
            patch_half_size: PATCH_HALF_SIZE,
        }
    }
}

impl LocatorConfig {
    /// Map an absolute marker centre onto its calibration column
    pub fn calibration_column(&self, center_x: i32) -> Option<i32> {
        self.column_breakpoints
            .iter()
            .position(|&breakpoint| center_x <= breakpoint)
            .and_then(|index| self.calibration_columns.get(index).copied())
    }
}

impl BoundaryConfig {
    /// Band height floor for a zone (0 when the zone has no configured floor)
    pub fn min_band_height(&self, zone: usize) -> i32 {
        self.min_band_heights.get(zone).copied().unwrap_or(0)
    }
}

impl InspectionConfig {
    /// Create a validated configuration from the operator thresholds,
    /// using station defaults for everything else
    pub fn new(
        diff_threshold: f64,
        rate_threshold: f64,
        fail_threshold_px: i32,
        distortion_threshold: f64,
        check_distortion: bool,
    ) -> Result<Self> {
        let config = Self {
            diff_threshold,
            rate_threshold,
            fail_threshold_px,
            distortion_threshold,
            check_distortion,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject thresholds and geometry that cannot produce a meaningful verdict
    pub fn validate(&self) -> Result<()> {
        if !self.diff_threshold.is_finite() || self.diff_threshold < 0.0 {
            return Err(InspectionError::invalid_parameter("diff_threshold", self.diff_threshold));
        }
        if !(0.0..=1.0).contains(&self.rate_threshold) {
            return Err(InspectionError::invalid_parameter("rate_threshold", self.rate_threshold));
        }
        if self.fail_threshold_px < 1 {
            return Err(InspectionError::invalid_parameter(
                "fail_threshold_px",
                self.fail_threshold_px,
            ));
        }
        if !self.distortion_threshold.is_finite() || self.distortion_threshold < 0.0 {
            return Err(InspectionError::invalid_parameter(
                "distortion_threshold",
                self.distortion_threshold,
            ));
        }
        self.locator.validate()?;
        self.boundary.validate()?;
        self.shift.validate()?;
        self.discontinuity.validate()?;
        Ok(())
    }

    /// Load configuration from a JSON file and validate it
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            InspectionError::config_io(format!("Failed to read {}", path.display()), e)
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            InspectionError::config_io(format!("Failed to parse {}", path.display()), e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| InspectionError::config_io("Failed to serialize configuration", e))?;
        std::fs::write(path, json).map_err(|e| {
            InspectionError::config_io(format!("Failed to write {}", path.display()), e)
        })?;
        Ok(())
    }
}

fn require_positive(parameter: &str, value: i32) -> Result<()> {
    if value <= 0 {
        return Err(InspectionError::invalid_parameter(parameter, value));
    }
    Ok(())
}

fn require_ratio(parameter: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(InspectionError::invalid_parameter(parameter, value));
    }
    Ok(())
}

impl LocatorConfig {
    fn validate(&self) -> Result<()> {
        require_positive("locator.window_half_width", self.window_half_width)?;
        require_positive("locator.min_marker_width", self.min_marker_width)?;
        require_ratio("locator.green_red_ratio", self.green_red_ratio)?;
        require_ratio("locator.blue_red_ratio", self.blue_red_ratio)?;
        if self.window_above + self.window_below <= 0 {
            return Err(InspectionError::invalid_parameter(
                "locator.window_below",
                self.window_below,
            ));
        }
        if self.pad_columns < 0 {
            return Err(InspectionError::invalid_parameter("locator.pad_columns", self.pad_columns));
        }
        if self.min_marker_height >= self.max_marker_height {
            return Err(InspectionError::invalid_parameter(
                "locator.max_marker_height",
                self.max_marker_height,
            ));
        }
        if self.calibration_columns.is_empty()
            || self.calibration_columns.len() != self.column_breakpoints.len()
        {
            return Err(InspectionError::invalid_parameter(
                "locator.calibration_columns",
                format!("{:?}", self.calibration_columns),
            ));
        }
        if !self.column_breakpoints.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(InspectionError::invalid_parameter(
                "locator.column_breakpoints",
                format!("{:?}", self.column_breakpoints),
            ));
        }
        Ok(())
    }
}

impl BoundaryConfig {
    fn validate(&self) -> Result<()> {
        require_positive("boundary.strip_half_width", self.strip_half_width)?;
        require_positive("boundary.band_gap", self.band_gap)?;
        require_ratio("boundary.green_red_ratio", self.green_red_ratio)?;
        require_ratio("boundary.blue_red_ratio", self.blue_red_ratio)?;
        if self.strip_inset < 0 || self.strip_inset >= self.strip_half_width {
            return Err(InspectionError::invalid_parameter("boundary.strip_inset", self.strip_inset));
        }
        if self.valid_row_min >= self.valid_row_max {
            return Err(InspectionError::invalid_parameter(
                "boundary.valid_row_max",
                self.valid_row_max,
            ));
        }
        if self.max_boundaries == 0 {
            return Err(InspectionError::invalid_parameter("boundary.max_boundaries", 0));
        }
        Ok(())
    }
}

impl ShiftConfig {
    fn validate(&self) -> Result<()> {
        require_positive("shift.roi_half_width", self.roi_half_width)?;
        require_positive("shift.side_band_width", self.side_band_width)?;
        require_positive("shift.max_shift", self.max_shift)?;
        if self.roi_above + self.roi_below < 3 {
            return Err(InspectionError::invalid_parameter("shift.roi_below", self.roi_below));
        }
        if self.calibration_correction < 0 {
            return Err(InspectionError::invalid_parameter(
                "shift.calibration_correction",
                self.calibration_correction,
            ));
        }
        Ok(())
    }
}

impl DiscontinuityConfig {
    fn validate(&self) -> Result<()> {
        require_positive("discontinuity.roi_half_width", self.roi_half_width)?;
        require_positive("discontinuity.roi_bands", self.roi_bands)?;
        require_positive("discontinuity.patch_half_size", self.patch_half_size)?;
        if self.top_n == 0 {
            return Err(InspectionError::invalid_parameter("discontinuity.top_n", 0));
        }
        if self.top_inset < 0 || self.bottom_inset < 0 || self.seam_gap < 0 {
            return Err(InspectionError::invalid_parameter(
                "discontinuity.top_inset",
                format!("{}/{}/{}", self.top_inset, self.bottom_inset, self.seam_gap),
            ));
        }
        Ok(())
    }
}
