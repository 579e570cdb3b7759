//! Calibration constants and reference values for seam inspection
//!
//! These are the defaults used on the 100 cm test station. Most of them were
//! tuned empirically against the station's calibration image set; they are
//! exposed through [`crate::config`] so a line can recalibrate them without
//! touching the algorithms. Changing any of them requires re-validating
//! against the calibration dataset.

/// Target Locator defaults
pub mod locator {
    /// Calibration column of the first seam (pixels)
    pub const FIRST_COLUMN: i32 = 88;

    /// Fixed calibration columns, one per seam
    pub const CALIBRATION_COLUMNS: [i32; 4] = [88, 88 + 1920, 88 + 1920 * 2, 88 + 1920 * 3];

    /// Breakpoints mapping a marker centre to a calibration column
    pub const COLUMN_BREAKPOINTS: [i32; 4] = [1050, 3050, 5050, 7050];

    /// Nominal row of the middle calibration target
    pub const NOMINAL_ROW: i32 = 1440;

    /// Half-width of each quadrant search window, `(ave_large + 100) / 2`
    pub const WINDOW_HALF_WIDTH: i32 = (310 + 100) / 2;

    /// Window extent above the nominal row
    pub const WINDOW_ABOVE: i32 = 50;

    /// Window extent below the nominal row
    pub const WINDOW_BELOW: i32 = 150;

    /// Maximum green/red ratio of a red-like pixel
    pub const GREEN_RED_RATIO: f64 = 0.75;

    /// Maximum blue/red ratio of a red-like pixel
    pub const BLUE_RED_RATIO: f64 = 0.75;

    /// Binarisation threshold of the red-likeness buffer
    pub const BINARY_THRESHOLD: f64 = 120.0;

    /// Black columns prepended before contour extraction
    pub const PAD_COLUMNS: i32 = 3;

    /// Nominal marker width on the 100 cm station
    pub const NOMINAL_MARKER_WIDTH: i32 = 200;

    /// Nominal red band height on the 100 cm station
    pub const NOMINAL_BAND_HEIGHT: i32 = 30;

    /// Contours must be wider than this
    pub const MIN_MARKER_WIDTH: i32 = NOMINAL_MARKER_WIDTH - 20;

    /// Contours must be taller than this
    pub const MIN_MARKER_HEIGHT: i32 = NOMINAL_BAND_HEIGHT - 20;

    /// Contours must be shorter than this
    pub const MAX_MARKER_HEIGHT: i32 = NOMINAL_BAND_HEIGHT + 40;
}

/// Boundary Resolver defaults
pub mod boundary {
    /// Half-width of the vertical strip around the seam column
    pub const STRIP_HALF_WIDTH: i32 = 20;

    /// Columns dropped next to the seam when averaging each side
    pub const STRIP_INSET: i32 = 7;

    /// Maximum green/red ratio of a red row
    pub const GREEN_RED_RATIO: f64 = 0.75;

    /// Maximum blue/red ratio of a red row
    pub const BLUE_RED_RATIO: f64 = 0.70;

    /// Minimum mean red value of a red row
    pub const RED_THRESHOLD: f64 = 120.0;

    /// Rows at or above this index are ignored
    pub const VALID_ROW_MIN: i32 = 400;

    /// Rows at or below this index are ignored
    pub const VALID_ROW_MAX: i32 = 2650;

    /// A gap larger than this between red rows starts a new target
    pub const BAND_GAP: i32 = 750;

    /// Maximum number of boundaries per seam
    pub const MAX_BOUNDARIES: usize = 3;

    /// Floor for the measured band height, per zone
    pub const MIN_BAND_HEIGHTS: [i32; 3] = [27, 26, 26];

    /// Right boundary must trail the left one by more than this to trigger
    /// the sampling-bias correction
    pub const CALIBRATION_TRIGGER: i32 = 1;
}

/// Shift Analyzer defaults
pub mod shift {
    /// Difference values not below `-DIFF_THRESHOLD` are treated as noise
    pub const DIFF_THRESHOLD: f64 = 10.0;

    /// Relative strength gap under which two valleys count as two real edges
    pub const RATE_THRESHOLD: f64 = 0.1;

    /// Minimum height of a valley in the negated difference sequence
    pub const VALLEY_MIN_HEIGHT: f64 = 1.0;

    /// Half-width of the shift ROI around the seam column
    pub const ROI_HALF_WIDTH: i32 = 30;

    /// ROI rows above the boundary row
    pub const ROI_ABOVE: i32 = 8;

    /// ROI rows below the boundary row
    pub const ROI_BELOW: i32 = 20;

    /// Columns averaged on each side of a centre line
    pub const SIDE_BAND_WIDTH: i32 = 5;

    /// Reported shifts are capped at this value
    pub const MAX_SHIFT: i32 = 15;

    /// Correction applied when the right sampling window trails the left one
    pub const CALIBRATION_CORRECTION: i32 = 1;
}

/// Discontinuity Analyzer defaults
pub mod discontinuity {
    /// Half-width of the colour ROI around the seam column
    pub const ROI_HALF_WIDTH: i32 = 30;

    /// Colour ROI height in band heights
    pub const ROI_BANDS: i32 = 5;

    /// Rows skipped at the top of the colour region
    pub const TOP_INSET: i32 = 15;

    /// Rows skipped at the bottom of the colour region
    pub const BOTTOM_INSET: i32 = 3;

    /// Rows skipped at the top of the grayscale region
    pub const GRAY_TOP_INSET: i32 = 5;

    /// Columns skipped on each side of the split
    pub const SEAM_GAP: i32 = 5;

    /// Blue row means above this are treated as blown out
    pub const BLUE_SATURATION_LIMIT: f64 = 128.0;

    /// Number of brightest row means averaged per channel
    pub const TOP_N: usize = 10;

    /// Horizontal distance of the refinement patches from the seam
    pub const PATCH_OFFSET: i32 = 10;

    /// Half-size of a refinement patch
    pub const PATCH_HALF_SIZE: i32 = 5;
}

/// Pass/fail defaults
pub mod verdict {
    /// Zones with a shift at or above this fail
    pub const FAIL_THRESHOLD_PX: i32 = 4;

    /// Maximum relative marker height deviation per quadrant
    pub const DISTORTION_THRESHOLD: f64 = 0.2;

    /// Shift reported for zones whose target could not be found
    pub const SENTINEL_SHIFT: i32 = 100;

    /// Discontinuity reported when a region cannot be measured
    pub const SENTINEL_DISCONTINUITY: f64 = 1.0;

    /// Zones reported per seam
    pub const ZONE_COUNT: usize = 3;

    /// Row spacing of sentinel zone rectangles around the nominal row
    pub const SENTINEL_ZONE_SPACING: i32 = 400;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_geometry() {
        assert_eq!(locator::WINDOW_HALF_WIDTH, 205);
        assert_eq!(locator::CALIBRATION_COLUMNS[0], locator::FIRST_COLUMN);
        assert!(locator::COLUMN_BREAKPOINTS.windows(2).all(|w| w[0] < w[1]));
        for (column, breakpoint) in locator::CALIBRATION_COLUMNS.iter().zip(locator::COLUMN_BREAKPOINTS) {
            assert!(*column <= breakpoint);
        }
    }

    #[test]
    fn test_threshold_ranges() {
        assert!(locator::MIN_MARKER_HEIGHT < locator::MAX_MARKER_HEIGHT);
        assert!(boundary::VALID_ROW_MIN < boundary::VALID_ROW_MAX);
        assert!(boundary::STRIP_INSET < boundary::STRIP_HALF_WIDTH);
        assert!(shift::RATE_THRESHOLD > 0.0 && shift::RATE_THRESHOLD < 1.0);
        assert!(verdict::SENTINEL_SHIFT > shift::MAX_SHIFT);
    }
}
