//! # Seam Inspect
//!
//! A Rust crate for inspecting the seams of stitched multi-camera panels from
//! a single photograph of a calibration target.
//!
//! Every seam carries a four-band target (black, red, green, blue on white).
//! The library:
//! - Locates the target markers in the four horizontal quadrants
//! - Resolves the band boundaries on both sides of the seam
//! - Measures the vertical pixel shift between the two camera images
//! - Quantifies brightness and per-channel discontinuity across the seam
//! - Aggregates a per-zone and per-image pass/fail verdict
//!
//! ## Example
//!
//! ```rust,no_run
//! use seam_inspect::{inspect_file, InspectionConfig};
//! use std::path::Path;
//!
//! let config = InspectionConfig::default();
//! let result = inspect_file(Path::new("panel.bmp"), &config)?;
//! for zone in &result.zones {
//!     println!("zone {}: {} px", zone.shift.zone, zone.shift.pixel_shift);
//! }
//! println!("{}", if result.passed { "PASS" } else { "FAIL" });
//! # Ok::<(), seam_inspect::InspectionError>(())
//! ```

pub mod analysis;
pub mod batch;
pub mod config;
pub mod constants;
pub mod detection;
pub mod error;
pub mod image_loader;
pub mod inspection;
pub mod region;
pub mod report;
pub mod synthetic;

pub use analysis::{DiscontinuityMeasurement, ShiftMeasurement};
pub use batch::{BatchInspector, BatchSummary};
pub use config::{InspectionConfig, RatioSource};
pub use detection::{BoundaryPoint, DistortionReport, SeamTarget};
pub use error::{InspectionError, Result};
pub use inspection::{
    debug_crop, inspect_file, inspect_image, InspectionResult, InspectionStage, Inspector, ZoneResult,
    ZoneStatus,
};
pub use region::Region;
pub use report::ReportRow;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspection_result_serialization() {
        let result = InspectionResult {
            zones: vec![ZoneResult {
                shift: ShiftMeasurement { zone: 0, pixel_shift: 3 },
                discontinuity: DiscontinuityMeasurement {
                    zone: 0,
                    white: 0.01,
                    red: 0.02,
                    green: 0.0,
                    blue: 0.5,
                },
                passed: true,
                status: ZoneStatus::Measured,
                rect: Region::new(58, 606, 60, 28),
                left_edge: 7,
                right_edge: 10,
            }],
            target: Some(SeamTarget {
                quadrant: 0,
                expected_x: 88,
                found_y: 1440,
                band_height: 26,
                center_x: 94,
            }),
            distortion: None,
            passed: true,
        };

        let json = serde_json::to_string(&result).unwrap();
        let deserialized: InspectionResult = serde_json::from_str(&json).unwrap();

        assert_eq!(result, deserialized);
        assert!(json.contains("\"status\":\"measured\""));
    }
}
