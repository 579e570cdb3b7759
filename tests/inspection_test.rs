//! Integration tests for the complete seam inspection pipeline
//!
//! These tests render synthetic calibration panels with known misalignment
//! and check the end-to-end behaviour:
//! - Aligned seams measure zero shift
//! - Injected offsets are recovered within one pixel
//! - Missing targets give failing sentinel zones instead of errors
//! - Discontinuity ratios track brightness mismatch across the seam
//! - Results are deterministic and the inspector is shareable across threads

use seam_inspect::analysis::ShiftAnalyzer;
use seam_inspect::synthetic::SyntheticPanel;
use seam_inspect::{
    debug_crop, inspect_file, inspect_image, InspectionConfig, InspectionResult, Inspector, RatioSource,
    ZoneStatus,
};
use opencv::core::{Mat, Scalar, Vec3b, CV_8UC3};
use opencv::prelude::*;

fn inspect(panel: &SyntheticPanel) -> InspectionResult {
    let image = panel.render().unwrap();
    inspect_image(&image, &panel.config()).unwrap()
}

fn shifts(result: &InspectionResult) -> Vec<i32> {
    result.shifts().iter().map(|s| s.pixel_shift).collect()
}

// ============================================================================
// Shift Measurement
// ============================================================================

#[test]
fn test_aligned_panel_has_zero_shift() {
    let result = inspect(&SyntheticPanel::compact());

    assert_eq!(shifts(&result), vec![0, 0, 0]);
    assert!(result.passed);
    assert!(result.zones.iter().all(|z| z.status == ZoneStatus::Measured));
    assert_eq!(result.target.unwrap().expected_x, 200);
}

#[test]
fn test_injected_offset_recovered_within_one_pixel() {
    for d in 1..=14 {
        for offset in [d, -d] {
            let result = inspect(&SyntheticPanel::compact().with_offset(1, offset));
            let measured = result.shifts()[1].pixel_shift;
            assert!(
                (measured - d).abs() <= 1,
                "offset {} measured as {}",
                offset,
                measured
            );
            assert!((0..=15).contains(&measured));
            assert_eq!(result.shifts()[0].pixel_shift, 0, "offset {}", offset);
            assert_eq!(result.shifts()[2].pixel_shift, 0, "offset {}", offset);
        }
    }
}

#[test]
fn test_calibration_correction_on_trailing_right_half() {
    let trailing = inspect(&SyntheticPanel::compact().with_offset(1, 6));
    assert_eq!(trailing.shifts()[1].pixel_shift, 5);

    let leading = inspect(&SyntheticPanel::compact().with_offset(1, -6));
    assert_eq!(leading.shifts()[1].pixel_shift, 6);
}

#[test]
fn test_large_alignment_offset_overrides_cap() {
    let result = inspect(&SyntheticPanel::compact().with_offset(1, 20));
    // the right edge leaves the shift ROI; the boundary offset of 20 is reported
    // instead, minus the correction
    assert_eq!(result.shifts()[1].pixel_shift, 19);
    assert!(!result.passed);
}

#[test]
fn test_rate_threshold_sweep_flips_classification() {
    // drops of 100 and 80, nine rows apart: rate = 0.2
    let mut profile = vec![255.0; 28];
    for v in profile.iter_mut().skip(6) {
        *v = 155.0;
    }
    for v in profile.iter_mut().skip(15) {
        *v = 75.0;
    }

    for rate in [0.05, 0.1, 0.15, 0.19, 0.21, 0.25, 0.3, 0.35, 0.4, 0.45] {
        let line = ShiftAnalyzer::new(10.0, rate).analyze_center_line(&profile, &profile);
        let expected = if rate > 0.2 { 9 } else { 0 };
        assert_eq!(line.shift, expected, "rate threshold {}", rate);
    }
}

// ============================================================================
// Station Scenario
// ============================================================================

#[test]
fn test_station_scenario_single_misaligned_zone() {
    let panel = SyntheticPanel::station().with_offset(1, 6);
    let image = panel.render().unwrap();
    let config = InspectionConfig::default();
    assert_eq!(config.fail_threshold_px, 4);

    let result = inspect_image(&image, &config).unwrap();

    let target = result.target.unwrap();
    assert_eq!(target.expected_x, 88);
    assert_eq!(result.zones.len(), 3);

    assert_eq!(result.zones[0].shift.pixel_shift, 0);
    assert!(result.zones[0].passed);
    assert!((result.zones[1].shift.pixel_shift - 6).abs() <= 1);
    assert!(!result.zones[1].passed);
    assert_eq!(result.zones[2].shift.pixel_shift, 0);
    assert!(result.zones[2].passed);
    assert!(!result.passed);
}

// ============================================================================
// Missing Targets
// ============================================================================

#[test]
fn test_no_red_content_gives_failing_sentinels() {
    let image = Mat::new_rows_cols_with_default(2600, 7680, CV_8UC3, Scalar::new(40.0, 160.0, 40.0, 0.0)).unwrap();
    let result = inspect_image(&image, &InspectionConfig::default()).unwrap();

    assert!(!result.passed);
    assert!(result.target.is_none());
    assert_eq!(result.zones.len(), 3);
    for zone in &result.zones {
        assert_eq!(zone.status, ZoneStatus::RoiError);
        assert_eq!(zone.shift.pixel_shift, 100);
        assert!(!zone.passed);
        let d = zone.discontinuity;
        assert_eq!((d.white, d.red, d.green, d.blue), (1.0, 1.0, 1.0, 1.0));
    }
}

#[test]
fn test_marker_without_bands_in_valid_rows() {
    // marker present, but the valid band rows exclude every red row
    let panel = SyntheticPanel::compact();
    let mut config = panel.config();
    config.boundary.valid_row_max = 500;

    let result = inspect_image(&panel.render().unwrap(), &config).unwrap();
    assert!(result.target.is_some());
    assert!(result.is_roi_error());
    assert_eq!(result.max_shift(), 100);
    assert!(!result.passed);
}

// ============================================================================
// Discontinuity
// ============================================================================

#[test]
fn test_identical_halves_have_zero_discontinuity() {
    let result = inspect(&SyntheticPanel::compact());
    for d in result.discontinuities() {
        assert_eq!((d.white, d.red, d.green, d.blue), (0.0, 0.0, 0.0, 0.0));
    }
}

#[test]
fn test_dimmer_right_half_raises_discontinuity() {
    let result = inspect(&SyntheticPanel::compact().with_right_gain(0.8));

    assert_eq!(shifts(&result), vec![0, 0, 0]);
    for d in result.discontinuities() {
        for ratio in [d.white, d.red, d.green, d.blue] {
            assert!(ratio > 0.05 && ratio <= 1.0, "ratio {}", ratio);
        }
    }
}

#[test]
fn test_patch_refinement_never_raises_ratios() {
    let panel = SyntheticPanel::compact().with_right_gain(0.8);
    let image = panel.render().unwrap();
    let mut config = panel.config();
    let plain = inspect_image(&image, &config).unwrap();

    config.discontinuity.patch_refinement = true;
    let refined = inspect_image(&image, &config).unwrap();

    for (p, r) in plain.discontinuities().iter().zip(refined.discontinuities()) {
        assert!(r.white <= p.white);
        assert!(r.red <= p.red);
        assert!(r.green <= p.green);
        assert!(r.blue <= p.blue);
    }
    assert_eq!(plain.shifts(), refined.shifts());
}

// ============================================================================
// Configuration Variants
// ============================================================================

#[test]
fn test_legacy_ratio_source_on_aligned_panel() {
    let panel = SyntheticPanel::compact();
    let mut config = panel.config();
    config.boundary.ratio_source = RatioSource::RightSide;

    let result = inspect_image(&panel.render().unwrap(), &config).unwrap();
    assert_eq!(shifts(&result), vec![0, 0, 0]);
    assert!(result.passed);
}

#[test]
fn test_distortion_check_on_uniform_markers() {
    let panel = SyntheticPanel::compact();
    let mut config = panel.config();
    config.check_distortion = true;

    let result = inspect_image(&panel.render().unwrap(), &config).unwrap();
    let report = result.distortion.as_ref().unwrap();
    assert_eq!(report.quadrants.len(), 4);
    assert_eq!(report.max_ratio(), 0.0);
    assert!(result.passed);
}

#[test]
fn test_distortion_failure_fails_image() {
    let panel = SyntheticPanel::compact();
    let mut image = panel.render().unwrap();
    // stretch the last quadrant's marker bar from 26 to 40 rows
    opencv::imgproc::rectangle(
        &mut image,
        opencv::core::Rect::new(1300, 1440, 200, 40),
        Scalar::new(30.0, 30.0, 220.0, 0.0),
        opencv::imgproc::FILLED,
        opencv::imgproc::LINE_8,
        0,
    )
    .unwrap();

    let mut config = panel.config();
    config.check_distortion = true;
    let result = inspect_image(&image, &config).unwrap();

    let report = result.distortion.as_ref().unwrap();
    assert_eq!(report.quadrants.len(), 4);
    assert_eq!(report.quadrants[3].band_height, 40);
    assert!(report.max_ratio() > config.distortion_threshold);
    assert!(!report.passed);

    assert_eq!(shifts(&result), vec![0, 0, 0]);
    assert!(result.zones.iter().all(|z| z.passed));
    assert!(!result.passed);

    config.check_distortion = false;
    assert!(inspect_image(&image, &config).unwrap().passed);
}

#[test]
fn test_fail_threshold_is_respected() {
    let panel = SyntheticPanel::compact().with_offset(0, 5);
    let image = panel.render().unwrap();

    let strict = inspect_image(&image, &panel.config()).unwrap();
    assert!(!strict.zones[0].passed);

    let mut lenient = panel.config();
    lenient.fail_threshold_px = 5;
    let result = inspect_image(&image, &lenient).unwrap();
    assert!(result.zones[0].passed);
    assert!(result.passed);
}

// ============================================================================
// Determinism, Threads, Files
// ============================================================================

#[test]
fn test_repeated_inspection_is_identical() {
    let panel = SyntheticPanel::compact().with_offset(2, 3).with_right_gain(0.9);
    let image = panel.render().unwrap();
    let inspector = Inspector::new(panel.config()).unwrap();

    let first = inspector.inspect(&image).unwrap();
    let second = inspector.inspect(&image).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_inspector_shared_across_threads() {
    let panels = [SyntheticPanel::compact(), SyntheticPanel::compact().with_offset(1, 8)];
    let inspector = Inspector::new(panels[0].config()).unwrap();

    let results: Vec<InspectionResult> = std::thread::scope(|scope| {
        let handles: Vec<_> = panels
            .iter()
            .map(|panel| {
                let inspector = &inspector;
                scope.spawn(move || inspector.inspect(&panel.render().unwrap()).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(results[0].passed);
    assert_eq!(results[1].shifts()[1].pixel_shift, 7);
}

#[test]
fn test_inspect_file_matches_in_memory() {
    let panel = SyntheticPanel::compact().with_offset(1, 5);
    let image = panel.render().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("panel.png");
    seam_inspect::image_loader::save_image(&path, &image).unwrap();

    let from_file = inspect_file(&path, &panel.config()).unwrap();
    let in_memory = inspect_image(&image, &panel.config()).unwrap();
    assert_eq!(from_file, in_memory);
}

#[test]
fn test_inspect_file_missing() {
    let err = inspect_file(std::path::Path::new("nonexistent_panel.bmp"), &InspectionConfig::default())
        .unwrap_err();
    assert!(matches!(err, seam_inspect::InspectionError::ImageLoadError { .. }));
}

#[test]
fn test_debug_crop_marks_edges() {
    let panel = SyntheticPanel::compact();
    let image = panel.render().unwrap();
    let result = inspect_image(&image, &panel.config()).unwrap();
    let zone = &result.zones[1];

    let crop = debug_crop(&image, zone).unwrap();
    assert_eq!((crop.cols(), crop.rows()), (60, 28));
    assert_eq!(zone.left_edge, 7);
    assert_eq!(zone.right_edge, 7);

    let left: &Vec3b = crop.at_2d(7, 5).unwrap();
    assert_eq!((left[0], left[1], left[2]), (0, 255, 0));
    let right: &Vec3b = crop.at_2d(7, 45).unwrap();
    assert_eq!((right[0], right[1], right[2]), (0, 0, 255));
}
