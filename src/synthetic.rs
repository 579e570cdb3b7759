//! Synthetic calibration panels
//!
//! Renders the four-band calibration target at every seam of a panel, with
//! optional vertical misalignment or brightness mismatch of the right camera
//! half. Used by tests, benches and demos to exercise the pipeline on images
//! with a known answer.
//!
//! Each zone is drawn as black, red, green, blue and white bands of equal
//! height, `marker_half_width` either side of the seam, starting one band
//! above the zone's red row. The red band of the zone closest to the
//! locator's nominal row doubles as the marker bar.

use crate::config::{InspectionConfig, LocatorConfig};
use crate::error::{InspectionError, Result};
use opencv::{
    core::{Mat, Rect, Scalar, CV_8UC3},
    imgproc::{self, FILLED, LINE_8},
};

/// Band colours in BGR, top to bottom
const BANDS: [[f64; 3]; 5] = [
    [0.0, 0.0, 0.0],
    [30.0, 30.0, 220.0],
    [30.0, 200.0, 30.0],
    [200.0, 30.0, 30.0],
    [255.0, 255.0, 255.0],
];

#[derive(Debug, Clone)]
pub struct SyntheticPanel {
    pub width: i32,
    pub height: i32,
    /// Red band row of each zone
    pub zone_rows: Vec<i32>,
    pub band_height: i32,
    pub marker_half_width: i32,
    /// Rows the right half of each zone is moved down (negative: up)
    pub offsets: Vec<i32>,
    /// Brightness factor applied to the right half of every band
    pub right_gain: f64,
    /// Locator geometry matching the seam layout
    pub locator: LocatorConfig,
}

impl SyntheticPanel {
    /// Full-resolution station panel: 7680x2600, seams every 1920 columns
    pub fn station() -> Self {
        Self {
            width: 7680,
            height: 2600,
            zone_rows: vec![640, 1440, 2240],
            band_height: 26,
            marker_half_width: 100,
            offsets: vec![0; 3],
            right_gain: 1.0,
            locator: LocatorConfig::default(),
        }
    }

    /// Narrow panel with seams at 200, 600, 1000 and 1400
    pub fn compact() -> Self {
        let seams = vec![200, 600, 1000, 1400];
        Self {
            width: 1600,
            height: 2400,
            locator: LocatorConfig {
                first_column: seams[0],
                column_breakpoints: seams.iter().map(|s| s + 200).collect(),
                calibration_columns: seams,
                ..LocatorConfig::default()
            },
            ..Self::station()
        }
    }

    /// Misalign the right half of `zone` by `offset` rows
    pub fn with_offset(mut self, zone: usize, offset: i32) -> Self {
        if let Some(slot) = self.offsets.get_mut(zone) {
            *slot = offset;
        }
        self
    }

    pub fn with_right_gain(mut self, gain: f64) -> Self {
        self.right_gain = gain;
        self
    }

    /// Seam columns the targets are drawn at
    pub fn seams(&self) -> &[i32] {
        &self.locator.calibration_columns
    }

    /// Default configuration with the locator geometry of this panel
    pub fn config(&self) -> InspectionConfig {
        InspectionConfig {
            locator: self.locator.clone(),
            ..InspectionConfig::default()
        }
    }

    /// Render the panel as a BGR image
    pub fn render(&self) -> Result<Mat> {
        let mut image = Mat::new_rows_cols_with_default(self.height, self.width, CV_8UC3, Scalar::all(255.0))
            .map_err(|e| InspectionError::opencv("panel allocation", e))?;

        for &seam in self.seams() {
            for (zone, &row) in self.zone_rows.iter().enumerate() {
                let offset = self.offsets.get(zone).copied().unwrap_or(0);
                self.draw_half(&mut image, seam - self.marker_half_width, row, 1.0)?;
                self.draw_half(&mut image, seam, row + offset, self.right_gain)?;
            }
        }
        Ok(image)
    }

    /// Draw the five bands of one target half starting at column `x`
    fn draw_half(&self, image: &mut Mat, x: i32, red_row: i32, gain: f64) -> Result<()> {
        let top = red_row - self.band_height;
        for (k, bgr) in BANDS.iter().enumerate() {
            let rect = Rect::new(x, top + k as i32 * self.band_height, self.marker_half_width, self.band_height);
            let color = Scalar::new(
                (bgr[0] * gain).min(255.0),
                (bgr[1] * gain).min(255.0),
                (bgr[2] * gain).min(255.0),
                0.0,
            );
            imgproc::rectangle(image, rect, color, FILLED, LINE_8, 0)
                .map_err(|e| InspectionError::opencv("panel band", e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::Vec3b;
    use opencv::prelude::*;

    fn pixel(image: &Mat, row: i32, col: i32) -> [u8; 3] {
        let px: &Vec3b = image.at_2d(row, col).unwrap();
        [px[0], px[1], px[2]]
    }

    #[test]
    fn test_compact_layout() {
        let panel = SyntheticPanel::compact();
        let image = panel.render().unwrap();
        assert_eq!((image.cols(), image.rows()), (1600, 2400));

        // zone 0 at seam 600: black above the red row, red from it
        assert_eq!(pixel(&image, 639, 590), [0, 0, 0]);
        assert_eq!(pixel(&image, 640, 590), [30, 30, 220]);
        assert_eq!(pixel(&image, 640, 610), [30, 30, 220]);
        assert_eq!(pixel(&image, 640 + 26, 610), [30, 200, 30]);
        assert_eq!(pixel(&image, 640, 300), [255, 255, 255]);
    }

    #[test]
    fn test_right_half_offset() {
        let image = SyntheticPanel::compact().with_offset(0, 4).render().unwrap();
        assert_eq!(pixel(&image, 640, 590), [30, 30, 220]);
        assert_eq!(pixel(&image, 640, 610), [0, 0, 0]);
        assert_eq!(pixel(&image, 644, 610), [30, 30, 220]);
    }

    #[test]
    fn test_config_maps_markers_to_seams() {
        let panel = SyntheticPanel::compact();
        let config = panel.config();
        assert_eq!(config.locator.calibration_column(600), Some(600));
        assert_eq!(config.locator.calibration_column(1400), Some(1400));
        assert!(config.validate().is_ok());
    }
}
