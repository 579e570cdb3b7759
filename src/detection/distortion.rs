//! Coarse lens distortion check across the four quadrant targets
//!
//! All markers are printed at the same height, so under an undistorted lens
//! their measured contour heights agree. Each quadrant's deviation from the
//! mean height is reported as a ratio of that mean.

use crate::detection::locator::SeamTarget;
use serde::{Deserialize, Serialize};

/// Distortion ratio of one located marker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadrantDistortion {
    pub quadrant: usize,
    pub band_height: i32,
    /// `|band_height - mean| / mean`
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistortionReport {
    pub quadrants: Vec<QuadrantDistortion>,
    pub threshold: f64,
    pub passed: bool,
}

impl DistortionReport {
    /// Largest per-quadrant ratio, 0.0 without targets
    pub fn max_ratio(&self) -> f64 {
        self.quadrants.iter().map(|q| q.ratio).fold(0.0, f64::max)
    }
}

/// Evaluate marker height consistency over the located targets.
///
/// With fewer than two targets there is nothing to compare and every ratio
/// is 0.0.
pub fn evaluate(targets: &[SeamTarget], threshold: f64) -> DistortionReport {
    let mean = if targets.len() < 2 {
        None
    } else {
        let total: i32 = targets.iter().map(|t| t.band_height).sum();
        Some(total as f64 / targets.len() as f64).filter(|m| *m > 0.0)
    };

    let quadrants: Vec<QuadrantDistortion> = targets
        .iter()
        .map(|t| QuadrantDistortion {
            quadrant: t.quadrant,
            band_height: t.band_height,
            ratio: mean.map_or(0.0, |m| (t.band_height as f64 - m).abs() / m),
        })
        .collect();

    let passed = quadrants.iter().all(|q| q.ratio <= threshold);
    DistortionReport {
        quadrants,
        threshold,
        passed,
    }
}
