//! Pixel-shift measurement across a seam
//!
//! The shift ROI straddles one band boundary. At five vertical centre lines
//! the analyzer averages a narrow column band just left and just right of the
//! line into row profiles, differentiates them, keeps only strong intensity
//! drops and locates the drop edges as valleys. A seam shows up either as two
//! comparable valleys on one side, or as the two sides disagreeing on where
//! the edge is.
//!
//! Algorithm tag: `algo-valley-pixel-shift`

use crate::analysis::profile::{find_valleys, first_difference, suppress_weak_drops};
use crate::config::ShiftConfig;
use crate::detection::boundary::BoundaryPoint;
use crate::error::{InspectionError, Result};
use opencv::{core::Mat, prelude::*};
use serde::{Deserialize, Serialize};

/// Number of centre lines sampled across the ROI
const CENTER_LINES: i32 = 5;

/// Terminal output of the Shift Analyzer for one zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftMeasurement {
    pub zone: usize,
    pub pixel_shift: i32,
}

/// Edges surviving disambiguation on one side of a centre line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideEdges {
    /// Valley positions (difference indices); `[0]` when no valley was found
    pub positions: Vec<usize>,
    /// Distance between two comparable valleys, 0 otherwise
    pub shift: usize,
}

impl SideEdges {
    fn last_edge(&self) -> usize {
        self.positions.iter().copied().max().unwrap_or(0)
    }
}

/// Result of one centre line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineShift {
    pub left: SideEdges,
    pub right: SideEdges,
    /// `max(primary, |last_left - last_right|)`
    pub shift: usize,
}

/// Raw (pre-correction) shift of a ROI plus the edge rows for overlays
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShiftOutcome {
    /// Maximum line shift over all centre lines
    pub raw_shift: i32,
    /// Lowest detected left edge row over all lines (0 when none)
    pub left_edge: i32,
    /// Lowest detected right edge row over all lines (0 when none)
    pub right_edge: i32,
}

/// Shift analyzer with thresholds captured at construction
#[derive(Debug, Clone)]
pub struct ShiftAnalyzer {
    diff_threshold: f64,
    rate_threshold: f64,
    config: ShiftConfig,
}

impl ShiftAnalyzer {
    /// Create an analyzer with station geometry
    pub fn new(diff_threshold: f64, rate_threshold: f64) -> Self {
        Self::with_config(diff_threshold, rate_threshold, ShiftConfig::default())
    }

    /// Create an analyzer with custom geometry
    pub fn with_config(diff_threshold: f64, rate_threshold: f64, config: ShiftConfig) -> Self {
        Self {
            diff_threshold,
            rate_threshold,
            config,
        }
    }

    /// Measure the raw shift of a grayscale ROI centred on a boundary
    ///
    /// # Arguments
    ///
    /// * `gray_roi` - single-channel 8-bit ROI, seam column in the middle
    ///
    /// # Errors
    ///
    /// Returns `InspectionError::DegenerateInput` if the ROI has fewer than 3
    /// rows or is narrower than one side band; OpenCV access errors propagate.
    pub fn measure_shift(&self, gray_roi: &Mat) -> Result<ShiftOutcome> {
        let height = gray_roi.rows();
        let width = gray_roi.cols();
        if height < 3 || width < self.config.side_band_width + 2 {
            return Err(InspectionError::degenerate(
                "shift roi",
                format!("{}x{} is too small for edge analysis", width, height),
            ));
        }

        let rows = (0..height)
            .map(|r| gray_roi.at_row::<u8>(r))
            .collect::<std::result::Result<Vec<&[u8]>, _>>()
            .map_err(|e| InspectionError::opencv("shift roi rows", e))?;

        let mut outcome = ShiftOutcome::default();
        for center in center_lines(width) {
            let band = self.config.side_band_width;
            let (Some(left), Some(right)) = (
                band_profile(&rows, center - band - 1, center - 1),
                band_profile(&rows, center + 1, center + band + 1),
            ) else {
                tracing::debug!(center, width, "centre line side band outside ROI, skipped");
                continue;
            };

            let line = self.analyze_center_line(&left, &right);
            outcome.raw_shift = outcome.raw_shift.max(line.shift as i32);
            outcome.left_edge = outcome.left_edge.max(line.left.last_edge() as i32);
            outcome.right_edge = outcome.right_edge.max(line.right.last_edge() as i32);
        }

        Ok(outcome)
    }

    /// Shift estimate of a single centre line from its two row profiles
    pub fn analyze_center_line(&self, left_profile: &[f64], right_profile: &[f64]) -> LineShift {
        let left = self.side_edges(left_profile);
        let right = self.side_edges(right_profile);

        let primary = left.shift.max(right.shift);
        let disagreement = left.last_edge().abs_diff(right.last_edge());

        LineShift {
            shift: primary.max(disagreement),
            left,
            right,
        }
    }

    /// Detect and disambiguate the drop edges of one row profile
    pub fn side_edges(&self, profile: &[f64]) -> SideEdges {
        let mut diff = first_difference(profile);
        suppress_weak_drops(&mut diff, self.diff_threshold);
        let valleys = find_valleys(&diff, self.config.valley_min_height);
        self.disambiguate(&diff, valleys)
    }

    /// Decide whether the two strongest valleys are two real edges or one
    /// edge plus noise.
    ///
    /// `rate = |strongest - second| / |strongest|` over the underlying
    /// difference values; below `rate_threshold` the valleys are comparable and
    /// their distance is the candidate shift.
    fn disambiguate(&self, diff: &[f64], valleys: Vec<usize>) -> SideEdges {
        match valleys.len() {
            0 => SideEdges {
                positions: vec![0],
                shift: 0,
            },
            1 => SideEdges {
                positions: valleys,
                shift: 0,
            },
            _ => {
                let mut ranked = valleys.clone();
                // stable: equal strengths keep positional order
                ranked.sort_by(|a, b| diff[*a].total_cmp(&diff[*b]));
                let strongest = diff[ranked[0]];
                let second = diff[ranked[1]];

                let comparable = strongest != 0.0
                    && ((strongest - second) / strongest).abs() < self.rate_threshold;

                if comparable {
                    SideEdges {
                        positions: valleys,
                        shift: ranked[0].abs_diff(ranked[1]),
                    }
                } else {
                    SideEdges {
                        positions: vec![ranked[0]],
                        shift: 0,
                    }
                }
            }
        }
    }

    /// Apply the cap, the upstream override and the sampling-bias correction
    pub fn finalize_shift(&self, raw_shift: i32, boundary: &BoundaryPoint) -> i32 {
        let mut shift = raw_shift.min(self.config.max_shift);

        if boundary.alignment_offset >= self.config.max_shift {
            shift = shift.max(boundary.alignment_offset);
        }

        if boundary.needs_calibration {
            (shift - self.config.calibration_correction).abs()
        } else {
            shift.abs()
        }
    }
}

/// Column positions of the centre lines for a ROI of `width` columns
pub fn center_lines(width: i32) -> Vec<i32> {
    let w = width as f64;
    (-(CENTER_LINES / 2)..=CENTER_LINES / 2)
        .map(|k| (w / 2.0 + k as f64 * w / 6.0) as i32)
        .collect()
}

/// Per-row mean of columns `[start, end)`, clipped to the rows; `None` when
/// the clipped band is empty
fn band_profile(rows: &[&[u8]], start: i32, end: i32) -> Option<Vec<f64>> {
    let width = rows.first().map(|r| r.len() as i32)?;
    let start = start.clamp(0, width) as usize;
    let end = end.clamp(0, width) as usize;
    if start >= end {
        return None;
    }
    let count = (end - start) as f64;
    Some(
        rows.iter()
            .map(|row| row[start..end].iter().map(|&v| v as f64).sum::<f64>() / count)
            .collect(),
    )
}
