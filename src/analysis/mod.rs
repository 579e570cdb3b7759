//! Seam measurement module
//!
//! This module turns the regions around a resolved boundary into the two
//! per-zone measurements: the vertical pixel shift and the brightness and
//! colour discontinuity across the seam.

pub mod discontinuity;
pub mod profile;
pub mod shift;

pub use discontinuity::{ChannelRatios, DiscontinuityAnalyzer, DiscontinuityMeasurement, PatchSite};
pub use shift::{ShiftAnalyzer, ShiftMeasurement, ShiftOutcome};
