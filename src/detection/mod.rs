//! Target and boundary detection module
//!
//! This module finds the seam calibration targets in a panel photograph and
//! resolves the band boundaries each seam measurement is anchored on.

pub mod boundary;
pub mod distortion;
pub mod locator;

pub use boundary::{BoundaryPoint, BoundaryResolver};
pub use distortion::DistortionReport;
pub use locator::{SeamTarget, TargetLocator};
