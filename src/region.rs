//! Axis-aligned pixel regions and clamped cropping
//!
//! Every region the pipeline samples is derived from a detected position plus
//! fixed offsets, so it can extend past the image. Regions are clipped to the
//! image before use; an empty clip is the `DegenerateInput` condition.

use crate::error::{InspectionError, Result};
use opencv::{
    core::{Mat, Rect, Scalar},
    imgproc,
    prelude::*,
};
use serde::{Deserialize, Serialize};

/// Half-open pixel rectangle `[x, x + width) x [y, y + height)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Build from corner coordinates `(x1, y1)` inclusive, `(x2, y2)` exclusive
    pub fn from_bounds(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: (x2 - x1).max(0),
            height: (y2 - y1).max(0),
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Intersect with a `cols x rows` image
    pub fn clip(&self, cols: i32, rows: i32) -> Self {
        Self::from_bounds(
            self.x.clamp(0, cols),
            self.y.clamp(0, rows),
            self.right().clamp(0, cols),
            self.bottom().clamp(0, rows),
        )
    }

    /// Clip to the bounds of `image`
    pub fn clip_to(&self, image: &Mat) -> Self {
        self.clip(image.cols(), image.rows())
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Copy `region` (clipped to the image) out of `image` into a new continuous Mat.
///
/// `T` must match the element type of `image` (`Vec3b` for BGR, `u8` for gray).
pub fn crop<T: DataType + Copy>(image: &Mat, region: &Region) -> Result<Mat> {
    let clipped = region.clip_to(image);
    if clipped.is_empty() {
        return Err(InspectionError::degenerate(
            "crop",
            format!("{:?} lies outside {}x{} image", region, image.cols(), image.rows()),
        ));
    }

    let mut out = Mat::new_rows_cols_with_default(
        clipped.height,
        clipped.width,
        image.typ(),
        Scalar::all(0.0),
    )
    .map_err(|e| InspectionError::opencv("crop allocation", e))?;

    let x0 = clipped.x as usize;
    let x1 = clipped.right() as usize;
    for row in 0..clipped.height {
        let src = image
            .at_row::<T>(clipped.y + row)
            .map_err(|e| InspectionError::opencv("crop source row", e))?;
        let dst = out
            .at_row_mut::<T>(row)
            .map_err(|e| InspectionError::opencv("crop destination row", e))?;
        dst.copy_from_slice(&src[x0..x1]);
    }

    Ok(out)
}

/// Convert a BGR image to single-channel grayscale
pub fn to_gray(image: &Mat) -> Result<Mat> {
    let mut gray = Mat::default();
    imgproc::cvt_color_def(image, &mut gray, imgproc::COLOR_BGR2GRAY)
        .map_err(|e| InspectionError::opencv("grayscale conversion", e))?;
    Ok(gray)
}
