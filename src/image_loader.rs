//! Image loading and saving for station photographs
//!
//! The station camera writes JPEG, PNG, BMP or TIFF files. All images are
//! decoded with the `image` crate and converted to an OpenCV Mat in BGR order
//! for the inspection pipeline. Saving goes the other way and is used for
//! debug crops.

use crate::error::{InspectionError, Result};
use image::{ImageReader, RgbImage};
use opencv::{
    core::{Mat, Scalar, Vec3b, CV_8UC3},
    prelude::*,
};
use std::path::Path;

/// Supported image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Bmp,
    Tiff,
}

impl ImageFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<ImageFormat> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "bmp" => Some(ImageFormat::Bmp),
            "tiff" | "tif" => Some(ImageFormat::Tiff),
            _ => None,
        }
    }
}

/// Load an image from disk as an OpenCV Mat (BGR, `CV_8UC3`)
///
/// # Errors
///
/// Returns `InspectionError::ImageLoadError` if the extension is not a
/// supported format or the file cannot be opened or decoded.
///
/// # Example
///
/// ```rust,no_run
/// use seam_inspect::image_loader::load_image;
/// use opencv::prelude::*;
/// use std::path::Path;
///
/// let mat = load_image(Path::new("panel.bmp"))?;
/// println!("Loaded image: {}x{}", mat.cols(), mat.rows());
/// # Ok::<(), seam_inspect::InspectionError>(())
/// ```
pub fn load_image(path: &Path) -> Result<Mat> {
    if ImageFormat::from_extension(path).is_none() {
        return Err(InspectionError::ImageLoadError {
            message: format!("Unknown image format for file: {}", path.display()),
            source: None,
        });
    }

    let reader = ImageReader::open(path).map_err(|e| {
        InspectionError::image_load(format!("Failed to open image file: {}", path.display()), e)
    })?;
    let img = reader.decode().map_err(|e| {
        InspectionError::image_load(format!("Failed to decode image: {}", path.display()), e)
    })?;

    mat_from_rgb(&img.to_rgb8())
}

/// Convert an RGB image buffer into a BGR Mat
pub fn mat_from_rgb(rgb: &RgbImage) -> Result<Mat> {
    let (width, height) = rgb.dimensions();
    let mut mat = Mat::new_rows_cols_with_default(
        height as i32,
        width as i32,
        CV_8UC3,
        Scalar::all(0.0),
    )
    .map_err(|e| InspectionError::opencv("image allocation", e))?;

    for (y, row) in rgb.rows().enumerate() {
        let dst = mat
            .at_row_mut::<Vec3b>(y as i32)
            .map_err(|e| InspectionError::opencv("image row access", e))?;
        for (pixel, src) in dst.iter_mut().zip(row) {
            // BGR order for OpenCV
            pixel[0] = src[2];
            pixel[1] = src[1];
            pixel[2] = src[0];
        }
    }

    Ok(mat)
}

/// Convert a BGR Mat into an RGB image buffer
pub fn rgb_from_mat(mat: &Mat) -> Result<RgbImage> {
    let mut rgb = RgbImage::new(mat.cols().max(0) as u32, mat.rows().max(0) as u32);
    for (y, row) in rgb.rows_mut().enumerate() {
        let src = mat
            .at_row::<Vec3b>(y as i32)
            .map_err(|e| InspectionError::opencv("image row access", e))?;
        for (pixel, bgr) in row.zip(src) {
            pixel.0 = [bgr[2], bgr[1], bgr[0]];
        }
    }
    Ok(rgb)
}

/// Save a BGR Mat; the format follows the file extension
pub fn save_image(path: &Path, mat: &Mat) -> Result<()> {
    rgb_from_mat(mat)?.save(path).map_err(|e| {
        InspectionError::image_load(format!("Failed to write image: {}", path.display()), e)
    })
}

/// Get list of all supported file extensions
pub fn supported_extensions() -> &'static [&'static str] {
    &["jpg", "jpeg", "png", "bmp", "tiff", "tif"]
}

/// Check if a file extension is supported
pub fn is_supported_extension(ext: &str) -> bool {
    let ext_lower = ext.to_lowercase();
    supported_extensions().contains(&ext_lower.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            ImageFormat::from_extension(Path::new("panel.jpg")),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_extension(Path::new("panel.JPEG")),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_extension(Path::new("panel.bmp")),
            Some(ImageFormat::Bmp)
        );
        assert_eq!(
            ImageFormat::from_extension(Path::new("panel.tif")),
            Some(ImageFormat::Tiff)
        );
        assert_eq!(ImageFormat::from_extension(Path::new("panel.heic")), None);
        assert_eq!(ImageFormat::from_extension(Path::new("panel")), None);
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_extension("jpg"));
        assert!(is_supported_extension("BMP"));
        assert!(is_supported_extension("png"));
        assert!(!is_supported_extension("webp"));
        assert!(!is_supported_extension("doc"));
    }

    #[test]
    fn test_rgb_to_bgr_conversion() {
        // red, green, blue, white
        let rgb = RgbImage::from_raw(2, 2, vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255]).unwrap();
        let mat = mat_from_rgb(&rgb).unwrap();

        let pixel: &Vec3b = mat.at_2d(0, 0).unwrap();
        assert_eq!((pixel[0], pixel[1], pixel[2]), (0, 0, 255));
        let pixel: &Vec3b = mat.at_2d(0, 1).unwrap();
        assert_eq!((pixel[0], pixel[1], pixel[2]), (0, 255, 0));
        let pixel: &Vec3b = mat.at_2d(1, 0).unwrap();
        assert_eq!((pixel[0], pixel[1], pixel[2]), (255, 0, 0));

        assert_eq!(rgb_from_mat(&mat).unwrap(), rgb);
    }

    #[test]
    fn test_png_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crop.png");
        let rgb = RgbImage::from_fn(5, 3, |x, y| image::Rgb([x as u8 * 40, y as u8 * 80, 7]));
        let mat = mat_from_rgb(&rgb).unwrap();

        save_image(&path, &mat).unwrap();
        let loaded = load_image(&path).unwrap();
        assert_eq!(rgb_from_mat(&loaded).unwrap(), rgb);
    }

    #[test]
    fn test_unknown_extension_is_load_error() {
        let err = load_image(Path::new("panel.xyz")).unwrap_err();
        assert!(matches!(err, InspectionError::ImageLoadError { .. }));
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = load_image(Path::new("/nonexistent/panel.png")).unwrap_err();
        assert!(matches!(err, InspectionError::ImageLoadError { .. }));
    }
}
