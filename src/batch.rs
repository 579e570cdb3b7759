//! Batch inspection of a set of image files
//!
//! Images are inspected strictly in order. A shared cancellation flag is
//! checked between images only, so a cancelled batch keeps every completed
//! result and never leaves an image half-inspected. Images that fail to load
//! are recorded and skipped.

use crate::config::InspectionConfig;
use crate::error::{InspectionError, Result};
use crate::image_loader::{is_supported_extension, load_image};
use crate::inspection::{InspectionResult, Inspector};
use crate::report::ReportRow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Outcome of one file in a batch
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub path: PathBuf,
    /// Inspection result, or the message of the error that skipped the file
    pub outcome: std::result::Result<InspectionResult, String>,
}

impl BatchEntry {
    /// File name used in reports
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub entries: Vec<BatchEntry>,
    /// The batch stopped at the cancellation flag before the last file
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn passed(&self) -> usize {
        self.results().filter(|r| r.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.results().filter(|r| !r.passed).count()
    }

    /// Files that could not be inspected
    pub fn skipped(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_err()).count()
    }

    /// Report rows for every inspected zone, in file order
    pub fn report_rows(&self) -> Vec<ReportRow> {
        self.entries
            .iter()
            .filter_map(|e| e.outcome.as_ref().ok().map(|r| ReportRow::from_result(&e.file_name(), r)))
            .flatten()
            .collect()
    }

    fn results(&self) -> impl Iterator<Item = &InspectionResult> {
        self.entries.iter().filter_map(|e| e.outcome.as_ref().ok())
    }
}

pub struct BatchInspector {
    inspector: Inspector,
}

impl BatchInspector {
    /// Create a batch driver; the configuration is validated once up front
    pub fn new(config: InspectionConfig) -> Result<Self> {
        Ok(Self {
            inspector: Inspector::new(config)?,
        })
    }

    pub fn inspector(&self) -> &Inspector {
        &self.inspector
    }

    /// Inspect `paths` in order until done or `cancel` is set
    pub fn run(&self, paths: &[PathBuf], cancel: &AtomicBool) -> BatchSummary {
        self.run_with(paths, cancel, |_| {})
    }

    /// Like [`BatchInspector::run`], calling `on_entry` after each file
    pub fn run_with<F>(&self, paths: &[PathBuf], cancel: &AtomicBool, mut on_entry: F) -> BatchSummary
    where
        F: FnMut(&BatchEntry),
    {
        let mut summary = BatchSummary::default();

        for (index, path) in paths.iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                tracing::info!(completed = index, remaining = paths.len() - index, "batch cancelled");
                summary.cancelled = true;
                break;
            }

            let outcome = self.inspect_path(path).map_err(|e| {
                tracing::warn!(path = %path.display(), error = %e, "image skipped");
                e.to_string()
            });
            let entry = BatchEntry {
                path: path.clone(),
                outcome,
            };
            on_entry(&entry);
            summary.entries.push(entry);
        }

        tracing::info!(
            inspected = summary.entries.len() - summary.skipped(),
            passed = summary.passed(),
            failed = summary.failed(),
            skipped = summary.skipped(),
            "batch finished"
        );
        summary
    }

    fn inspect_path(&self, path: &Path) -> Result<InspectionResult> {
        let image = load_image(path)?;
        self.inspector.inspect(&image)
    }
}

/// Supported image files directly inside `dir`, sorted by path
pub fn find_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        InspectionError::io(format!("Failed to read directory {}", dir.display()), e)
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| InspectionError::io(format!("Failed to list {}", dir.display()), e))?
            .path();
        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(is_supported_extension);
        if path.is_file() && supported {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_loader::save_image;
    use opencv::core::{Mat, Scalar, CV_8UC3};
    use opencv::prelude::*;

    fn write_blank(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let image = Mat::new_rows_cols_with_default(40, 60, CV_8UC3, Scalar::all(255.0)).unwrap();
        save_image(&path, &image).unwrap();
        path
    }

    #[test]
    fn test_find_images_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        write_blank(dir.path(), "b.png");
        write_blank(dir.path(), "a.bmp");
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let found = find_images(dir.path()).unwrap();
        let names: Vec<_> = found.iter().map(|p| p.file_name().unwrap().to_str().unwrap()).collect();
        assert_eq!(names, vec!["a.bmp", "b.png"]);
    }

    #[test]
    fn test_unreadable_image_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.png");
        std::fs::write(&broken, b"not a png").unwrap();
        let blank = write_blank(dir.path(), "blank.png");

        let batch = BatchInspector::new(InspectionConfig::default()).unwrap();
        let summary = batch.run(&[broken, blank], &AtomicBool::new(false));

        assert_eq!(summary.entries.len(), 2);
        assert_eq!(summary.skipped(), 1);
        // blank panel: no target, all zones fail
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.report_rows().len(), 3);
        assert!(!summary.cancelled);
    }

    #[test]
    fn test_cancel_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let blank = write_blank(dir.path(), "blank.png");

        let batch = BatchInspector::new(InspectionConfig::default()).unwrap();
        let summary = batch.run(&[blank], &AtomicBool::new(true));
        assert!(summary.cancelled);
        assert!(summary.entries.is_empty());
    }

    #[test]
    fn test_cancel_between_images() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![
            write_blank(dir.path(), "1.png"),
            write_blank(dir.path(), "2.png"),
            write_blank(dir.path(), "3.png"),
        ];

        let cancel = AtomicBool::new(false);
        let batch = BatchInspector::new(InspectionConfig::default()).unwrap();
        let summary = batch.run_with(&paths, &cancel, |_| cancel.store(true, Ordering::Relaxed));

        assert!(summary.cancelled);
        assert_eq!(summary.entries.len(), 1);
        assert_eq!(summary.entries[0].file_name(), "1.png");
    }

    #[test]
    fn test_find_images_in_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_images(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, InspectionError::IoError { .. }));
    }
}
