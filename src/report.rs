//! Delimited-text export of inspection results
//!
//! One row per inspected zone with the columns
//! `file,zone,pixel_shift,result,white,red,green,blue`. Ratios are written as
//! fractions with four decimals.

use crate::error::{InspectionError, Result};
use crate::inspection::InspectionResult;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

pub const HEADER: [&str; 8] = ["file", "zone", "pixel_shift", "result", "white", "red", "green", "blue"];

/// One exported zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub file: String,
    pub zone: usize,
    pub pixel_shift: i32,
    pub passed: bool,
    pub white: f64,
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl ReportRow {
    /// Rows for every zone of an inspection result
    pub fn from_result(file: &str, result: &InspectionResult) -> Vec<ReportRow> {
        result
            .zones
            .iter()
            .map(|zone| ReportRow {
                file: file.to_string(),
                zone: zone.shift.zone,
                pixel_shift: zone.shift.pixel_shift,
                passed: zone.passed,
                white: zone.discontinuity.white,
                red: zone.discontinuity.red,
                green: zone.discontinuity.green,
                blue: zone.discontinuity.blue,
            })
            .collect()
    }

    pub fn result_label(&self) -> &'static str {
        if self.passed {
            "PASS"
        } else {
            "FAIL"
        }
    }

    /// Render as one delimited line, without terminator
    pub fn to_line(&self) -> String {
        format!(
            "{},{},{},{},{:.4},{:.4},{:.4},{:.4}",
            escape_field(&self.file),
            self.zone,
            self.pixel_shift,
            self.result_label(),
            self.white,
            self.red,
            self.green,
            self.blue
        )
    }
}

/// Write the header and `rows` to `writer`
pub fn write_report<W: Write>(writer: &mut W, rows: &[ReportRow]) -> std::io::Result<()> {
    writeln!(writer, "{}", HEADER.join(","))?;
    for row in rows {
        writeln!(writer, "{}", row.to_line())?;
    }
    writer.flush()
}

/// Write a report file, replacing any existing file
pub fn write_report_file(path: &Path, rows: &[ReportRow]) -> Result<()> {
    let mut file = std::fs::File::create(path).map_err(|e| {
        InspectionError::io(format!("Failed to create report {}", path.display()), e)
    })?;
    write_report(&mut file, rows).map_err(|e| {
        InspectionError::io(format!("Failed to write report {}", path.display()), e)
    })
}

/// Quote a field containing the delimiter, quotes or line breaks
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(file: &str, passed: bool) -> ReportRow {
        ReportRow {
            file: file.to_string(),
            zone: 1,
            pixel_shift: 5,
            passed,
            white: 0.0123,
            red: 1.0,
            green: 0.5,
            blue: 0.0,
        }
    }

    #[test]
    fn test_line_has_eight_columns() {
        let line = row("panel_01.bmp", false).to_line();
        assert_eq!(line, "panel_01.bmp,1,5,FAIL,0.0123,1.0000,0.5000,0.0000");
        assert_eq!(line.split(',').count(), HEADER.len());
    }

    #[test]
    fn test_file_names_with_commas_are_quoted() {
        let line = row("a,b \"x\".png", true).to_line();
        assert!(line.starts_with("\"a,b \"\"x\"\".png\",1,5,PASS,"));
    }

    #[test]
    fn test_write_report_header_and_rows() {
        let mut out = Vec::new();
        write_report(&mut out, &[row("a.bmp", true), row("b.bmp", false)]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "file,zone,pixel_shift,result,white,red,green,blue");
        assert_eq!(lines.len(), 3);
        assert!(lines[2].contains("FAIL"));
    }

    #[test]
    fn test_write_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        write_report_file(&path, &[row("a.bmp", true)]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_write_report_file_into_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("results.csv");
        let err = write_report_file(&path, &[row("a.bmp", true)]).unwrap_err();
        assert!(matches!(err, InspectionError::IoError { .. }));
    }
}
