//! Error types for the seam_inspect library

use thiserror::Error;

/// Result type alias for seam_inspect operations
pub type Result<T> = std::result::Result<T, InspectionError>;

/// Error taxonomy for seam inspection.
///
/// `TargetNotFound` and `DegenerateInput` are per-image conditions. The
/// orchestrator and the analyzers recover from them locally with fail-forcing
/// sentinel values, so they never abort an inspection. `InvalidParameter` is a
/// systemic misconfiguration and is the one category surfaced to callers
/// before any image is processed.
#[derive(Error, Debug)]
pub enum InspectionError {
    /// Image file could not be loaded or decoded
    #[error("Failed to load image: {message}")]
    ImageLoadError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A calibration target or one of its band boundaries could not be identified
    #[error("Target not found: {reason}")]
    TargetNotFound { reason: String },

    /// A region became empty (or too small) after clamping to image bounds
    #[error("Degenerate input in {region}: {reason}")]
    DegenerateInput { region: String, reason: String },

    /// Invalid configuration parameter
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// Configuration file could not be read, parsed or written
    #[error("Configuration I/O error: {message}")]
    ConfigIo {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Filesystem access outside configuration files failed
    #[error("I/O error: {message}")]
    IoError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// OpenCV operation failed
    #[error("OpenCV error: {operation}")]
    OpenCvError {
        operation: String,
        #[source]
        source: Option<opencv::Error>,
    },
}

impl InspectionError {
    /// Create an image load error with context
    pub fn image_load<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ImageLoadError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration I/O error with context
    pub fn config_io<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ConfigIo {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a filesystem I/O error with context
    pub fn io<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::IoError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an OpenCV error with context
    pub fn opencv(operation: impl Into<String>, source: opencv::Error) -> Self {
        Self::OpenCvError {
            operation: operation.into(),
            source: Some(source),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Create a degenerate input error for a named region
    pub fn degenerate(region: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DegenerateInput {
            region: region.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error is a per-image condition that the pipeline
    /// recovers from with sentinel values
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            InspectionError::TargetNotFound { .. } | InspectionError::DegenerateInput { .. }
        )
    }

    /// Get operator-facing status text for display on the station
    pub fn user_message(&self) -> String {
        match self {
            InspectionError::ImageLoadError { .. } => {
                "Could not load the image. Please check the file format and try again.".to_string()
            }
            InspectionError::TargetNotFound { .. } => {
                "ROI error: calibration target not found at the expected position.".to_string()
            }
            InspectionError::DegenerateInput { .. } => {
                "ROI error: measurement region lies outside the image.".to_string()
            }
            InspectionError::IoError { message, .. } => {
                format!("File access failed: {}.", message)
            }
            InspectionError::InvalidParameter { parameter, value } => {
                format!("Configuration rejected: {} = {} is out of range.", parameter, value)
            }
            _ => "Seam inspection failed. Please try with a different image.".to_string(),
        }
    }
}
