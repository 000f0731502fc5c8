//! Error types for GeoFlow

use thiserror::Error;

use crate::models::Tier;

#[derive(Debug, Error)]
pub enum GeoflowError {
    // Upload errors
    #[error("Unsupported format '{extension}' for {file_name}")]
    UnsupportedFormat { file_name: String, extension: String },

    // Lookup errors
    #[error("Dataset not found: {id}")]
    DatasetNotFound { id: String },

    #[error("Tool not found: {id}")]
    ToolNotFound { id: String },

    #[error("Job not found: {id}")]
    JobNotFound { id: String },

    #[error("Layer not found: {id}")]
    LayerNotFound { id: String },

    #[error("Export format not found: {id}")]
    ExportFormatNotFound { id: String },

    // Submission errors
    #[error("Invalid value for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("{feature} requires a {required} subscription (current tier: {actual})")]
    PremiumRequired {
        feature: String,
        required: Tier,
        actual: Tier,
    },

    // State machine errors
    #[error("Invalid transition for {subject}: {from} -> {to}")]
    InvalidTransition {
        subject: String,
        from: String,
        to: String,
    },

    #[error("Workflow step '{step}' is unavailable: {reason}")]
    StepUnavailable { step: String, reason: String },

    #[error("{field} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    // Configuration errors
    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // Collaborator errors
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Execution error: {0}")]
    Execution(String),
}

/// Coarse classification of errors for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedFormat,
    NotFound,
    Validation,
    PremiumRequired,
    InvalidTransition,
    OutOfRange,
    Config,
    Storage,
    Execution,
}

impl GeoflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GeoflowError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            GeoflowError::DatasetNotFound { .. }
            | GeoflowError::ToolNotFound { .. }
            | GeoflowError::JobNotFound { .. }
            | GeoflowError::LayerNotFound { .. }
            | GeoflowError::ExportFormatNotFound { .. } => ErrorKind::NotFound,
            GeoflowError::Validation { .. } => ErrorKind::Validation,
            GeoflowError::PremiumRequired { .. } => ErrorKind::PremiumRequired,
            GeoflowError::InvalidTransition { .. } | GeoflowError::StepUnavailable { .. } => {
                ErrorKind::InvalidTransition
            }
            GeoflowError::OutOfRange { .. } => ErrorKind::OutOfRange,
            GeoflowError::ConfigInvalid { .. } => ErrorKind::Config,
            GeoflowError::Storage(_) => ErrorKind::Storage,
            GeoflowError::Execution(_) => ErrorKind::Execution,
        }
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        GeoflowError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GeoflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let missing = GeoflowError::ExportFormatNotFound { id: "kmz".to_string() };
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let config = GeoflowError::ConfigInvalid {
            key: "upload_zoom".to_string(),
            reason: "not a number".to_string(),
        };
        assert_eq!(config.kind(), ErrorKind::Config);
        assert_eq!(GeoflowError::Execution("boom".to_string()).kind(), ErrorKind::Execution);
    }

    #[test]
    fn test_premium_required_names_feature() {
        let err = GeoflowError::PremiumRequired {
            feature: "PDF Report".to_string(),
            required: Tier::Premium,
            actual: Tier::Free,
        };
        assert_eq!(
            err.to_string(),
            "PDF Report requires a premium subscription (current tier: free)"
        );
    }
}
