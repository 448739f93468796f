//! Caller-supplied payloads for creating and verifying reports.
//!
//! Classification fields arrive as raw strings so that an unknown hazard
//! type or severity surfaces as a [`ValidationError`] instead of a
//! deserialization failure.

use std::str::FromStr as _;

use serde::{Deserialize, Serialize};

use crate::{HazardType, Location, ReportStatus, Severity};

/// Placeholder used for image objects that carry no name.
const UNNAMED_IMAGE: &str = "image";

/// Errors produced while validating a [`CreateReportInput`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// A required text field was empty or whitespace.
    #[error("{field} must not be empty")]
    EmptyField {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The hazard type is not a known variant.
    #[error("unknown hazard type '{value}'")]
    InvalidHazardType {
        /// The value that was provided.
        value: String,
    },

    /// The severity is not a known variant.
    #[error("unknown severity '{value}'")]
    InvalidSeverity {
        /// The value that was provided.
        value: String,
    },

    /// Coordinates were not finite or fell outside the valid ranges.
    #[error("invalid coordinates ({lat}, {lng})")]
    InvalidCoordinates {
        /// Latitude that was provided.
        lat: f64,
        /// Longitude that was provided.
        lng: f64,
    },
}

/// An image reference as supplied by the caller.
///
/// Either a plain reference string or a file-like object carrying a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageRef {
    /// A raw reference such as a file name or URL.
    Reference(String),
    /// A file-like object.
    File {
        /// File name, if the object has one.
        #[serde(default)]
        name: Option<String>,
    },
}

impl ImageRef {
    /// Normalizes the reference to the string stored on the report.
    #[must_use]
    pub fn normalize(&self) -> String {
        match self {
            Self::Reference(reference) => reference.clone(),
            Self::File { name } => name
                .as_deref()
                .filter(|n| !n.is_empty())
                .unwrap_or(UNNAMED_IMAGE)
                .to_string(),
        }
    }
}

impl From<&str> for ImageRef {
    fn from(value: &str) -> Self {
        Self::Reference(value.to_string())
    }
}

/// Payload for creating a new report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportInput {
    /// Short headline.
    pub title: String,
    /// Free-text description.
    pub description: String,
    /// Hazard type, e.g. `"storm_surge"`.
    pub hazard_type: String,
    /// Severity, e.g. `"high"`.
    pub severity: String,
    /// Where the hazard was observed.
    pub location: Location,
    /// Optional image references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ImageRef>>,
}

/// A [`CreateReportInput`] that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    /// Trimmed headline.
    pub title: String,
    /// Trimmed description.
    pub description: String,
    /// Parsed hazard type.
    pub hazard_type: HazardType,
    /// Parsed severity.
    pub severity: Severity,
    /// Validated location.
    pub location: Location,
    /// Normalized image references.
    pub images: Option<Vec<String>>,
}

impl CreateReportInput {
    /// Checks every constraint and returns the typed report fields.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for the first constraint that fails.
    pub fn validate(&self) -> Result<NewReport, ValidationError> {
        let title = required("title", &self.title)?;
        let description = required("description", &self.description)?;

        let hazard_type = HazardType::from_str(self.hazard_type.trim()).map_err(|_| {
            ValidationError::InvalidHazardType {
                value: self.hazard_type.clone(),
            }
        })?;
        let severity = Severity::from_str(self.severity.trim()).map_err(|_| {
            ValidationError::InvalidSeverity {
                value: self.severity.clone(),
            }
        })?;

        if !self.location.has_valid_coordinates() {
            return Err(ValidationError::InvalidCoordinates {
                lat: self.location.lat,
                lng: self.location.lng,
            });
        }

        let images = self
            .images
            .as_ref()
            .map(|images| images.iter().map(ImageRef::normalize).collect());

        Ok(NewReport {
            title,
            description,
            hazard_type,
            severity,
            location: self.location.clone(),
            images,
        })
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(trimmed.to_string())
}

/// Payload for changing a report's verification state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportVerification {
    /// Report to update.
    pub report_id: String,
    /// New verification state.
    pub status: ReportStatus,
    /// Who performed the verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<String>,
    /// Free-text verification notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
