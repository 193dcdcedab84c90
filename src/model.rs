//! Data model shared by the orchestrators and the recognition client.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of reference photos collected per enrollment.
pub const DEFAULT_ENROLLMENT_SIZE: usize = 5;

/// Source of a capture request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTrigger {
    /// Emitted repeatedly while the detector sees a face.
    Automatic,
    /// A single user-initiated tap.
    Manual,
}

impl fmt::Display for CaptureTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureTrigger::Automatic => write!(f, "automatic"),
            CaptureTrigger::Manual => write!(f, "manual"),
        }
    }
}

/// A best-effort coordinate for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoFix {
    /// Build a fix, rejecting coordinates outside the WGS84 range.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }
}

/// Direction of an attendance punch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogType {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "OUT")]
    Out,
}

impl LogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::In => "IN",
            LogType::Out => "OUT",
        }
    }

    /// Headline shown on the splash panel.
    pub fn headline(&self) -> &'static str {
        match self {
            LogType::In => "PUNCHED IN",
            LogType::Out => "PUNCHED OUT",
        }
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /recognize`. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionRequest {
    site_id: String,
    image: String,
    latitude: f64,
    longitude: f64,
    device_id: String,
}

impl RecognitionRequest {
    pub fn new(
        site_id: impl Into<String>,
        device_id: impl Into<String>,
        image: impl Into<String>,
        fix: GeoFix,
    ) -> Self {
        Self {
            site_id: site_id.into(),
            image: image.into(),
            latitude: fix.latitude,
            longitude: fix.longitude,
            device_id: device_id.into(),
        }
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn location(&self) -> GeoFix {
        GeoFix {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

/// A recognized employee and the punch recorded for them.
#[derive(Debug, Clone, PartialEq)]
pub struct Punch {
    pub log_type: LogType,
    pub employee_name: String,
    pub employee_id: String,
    /// The image that was submitted for this attempt.
    pub selfie: String,
    /// Check-in document created on the attendance backend, when reported.
    pub checkin_name: Option<String>,
    pub confidence: Option<f64>,
}

/// Outcome of a recognition round trip that reached the service.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionResult {
    Success(Punch),
    Failure { reason: String },
}

/// Errors raised when mutating an [`EnrollmentBatch`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("enrollment batch is sealed ({max} images)")]
    Sealed { max: usize },
    #[error("enrollment batch size must be at least 1")]
    EmptyBatch,
}

/// Reference photos for one employee, submitted together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrollmentBatch {
    site_id: String,
    employee_id: String,
    employee_name: String,
    images: Vec<String>,
    #[serde(skip)]
    max: usize,
}

impl EnrollmentBatch {
    pub fn new(
        site_id: impl Into<String>,
        employee_id: impl Into<String>,
        employee_name: impl Into<String>,
        max: usize,
    ) -> Result<Self, BatchError> {
        if max == 0 {
            return Err(BatchError::EmptyBatch);
        }
        Ok(Self {
            site_id: site_id.into(),
            employee_id: employee_id.into(),
            employee_name: employee_name.into(),
            images: Vec::with_capacity(max),
            max,
        })
    }

    /// Append one image, returning the new count.
    pub fn push(&mut self, image: String) -> Result<usize, BatchError> {
        if self.is_sealed() {
            return Err(BatchError::Sealed { max: self.max });
        }
        self.images.push(image);
        Ok(self.images.len())
    }

    pub fn is_sealed(&self) -> bool {
        self.images.len() >= self.max
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn employee_id(&self) -> &str {
        &self.employee_id
    }

    pub fn employee_name(&self) -> &str {
        &self.employee_name
    }

    /// Counter text shown while collecting, e.g. `3/5`.
    pub fn counter(&self) -> String {
        format!("{}/{}", self.images.len(), self.max)
    }
}

/// Server acknowledgement of a batch enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnrollOutcome {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// Images that produced an embedding.
    #[serde(default)]
    pub saved: Option<u32>,
    /// Images the server could not use.
    #[serde(default)]
    pub failed: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geofix_rejects_out_of_range() {
        assert!(GeoFix::new(12.9, 77.6).is_some());
        assert!(GeoFix::new(91.0, 0.0).is_none());
        assert!(GeoFix::new(0.0, -180.5).is_none());
        assert!(GeoFix::new(f64::NAN, 0.0).is_none());
    }

    #[test]
    fn test_log_type_wire_format() {
        assert_eq!(serde_json::to_string(&LogType::In).unwrap(), "\"IN\"");
        let parsed: LogType = serde_json::from_str("\"OUT\"").unwrap();
        assert_eq!(parsed, LogType::Out);
        assert_eq!(LogType::Out.headline(), "PUNCHED OUT");
    }

    #[test]
    fn test_request_serializes_flat_coordinates() {
        let fix = GeoFix::new(12.9, 77.6).unwrap();
        let request = RecognitionRequest::new("erp.example.com", "KIOSK-1", "data:x", fix);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["site_id"], "erp.example.com");
        assert_eq!(json["device_id"], "KIOSK-1");
        assert_eq!(json["latitude"], 12.9);
        assert_eq!(json["longitude"], 77.6);
        assert_eq!(json["image"], "data:x");
    }

    #[test]
    fn test_batch_seals_at_max() {
        let mut batch = EnrollmentBatch::new("site", "EMP01", "Asha", 2).unwrap();
        assert_eq!(batch.push("a".into()), Ok(1));
        assert!(!batch.is_sealed());
        assert_eq!(batch.push("b".into()), Ok(2));
        assert!(batch.is_sealed());
        assert_eq!(batch.push("c".into()), Err(BatchError::Sealed { max: 2 }));
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.counter(), "2/2");
    }

    #[test]
    fn test_batch_serialization_omits_max() {
        let mut batch = EnrollmentBatch::new("site", "EMP01", "Asha", 1).unwrap();
        batch.push("img".into()).unwrap();
        let json = serde_json::to_value(&batch).unwrap();
        assert!(json.get("max").is_none());
        assert_eq!(json["images"], serde_json::json!(["img"]));
        assert_eq!(json["employee_name"], "Asha");
    }

    #[test]
    fn test_zero_sized_batch_rejected() {
        assert_eq!(
            EnrollmentBatch::new("s", "e", "n", 0),
            Err(BatchError::EmptyBatch)
        );
    }
}
