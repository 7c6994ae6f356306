//! # Detection Records
//!
//! Object detection results published by the remote detector. Each UDP datagram carries exactly
//! one UTF-8 JSON object:
//!
//! ```json
//! {"timestamp": 1700000000.25, "frame_id": 42,
//!  "objects": [{"label": "person", "score": 0.8, "bbox": [280, 100, 360, 400]}]}
//! ```
//!
//! `timestamp` is required. `objects` defaults to empty and `frame_id` is optional. Individual
//! object entries which are malformed are dropped rather than failing the whole record.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single set of detections captured from one frame by the remote detector.
///
/// Records are immutable once decoded, a newer record replaces an older one entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    /// Wall-clock time at which the producer captured the frame.
    ///
    /// Units: seconds since the unix epoch
    pub timestamp: f64,

    /// Opaque frame identifier, only used for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<Value>,

    /// Detected objects in the order the detector produced them.
    #[serde(default)]
    pub objects: Vec<DetectedObject>,
}

/// An object found by the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Class label, for example `"person"`.
    pub label: String,

    /// Confidence between 0 and 1.
    pub score: f64,

    /// Bounding box in pixel coordinates of the source frame.
    pub bbox: BBox,
}

/// Axis aligned bounding box, serialised as `[xmin, ymin, xmax, ymax]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

/// Wire shape of a record before the objects are validated.
#[derive(Deserialize)]
struct RawRecord {
    timestamp: f64,

    #[serde(default)]
    frame_id: Option<Value>,

    #[serde(default)]
    objects: Vec<Value>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur while decoding a detection datagram.
#[derive(Debug, thiserror::Error)]
pub enum DetParseError {
    #[error("The datagram is not valid UTF-8: {0}")]
    NonUtf8(std::str::Utf8Error),

    #[error("The datagram is not valid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("Expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    #[error("The record is missing a required field or has the wrong type: {0}")]
    InvalidRecord(serde_json::Error),

    #[error("The record timestamp is not finite")]
    InvalidTimestamp,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DetectionRecord {
    /// Decode a record from the raw bytes of one datagram.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DetParseError> {
        let s = std::str::from_utf8(bytes).map_err(DetParseError::NonUtf8)?;
        Self::from_json_str(s)
    }

    /// Decode a record from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, DetParseError> {
        let value: Value = serde_json::from_str(s).map_err(DetParseError::InvalidJson)?;

        if !value.is_object() {
            return Err(DetParseError::NotAnObject(json_type_name(&value)));
        }

        let raw: RawRecord = serde_json::from_value(value).map_err(DetParseError::InvalidRecord)?;

        if !raw.timestamp.is_finite() {
            return Err(DetParseError::InvalidTimestamp);
        }

        let num_raw_objects = raw.objects.len();
        let objects: Vec<DetectedObject> = raw
            .objects
            .into_iter()
            .filter_map(DetectedObject::from_value)
            .collect();

        if objects.len() != num_raw_objects {
            debug!(
                "Dropped {} malformed object(s) from frame {}",
                num_raw_objects - objects.len(),
                frame_id_str(&raw.frame_id)
            );
        }

        Ok(Self {
            timestamp: raw.timestamp,
            frame_id: raw.frame_id,
            objects,
        })
    }

    /// Encode this record as the JSON payload of one datagram.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Age of this record at the given time.
    ///
    /// Units: seconds
    pub fn age_s(&self, now_s: f64) -> f64 {
        now_s - self.timestamp
    }

    /// The frame id formatted for diagnostics, `"?"` if not present.
    pub fn frame_id_str(&self) -> String {
        frame_id_str(&self.frame_id)
    }
}

impl DetectedObject {
    /// Build an object from a JSON value, returning `None` if any field is missing or invalid.
    fn from_value(value: Value) -> Option<Self> {
        let obj: DetectedObject = serde_json::from_value(value).ok()?;

        if obj.score.is_finite() && obj.bbox.is_valid() {
            Some(obj)
        } else {
            None
        }
    }
}

impl BBox {
    /// Horizontal centre of the box.
    ///
    /// Units: pixels
    pub fn center_x(&self) -> f64 {
        (self.xmin + self.xmax) / 2.0
    }

    /// Returns true if the box is non-empty, finite and not negative.
    pub fn is_valid(&self) -> bool {
        let all = [self.xmin, self.ymin, self.xmax, self.ymax];

        all.iter().all(|v| v.is_finite() && *v >= 0.0)
            && self.xmin < self.xmax
            && self.ymin < self.ymax
    }
}

impl From<[f64; 4]> for BBox {
    fn from(a: [f64; 4]) -> Self {
        Self {
            xmin: a[0],
            ymin: a[1],
            xmax: a[2],
            ymax: a[3],
        }
    }
}

impl From<BBox> for [f64; 4] {
    fn from(b: BBox) -> Self {
        [b.xmin, b.ymin, b.xmax, b.ymax]
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn frame_id_str(frame_id: &Option<Value>) -> String {
    match frame_id {
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
        None => String::from("?"),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode_full_record() {
        let rec = DetectionRecord::from_bytes(
            br#"{"timestamp": 100.5, "frame_id": 7,
                 "objects": [{"label": "person", "score": 0.8, "bbox": [280, 100, 360, 400]},
                             {"label": "car", "score": 0.7, "bbox": [0, 0, 10, 10]}]}"#,
        )
        .unwrap();

        assert_eq!(rec.timestamp, 100.5);
        assert_eq!(rec.frame_id_str(), "7");
        assert_eq!(rec.objects.len(), 2);
        assert_eq!(rec.objects[0].label, "person");
        assert_eq!(rec.objects[0].bbox.center_x(), 320.0);
        assert_eq!(rec.objects[1].label, "car");
    }

    #[test]
    fn test_optional_fields_default() {
        let rec = DetectionRecord::from_json_str(r#"{"timestamp": 1.0}"#).unwrap();
        assert!(rec.objects.is_empty());
        assert!(rec.frame_id.is_none());
        assert_eq!(rec.frame_id_str(), "?");
    }

    #[test]
    fn test_rejects_bad_datagrams() {
        assert!(matches!(
            DetectionRecord::from_bytes(&[0xff, 0xfe, 0x00]),
            Err(DetParseError::NonUtf8(_))
        ));
        assert!(matches!(
            DetectionRecord::from_bytes(b"{\"timestamp\": 1.0"),
            Err(DetParseError::InvalidJson(_))
        ));
        assert!(matches!(
            DetectionRecord::from_bytes(b"[1.0, null, []]"),
            Err(DetParseError::NotAnObject(_))
        ));
        assert!(matches!(
            DetectionRecord::from_bytes(br#"{"objects": []}"#),
            Err(DetParseError::InvalidRecord(_))
        ));
        assert!(matches!(
            DetectionRecord::from_bytes(br#"{"timestamp": "now"}"#),
            Err(DetParseError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_malformed_objects_are_dropped() {
        let rec = DetectionRecord::from_json_str(
            r#"{"timestamp": 5.0, "objects": [
                {"label": "dog", "score": 0.9},
                {"label": "cat", "score": 0.9, "bbox": [10, 10, 5, 20]},
                {"label": "car", "score": 0.9, "bbox": [-1, 0, 5, 20]},
                {"label": 3, "score": 0.9, "bbox": [0, 0, 5, 20]},
                {"label": "bicycle", "score": 0.9, "bbox": [0, 0, 5, 20]}
            ]}"#,
        )
        .unwrap();

        assert_eq!(rec.objects.len(), 1);
        assert_eq!(rec.objects[0].label, "bicycle");
    }

    #[test]
    fn test_encode_matches_wire_format() {
        let rec = DetectionRecord {
            timestamp: 2.0,
            frame_id: None,
            objects: vec![DetectedObject {
                label: String::from("person"),
                score: 0.5,
                bbox: BBox::from([1.0, 2.0, 3.0, 4.0]),
            }],
        };

        let bytes = rec.to_json_bytes().unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["objects"][0]["bbox"], serde_json::json!([1.0, 2.0, 3.0, 4.0]));
        assert!(value.get("frame_id").is_none());

        assert_eq!(DetectionRecord::from_bytes(&bytes).unwrap(), rec);
    }
}
