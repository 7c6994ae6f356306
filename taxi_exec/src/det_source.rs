//! # Detection Source
//!
//! Where the control loop gets its detected objects from each cycle:
//!
//! - `Udp`: records from the remote detector, passed through the freshness gate.
//! - `Local`: an on-board detector run on the frame captured this cycle.
//! - `Off`: no detections at all.
//!
//! Whichever source is used, a missing, stale or failed detection is reported as an empty set of
//! objects.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::str::FromStr;

use image::RgbImage;
use serde::Deserialize;

use crate::{
    car_if::ObjectDetector,
    det_client::{freshness, DetClient, DrainReport},
};
use comms_if::eqpt::det::DetectedObject;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Which detection source to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetSourceKind {
    Udp,
    Local,
    Off,
}

/// A source of detected objects.
pub enum DetSource {
    Udp(DetClient),
    Local(Box<dyn ObjectDetector>),
    Off,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Detections gathered for one cycle.
#[derive(Debug, Clone, Default)]
pub struct DetSample {
    /// Objects to consider this cycle.
    pub objects: Vec<DetectedObject>,

    /// Age of the record the objects came from, `None` if no usable record.
    ///
    /// Units: seconds
    pub record_age_s: Option<f64>,

    /// Result of draining the socket this cycle.
    pub drain: DrainReport,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FromStr for DetSourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "udp" => Ok(DetSourceKind::Udp),
            "local" => Ok(DetSourceKind::Local),
            "off" => Ok(DetSourceKind::Off),
            _ => Err(format!(
                "Unknown detection source \"{}\", expected \"udp\", \"local\" or \"off\"",
                s
            )),
        }
    }
}

impl DetSource {
    /// True if this source needs a camera frame each cycle.
    pub fn needs_frame(&self) -> bool {
        matches!(self, DetSource::Local(_))
    }

    /// Gather the detections for this cycle.
    pub fn sample(
        &mut self,
        frame: Option<&RgbImage>,
        now_s: f64,
        staleness_budget_s: f64,
    ) -> DetSample {
        match self {
            DetSource::Udp(client) => {
                let drain = client.poll();

                match freshness::usable(client.latest(), now_s, staleness_budget_s) {
                    Some(record) => DetSample {
                        objects: record.objects.clone(),
                        record_age_s: Some(record.age_s(now_s)),
                        drain,
                    },
                    None => DetSample {
                        drain,
                        ..Default::default()
                    },
                }
            }
            DetSource::Local(detector) => match frame {
                Some(f) => DetSample {
                    objects: detector.detect_objects(f),
                    record_age_s: Some(0.0),
                    ..Default::default()
                },
                None => DetSample::default(),
            },
            DetSource::Off => DetSample::default(),
        }
    }

    /// Total number of detection records received, zero for non-network sources.
    pub fn packet_count(&self) -> u64 {
        match self {
            DetSource::Udp(client) => client.packet_count(),
            _ => 0,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
