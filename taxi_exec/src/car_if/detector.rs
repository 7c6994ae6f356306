//! On-board object detector interface

use image::RgbImage;
use log::warn;

use comms_if::eqpt::det::DetectedObject;

/// Object detection run on frames captured by the car.
pub trait ObjectDetector {
    /// Detect objects in the frame, in the detector's output order.
    fn detect_objects(&mut self, frame: &RgbImage) -> Vec<DetectedObject>;
}

/// Stands in for a detector which could not be constructed. Never detects anything.
#[derive(Debug, Default)]
pub struct NullDetector;

impl ObjectDetector for NullDetector {
    fn detect_objects(&mut self, _frame: &RgbImage) -> Vec<DetectedObject> {
        Vec::new()
    }
}

/// Build the on-board detector.
///
/// No accelerator runtime is linked into this build, so the null detector is always returned.
pub fn build_detector() -> Box<dyn ObjectDetector> {
    warn!("No on-board object detector available, local detections will always be empty");
    Box::new(NullDetector)
}
