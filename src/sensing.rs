// src/sensing.rs
//
// Seams to the vision models. An implementor is bound to a single frame;
// the engine asks it for landmarks, detections and region text.

use crate::types::{BoundingBox, Detection, LandmarkSet};
use anyhow::Result;

pub trait LandmarkSource {
    /// Empty set means no body in view
    fn landmarks(&self) -> Result<LandmarkSet>;
}

pub trait ObjectDetector {
    /// Raw detections, not yet confidence-filtered
    fn detect(&self) -> Result<Vec<Detection>>;
}

pub trait TextExtractor {
    fn extract_text(&self, region: &BoundingBox) -> Result<String>;
}

