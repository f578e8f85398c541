// src/detection/geometry.rs

use crate::types::{Landmark, LandmarkSet};

/// Euclidean distance between two landmarks in pixels
pub fn distance(a: &Landmark, b: &Landmark) -> f32 {
    ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
}

/// Distance between two landmarks by index, None if either is missing
pub fn distance_between(set: &LandmarkSet, a: u32, b: u32) -> Option<f32> {
    Some(distance(set.get(a)?, set.get(b)?))
}
