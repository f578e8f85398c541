// src/classification/classifier.rs
//
// Maps a raw detection to Pill / Water / Food / Unknown.
//
// Cascade, first decision wins:
//   1. exclusion vocabulary (people, body parts, wearables) -> Unknown
//   2. size filter, position dependent -> Unknown
//   3. label fast path, no text read
//   4. text on ambiguous labels: medicine > food > beverage
//   5. while consuming, leftover containers are drinks
//   6. label defaults, then shape fallback (always decides)

use super::keywords::{contains_any, find_term, AMBIGUOUS_LABELS, EXCLUDED_LABELS};
use super::rules::{
    first_label_match, first_shape_match, first_text_match, CONSUMING_CONTAINER,
    LABEL_DEFAULTS, LABEL_FAST_PATH, SHAPE_FALLBACK, TEXT_PRIORITY,
};
use super::text_cache::TextCache;
use crate::sensing::TextExtractor;
use crate::types::{BoundingBox, Category, ClassifierConfig, Detection, FrameInfo, PoseState};
use tracing::debug;

pub struct ObjectClassifier {
    config: ClassifierConfig,
    cache: TextCache,
}

impl ObjectClassifier {
    pub fn new(config: ClassifierConfig, cache_clear_interval: u64) -> Self {
        Self {
            config,
            cache: TextCache::new(cache_clear_interval),
        }
    }

    /// Call once per detection cycle, before classifying its detections
    pub fn begin_cycle(&mut self) -> u64 {
        let cycle = self.cache.tick();
        debug!("Detection cycle {} ({} cached regions)", cycle, self.cache.len());
        cycle
    }

    pub fn classify(
        &mut self,
        detection: &Detection,
        frame: FrameInfo,
        pose: PoseState,
        extractor: &dyn TextExtractor,
    ) -> Category {
        let config = &self.config;
        let cache = &mut self.cache;
        classify_detection(detection, frame, pose, config, || {
            read_region_text(cache, config, &detection.bbox, frame, extractor)
        })
    }
}

/// The cascade itself. Deterministic given the detection, the pose and the
/// text `read_text` yields; `read_text` is only called for ambiguous labels.
pub fn classify_detection<F>(
    detection: &Detection,
    frame: FrameInfo,
    pose: PoseState,
    config: &ClassifierConfig,
    read_text: F,
) -> Category
where
    F: FnOnce() -> String,
{
    let label = detection.class_label.trim().to_lowercase();

    if let Some(term) = find_term(&label, EXCLUDED_LABELS) {
        debug!("'{}' excluded ({})", label, term);
        return Category::Unknown;
    }

    if !passes_size_filter(&detection.bbox, frame, config) {
        debug!("'{}' too small at {:?}", label, detection.bbox.center());
        return Category::Unknown;
    }

    if let Some(rule) = first_label_match(LABEL_FAST_PATH, &label) {
        debug!("'{}' -> {} ({})", label, rule.category.as_str(), rule.name);
        return rule.category;
    }

    if contains_any(&label, AMBIGUOUS_LABELS) {
        let text = read_text().to_lowercase();
        if let Some((rule, term)) = first_text_match(TEXT_PRIORITY, &text) {
            debug!(
                "'{}' -> {} ({}: '{}')",
                label,
                rule.category.as_str(),
                rule.name,
                term
            );
            return rule.category;
        }
    }

    if pose == PoseState::Consuming {
        if let Some(rule) = first_label_match(CONSUMING_CONTAINER, &label) {
            debug!("'{}' -> {} ({})", label, rule.category.as_str(), rule.name);
            return rule.category;
        }
    }

    if let Some(rule) = first_label_match(LABEL_DEFAULTS, &label) {
        debug!("'{}' -> {} ({})", label, rule.category.as_str(), rule.name);
        return rule.category;
    }

    match first_shape_match(SHAPE_FALLBACK, &detection.bbox, config) {
        Some(rule) => {
            debug!("'{}' -> {} (shape: {})", label, rule.category.as_str(), rule.name);
            rule.category
        }
        None => Category::Food,
    }
}

/// Background suppression. Objects near the frame center (where the mouth
/// usually is) keep a much lower floor than the rest; edge objects a higher one.
fn passes_size_filter(bbox: &BoundingBox, frame: FrameInfo, config: &ClassifierConfig) -> bool {
    let (cx, cy) = bbox.center();
    let (w, h) = (frame.width as f32, frame.height as f32);

    let edge = config.edge_margin;
    let near_edge =
        cx < w * edge || cx > w * (1.0 - edge) || cy < h * edge || cy > h * (1.0 - edge);

    let center = config.center_margin;
    let near_center = cx > w * center
        && cx < w * (1.0 - center)
        && cy > h * center
        && cy < h * (1.0 - center);

    let floor = if near_edge {
        config.edge_min_area
    } else if near_center {
        config.center_min_area
    } else {
        config.min_area
    };
    bbox.area() >= floor
}

/// Text inside the detection, or "" when the region is too small to read or
/// the extractor fails. Successful and failed reads are both cached.
fn read_region_text(
    cache: &mut TextCache,
    config: &ClassifierConfig,
    bbox: &BoundingBox,
    frame: FrameInfo,
    extractor: &dyn TextExtractor,
) -> String {
    let region = bbox.clamp_to(frame);
    if region.width() < config.text_min_side
        || region.height() < config.text_min_side
        || region.area() < config.text_min_area
    {
        return String::new();
    }

    cache.get_or_extract(&region, || match extractor.extract_text(&region) {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            debug!("Text extraction failed on {:?}: {:#}", region.pixel_key(), e);
            String::new()
        }
    })
}
