// src/types.rs

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Local wall-clock time. Every window and cooldown is measured on it.
pub type Timestamp = NaiveDateTime;

/// Seconds elapsed from `earlier` to `later` (negative if the clock went back).
pub fn seconds_between(earlier: Timestamp, later: Timestamp) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 1000.0
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pose: PoseConfig,
    pub classifier: ClassifierConfig,
    pub cooldowns: CooldownConfig,
    pub sampling: SamplingConfig,
    pub dispatch: DispatchConfig,
    pub replay: ReplayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    /// Landmark used as the head reference (MediaPipe 2 = left eye)
    pub head_landmark: u32,
    /// Landmark used as the foot reference (MediaPipe 27 = left ankle)
    pub foot_landmark: u32,
    /// Landmark near the mouth (MediaPipe 9 = mouth left)
    pub mouth_landmark: u32,
    /// Landmark on the hand (MediaPipe 19 = left index)
    pub hand_landmark: u32,
    /// Head-to-foot distance (px) above which the body counts as upright
    pub upright_min_distance: f32,
    /// Max head.y - foot.y (px); larger means the body is horizontal
    pub max_head_vertical_offset: f32,
    /// Hand-to-mouth distance (px) below which the person is consuming
    pub consuming_max_distance: f32,
    /// Empty landmark frames tolerated before BodyMissing
    pub missing_grace_secs: f64,
    /// A disappearance shorter than this is treated as a fall
    pub abrupt_disappearance_secs: f64,
    /// Sustained bad posture needed to confirm a fall
    pub fall_confirm_secs: f64,
    /// Periodic re-announcement of an unchanged posture
    pub announce_interval_secs: f64,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            head_landmark: 2,
            foot_landmark: 27,
            mouth_landmark: 9,
            hand_landmark: 19,
            upright_min_distance: 150.0,
            max_head_vertical_offset: 15.0,
            consuming_max_distance: 150.0,
            missing_grace_secs: 1.0,
            abrupt_disappearance_secs: 3.0,
            fall_confirm_secs: 5.0,
            announce_interval_secs: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Minimum area for objects away from both the edges and the center
    pub min_area: f32,
    /// Minimum area for objects whose center lies near the frame edges
    pub edge_min_area: f32,
    /// Minimum area for objects in the central region (near the mouth)
    pub center_min_area: f32,
    /// Fraction of the frame treated as the edge band
    pub edge_margin: f32,
    /// Fraction of the frame excluded on each side of the center region
    pub center_margin: f32,
    /// Boxes more elongated than this fall back to Water
    pub elongated_aspect: f32,
    /// Boxes larger than this fall back to Food
    pub large_area: f32,
    /// Pill band: lower area bound (exclusive)
    pub pill_min_area: f32,
    /// Pill band: upper area bound (exclusive)
    pub pill_max_area: f32,
    /// Pill band: maximum aspect ratio (exclusive)
    pub pill_max_aspect: f32,
    /// Regions smaller than this (px²) are not worth reading text from
    pub text_min_area: f32,
    /// Regions narrower or shorter than this (px) are not worth reading
    pub text_min_side: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_area: 800.0,
            edge_min_area: 5000.0,
            center_min_area: 400.0,
            edge_margin: 0.05,
            center_margin: 0.2,
            elongated_aspect: 1.5,
            large_area: 10000.0,
            pill_min_area: 4000.0,
            pill_max_area: 12000.0,
            pill_max_aspect: 1.3,
            text_min_area: 2000.0,
            text_min_side: 15.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownConfig {
    pub pill_consumed_secs: f64,
    pub water_consumed_secs: f64,
    pub food_consumed_secs: f64,
    pub pill_reminder_secs: f64,
    pub fall_secs: f64,
    pub body_missing_secs: f64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            pill_consumed_secs: 5.0,
            water_consumed_secs: 5.0,
            food_consumed_secs: 1800.0,
            pill_reminder_secs: 5.0,
            fall_secs: 5.0,
            body_missing_secs: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Object detection runs on every Nth frame
    pub process_every_n_frames: u64,
    /// Detections at or below this confidence are discarded
    pub confidence_threshold: f32,
    /// The text cache is cleared every N detection cycles
    pub text_cache_clear_interval: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            process_every_n_frames: 5,
            confidence_threshold: 0.3,
            text_cache_clear_interval: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub event_log_path: String,
    /// Name used in outbound notification text
    pub patient_name: String,
    pub webhook_url: Option<String>,
    pub webhook_timeout_secs: u64,
    pub announce: bool,
    pub shutdown_grace_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            event_log_path: "output/events.jsonl".to_string(),
            patient_name: "Patient".to_string(),
            webhook_url: None,
            webhook_timeout_secs: 10,
            announce: true,
            shutdown_grace_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub input_dir: String,
    pub default_width: u32,
    pub default_height: u32,
    /// Sleep between frames according to their timestamps
    pub realtime: bool,
    /// Window of the end-of-run summary report
    pub summary_days: u32,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            input_dir: "recordings".to_string(),
            default_width: 480,
            default_height: 360,
            realtime: false,
            summary_days: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "care_monitor=info".to_string(),
        }
    }
}

// ============================================================================
// SENSING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub index: u32,
    pub x: f32,
    pub y: f32,
}

/// Landmarks of one frame. Empty means no body was detected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkSet {
    points: Vec<Landmark>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Lookup by landmark index (not by position in the list)
    pub fn get(&self, index: u32) -> Option<&Landmark> {
        self.points
            .get(index as usize)
            .filter(|p| p.index == index)
            .or_else(|| self.points.iter().find(|p| p.index == index))
    }
}

impl From<Vec<(u32, f32, f32)>> for LandmarkSet {
    fn from(raw: Vec<(u32, f32, f32)>) -> Self {
        Self::new(
            raw.into_iter()
                .map(|(index, x, y)| Landmark { index, x, y })
                .collect(),
        )
    }
}

/// Pixel-space box, `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Always >= 1.0; degenerate boxes report 1.0
    pub fn aspect_ratio(&self) -> f32 {
        let (w, h) = (self.width(), self.height());
        if w <= 0.0 || h <= 0.0 {
            return 1.0;
        }
        (w / h).max(h / w)
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn clamp_to(&self, frame: FrameInfo) -> Self {
        let (w, h) = (frame.width as f32, frame.height as f32);
        Self {
            x1: self.x1.clamp(0.0, w),
            y1: self.y1.clamp(0.0, h),
            x2: self.x2.clamp(0.0, w),
            y2: self.y2.clamp(0.0, h),
        }
    }

    /// Integer pixel key, stable for cache lookups
    pub fn pixel_key(&self) -> (i32, i32, i32, i32) {
        (
            self.x1.round() as i32,
            self.y1.round() as i32,
            self.x2.round() as i32,
            self.y2.round() as i32,
        )
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class_label: String,
}

// ============================================================================
// CLASSIFICATION & POSE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Pill,
    Water,
    Food,
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Pill => "pill",
            Category::Water => "water",
            Category::Food => "food",
            Category::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedObject {
    pub detection: Detection,
    pub category: Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoseState {
    Idle,
    Standing,
    Consuming,
    Fallen,
    BodyMissing,
}

impl PoseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoseState::Idle => "idle",
            PoseState::Standing => "standing",
            PoseState::Consuming => "consuming",
            PoseState::Fallen => "fallen",
            PoseState::BodyMissing => "body_missing",
        }
    }
}

impl fmt::Display for PoseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// EVENTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    #[serde(rename = "fallen")]
    Fallen,
    #[serde(rename = "consumed pill")]
    ConsumedPill,
    #[serde(rename = "consumed water")]
    ConsumedWater,
    #[serde(rename = "ate food")]
    AteFood,
    #[serde(rename = "pill reminder")]
    PillReminder,
    #[serde(rename = "body missing")]
    BodyMissing,
}

impl EventCategory {
    pub const ALL: [EventCategory; 6] = [
        EventCategory::Fallen,
        EventCategory::ConsumedPill,
        EventCategory::ConsumedWater,
        EventCategory::AteFood,
        EventCategory::PillReminder,
        EventCategory::BodyMissing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Fallen => "fallen",
            EventCategory::ConsumedPill => "consumed pill",
            EventCategory::ConsumedWater => "consumed water",
            EventCategory::AteFood => "ate food",
            EventCategory::PillReminder => "pill reminder",
            EventCategory::BodyMissing => "body missing",
        }
    }

    /// Categories that go out on the emergency notification channel
    pub fn is_emergency(&self) -> bool {
        matches!(self, EventCategory::Fallen)
    }

    pub fn consumed(category: Category) -> Option<Self> {
        match category {
            Category::Pill => Some(EventCategory::ConsumedPill),
            Category::Water => Some(EventCategory::ConsumedWater),
            Category::Food => Some(EventCategory::AteFood),
            Category::Unknown => None,
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealSlot {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=10 => MealSlot::Breakfast,
            11..=14 => MealSlot::Lunch,
            17..=20 => MealSlot::Dinner,
            _ => MealSlot::Snack,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::Lunch => "lunch",
            MealSlot::Dinner => "dinner",
            MealSlot::Snack => "snack",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventContext {
    Reminder { day_of_week: String, meal: MealSlot },
    Consumption { category: Category },
    Fall { reason: FallReason },
    BodyMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallReason {
    /// Body vanished and came back within the abrupt-disappearance window
    AbruptDisappearance,
    /// Upright check kept failing for the confirmation window
    SustainedPosture,
}

impl FallReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallReason::AbruptDisappearance => "body disappeared quickly",
            FallReason::SustainedPosture => "pose detection",
        }
    }
}

/// Write-once record handed to the sinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedEvent {
    pub id: uuid::Uuid,
    pub category: EventCategory,
    pub timestamp: Timestamp,
    pub context: EventContext,
}

impl EmittedEvent {
    pub fn new(category: EventCategory, timestamp: Timestamp, context: EventContext) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            category,
            timestamp,
            context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_aspect_ratio_is_orientation_independent() {
        let tall = BoundingBox::new(0.0, 0.0, 20.0, 60.0);
        let wide = BoundingBox::new(0.0, 0.0, 60.0, 20.0);
        assert_eq!(tall.aspect_ratio(), 3.0);
        assert_eq!(wide.aspect_ratio(), 3.0);
        assert_eq!(BoundingBox::new(5.0, 5.0, 5.0, 9.0).aspect_ratio(), 1.0);
    }

    #[test]
    fn test_meal_slot_boundaries() {
        assert_eq!(MealSlot::from_hour(5), MealSlot::Snack);
        assert_eq!(MealSlot::from_hour(6), MealSlot::Breakfast);
        assert_eq!(MealSlot::from_hour(10), MealSlot::Breakfast);
        assert_eq!(MealSlot::from_hour(11), MealSlot::Lunch);
        assert_eq!(MealSlot::from_hour(15), MealSlot::Snack);
        assert_eq!(MealSlot::from_hour(17), MealSlot::Dinner);
        assert_eq!(MealSlot::from_hour(21), MealSlot::Snack);
    }

    #[test]
    fn test_landmark_lookup_by_index() {
        let set: LandmarkSet = vec![(0, 1.0, 1.0), (5, 2.0, 2.0)].into();
        assert_eq!(set.get(5).map(|p| p.x), Some(2.0));
        assert!(set.get(1).is_none());
        assert!(LandmarkSet::empty().is_empty());
    }

    #[test]
    fn test_event_category_serializes_as_log_name() {
        let json = serde_json::to_string(&EventCategory::AteFood).unwrap();
        assert_eq!(json, "\"ate food\"");
    }

    #[test]
    fn test_config_defaults_from_empty_yaml() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.sampling.process_every_n_frames, 5);
        assert_eq!(config.cooldowns.food_consumed_secs, 1800.0);
        assert_eq!(config.pose.foot_landmark, 27);
    }
}
