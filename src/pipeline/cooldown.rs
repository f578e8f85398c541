// src/pipeline/cooldown.rs
//
// Per-category emission gates. A category may fire again once its window
// has fully elapsed since the last emission. A category that never fired
// is always ready.

use crate::types::{seconds_between, CooldownConfig, EventCategory, Timestamp};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct CooldownTimers {
    windows: HashMap<EventCategory, f64>,
    last_fired: HashMap<EventCategory, Timestamp>,
}

impl CooldownTimers {
    pub fn new(config: &CooldownConfig) -> Self {
        let windows = EventCategory::ALL
            .iter()
            .map(|&category| {
                let secs = match category {
                    EventCategory::ConsumedPill => config.pill_consumed_secs,
                    EventCategory::ConsumedWater => config.water_consumed_secs,
                    EventCategory::AteFood => config.food_consumed_secs,
                    EventCategory::PillReminder => config.pill_reminder_secs,
                    EventCategory::Fallen => config.fall_secs,
                    EventCategory::BodyMissing => config.body_missing_secs,
                };
                (category, secs)
            })
            .collect();

        Self {
            windows,
            last_fired: HashMap::new(),
        }
    }

    pub fn window(&self, category: EventCategory) -> f64 {
        self.windows.get(&category).copied().unwrap_or(0.0)
    }

    /// A clock that stepped back behind the last emission (DST, NTP) counts
    /// as a reset: the category is ready and the next fire re-seeds it.
    pub fn is_ready(&self, category: EventCategory, now: Timestamp) -> bool {
        self.last_fired.get(&category).map_or(true, |&last| {
            let elapsed = seconds_between(last, now);
            elapsed < 0.0 || elapsed >= self.window(category)
        })
    }

    /// Fire if ready. Returns whether the category fired.
    pub fn try_fire(&mut self, category: EventCategory, now: Timestamp) -> bool {
        if !self.is_ready(category, now) {
            return false;
        }
        self.last_fired.insert(category, now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t(secs: i64) -> Timestamp {
        NaiveDate::from_ymd_opt(2025, 8, 4)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            + chrono::Duration::seconds(secs)
    }

    #[test]
    fn test_unset_timer_is_ready() {
        let timers = CooldownTimers::new(&CooldownConfig::default());
        for category in EventCategory::ALL {
            assert!(timers.is_ready(category, t(0)));
        }
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let mut timers = CooldownTimers::new(&CooldownConfig::default());
        assert!(timers.try_fire(EventCategory::ConsumedPill, t(0)));
        assert!(!timers.try_fire(EventCategory::ConsumedPill, t(4)));
        assert!(timers.try_fire(EventCategory::ConsumedPill, t(5)));
    }

    #[test]
    fn test_categories_are_independent() {
        let mut timers = CooldownTimers::new(&CooldownConfig::default());
        assert!(timers.try_fire(EventCategory::AteFood, t(0)));
        assert!(timers.try_fire(EventCategory::ConsumedWater, t(1)));
        assert!(!timers.is_ready(EventCategory::AteFood, t(600)));
        assert!(timers.is_ready(EventCategory::AteFood, t(1800)));
        assert_eq!(timers.window(EventCategory::AteFood), 1800.0);
    }

    #[test]
    fn test_clock_stepping_back_resets_the_window() {
        let mut timers = CooldownTimers::new(&CooldownConfig::default());
        assert!(timers.try_fire(EventCategory::Fallen, t(0)));
        assert!(!timers.is_ready(EventCategory::Fallen, t(2)));

        // Wall clock jumps back an hour (DST fall-back)
        assert!(timers.is_ready(EventCategory::Fallen, t(-3000)));
        assert!(timers.try_fire(EventCategory::Fallen, t(-3000)));
        assert!(!timers.is_ready(EventCategory::Fallen, t(-2998)));
        assert!(timers.is_ready(EventCategory::Fallen, t(-2995)));
    }
}
