// src/pipeline/correlator.rs
//
// Turns (pose, visible objects) into at most one care event per cycle,
// and pose signals into fall / body-missing events. All de-duplication
// happens here through the cooldown timers.

use super::cooldown::CooldownTimers;
use crate::detection::PoseSignal;
use crate::types::{
    Category, ClassifiedObject, CooldownConfig, EmittedEvent, EventCategory, EventContext,
    MealSlot, PoseState, Timestamp,
};
use chrono::Timelike;
use tracing::{info, warn};

/// Consumption priority: the first present category that is off cooldown wins
const CONSUMPTION_ORDER: [Category; 3] = [Category::Pill, Category::Water, Category::Food];

pub struct EventCorrelator {
    cooldowns: CooldownTimers,
}

impl EventCorrelator {
    pub fn new(config: &CooldownConfig) -> Self {
        Self {
            cooldowns: CooldownTimers::new(config),
        }
    }

    pub fn on_cycle(
        &mut self,
        pose: PoseState,
        objects: &[ClassifiedObject],
        now: Timestamp,
    ) -> Option<EmittedEvent> {
        let present = |category: Category| objects.iter().any(|o| o.category == category);

        match pose {
            PoseState::Standing if present(Category::Pill) => self.pill_reminder(now),
            PoseState::Consuming => self.consumption(&present, now),
            _ => None,
        }
    }

    pub fn on_pose_signal(&mut self, signal: PoseSignal, now: Timestamp) -> Option<EmittedEvent> {
        let (category, context) = match signal {
            PoseSignal::Fallen(reason) => (EventCategory::Fallen, EventContext::Fall { reason }),
            PoseSignal::BodyMissing => (EventCategory::BodyMissing, EventContext::BodyMissing),
        };

        if !self.cooldowns.try_fire(category, now) {
            return None;
        }

        match context {
            EventContext::Fall { reason } => warn!("🚨 Fall detected ({})", reason.as_str()),
            _ => warn!("👻 Body missing from view"),
        }
        Some(EmittedEvent::new(category, now, context))
    }

    /// Informational only; never combined with a consumption event
    fn pill_reminder(&mut self, now: Timestamp) -> Option<EmittedEvent> {
        if !self.cooldowns.try_fire(EventCategory::PillReminder, now) {
            return None;
        }

        let day_of_week = now.format("%A").to_string();
        let meal = MealSlot::from_hour(now.hour());
        info!("💊 Pill reminder: {} {}", day_of_week, meal.as_str());
        Some(EmittedEvent::new(
            EventCategory::PillReminder,
            now,
            EventContext::Reminder { day_of_week, meal },
        ))
    }

    fn consumption(
        &mut self,
        present: &dyn Fn(Category) -> bool,
        now: Timestamp,
    ) -> Option<EmittedEvent> {
        for category in CONSUMPTION_ORDER {
            if !present(category) {
                continue;
            }
            let Some(event_category) = EventCategory::consumed(category) else {
                continue;
            };
            if self.cooldowns.try_fire(event_category, now) {
                info!("✅ {} at {}", event_category, now.format("%I:%M %p"));
                return Some(EmittedEvent::new(
                    event_category,
                    now,
                    EventContext::Consumption { category },
                ));
            }
        }
        None
    }
}
