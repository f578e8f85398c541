// src/dispatch/messages.rs
//
// Human-readable text for each event, spoken and sent.

use crate::types::{EmittedEvent, EventCategory, EventContext};

/// What the voice announcer says, if anything
pub fn spoken_text(event: &EmittedEvent) -> Option<String> {
    match &event.context {
        EventContext::Reminder { day_of_week, meal } => Some(format!(
            "It is {} {}. Make sure to take the right pill.",
            day_of_week,
            meal.as_str()
        )),
        _ => None,
    }
}

/// One-line notification body for caregivers
pub fn notification_text(event: &EmittedEvent, patient: &str) -> String {
    let time = event.timestamp.format("%I:%M %p");
    match (&event.category, &event.context) {
        (EventCategory::Fallen, EventContext::Fall { reason }) => format!(
            "🚨 FALL ALERT: {} may have fallen at {}. Fall type: {}. Please check immediately!",
            patient,
            time,
            reason.as_str()
        ),
        (EventCategory::Fallen, _) => format!(
            "🚨 FALL ALERT: {} may have fallen at {}. Please check immediately!",
            patient, time
        ),
        (EventCategory::ConsumedPill, _) => format!("✅ CONFIRMED: Medication taken at {}", time),
        (EventCategory::ConsumedWater, _) => format!("💧 HYDRATION: Water intake logged at {}", time),
        (EventCategory::AteFood, _) => format!("🍽️ MEAL: Food consumption detected at {}", time),
        (EventCategory::PillReminder, EventContext::Reminder { day_of_week, meal }) => format!(
            "🔔 REMINDER: It's {} {}. Time to take your medication.",
            day_of_week,
            meal.as_str()
        ),
        (EventCategory::PillReminder, _) => {
            "🔔 REMINDER: Time to take your medication.".to_string()
        }
        (EventCategory::BodyMissing, _) => {
            format!("👻 {} is out of the camera view since {}", patient, time)
        }
    }
}
