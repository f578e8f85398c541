// src/summary.rs
//
// End-of-run report built from the event log: per-category counts over the
// last N days plus the anomalies a caregiver should look at.

use crate::types::{seconds_between, EmittedEvent, EventCategory, Timestamp};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::warn;

const FALL_THRESHOLD: usize = 1;
const MISSED_PILL_THRESHOLD: i64 = 3;
const DOSES_PER_DAY: i64 = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventStats {
    pub event: EventCategory,
    pub count: usize,
    pub first_occurrence: Option<Timestamp>,
    pub last_occurrence: Option<Timestamp>,
    pub average_per_day: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub event: String,
    pub count: i64,
    pub last_occurrence: Option<Timestamp>,
    pub note: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub summary_window: String,
    pub anomalies: Vec<Anomaly>,
    pub details: Vec<EventStats>,
}

pub struct AnomalyReporter {
    days: u32,
}

impl AnomalyReporter {
    pub fn new(days: u32) -> Self {
        Self { days: days.max(1) }
    }

    /// Events from a JSON-lines log. A missing log is an empty history.
    pub fn load_events<P: AsRef<Path>>(path: P) -> Result<Vec<EmittedEvent>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read event log {}", path.display()))?;

        let mut events = Vec::new();
        for (i, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<EmittedEvent>(line) {
                Ok(event) => events.push(event),
                Err(e) => warn!("{}:{} skipped: {}", path.display(), i + 1, e),
            }
        }
        Ok(events)
    }

    pub fn event_stats(
        &self,
        events: &[EmittedEvent],
        category: EventCategory,
        now: Timestamp,
    ) -> EventStats {
        let window_secs = f64::from(self.days) * 86_400.0;
        let times: Vec<Timestamp> = events
            .iter()
            .filter(|e| e.category == category)
            .map(|e| e.timestamp)
            .filter(|&t| {
                let age = seconds_between(t, now);
                (0.0..=window_secs).contains(&age)
            })
            .collect();

        EventStats {
            event: category,
            count: times.len(),
            first_occurrence: times.iter().min().copied(),
            last_occurrence: times.iter().max().copied(),
            average_per_day: times.len() as f64 / f64::from(self.days),
        }
    }

    pub fn generate_report(&self, events: &[EmittedEvent], now: Timestamp) -> SummaryReport {
        let details: Vec<EventStats> = EventCategory::ALL
            .iter()
            .map(|&category| self.event_stats(events, category, now))
            .collect();
        let mut anomalies = Vec::new();

        let falls = self.event_stats(events, EventCategory::Fallen, now);
        if falls.count >= FALL_THRESHOLD {
            anomalies.push(Anomaly {
                event: EventCategory::Fallen.as_str().to_string(),
                count: falls.count as i64,
                last_occurrence: falls.last_occurrence,
                note: format!("{} fall event(s) detected.", falls.count),
            });
        }

        let pills = self.event_stats(events, EventCategory::ConsumedPill, now);
        let expected = i64::from(self.days) * DOSES_PER_DAY;
        let missed = expected - pills.count as i64;
        if missed >= MISSED_PILL_THRESHOLD {
            anomalies.push(Anomaly {
                event: "missed_pills".to_string(),
                count: missed,
                last_occurrence: pills.last_occurrence,
                note: format!(
                    "{} medication dose(s) missed (expected {}).",
                    missed, expected
                ),
            });
        }

        SummaryReport {
            summary_window: format!("Last {} day(s)", self.days),
            anomalies,
            details,
        }
    }

    pub fn report_from_log<P: AsRef<Path>>(
        &self,
        path: P,
        now: Timestamp,
    ) -> Result<SummaryReport> {
        let events = Self::load_events(path)?;
        Ok(self.generate_report(&events, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, EventContext, FallReason};
    use chrono::NaiveDate;

    fn at(day: u32, h: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2025, 8, day)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn pill(ts: Timestamp) -> EmittedEvent {
        EmittedEvent::new(
            EventCategory::ConsumedPill,
            ts,
            EventContext::Consumption {
                category: Category::Pill,
            },
        )
    }

    fn fall(ts: Timestamp) -> EmittedEvent {
        EmittedEvent::new(
            EventCategory::Fallen,
            ts,
            EventContext::Fall {
                reason: FallReason::SustainedPosture,
            },
        )
    }

    #[test]
    fn test_stats_respect_the_window() {
        let reporter = AnomalyReporter::new(1);
        let events = vec![pill(at(3, 8)), pill(at(4, 8)), pill(at(4, 13))];
        let stats = reporter.event_stats(&events, EventCategory::ConsumedPill, at(4, 20));

        assert_eq!(stats.count, 2);
        assert_eq!(stats.first_occurrence, Some(at(4, 8)));
        assert_eq!(stats.last_occurrence, Some(at(4, 13)));
        assert_eq!(stats.average_per_day, 2.0);
    }

    #[test]
    fn test_quiet_day_reports_missed_pills() {
        let reporter = AnomalyReporter::new(1);
        let report = reporter.generate_report(&[], at(4, 20));

        assert_eq!(report.summary_window, "Last 1 day(s)");
        assert_eq!(report.details.len(), EventCategory::ALL.len());
        assert_eq!(report.anomalies.len(), 1);
        assert_eq!(report.anomalies[0].event, "missed_pills");
        assert_eq!(report.anomalies[0].count, 3);
    }

    #[test]
    fn test_fall_is_always_an_anomaly() {
        let reporter = AnomalyReporter::new(1);
        let events = vec![fall(at(4, 10)), pill(at(4, 8)), pill(at(4, 13))];
        let report = reporter.generate_report(&events, at(4, 20));

        assert_eq!(report.anomalies.len(), 1);
        assert_eq!(report.anomalies[0].event, "fallen");
        assert_eq!(report.anomalies[0].last_occurrence, Some(at(4, 10)));
    }

    #[test]
    fn test_load_skips_bad_lines_and_missing_log() {
        assert!(AnomalyReporter::load_events("no/such/events.jsonl").unwrap().is_empty());

        let path = std::env::temp_dir()
            .join(format!("care-monitor-summary-{}.jsonl", uuid::Uuid::new_v4()));
        let good = serde_json::to_string(&pill(at(4, 8))).unwrap();
        fs::write(&path, format!("{}\ngarbage\n\n{}\n", good, good)).unwrap();

        let events = AnomalyReporter::load_events(&path).unwrap();
        assert_eq!(events.len(), 2);
        fs::remove_file(&path).ok();
    }
}
