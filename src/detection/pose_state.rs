// src/detection/pose_state.rs
//
// Posture / presence state machine.
//
// Fed one LandmarkSet per frame. Two independent triggers lead into Fallen:
//   - abrupt disappearance: the body went missing and came back before
//     `abrupt_disappearance_secs` had passed since it was last seen
//   - sustained posture: the upright check kept failing for longer than
//     `fall_confirm_secs`
// Absence of a body is a valid state, never an error.

use super::geometry::distance_between;
use crate::types::{seconds_between, FallReason, LandmarkSet, PoseConfig, PoseState, Timestamp};
use tracing::{debug, info, warn};

/// Discrete signal raised by a state update, turned into an event by the correlator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseSignal {
    Fallen(FallReason),
    BodyMissing,
}

/// Raw posture metrics of one frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PoseReading {
    pub head_foot_distance: Option<f32>,
    /// head.y - foot.y; negative while the head is above the feet
    pub head_vertical_offset: Option<f32>,
    pub hand_mouth_distance: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoseUpdate {
    pub state: PoseState,
    pub signal: Option<PoseSignal>,
    /// True when the state should be re-announced for observability
    pub announce: bool,
    pub reading: Option<PoseReading>,
}

pub struct PoseStateMachine {
    config: PoseConfig,
    state: PoseState,
    last_body_seen: Option<Timestamp>,
    bad_posture_since: Option<Timestamp>,
    last_announced_at: Option<Timestamp>,
}

impl PoseStateMachine {
    pub fn new(config: PoseConfig) -> Self {
        Self {
            config,
            state: PoseState::Idle,
            last_body_seen: None,
            bad_posture_since: None,
            last_announced_at: None,
        }
    }

    pub fn state(&self) -> PoseState {
        self.state
    }

    pub fn update(&mut self, landmarks: &LandmarkSet, now: Timestamp) -> PoseUpdate {
        let previous = self.state;
        let (signal, reading) = if landmarks.is_empty() {
            (self.update_absent(now), None)
        } else {
            let reading = self.read(landmarks);
            (self.update_present(reading, now), Some(reading))
        };

        let announce = self.should_announce(previous, now);
        if announce {
            self.last_announced_at = Some(now);
            match self.state {
                PoseState::Fallen | PoseState::BodyMissing => warn!("⚠️  Pose: {}", self.state),
                _ => info!("🧍 Pose: {}", self.state),
            }
            if let Some(r) = reading {
                debug!(
                    "Pose metrics: head-foot={:?} offset={:?} hand-mouth={:?}",
                    r.head_foot_distance,
                    r.head_vertical_offset,
                    r.hand_mouth_distance
                );
            }
        }

        PoseUpdate {
            state: self.state,
            signal,
            announce,
            reading,
        }
    }

    fn update_absent(&mut self, now: Timestamp) -> Option<PoseSignal> {
        if self.state == PoseState::BodyMissing {
            return None;
        }

        let missing = match self.last_body_seen {
            // Never seen anyone: nobody is there
            None => true,
            Some(seen) => {
                let gap = seconds_between(seen, now);
                if gap < 0.0 {
                    warn!("Clock stepped back {:.1}s, restarting the missing grace", -gap);
                    self.last_body_seen = Some(now);
                }
                gap > self.config.missing_grace_secs
            }
        };

        if missing {
            self.state = PoseState::BodyMissing;
            self.bad_posture_since = None;
            Some(PoseSignal::BodyMissing)
        } else {
            None
        }
    }

    fn update_present(&mut self, reading: PoseReading, now: Timestamp) -> Option<PoseSignal> {
        let gap = self.last_body_seen.map(|seen| seconds_between(seen, now));
        self.last_body_seen = Some(now);

        if self.state == PoseState::BodyMissing {
            if let Some(gap) = gap {
                // A negative gap is a clock reset, not a short disappearance
                if gap < 0.0 {
                    warn!("Clock stepped back {:.1}s while the body was missing", -gap);
                } else if gap < self.config.abrupt_disappearance_secs {
                    debug!("Body reappeared after {:.2}s", gap);
                    self.state = PoseState::Fallen;
                    self.bad_posture_since = None;
                    return Some(PoseSignal::Fallen(FallReason::AbruptDisappearance));
                }
            }
        }

        if self.is_upright(&reading) {
            self.bad_posture_since = None;
            let consuming = reading
                .hand_mouth_distance
                .is_some_and(|d| d < self.config.consuming_max_distance);
            self.state = if consuming {
                PoseState::Consuming
            } else {
                PoseState::Standing
            };
            return None;
        }

        let since = match self
            .bad_posture_since
            .filter(|&since| seconds_between(since, now) >= 0.0)
        {
            Some(since) => since,
            None => {
                self.bad_posture_since = Some(now);
                now
            }
        };
        if seconds_between(since, now) > self.config.fall_confirm_secs {
            let entering = self.state != PoseState::Fallen;
            self.state = PoseState::Fallen;
            if entering || self.announce_due(now) {
                return Some(PoseSignal::Fallen(FallReason::SustainedPosture));
            }
        } else if self.state != PoseState::Fallen {
            // Stays Fallen until an upright frame or a disappearance
            self.state = PoseState::Idle;
        }
        None
    }

    fn read(&self, landmarks: &LandmarkSet) -> PoseReading {
        let c = &self.config;
        let head_vertical_offset = match (landmarks.get(c.head_landmark), landmarks.get(c.foot_landmark)) {
            (Some(head), Some(foot)) => Some(head.y - foot.y),
            _ => None,
        };
        PoseReading {
            head_foot_distance: distance_between(landmarks, c.head_landmark, c.foot_landmark),
            head_vertical_offset,
            hand_mouth_distance: distance_between(landmarks, c.mouth_landmark, c.hand_landmark),
        }
    }

    /// Missing landmarks make the check fail
    fn is_upright(&self, reading: &PoseReading) -> bool {
        match (reading.head_foot_distance, reading.head_vertical_offset) {
            (Some(distance), Some(offset)) => {
                distance > self.config.upright_min_distance
                    && offset < self.config.max_head_vertical_offset
            }
            _ => false,
        }
    }

    fn announce_due(&self, now: Timestamp) -> bool {
        self.last_announced_at.map_or(true, |t| {
            let elapsed = seconds_between(t, now);
            elapsed < 0.0 || elapsed > self.config.announce_interval_secs
        })
    }

    fn should_announce(&self, previous: PoseState, now: Timestamp) -> bool {
        if self.state != previous || self.last_announced_at.is_none() {
            return true;
        }
        matches!(
            self.state,
            PoseState::Standing | PoseState::Consuming | PoseState::Fallen
        ) && self.announce_due(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t(ms: i64) -> Timestamp {
        NaiveDate::from_ymd_opt(2025, 8, 4)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
            + chrono::Duration::milliseconds(ms)
    }

    fn standing() -> LandmarkSet {
        // head high above the ankle, hand far from the mouth
        vec![(2, 200.0, 50.0), (9, 200.0, 70.0), (19, 400.0, 300.0), (27, 200.0, 400.0)].into()
    }

    fn consuming() -> LandmarkSet {
        vec![(2, 200.0, 50.0), (9, 200.0, 70.0), (19, 210.0, 90.0), (27, 200.0, 400.0)].into()
    }

    fn lying() -> LandmarkSet {
        // head dropped below the ankle line and close to it
        vec![(2, 100.0, 320.0), (9, 110.0, 320.0), (19, 300.0, 300.0), (27, 160.0, 300.0)].into()
    }

    fn machine() -> PoseStateMachine {
        PoseStateMachine::new(PoseConfig::default())
    }

    #[test]
    fn test_upright_states() {
        let mut m = machine();
        assert_eq!(m.update(&standing(), t(0)).state, PoseState::Standing);
        assert_eq!(m.update(&consuming(), t(100)).state, PoseState::Consuming);
        assert_eq!(m.update(&standing(), t(200)).state, PoseState::Standing);
    }

    #[test]
    fn test_no_body_ever_is_body_missing_once() {
        let mut m = machine();
        let first = m.update(&LandmarkSet::empty(), t(0));
        assert_eq!(first.state, PoseState::BodyMissing);
        assert_eq!(first.signal, Some(PoseSignal::BodyMissing));

        let second = m.update(&LandmarkSet::empty(), t(500));
        assert_eq!(second.state, PoseState::BodyMissing);
        assert_eq!(second.signal, None, "signal only on entry");
    }

    #[test]
    fn test_empty_beyond_grace_reaches_body_missing_and_stays() {
        let mut m = machine();
        m.update(&standing(), t(0));

        // Within the grace period the state is held
        assert_eq!(m.update(&LandmarkSet::empty(), t(500)).state, PoseState::Standing);
        assert_eq!(m.update(&LandmarkSet::empty(), t(1000)).state, PoseState::Standing);

        let update = m.update(&LandmarkSet::empty(), t(1100));
        assert_eq!(update.state, PoseState::BodyMissing);
        assert_eq!(update.signal, Some(PoseSignal::BodyMissing));

        for ms in (1200..20_000).step_by(700) {
            let u = m.update(&LandmarkSet::empty(), t(ms));
            assert_eq!(u.state, PoseState::BodyMissing);
            assert!(u.signal.is_none());
        }
    }

    #[test]
    fn test_quick_disappearance_is_a_fall() {
        let mut m = machine();
        m.update(&standing(), t(0));
        m.update(&LandmarkSet::empty(), t(1500));
        assert_eq!(m.state(), PoseState::BodyMissing);

        let back = m.update(&standing(), t(2500));
        assert_eq!(back.state, PoseState::Fallen);
        assert_eq!(
            back.signal,
            Some(PoseSignal::Fallen(FallReason::AbruptDisappearance))
        );
    }

    #[test]
    fn test_long_disappearance_is_not_a_fall() {
        let mut m = machine();
        m.update(&standing(), t(0));
        m.update(&LandmarkSet::empty(), t(1500));
        let back = m.update(&standing(), t(4000));
        assert_eq!(back.state, PoseState::Standing);
        assert!(back.signal.is_none());
    }

    #[test]
    fn test_flicker_within_grace_keeps_state() {
        let mut m = machine();
        m.update(&standing(), t(0));
        m.update(&LandmarkSet::empty(), t(300));
        let back = m.update(&standing(), t(600));
        assert_eq!(back.state, PoseState::Standing);
        assert!(back.signal.is_none());
    }

    #[test]
    fn test_sustained_bad_posture_confirms_fall() {
        let mut m = machine();
        m.update(&standing(), t(0));

        assert_eq!(m.update(&lying(), t(100)).state, PoseState::Idle);
        assert_eq!(m.update(&lying(), t(3000)).state, PoseState::Idle);
        assert_eq!(m.update(&lying(), t(5100)).state, PoseState::Idle);

        let fall = m.update(&lying(), t(5200));
        assert_eq!(fall.state, PoseState::Fallen);
        assert_eq!(fall.signal, Some(PoseSignal::Fallen(FallReason::SustainedPosture)));

        // Still lying: stays Fallen without re-signalling every frame
        let again = m.update(&lying(), t(5300));
        assert_eq!(again.state, PoseState::Fallen);
        assert!(again.signal.is_none());

        // Re-confirmed after the announce interval
        let later = m.update(&lying(), t(10_400));
        assert_eq!(later.signal, Some(PoseSignal::Fallen(FallReason::SustainedPosture)));
    }

    #[test]
    fn test_upright_frame_resets_posture_timer() {
        let mut m = machine();
        m.update(&lying(), t(0));
        m.update(&lying(), t(4000));
        m.update(&standing(), t(4500));
        assert_eq!(m.update(&lying(), t(6000)).state, PoseState::Idle);
        assert_eq!(m.update(&lying(), t(9000)).state, PoseState::Idle);
    }

    #[test]
    fn test_clock_stepping_back_is_not_a_fall() {
        let mut m = machine();
        m.update(&standing(), t(0));
        assert_eq!(m.update(&LandmarkSet::empty(), t(2000)).state, PoseState::BodyMissing);

        // Back 40 real seconds later, but the wall clock fell back an hour
        let back = m.update(&standing(), t(40_000 - 3_600_000));
        assert_eq!(back.state, PoseState::Standing);
        assert_eq!(back.signal, None);
    }

    #[test]
    fn test_clock_stepping_back_while_absent_restarts_grace() {
        let mut m = machine();
        m.update(&standing(), t(0));
        assert_eq!(
            m.update(&LandmarkSet::empty(), t(-3_600_000)).state,
            PoseState::Standing
        );
        let update = m.update(&LandmarkSet::empty(), t(-3_598_500));
        assert_eq!(update.state, PoseState::BodyMissing);
        assert_eq!(update.signal, Some(PoseSignal::BodyMissing));
    }

    #[test]
    fn test_clock_stepping_back_restarts_the_posture_timer() {
        let mut m = machine();
        m.update(&lying(), t(0));
        m.update(&lying(), t(2000));
        // Clock jumps back; the bad posture must still confirm after 5s
        m.update(&lying(), t(-3_600_000));
        assert_eq!(m.update(&lying(), t(-3_597_000)).state, PoseState::Idle);
        assert_eq!(m.update(&lying(), t(-3_594_000)).state, PoseState::Fallen);
    }

    #[test]
    fn test_missing_required_landmarks_fail_upright_check() {
        let mut m = machine();
        let partial: LandmarkSet = vec![(0, 1.0, 1.0)].into();
        let update = m.update(&partial, t(0));
        assert_eq!(update.state, PoseState::Idle);
        assert_eq!(update.reading.unwrap().head_foot_distance, None);
    }

    #[test]
    fn test_announce_on_change_and_interval_only() {
        let mut m = machine();
        assert!(m.update(&standing(), t(0)).announce);
        assert!(!m.update(&standing(), t(1000)).announce);
        assert!(m.update(&consuming(), t(2000)).announce);
        assert!(!m.update(&consuming(), t(6000)).announce);
        assert!(m.update(&consuming(), t(7100)).announce);
    }
}
