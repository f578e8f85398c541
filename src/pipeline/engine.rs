// src/pipeline/engine.rs
//
// One monitoring cycle per frame, strictly in order:
//   landmarks -> pose update -> (every Nth frame) detect + classify -> correlate
//
// The engine owns every piece of mutable monitoring state. Nothing here
// blocks on delivery; emitted events are handed back to the caller.

use super::correlator::EventCorrelator;
use super::metrics::PipelineMetrics;
use crate::classification::ObjectClassifier;
use crate::detection::PoseStateMachine;
use crate::sensing::{LandmarkSource, ObjectDetector, TextExtractor};
use crate::types::{
    Category, ClassifiedObject, Config, EmittedEvent, FrameInfo, LandmarkSet, PoseState,
    SamplingConfig, Timestamp,
};
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub pose: PoseState,
    pub events: Vec<EmittedEvent>,
    /// The pose was (re-)announced this cycle
    pub announced: bool,
}

pub struct MonitorEngine {
    pose: PoseStateMachine,
    classifier: ObjectClassifier,
    correlator: EventCorrelator,
    sampling: SamplingConfig,
    /// Last classification result; reused until the next sampled frame
    objects: Vec<ClassifiedObject>,
    frame_count: u64,
    metrics: PipelineMetrics,
}

impl MonitorEngine {
    pub fn new(config: &Config, metrics: PipelineMetrics) -> Self {
        Self {
            pose: PoseStateMachine::new(config.pose.clone()),
            classifier: ObjectClassifier::new(
                config.classifier.clone(),
                config.sampling.text_cache_clear_interval,
            ),
            correlator: EventCorrelator::new(&config.cooldowns),
            sampling: config.sampling.clone(),
            objects: Vec::new(),
            frame_count: 0,
            metrics,
        }
    }

    pub fn pose_state(&self) -> PoseState {
        self.pose.state()
    }

    pub fn objects(&self) -> &[ClassifiedObject] {
        &self.objects
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn process_cycle<S>(&mut self, frame: FrameInfo, sensors: &S, now: Timestamp) -> CycleOutcome
    where
        S: LandmarkSource + ObjectDetector + TextExtractor,
    {
        let started = Instant::now();
        self.frame_count += 1;
        self.metrics.inc(&self.metrics.total_frames);

        let landmarks = sensors.landmarks().unwrap_or_else(|e| {
            warn!("Landmark source failed on frame {}: {:#}", self.frame_count, e);
            self.metrics.inc(&self.metrics.sensing_failures);
            LandmarkSet::empty()
        });
        if !landmarks.is_empty() {
            self.metrics.inc(&self.metrics.frames_with_body);
        }

        let update = self.pose.update(&landmarks, now);
        if let Some(reading) = update.reading {
            debug!(
                "Frame {}: {} ({} landmarks, hand-mouth={:?})",
                self.frame_count,
                update.state,
                landmarks.len(),
                reading.hand_mouth_distance
            );
        }
        let mut events = Vec::new();
        if let Some(signal) = update.signal {
            events.extend(self.correlator.on_pose_signal(signal, now));
        }

        if self.is_sampled_frame() {
            self.refresh_objects(frame, sensors, update.state);
        }

        events.extend(self.correlator.on_cycle(update.state, &self.objects, now));

        self.metrics.add(&self.metrics.events_emitted, events.len() as u64);
        self.metrics
            .set_timing(&self.metrics.cycle_time_us, started.elapsed().as_micros() as u64);

        CycleOutcome {
            pose: update.state,
            events,
            announced: update.announce,
        }
    }

    /// First frame and every Nth after it
    fn is_sampled_frame(&self) -> bool {
        let every = self.sampling.process_every_n_frames.max(1);
        (self.frame_count - 1) % every == 0
    }

    fn refresh_objects<S>(&mut self, frame: FrameInfo, sensors: &S, pose: PoseState)
    where
        S: ObjectDetector + TextExtractor,
    {
        self.metrics.inc(&self.metrics.detection_cycles);
        let cycle = self.classifier.begin_cycle();

        let detections = match sensors.detect() {
            Ok(d) => d,
            Err(e) => {
                warn!("Object detector failed on cycle {}: {:#}", cycle, e);
                self.metrics.inc(&self.metrics.sensing_failures);
                Vec::new()
            }
        };

        let threshold = self.sampling.confidence_threshold;
        let mut objects = Vec::new();
        for detection in detections.into_iter().filter(|d| d.confidence > threshold) {
            let category = self.classifier.classify(&detection, frame, pose, sensors);
            self.metrics.record_category(category);
            if category != Category::Unknown {
                objects.push(ClassifiedObject {
                    detection,
                    category,
                });
            }
        }

        debug!(
            "Cycle {}: {} object(s) in view: {:?}",
            cycle,
            objects.len(),
            objects
                .iter()
                .map(|o| (o.detection.class_label.as_str(), o.category.as_str()))
                .collect::<Vec<_>>()
        );
        self.objects = objects;
    }
}
