// src/replay.rs
//
// Recorded sessions stand in for the camera and the vision models. Each
// JSON line is one frame: its timestamp, the pose landmarks, and the
// object detections with any text read from them.

use crate::sensing::{LandmarkSource, ObjectDetector, TextExtractor};
use crate::types::{BoundingBox, Config, Detection, FrameInfo, LandmarkSet, Timestamp};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Real-time pacing never sleeps longer than this between two frames
const MAX_PACING_GAP: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct FrameRecord {
    time: Timestamp,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    landmarks: Vec<(u32, f32, f32)>,
    #[serde(default)]
    detections: Vec<DetectionRecord>,
}

#[derive(Debug, Deserialize)]
struct DetectionRecord {
    bbox: BoundingBox,
    confidence: f32,
    label: String,
    #[serde(default)]
    text: Option<String>,
}

/// One replayed frame, answering the engine's sensing calls
#[derive(Debug, Clone)]
pub struct RecordedFrame {
    pub time: Timestamp,
    pub info: FrameInfo,
    landmarks: LandmarkSet,
    detections: Vec<(Detection, Option<String>)>,
}

impl RecordedFrame {
    /// A frame where sensing produced nothing usable
    fn blank(time: Timestamp, info: FrameInfo) -> Self {
        Self {
            time,
            info,
            landmarks: LandmarkSet::empty(),
            detections: Vec::new(),
        }
    }

    fn from_record(record: FrameRecord, default_frame: FrameInfo) -> Self {
        let info = FrameInfo {
            width: record.width.unwrap_or(default_frame.width),
            height: record.height.unwrap_or(default_frame.height),
        };
        let detections = record
            .detections
            .into_iter()
            .map(|d| {
                (
                    Detection {
                        bbox: d.bbox,
                        confidence: d.confidence,
                        class_label: d.label,
                    },
                    d.text,
                )
            })
            .collect();

        Self {
            time: record.time,
            info,
            landmarks: record.landmarks.into(),
            detections,
        }
    }
}

impl LandmarkSource for RecordedFrame {
    fn landmarks(&self) -> Result<LandmarkSet> {
        Ok(self.landmarks.clone())
    }
}

impl ObjectDetector for RecordedFrame {
    fn detect(&self) -> Result<Vec<Detection>> {
        Ok(self.detections.iter().map(|(d, _)| d.clone()).collect())
    }
}

impl TextExtractor for RecordedFrame {
    /// Text recorded for the detection covering `region`; "" when none was
    fn extract_text(&self, region: &BoundingBox) -> Result<String> {
        let key = region.pixel_key();
        let text = self
            .detections
            .iter()
            .find(|(d, _)| d.bbox.clamp_to(self.info).pixel_key() == key)
            .and_then(|(_, text)| text.clone())
            .unwrap_or_default();
        Ok(text)
    }
}

pub struct ReplaySource {
    input_dir: PathBuf,
    default_frame: FrameInfo,
}

impl ReplaySource {
    pub fn new(config: &Config) -> Self {
        Self {
            input_dir: PathBuf::from(&config.replay.input_dir),
            default_frame: FrameInfo {
                width: config.replay.default_width,
                height: config.replay.default_height,
            },
        }
    }

    pub fn find_replay_files(&self) -> Result<Vec<PathBuf>> {
        if !self.input_dir.exists() {
            anyhow::bail!("Replay directory {} does not exist", self.input_dir.display());
        }

        let mut files: Vec<PathBuf> = WalkDir::new(&self.input_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("jsonl")))
            .collect();
        files.sort();

        info!("Found {} replay file(s)", files.len());
        Ok(files)
    }

    pub fn open(&self, path: &Path) -> Result<ReplayReader> {
        info!("Opening replay: {}", path.display());
        let file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

        Ok(ReplayReader {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
            last_time: None,
            default_frame: self.default_frame,
            malformed: 0,
        })
    }
}

pub struct ReplayReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: usize,
    last_time: Option<Timestamp>,
    default_frame: FrameInfo,
    malformed: usize,
}

impl ReplayReader {
    /// Next frame, `None` at end of file. An I/O error is a capture failure
    /// and ends the replay; a malformed line is a blank frame.
    pub fn next_frame(&mut self) -> Result<Option<RecordedFrame>> {
        loop {
            let Some(line) = self.lines.next() else {
                return Ok(None);
            };
            let line =
                line.with_context(|| format!("Read error in {}", self.path.display()))?;
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<FrameRecord>(&line) {
                Ok(record) => {
                    let frame = RecordedFrame::from_record(record, self.default_frame);
                    self.last_time = Some(frame.time);
                    return Ok(Some(frame));
                }
                Err(e) => {
                    self.malformed += 1;
                    warn!(
                        "{}:{} unreadable frame ({}), treating as blank",
                        self.path.display(),
                        self.line_no,
                        e
                    );
                    // No timestamp to anchor a blank frame before the first good one
                    if let Some(time) = self.last_time {
                        return Ok(Some(RecordedFrame::blank(time, self.default_frame)));
                    }
                    debug!("Skipping malformed line before first timestamp");
                }
            }
        }
    }

    pub fn lines_read(&self) -> usize {
        self.line_no
    }

    pub fn malformed(&self) -> usize {
        self.malformed
    }
}

/// Sleep needed between two frames to replay at recorded speed
pub fn pacing_delay(previous: Timestamp, next: Timestamp) -> Duration {
    (next - previous)
        .to_std()
        .map(|d| d.min(MAX_PACING_GAP))
        .unwrap_or(Duration::ZERO)
}
