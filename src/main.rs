// src/main.rs

mod classification;
mod config;
mod detection;
mod dispatch;
mod pipeline;
mod replay;
mod sensing;
mod summary;
mod types;

use anyhow::Result;
use dispatch::{
    dispatch_channel, Dispatcher, EventSink, JsonlEventLog, Notifier, VoiceAnnouncer,
    WebhookNotifier,
};
use pipeline::{MonitorEngine, PipelineMetrics};
use replay::{pacing_delay, ReplaySource};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use summary::AnomalyReporter;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use types::{PoseState, Timestamp};

struct ReplayStats {
    lines: usize,
    frames: usize,
    malformed: usize,
    events: usize,
    announcements: usize,
    last_time: Option<Timestamp>,
    final_pose: PoseState,
    interrupted: bool,
    /// Capture failure that ended the file early; frames before it still count
    read_error: Option<anyhow::Error>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path =
        std::env::var("CARE_MONITOR_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = types::Config::load(&config_path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🩺 Care Monitor Starting");
    info!("✓ Configuration loaded from {}", config_path);
    info!(
        "Cooldowns: pill={}s water={}s food={}s reminder={}s fall={}s missing={}s",
        config.cooldowns.pill_consumed_secs,
        config.cooldowns.water_consumed_secs,
        config.cooldowns.food_consumed_secs,
        config.cooldowns.pill_reminder_secs,
        config.cooldowns.fall_secs,
        config.cooldowns.body_missing_secs
    );

    let metrics = PipelineMetrics::new();

    let event_log = JsonlEventLog::open(&config.dispatch.event_log_path)?;
    info!("✓ Event log: {}", event_log.path().display());
    let sinks: Vec<Arc<dyn EventSink>> = vec![Arc::new(event_log)];

    let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();
    match &config.dispatch.webhook_url {
        Some(url) => {
            let webhook = WebhookNotifier::new(
                url.clone(),
                config.dispatch.webhook_timeout_secs,
                config.dispatch.patient_name.clone(),
            )?;
            info!("📡 Emergency webhook: {}", url);
            notifiers.push(Arc::new(webhook));
        }
        None => info!("⚪ No webhook configured, emergencies are logged only"),
    }
    if config.dispatch.announce {
        notifiers.push(Arc::new(VoiceAnnouncer));
        info!("✓ Voice reminders enabled");
    }

    let (dispatcher, worker) = dispatch_channel(
        sinks,
        notifiers,
        metrics.clone(),
        Duration::from_secs(config.dispatch.shutdown_grace_secs),
    );
    let worker_handle = tokio::spawn(worker.run());

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("🛑 Interrupt received, finishing current frame");
                stop.store(true, Ordering::SeqCst);
            }
        });
    }

    let source = ReplaySource::new(&config);
    let replay_files = source.find_replay_files()?;
    if replay_files.is_empty() {
        error!("No replay files found in {}", config.replay.input_dir);
    }

    // One engine across every file: cooldowns and pose carry over
    let mut engine = MonitorEngine::new(&config, metrics.clone());
    let mut last_time = None;

    for (idx, path) in replay_files.iter().enumerate() {
        if stop.load(Ordering::SeqCst) {
            break;
        }

        info!("========================================");
        info!(
            "Replaying {}/{}: {}",
            idx + 1,
            replay_files.len(),
            path.display()
        );
        info!("========================================");

        match replay_file(
            path,
            &source,
            &mut engine,
            &dispatcher,
            config.replay.realtime,
            &stop,
        )
        .await
        {
            Ok(stats) => {
                info!("✓ Replay finished");
                info!("  Frames: {} ({} lines)", stats.frames, stats.lines);
                if stats.malformed > 0 {
                    warn!("  ⚠️  Malformed lines: {}", stats.malformed);
                }
                info!("  Events emitted: {}", stats.events);
                info!("  Pose announcements: {}", stats.announcements);
                info!("  Final pose: {}", stats.final_pose);
                if stats.interrupted {
                    warn!("  Replay interrupted");
                }
                if let Some(e) = &stats.read_error {
                    error!("  Replay stopped early: {:#}", e);
                }
                last_time = stats.last_time.or(last_time);
            }
            Err(e) => {
                error!("Failed to replay {}: {:#}", path.display(), e);
            }
        }
    }

    // Closing the queue lets the worker drain and exit
    drop(dispatcher);
    if let Err(e) = worker_handle.await {
        error!("Dispatch worker panicked: {}", e);
    }

    let run = metrics.summary();
    info!("========================================");
    info!("📊 Run metrics");
    info!("  Frames: {} ({:.1} FPS)", run.total_frames, run.fps);
    info!("  Frames with body: {}", run.frames_with_body);
    info!("  Detection cycles: {}", run.detection_cycles);
    info!(
        "  Objects: pills={} water={} food={} unknown={}",
        run.pills_seen, run.water_seen, run.food_seen, run.unknown_seen
    );
    info!(
        "  Events: {} emitted, {} delivered, {} failed",
        run.events_emitted, run.dispatch_successes, run.dispatch_failures
    );
    if run.sensing_failures > 0 {
        warn!("  Sensing failures: {}", run.sensing_failures);
    }
    debug!("{}", serde_json::to_string(&run)?);

    let now = last_time.unwrap_or_else(|| chrono::Local::now().naive_local());
    let reporter = AnomalyReporter::new(config.replay.summary_days);
    match reporter.report_from_log(&config.dispatch.event_log_path, now) {
        Ok(report) => {
            info!("📋 Summary ({})", report.summary_window);
            for stats in report.details.iter().filter(|s| s.count > 0) {
                info!(
                    "  {}: {} ({:.1}/day)",
                    stats.event, stats.count, stats.average_per_day
                );
            }
            if report.anomalies.is_empty() {
                info!("  ✅ No anomalies");
            }
            for anomaly in &report.anomalies {
                warn!("  🚨 {}", anomaly.note);
            }
        }
        Err(e) => error!("Failed to build summary: {:#}", e),
    }

    Ok(())
}

async fn replay_file(
    path: &Path,
    source: &ReplaySource,
    engine: &mut MonitorEngine,
    dispatcher: &Dispatcher,
    realtime: bool,
    stop: &AtomicBool,
) -> Result<ReplayStats> {
    let mut reader = source.open(path)?;
    let mut stats = ReplayStats {
        lines: 0,
        frames: 0,
        malformed: 0,
        events: 0,
        announcements: 0,
        last_time: None,
        final_pose: engine.pose_state(),
        interrupted: false,
        read_error: None,
    };

    loop {
        let frame = match reader.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                stats.read_error = Some(e);
                break;
            }
        };
        if stop.load(Ordering::SeqCst) {
            stats.interrupted = true;
            break;
        }

        if realtime {
            if let Some(previous) = stats.last_time {
                tokio::time::sleep(pacing_delay(previous, frame.time)).await;
            }
        }

        let outcome = engine.process_cycle(frame.info, &frame, frame.time);
        stats.frames += 1;
        stats.last_time = Some(frame.time);
        stats.final_pose = outcome.pose;

        if outcome.announced {
            stats.announcements += 1;
            info!("🧍 {} | pose: {}", frame.time.format("%H:%M:%S%.3f"), outcome.pose);
        }

        for event in outcome.events {
            info!(
                "🔔 {} | {} ({})",
                event.timestamp.format("%H:%M:%S%.3f"),
                event.category,
                event.id
            );
            stats.events += 1;
            dispatcher.enqueue(event);
        }

        if stats.frames % 500 == 0 {
            debug!(
                "Frame {} | pose={} objects={}",
                engine.frame_count(),
                engine.pose_state(),
                engine.objects().len()
            );
            // Let the dispatch worker run between long stretches of frames
            tokio::task::yield_now().await;
        }
    }

    stats.lines = reader.lines_read();
    stats.malformed = reader.malformed();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_read_error_keeps_frames_seen_so_far() {
        let dir = std::env::temp_dir().join(format!("care-monitor-main-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.jsonl");
        let mut contents = concat!(
            r#"{"time":"2025-08-04T08:00:00.000","landmarks":[[2,200,50],[27,200,400]]}"#,
            "\n",
            r#"{"time":"2025-08-04T08:00:00.200","landmarks":[[2,200,50],[27,200,400]]}"#,
            "\n"
        )
        .as_bytes()
        .to_vec();
        // Not UTF-8: the line reader fails here
        contents.extend_from_slice(&[0xff, 0xfe, 0xfd, b'\n']);
        fs::write(&path, contents).unwrap();

        let mut config = types::Config::default();
        config.replay.input_dir = dir.to_string_lossy().to_string();
        let source = ReplaySource::new(&config);
        let mut engine = MonitorEngine::new(&config, PipelineMetrics::new());
        let (dispatcher, _worker) =
            dispatch_channel(Vec::new(), Vec::new(), PipelineMetrics::new(), Duration::from_secs(1));
        let stop = AtomicBool::new(false);

        let stats = replay_file(&path, &source, &mut engine, &dispatcher, false, &stop)
            .await
            .unwrap();

        assert_eq!(stats.frames, 2);
        assert!(stats.read_error.is_some());
        let expected = chrono::NaiveDate::from_ymd_opt(2025, 8, 4)
            .unwrap()
            .and_hms_milli_opt(8, 0, 0, 200)
            .unwrap();
        assert_eq!(stats.last_time, Some(expected));

        fs::remove_dir_all(&dir).ok();
    }
}
