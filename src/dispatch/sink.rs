// src/dispatch/sink.rs
//
// Persistence of emitted events. The engine guarantees at most one event
// per category per cooldown window, so sinks never de-duplicate.

use crate::types::EmittedEvent;
use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

pub trait EventSink: Send + Sync {
    fn name(&self) -> &str;
    fn record(&self, event: &EmittedEvent) -> Result<()>;
}

/// Append-only JSON lines, one event per line
pub struct JsonlEventLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlEventLog {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open event log {}", path.display()))?;

        info!("💾 Event log: {}", path.display());
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for JsonlEventLog {
    fn name(&self) -> &str {
        "event-log"
    }

    fn record(&self, event: &EmittedEvent) -> Result<()> {
        let line = serde_json::to_string(event)?;
        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow::anyhow!("event log lock poisoned"))?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }
}
