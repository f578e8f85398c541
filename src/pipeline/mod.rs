// src/pipeline/mod.rs

pub mod cooldown;
pub mod correlator;
pub mod engine;
pub mod metrics;

pub use engine::MonitorEngine;
pub use metrics::PipelineMetrics;
