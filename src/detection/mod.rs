// src/detection/mod.rs

mod geometry;
mod pose_state;

// Re-export public APIs
pub use pose_state::{PoseSignal, PoseStateMachine};
