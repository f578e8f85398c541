// src/classification/mod.rs

mod classifier;
mod keywords;
mod rules;
mod text_cache;

pub use classifier::ObjectClassifier;
