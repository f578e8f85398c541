// src/classification/text_cache.rs
//
// Per-region text memo. Entries are keyed by detection cycle and pixel box,
// and the whole map is dropped every `clear_interval` cycles. A cleared
// cache only costs a repeated extraction.

use crate::types::BoundingBox;
use std::collections::HashMap;
use tracing::debug;

type CacheKey = (u64, (i32, i32, i32, i32));

pub struct TextCache {
    entries: HashMap<CacheKey, String>,
    cycle: u64,
    clear_interval: u64,
}

impl TextCache {
    pub fn new(clear_interval: u64) -> Self {
        Self {
            entries: HashMap::new(),
            cycle: 0,
            clear_interval,
        }
    }

    /// Start a new detection cycle. Returns its id.
    pub fn tick(&mut self) -> u64 {
        self.cycle += 1;
        if self.clear_interval > 0 && self.cycle % self.clear_interval == 0 {
            debug!(
                "Clearing text cache ({} entries) at cycle {}",
                self.entries.len(),
                self.cycle
            );
            self.entries.clear();
        }
        self.cycle
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Cached text for `region` in the current cycle, extracting on a miss
    pub fn get_or_extract<F>(&mut self, region: &BoundingBox, extract: F) -> String
    where
        F: FnOnce() -> String,
    {
        self.entries
            .entry((self.cycle, region.pixel_key()))
            .or_insert_with(extract)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_hit_skips_extraction() {
        let mut cache = TextCache::new(100);
        cache.tick();
        let calls = Cell::new(0);
        let region = BoundingBox::new(10.0, 10.0, 90.0, 90.0);

        for _ in 0..3 {
            let text = cache.get_or_extract(&region, || {
                calls.set(calls.get() + 1);
                "aspirin".to_string()
            });
            assert_eq!(text, "aspirin");
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_new_cycle_is_a_new_key() {
        let mut cache = TextCache::new(100);
        let region = BoundingBox::new(10.0, 10.0, 90.0, 90.0);
        cache.tick();
        cache.get_or_extract(&region, || "first".to_string());
        cache.tick();
        assert_eq!(cache.get_or_extract(&region, || "second".to_string()), "second");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cleared_wholesale_on_interval() {
        let mut cache = TextCache::new(3);
        let region = BoundingBox::new(0.0, 0.0, 50.0, 50.0);
        cache.tick();
        cache.get_or_extract(&region, String::new);
        cache.tick();
        cache.get_or_extract(&region, String::new);
        assert_eq!(cache.len(), 2);

        assert_eq!(cache.tick(), 3);
        assert_eq!(cache.len(), 0);
    }
}
