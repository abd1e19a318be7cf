use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Governs how often accumulated item state reaches durable storage.
/// In-memory state updates on every event; writes are limited to one
/// per interval per item, except that the first and the terminal update
/// for an item always flush.
pub struct PersistThrottle {
    interval: Duration,
    last_flush: HashMap<String, Instant>,
}

impl PersistThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_flush: HashMap::new(),
        }
    }

    pub fn should_persist(&mut self, item_id: &str, terminal: bool) -> bool {
        if terminal {
            // The entry is released with the accumulator.
            self.last_flush.remove(item_id);
            return true;
        }

        match self.last_flush.get(item_id) {
            None => {
                self.last_flush.insert(item_id.to_string(), Instant::now());
                true
            }
            Some(last) if last.elapsed() >= self.interval => {
                self.last_flush.insert(item_id.to_string(), Instant::now());
                true
            }
            Some(_) => false,
        }
    }

    /// Drop tracking for an item without a terminal event (abort path).
    pub fn release(&mut self, item_id: &str) {
        self.last_flush.remove(item_id);
    }
}

impl Default for PersistThrottle {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
