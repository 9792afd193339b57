//! Millisecond-timestamp record ids.

use chrono::Utc;
use parking_lot::Mutex;

/// Hands out strictly increasing millisecond ids.
///
/// Two ids requested within the same millisecond get `last + 1`, so the
/// generator never repeats itself even under bursts.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: Mutex<i64>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id as a raw millisecond value.
    pub fn next_millis(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last.lock();
        let id = if now > *last { now } else { *last + 1 };
        *last = id;
        id
    }

    /// Next id in its stored string form.
    pub fn next_id(&self) -> String {
        self.next_millis().to_string()
    }

    /// Record an id that already exists on disk so it is never handed out again.
    pub fn observe(&self, id: &str) {
        if let Ok(value) = id.parse::<i64>() {
            let mut last = self.last.lock();
            if value > *last {
                *last = value;
            }
        }
    }
}
