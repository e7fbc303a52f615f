//! Time-windowed keystroke activity log.
//!
//! Producers (input watchers) append events; reactive presets query the
//! recent window during rendering. Pruning happens lazily on every write and
//! read, so memory stays bounded by events-per-second × history window.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Instant;

/// Default history horizon in seconds
pub const DEFAULT_HISTORY_WINDOW: f64 = 2.5;

/// One key press with monotonic timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyActivityEvent {
    pub key_index: usize,
    pub time_seconds: f64,
    pub intensity: f64,
}

struct BusInner {
    key_count: usize,
    events: VecDeque<KeyActivityEvent>,
}

/// Shared, thread-safe activity log
pub struct KeyActivityBus {
    start: Instant,
    history_window: f64,
    inner: Mutex<BusInner>,
}

impl KeyActivityBus {
    pub fn new(key_count: usize, history_window_seconds: f64) -> Self {
        Self {
            start: Instant::now(),
            history_window: history_window_seconds.max(0.0),
            inner: Mutex::new(BusInner {
                key_count,
                events: VecDeque::new(),
            }),
        }
    }

    /// Monotonic seconds since the bus was created
    pub fn now_seconds(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    pub fn history_window_seconds(&self) -> f64 {
        self.history_window
    }

    /// Reset the valid key index range; pending events are discarded
    pub fn set_key_count(&self, key_count: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.key_count = key_count;
        inner.events.clear();
    }

    /// Append a key press. Out-of-range indices are dropped silently.
    pub fn record(&self, key_index: usize, intensity: f64) {
        let now = self.now_seconds();
        let mut inner = self.inner.lock().unwrap();
        if key_index >= inner.key_count {
            return;
        }
        inner.events.push_back(KeyActivityEvent {
            key_index,
            time_seconds: now,
            intensity,
        });
        Self::prune(&mut inner.events, now - self.history_window);
    }

    /// Snapshot of events within the last `window_seconds`, clamped to the
    /// history horizon, in insertion order. The snapshot is independent of
    /// internal storage.
    pub fn recent(&self, window_seconds: f64) -> Vec<KeyActivityEvent> {
        let now = self.now_seconds();
        let window = window_seconds.clamp(0.0, self.history_window);
        let mut inner = self.inner.lock().unwrap();
        Self::prune(&mut inner.events, now - self.history_window);
        let cutoff = now - window;
        inner
            .events
            .iter()
            .filter(|ev| ev.time_seconds >= cutoff)
            .copied()
            .collect()
    }

    fn prune(events: &mut VecDeque<KeyActivityEvent>, cutoff: f64) {
        while let Some(front) = events.front() {
            if front.time_seconds >= cutoff {
                break;
            }
            events.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn record_and_query() {
        let bus = KeyActivityBus::new(4, 1.0);
        bus.record(0, 1.0);
        bus.record(3, 0.5);
        let events = bus.recent(1.0);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].key_index, 0);
        assert_eq!(events[1].key_index, 3);
        assert_eq!(events[1].intensity, 0.5);
    }

    #[test]
    fn out_of_range_index_is_dropped() {
        let bus = KeyActivityBus::new(2, 1.0);
        bus.record(2, 1.0);
        assert!(bus.recent(1.0).is_empty());
    }

    #[test]
    fn window_is_clamped_to_horizon() {
        let bus = KeyActivityBus::new(2, 1.0);
        bus.record(0, 1.0);
        // Oversized windows clamp down to the horizon
        assert_eq!(bus.recent(100.0).len(), 1);
        // Negative windows clamp up to zero seconds
        sleep(Duration::from_millis(2));
        assert!(bus.recent(-1.0).is_empty());
    }

    #[test]
    fn events_expire_past_the_horizon() {
        let bus = KeyActivityBus::new(2, 0.05);
        bus.record(0, 1.0);
        assert_eq!(bus.recent(0.05).len(), 1);
        sleep(Duration::from_millis(80));
        assert!(bus.recent(0.05).is_empty());
    }

    #[test]
    fn narrow_window_filters_older_events() {
        let bus = KeyActivityBus::new(2, 0.5);
        bus.record(0, 1.0);
        sleep(Duration::from_millis(120));
        bus.record(1, 1.0);
        let narrow = bus.recent(0.05);
        assert_eq!(narrow.len(), 1);
        assert_eq!(narrow[0].key_index, 1);
        let wide = bus.recent(0.5);
        assert_eq!(wide.len(), 2);
    }

    #[test]
    fn set_key_count_clears_pending_events() {
        let bus = KeyActivityBus::new(2, 1.0);
        bus.record(0, 1.0);
        bus.set_key_count(4);
        assert!(bus.recent(1.0).is_empty());
        bus.record(3, 1.0);
        assert_eq!(bus.recent(1.0).len(), 1);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let bus = KeyActivityBus::new(8, 1.0);
        for i in 0..5 {
            bus.record(i, 1.0);
        }
        let events = bus.recent(1.0);
        let indices: Vec<usize> = events.iter().map(|ev| ev.key_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }
}
