//! Per-client request throttling.
//!
//! The router depends only on [`RequestThrottle`], so the in-memory
//! [`FixedWindowThrottle`] can be swapped for a shared backing store.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Admission decision for one inbound request.
pub trait RequestThrottle: Send + Sync {
    /// Records one request for `key` and returns whether it is admitted.
    fn admit(&self, key: &str) -> bool;
}

/// Expired windows are swept once the map grows past this many clients.
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Allows `limit` admissions per key in each window. The window opens on
/// the first request from a key and the count resets once it has elapsed.
pub struct FixedWindowThrottle {
    limit: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl FixedWindowThrottle {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl RequestThrottle for FixedWindowThrottle {
    fn admit(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        if windows.len() >= PRUNE_THRESHOLD {
            let span = self.window;
            windows.retain(|_, w| now.duration_since(w.started) < span);
        }

        let entry = windows.entry(key.to_string()).or_insert(Window { started: now, count: 0 });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window { started: now, count: 0 };
        }

        if entry.count >= self.limit {
            return false;
        }
        entry.count += 1;
        true
    }
}
