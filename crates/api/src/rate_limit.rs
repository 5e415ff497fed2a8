use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

const DEFAULT_MAX_TRACKED_CLIENTS: usize = 10_000;

/// Sliding-window limiter keyed by client address. Idle clients are evicted
/// whenever the tracked set reaches `max_tracked_clients`.
#[derive(Debug, Clone)]
pub struct ClientRateLimiter {
    inner: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    window: Duration,
    max_requests: usize,
    max_tracked_clients: usize,
}

/// Rejection carrying how long until the oldest request leaves the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttled {
    pub retry_after: Duration,
}

impl ClientRateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            window,
            max_requests: max_requests.max(1),
            max_tracked_clients: DEFAULT_MAX_TRACKED_CLIENTS,
        }
    }

    pub fn with_max_tracked_clients(mut self, max_tracked_clients: usize) -> Self {
        self.max_tracked_clients = max_tracked_clients.max(1);
        self
    }

    pub fn check(&self, client: &str) -> Result<(), Throttled> {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> Result<(), Throttled> {
        let mut guard = self.inner.lock();
        if guard.len() >= self.max_tracked_clients && !guard.contains_key(client) {
            guard.retain(|_, queue| {
                queue
                    .back()
                    .is_some_and(|last| now.duration_since(*last) < self.window)
            });
        }
        let queue = guard.entry(client.to_string()).or_default();

        while let Some(front) = queue.front() {
            if now.duration_since(*front) >= self.window {
                queue.pop_front();
            } else {
                break;
            }
        }

        if queue.len() >= self.max_requests {
            let retry_after = queue
                .front()
                .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.window);
            return Err(Throttled { retry_after });
        }

        queue.push_back(now);
        Ok(())
    }

    pub fn tracked_clients(&self) -> usize {
        self.inner.lock().len()
    }
}
