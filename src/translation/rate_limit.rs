use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Requests-per-minute limiter shared by all workers. Each `acquire` reserves
/// the next send slot and sleeps until it arrives, so bursts are spread
/// evenly instead of front-loaded.
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        let rpm = requests_per_minute.max(1);
        Self {
            interval: Duration::from_secs_f64(60.0 / rpm as f64),
            next_slot: Mutex::new(Instant::now()),
        }
    }

    /// Wait until a request may be sent.
    pub async fn acquire(&self) {
        let deadline = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let deadline = (*next).max(now);
            *next = deadline + self.interval;
            deadline
        };
        tokio::time::sleep_until(deadline).await;
    }
}
