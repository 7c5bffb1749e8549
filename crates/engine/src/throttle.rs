use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Enforces a minimum spacing between outbound requests across all tasks.
///
/// Each caller reserves the next free slot under the lock, then sleeps until
/// that slot outside of it, so concurrent callers queue up in order.
pub struct RequestThrottle {
    spacing: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RequestThrottle {
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            next_slot: Mutex::new(None),
        }
    }

    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Wait until this caller may issue a request.
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(t) if t > now => t,
                _ => now,
            };
            *next = Some(slot + self.spacing);
            slot
        };
        sleep_until(slot).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn first_request_is_immediate() {
        let throttle = RequestThrottle::new(Duration::from_secs(5));
        let start = Instant::now();
        throttle.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn concurrent_callers_are_spaced() {
        let throttle = Arc::new(RequestThrottle::new(Duration::from_millis(40)));
        let start = Instant::now();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let t = throttle.clone();
                tokio::spawn(async move { t.acquire().await })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }
        // four slots: 0, 40, 80, 120 ms
        assert!(start.elapsed() >= Duration::from_millis(120));
    }

    #[tokio::test]
    async fn zero_spacing_never_waits() {
        let throttle = RequestThrottle::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..100 {
            throttle.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
