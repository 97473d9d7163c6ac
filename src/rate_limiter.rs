use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Clone, Debug, Default)]
pub struct Limits {
    /// Token bucket capacity refilled over one minute; `None` or 0 disables it
    pub requests_per_min: Option<u64>,
    /// Minimum spacing between two consecutive requests
    pub min_delay: Duration,
}

#[derive(Debug)]
pub struct RateLimiter {
    limits: Limits,
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    // token bucket modeled by current tokens and time of last refill
    tokens: f64,
    refilled_at: Instant,
    last_request: Option<Instant>,
}

impl RateLimiter {
    pub fn new(limits: Limits) -> Self {
        let capacity = limits.requests_per_min.unwrap_or(0) as f64;
        Self {
            limits,
            state: Mutex::new(State {
                tokens: capacity,
                refilled_at: Instant::now(),
                last_request: None,
            }),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(Limits::default())
    }

    /// Waits until one more request is allowed, then records it.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;

        if let Some(last) = state.last_request {
            let since = last.elapsed();
            if since < self.limits.min_delay {
                let wait = self.limits.min_delay - since;
                debug!("Rate limiter spacing requests, waiting {:?}", wait);
                tokio::time::sleep(wait).await;
            }
        }

        if let Some(rpm) = self.limits.requests_per_min.filter(|r| *r > 0) {
            let capacity = rpm as f64;
            let refill_rate = capacity / 60.0; // tokens per second
            loop {
                let now = Instant::now();
                let elapsed = now.duration_since(state.refilled_at).as_secs_f64();
                state.tokens = (state.tokens + elapsed * refill_rate).min(capacity);
                state.refilled_at = now;
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    break;
                }
                let secs = (1.0 - state.tokens) / refill_rate;
                debug!("Rate limiter bucket empty, waiting {:.3}s", secs);
                tokio::time::sleep(Duration::from_secs_f64(secs.max(0.001))).await;
            }
        }

        state.last_request = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unlimited_does_not_wait() {
        let limiter = RateLimiter::unlimited();
        let start = Instant::now();
        for _ in 0..50 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_min_delay_spaces_requests() {
        let limiter = RateLimiter::new(Limits {
            requests_per_min: None,
            min_delay: Duration::from_millis(30),
        });
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        // first request is free, the next two wait
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_bucket_blocks_when_empty() {
        // 600/min refills one token every 100ms
        let limiter = RateLimiter::new(Limits {
            requests_per_min: Some(600),
            min_delay: Duration::ZERO,
        });
        {
            let mut state = limiter.state.lock().await;
            state.tokens = 1.0;
        }
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(80));
    }
}
