use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::Config;

/// Longest wait between two requests to one host.
pub(crate) const MAX_CRAWL_DELAY: Duration = Duration::from_secs(60 * 60);

/// Gate that every network request passes before it is made.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Returns once the next request may go out.
    async fn wait(&self);
}

#[async_trait]
impl RateLimiter for DefaultDirectRateLimiter {
    async fn wait(&self) {
        self.until_ready().await
    }
}

struct Unlimited;

#[async_trait]
impl RateLimiter for Unlimited {
    async fn wait(&self) {}
}

pub(crate) fn from_config(config: &Config) -> Arc<dyn RateLimiter> {
    let burst = NonZeroU32::new(config.rate_burst).unwrap_or(NonZeroU32::MIN);
    match Quota::with_period(config.rate_limit) {
        Some(quota) => Arc::new(DefaultDirectRateLimiter::direct(quota.allow_burst(burst))),
        None => Arc::new(Unlimited),
    }
}

/// Keeps requests to the same host apart.
#[derive(Debug, Default)]
pub(crate) struct CrawlDelays {
    /// when the next request to a host may start
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl CrawlDelays {
    pub(crate) async fn wait_turn(&self, host: &str, delay: Duration) {
        let delay = delay.min(MAX_CRAWL_DELAY);
        let now = Instant::now();
        let start = {
            let mut next_slot = self.next_slot.lock().await;
            let start = next_slot
                .get(host)
                .copied()
                .filter(|slot| *slot > now)
                .unwrap_or(now);
            let next = start.checked_add(delay).unwrap_or(start);
            next_slot.insert(host.to_owned(), next);
            start
        };

        if start > now {
            debug!("waiting {:?} for crawl delay of {host}", start - now);
            tokio::time::sleep_until(start).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn same_host_waits_other_host_does_not() {
        let delays = CrawlDelays::default();
        let delay = Duration::from_secs(10);
        let start = Instant::now();

        delays.wait_turn("example.org", delay).await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        delays.wait_turn("example.com", delay).await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        delays.wait_turn("example.org", delay).await;
        assert_eq!(start.elapsed(), delay);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_requests_queue_up() {
        let delays = CrawlDelays::default();
        let delay = Duration::from_secs(1);
        let start = Instant::now();

        tokio::join!(
            delays.wait_turn("example.org", delay),
            delays.wait_turn("example.org", delay),
            delays.wait_turn("example.org", delay),
        );
        assert_eq!(start.elapsed(), 2 * delay);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_is_capped() {
        let delays = CrawlDelays::default();
        let start = Instant::now();

        delays.wait_turn("example.org", Duration::MAX).await;
        delays.wait_turn("example.org", Duration::MAX).await;
        assert_eq!(start.elapsed(), MAX_CRAWL_DELAY);
    }

    #[tokio::test]
    async fn zero_rate_limit_never_blocks() {
        let config = Config {
            rate_limit: Duration::ZERO,
            ..Config::default()
        };
        let limiter = from_config(&config);
        let start = std::time::Instant::now();
        for _ in 0..100 {
            limiter.wait().await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
