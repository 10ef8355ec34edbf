use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use texting_robots::Robot;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};
use url::Url;

use crate::throttle::MAX_CRAWL_DELAY;

/// Parsed robots.txt of one host. Without rules everything is allowed.
pub(crate) struct Rules {
    robot: Option<Robot>,
}

impl Rules {
    fn allow_all() -> Self {
        Self { robot: None }
    }

    pub(crate) fn allowed(&self, url: &Url) -> bool {
        self.robot
            .as_ref()
            .map_or(true, |robot| robot.allowed(url.as_str()))
    }

    /// At most [`MAX_CRAWL_DELAY`], negative or unrepresentable delays
    /// are ignored.
    pub(crate) fn crawl_delay(&self) -> Option<Duration> {
        let secs = self.robot.as_ref()?.delay?;
        if secs.is_nan() || secs < 0.0 {
            return None;
        }
        let delay = Duration::try_from_secs_f32(secs).unwrap_or(MAX_CRAWL_DELAY);
        Some(delay.min(MAX_CRAWL_DELAY))
    }
}

/// robots.txt url to the rules it contained
#[derive(Default)]
pub(crate) struct RobotsCache {
    by_url: Mutex<HashMap<String, Arc<OnceCell<Arc<Rules>>>>>,
}

impl RobotsCache {
    /// Rules for the host of `url`, fetched on first use. Concurrent
    /// requests to a host share one fetch, other hosts do not wait on it.
    #[instrument(skip(self, client), fields(url = %url))]
    pub(crate) async fn rules(&self, client: &reqwest::Client, url: &Url, agent: &str) -> Arc<Rules> {
        let Ok(robots_url) = url.join("/robots.txt") else {
            return Arc::new(Rules::allow_all());
        };

        let cell = {
            let mut by_url = self.by_url.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(by_url.entry(robots_url.to_string()).or_default())
        };

        // a failed fetch leaves the cell empty so the next request tries again
        match cell.get_or_try_init(|| fetch(client, &robots_url, agent)).await {
            Ok(rules) => Arc::clone(rules),
            Err(e) => {
                debug!("could not fetch {robots_url}, allowing access: {e}");
                Arc::new(Rules::allow_all())
            }
        }
    }
}

async fn fetch(client: &reqwest::Client, robots_url: &Url, agent: &str) -> Result<Arc<Rules>, reqwest::Error> {
    let response = client.get(robots_url.clone()).send().await?;
    if !response.status().is_success() {
        debug!("{robots_url} returned {}, allowing access", response.status());
        return Ok(Arc::new(Rules::allow_all()));
    }

    let body = response.bytes().await?;
    let rules = match Robot::new(agent, &body) {
        Ok(robot) => Rules { robot: Some(robot) },
        Err(e) => {
            debug!("could not parse {robots_url}, allowing access: {e}");
            Rules::allow_all()
        }
    };
    Ok(Arc::new(rules))
}
