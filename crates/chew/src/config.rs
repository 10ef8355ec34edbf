use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identify ourselves, sites may have robots.txt rules for us
pub static DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// How politely urls are fetched and what to do with the result.
///
/// Durations are given in milliseconds when (de)serialized:
///
/// ```toml
/// user_agent = "MyBot/1.0 (+https://example.com/bot)"
/// retry_limit = 3
/// retry_delay = 5000
/// crawl_delay = 10000
/// proxy_list = ["http://proxy1.com", "http://proxy2.com"]
/// rate_limit = 2000
/// rate_burst = 3
/// ignore_robots_txt = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub user_agent: String,
    /// extra attempts after the first one failed
    pub retry_limit: u32,
    #[serde(with = "millis")]
    pub retry_delay: Duration,
    /// minimum time between two requests to the same host, a larger
    /// `Crawl-delay` in the hosts robots.txt takes precedence
    #[serde(with = "millis")]
    pub crawl_delay: Duration,
    /// used round robin, one proxy per request
    pub proxy_list: Vec<String>,
    /// period in which one request may start, zero disables rate limiting
    #[serde(with = "millis")]
    pub rate_limit: Duration,
    pub rate_burst: u32,
    pub ignore_robots_txt: bool,
    #[serde(with = "millis")]
    pub request_timeout: Duration,
    /// reduce markdown documents to plain text
    pub strip_markdown: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            retry_limit: 3,
            retry_delay: Duration::from_secs(1),
            crawl_delay: Duration::from_secs(1),
            proxy_list: Vec::new(),
            rate_limit: Duration::from_secs(1),
            rate_burst: 1,
            ignore_robots_txt: false,
            request_timeout: Duration::from_secs(30),
            strip_markdown: false,
        }
    }
}

impl Config {
    /// The name robots.txt rules are matched against: the user
    /// agent up to the version, `MyBot/1.0 (...)` becomes `MyBot`.
    pub(crate) fn robots_agent(&self) -> &str {
        self.user_agent
            .split(['/', ' '])
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.user_agent)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
