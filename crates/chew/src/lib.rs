//! Fetch urls and local files politely and turn them into text [`Chunk`]s.
//!
//! Robots.txt rules, crawl delays and a global rate limit are respected
//! unless configured otherwise, see [`Config`].
//!
//! ```no_run
//! # async fn run() -> Result<(), chew::Error> {
//! let chew = chew::Chew::new(chew::Config::default())?;
//! let chunks = chew
//!     .process(&["https://example.com", "file:///tmp/notes.md"])
//!     .await?;
//! for chunk in chunks {
//!     println!("{}: {}", chunk.source, chunk.content);
//! }
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use futures::future::try_join_all;
use reqwest::StatusCode;
use tokio::task::JoinError;
use tracing::{debug, instrument};
use url::Url;

mod config;
mod fetch;
mod robots;
mod throttle;

pub use config::{Config, DEFAULT_USER_AGENT};
pub use extract::Chunk;
pub use throttle::RateLimiter;

use robots::RobotsCache;
use throttle::CrawlDelays;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not set up http client, details: {0:?}")]
    BuildClient(reqwest::Error),
    #[error("The proxy: {proxy} is not valid because: {source}")]
    InvalidProxy {
        proxy: String,
        source: url::ParseError,
    },
    #[error("The url: {url} is not valid because: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("Could not connect to {url}, details: {source}")]
    Request { url: String, source: reqwest::Error },
    #[error("Server returned {status} for {url}")]
    Status { url: String, status: StatusCode },
    #[error("Could not download body of {url}, details: {source}")]
    Body { url: String, source: reqwest::Error },
    #[error("Could not read file {path:?}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unsupported content type: {content_type} (url: {url})")]
    UnsupportedContentType { content_type: String, url: String },
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("Could not extract text from {url}: {error}")]
    Extraction {
        url: String,
        #[source]
        error: extract::Error,
    },
    #[error("access to {0} is disallowed by robots.txt")]
    DisallowedByRobots(Url),
    #[error("Giving up on {url} after {attempts} attempts, last error: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: Box<Error>,
    },
    #[error("Extraction task failed: {0}")]
    Join(#[from] JoinError),
}

impl Error {
    /// Whether trying again later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Request { .. } | Error::Body { .. } => true,
            Error::Status { status, .. } => fetch::is_transient_status(*status),
            _ => false,
        }
    }
}

/// Client that processes urls and `file://` paths. Cheap to share
/// between tasks by reference or in an [`Arc`].
pub struct Chew {
    config: Config,
    client: reqwest::Client,
    rate_limiter: RwLock<Arc<dyn RateLimiter>>,
    robots: RobotsCache,
    crawl_delays: CrawlDelays,
}

impl std::fmt::Debug for Chew {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chew")
            .field("config", &self.config)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl Chew {
    pub fn new(config: Config) -> Result<Self, Error> {
        let client = fetch::build_client(&config)?;
        let rate_limiter = throttle::from_config(&config);
        Ok(Self {
            config,
            client,
            rate_limiter: RwLock::new(rate_limiter),
            robots: RobotsCache::default(),
            crawl_delays: CrawlDelays::default(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Use a custom client, for example one with extra middleware or
    /// tls settings. Proxies and timeouts from the [`Config`] are not
    /// applied to it. The user agent still is, on every request.
    pub fn set_http_client(&mut self, client: reqwest::Client) {
        self.client = client;
    }

    /// Replace the rate limiter, affects requests that have not yet
    /// started waiting.
    pub fn set_rate_limiter(&self, limiter: Arc<dyn RateLimiter>) {
        *self
            .rate_limiter
            .write()
            .unwrap_or_else(PoisonError::into_inner) = limiter;
    }

    /// Process all inputs concurrently. Chunks are returned in the order
    /// of the inputs. The first failure cancels the remaining work.
    ///
    /// Inputs are either urls or local paths prefixed with `file://`.
    /// Bound the time this may take by wrapping it in
    /// [`tokio::time::timeout`].
    pub async fn process<S: AsRef<str>>(&self, inputs: &[S]) -> Result<Vec<Chunk>, Error> {
        let per_input = try_join_all(inputs.iter().map(|input| self.process_one(input.as_ref())))
            .await?;
        Ok(per_input.into_iter().flatten().collect())
    }

    #[instrument(skip(self))]
    async fn process_one(&self, input: &str) -> Result<Vec<Chunk>, Error> {
        if let Some(path) = input.strip_prefix("file://") {
            return fetch::read_file(&self.config, input, path).await;
        }

        let url = Url::parse(input).map_err(|source| Error::InvalidUrl {
            url: input.to_owned(),
            source,
        })?;

        let limiter = Arc::clone(&self.rate_limiter.read().unwrap_or_else(PoisonError::into_inner));
        limiter.wait().await;

        if !self.config.ignore_robots_txt {
            let rules = self
                .robots
                .rules(&self.client, &url, self.config.robots_agent())
                .await;
            if !rules.allowed(&url) {
                return Err(Error::DisallowedByRobots(url));
            }

            let delay = rules
                .crawl_delay()
                .map_or(self.config.crawl_delay, |d| d.max(self.config.crawl_delay));
            let host = url.host_str().unwrap_or_default();
            debug!("crawl delay for {host} is {delay:?}");
            self.crawl_delays.wait_turn(host, delay).await;
        }

        fetch::with_retry(&self.client, &self.config, &url).await
    }
}
