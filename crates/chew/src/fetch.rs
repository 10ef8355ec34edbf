use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use extract::{file_extension, is_markdown, sniff_content_type, Chunk, Format};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Proxy, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::{Config, Error};

/// Content types servers send when they do not know better.
const GENERIC_TYPES: &[&str] = &["text/plain", "application/octet-stream"];

pub(crate) fn build_client(config: &Config) -> Result<reqwest::Client, Error> {
    let mut builder = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.request_timeout);

    if !config.proxy_list.is_empty() {
        builder = builder.proxy(rotating_proxy(&config.proxy_list)?);
    }
    builder.build().map_err(Error::BuildClient)
}

/// Every request goes through the next proxy in the list.
fn rotating_proxy(proxy_list: &[String]) -> Result<Proxy, Error> {
    let proxies = proxy_list
        .iter()
        .map(|proxy| {
            Url::parse(proxy).map_err(|source| Error::InvalidProxy {
                proxy: proxy.clone(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let next = AtomicUsize::new(0);
    Ok(Proxy::custom(move |_| {
        let idx = next.fetch_add(1, Ordering::Relaxed) % proxies.len();
        Some(proxies[idx].clone())
    }))
}

/// Server's content type, unless it is generic and the url has a
/// known extension. The extension is the fallback either way.
pub(crate) fn choose_format(content_type: &str, url: &str) -> Option<Format> {
    let by_extension = file_extension(url).and_then(|ext| Format::from_extension(&ext));

    let lowered = content_type.to_ascii_lowercase();
    let generic = lowered.trim().is_empty() || GENERIC_TYPES.iter().any(|t| lowered.contains(t));
    if generic && by_extension.is_some() {
        return by_extension;
    }
    Format::from_content_type(content_type).or(by_extension)
}

pub(crate) async fn fetch(
    client: &reqwest::Client,
    config: &Config,
    url: &Url,
) -> Result<Vec<Chunk>, Error> {
    let response = client
        .get(url.clone())
        .header(reqwest::header::USER_AGENT, &config.user_agent)
        .send()
        .await
        .map_err(|source| Error::Request {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Status {
            url: url.to_string(),
            status,
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    let format = choose_format(&content_type, url.as_str()).ok_or_else(|| {
        Error::UnsupportedContentType {
            content_type: content_type.clone(),
            url: url.to_string(),
        }
    })?;

    let body = response.bytes().await.map_err(|source| Error::Body {
        url: url.to_string(),
        source,
    })?;
    debug!("got {} bytes of {content_type}", body.len());

    let strip = config.strip_markdown && is_markdown(&content_type, url.as_str());
    extract(format, body.to_vec(), url.to_string(), strip).await
}

pub(crate) async fn read_file(config: &Config, input: &str, path: &str) -> Result<Vec<Chunk>, Error> {
    let data = tokio::fs::read(path).await.map_err(|source| Error::ReadFile {
        path: Path::new(path).to_owned(),
        source,
    })?;

    let extension = file_extension(path);
    let sniffed = sniff_content_type(&data);
    let format = extension
        .as_deref()
        .and_then(Format::from_extension)
        .or_else(|| Format::from_content_type(sniffed))
        .ok_or_else(|| {
            Error::UnsupportedFileType(extension.clone().unwrap_or_else(|| sniffed.to_owned()))
        })?;

    let strip = config.strip_markdown && is_markdown(sniffed, path);
    extract(format, data, input.to_owned(), strip).await
}

/// Extraction is cpu bound, it runs on the blocking pool. Markdown
/// syntax is only stripped from documents read as text.
async fn extract(
    format: Format,
    data: Vec<u8>,
    source: String,
    strip_markdown: bool,
) -> Result<Vec<Chunk>, Error> {
    let strip_markdown = strip_markdown && format == Format::Text;
    tokio::task::spawn_blocking(move || {
        let mut chunks = format.processor()(&data, &source).map_err(|error| Error::Extraction {
            url: source.clone(),
            error,
        })?;
        if strip_markdown {
            for chunk in &mut chunks {
                chunk.content = extract::markdown::strip_syntax(&chunk.content);
            }
        }
        Ok(chunks)
    })
    .await?
}

pub(crate) async fn with_retry(
    client: &reqwest::Client,
    config: &Config,
    url: &Url,
) -> Result<Vec<Chunk>, Error> {
    let attempts = 1 + config.retry_limit;
    let mut attempt = 1;
    loop {
        let err = match fetch(client, config, url).await {
            Ok(chunks) => return Ok(chunks),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => e,
        };

        if attempt >= attempts {
            return Err(Error::RetriesExhausted {
                url: url.to_string(),
                attempts,
                last: Box::new(err),
            });
        }
        warn!("attempt {attempt}/{attempts} failed, retrying in {:?}: {err}", config.retry_delay);
        attempt += 1;
        tokio::time::sleep(config.retry_delay).await;
    }
}

pub(crate) fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}
