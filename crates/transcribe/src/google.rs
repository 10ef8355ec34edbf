//! Speech-to-Text over its REST api. Audio is staged in Cloud Storage
//! since long recordings can not be sent inline.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::audio::{audio_info, AudioInfo};
use crate::{Error, TranscribeOptions, Transcriber};

const SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Hands out bearer tokens for the google apis.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<String, Error>;
}

/// Tokens from a service account key or the ambient credentials
/// (`GOOGLE_APPLICATION_CREDENTIALS`, gcloud, metadata server).
pub struct GcpAuth(Arc<dyn TokenProvider>);

impl GcpAuth {
    pub async fn new(credentials_json: Option<&[u8]>) -> Result<Self, Error> {
        let provider: Arc<dyn TokenProvider> = match credentials_json {
            Some(json) => Arc::new(CustomServiceAccount::from_json(&String::from_utf8_lossy(
                json,
            ))?),
            None => gcp_auth::provider().await?,
        };
        Ok(Self(provider))
    }
}

#[async_trait]
impl TokenSource for GcpAuth {
    async fn token(&self) -> Result<String, Error> {
        let token = self.0.token(SCOPES).await?;
        Ok(token.as_str().to_owned())
    }
}

/// A token obtained elsewhere.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String, Error> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub storage: Url,
    pub speech: Url,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            storage: Url::parse("https://storage.googleapis.com/").expect("valid url"),
            speech: Url::parse("https://speech.googleapis.com/").expect("valid url"),
        }
    }
}

pub struct Google {
    client: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
    endpoints: Endpoints,
    poll_interval: Duration,
}

impl Google {
    pub fn new(tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            client: reqwest::Client::new(),
            tokens,
            endpoints: Endpoints::default(),
            poll_interval: Duration::from_secs(5),
        }
    }

    /// Authenticates with the `credentials_json` in `opts`, if any.
    pub async fn from_options(opts: &TranscribeOptions) -> Result<Self, Error> {
        let tokens = GcpAuth::new(opts.credentials_json.as_deref()).await?;
        Ok(Self::new(Arc::new(tokens)))
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// How long to wait between checks on a running recognition.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    async fn upload(&self, bucket: &str, object: &str, audio: Vec<u8>) -> Result<(), Error> {
        let mut url = endpoint(&self.endpoints.storage, &["upload", "storage", "v1", "b", bucket, "o"])?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", object);

        let response = self
            .client
            .post(url)
            .bearer_auth(self.tokens.token().await?)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(audio)
            .send()
            .await?;
        check_status(response).await?;
        debug!("uploaded audio to gs://{bucket}/{object}");
        Ok(())
    }

    async fn delete(&self, bucket: &str, object: &str) -> Result<(), Error> {
        let url = endpoint(&self.endpoints.storage, &["storage", "v1", "b", bucket, "o", object])?;
        let response = self
            .client
            .delete(url)
            .bearer_auth(self.tokens.token().await?)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn recognize(
        &self,
        info: AudioInfo,
        gcs_uri: &str,
        opts: &TranscribeOptions,
    ) -> Result<String, Error> {
        let url = endpoint(&self.endpoints.speech, &["v1", "speech:longrunningrecognize"])?;
        let request = json!({
            "config": recognition_config(info, opts),
            "audio": { "uri": gcs_uri },
        });
        let response = self
            .client
            .post(url)
            .bearer_auth(self.tokens.token().await?)
            .json(&request)
            .send()
            .await?;
        let operation: Operation = check_status(response).await?.json().await?;
        debug!("recognition running as operation {}", operation.name);

        let url = endpoint(&self.endpoints.speech, &["v1", "operations", operation.name.as_str()])?;
        loop {
            let response = self
                .client
                .get(url.clone())
                .bearer_auth(self.tokens.token().await?)
                .send()
                .await?;
            let operation: Operation = check_status(response).await?.json().await?;

            if let Some(status) = operation.error {
                return Err(Error::Operation {
                    code: status.code,
                    message: status.message,
                });
            }
            if operation.done {
                return Ok(operation.response.map(Recognized::transcript).unwrap_or_default());
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl Transcriber for Google {
    #[instrument(skip(self, opts), fields(bucket = %opts.bucket))]
    async fn transcribe(&self, path: &Path, opts: &TranscribeOptions) -> Result<String, Error> {
        let probe_path = path.to_owned();
        let info = tokio::task::spawn_blocking(move || audio_info(&probe_path)).await??;
        let audio = tokio::fs::read(path).await.map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })?;

        let object = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.upload(&opts.bucket, &object, audio).await?;

        let gcs_uri = format!("gs://{}/{object}", opts.bucket);
        let transcript = self.recognize(info, &gcs_uri, opts).await;

        if opts.cleanup_on_complete {
            if let Err(e) = self.delete(&opts.bucket, &object).await {
                warn!("failed to delete {gcs_uri}: {e}");
            }
        }
        transcript
    }
}

fn recognition_config(info: AudioInfo, opts: &TranscribeOptions) -> serde_json::Value {
    json!({
        "encoding": info.format.speech_encoding(),
        "sampleRateHertz": info.sample_rate,
        "audioChannelCount": info.channels,
        "languageCode": opts.language_code,
        "enableAutomaticPunctuation": true,
        "useEnhanced": true,
        "enableWordConfidence": true,
        "model": "latest_long",
        "diarizationConfig": {
            "enableSpeakerDiarization": opts.enable_diarization,
            "minSpeakerCount": opts.min_speakers,
            "maxSpeakerCount": opts.max_speakers,
        },
    })
}

fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, Error> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| Error::InvalidEndpoint(base.clone()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Api { status, body })
}

#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    error: Option<Status>,
    response: Option<Recognized>,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct Recognized {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
}

impl Recognized {
    fn transcript(self) -> String {
        self.results
            .into_iter()
            .flat_map(|result| result.alternatives)
            .map(|alternative| alternative.transcript)
            .collect()
    }
}
