use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use crate::{Error, TranscribeOptions, Transcriber};

pub const ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";

/// OpenAI's hosted Whisper model.
#[derive(Debug, Clone)]
pub struct Whisper {
    client: reqwest::Client,
    endpoint: Url,
}

impl Default for Whisper {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: Url::parse(ENDPOINT).expect("endpoint constant is a valid url"),
        }
    }
}

#[derive(Deserialize)]
struct Transcription {
    text: String,
}

impl Whisper {
    pub fn with_endpoint(endpoint: Url) -> Self {
        Self {
            endpoint,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Transcriber for Whisper {
    #[instrument(skip(self, opts))]
    async fn transcribe(&self, path: &Path, opts: &TranscribeOptions) -> Result<String, Error> {
        let audio = tokio::fs::read(path).await.map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut form = Form::new().part("file", Part::bytes(audio).file_name(file_name));
        for (key, value) in [
            ("model", &opts.whisper_model),
            ("language", &opts.language_code),
            ("prompt", &opts.whisper_prompt),
        ] {
            if !value.is_empty() {
                form = form.text(key, value.clone());
            }
        }

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&opts.whisper_api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, body });
        }

        let Transcription { text } = response.json().await?;
        debug!("transcribed {} characters", text.len());
        Ok(text)
    }
}
