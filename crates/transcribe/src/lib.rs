//! Transcribe audio files through OpenAI Whisper or Google
//! Speech-to-Text.
//!
//! Google transcription uploads the audio to a Cloud Storage bucket
//! first, the recognition itself runs as a long running operation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::task::{JoinError, JoinSet};
use tracing::instrument;

mod audio;
pub mod google;
pub mod whisper;

pub use audio::{audio_info, AudioFormat, AudioInfo};
pub use google::Google;
pub use whisper::Whisper;

#[derive(Debug, Clone, Default)]
pub struct TranscribeOptions {
    /// service account key, when missing the ambient google
    /// credentials are used
    pub credentials_json: Option<Vec<u8>>,
    /// cloud storage bucket the audio is uploaded to
    pub bucket: String,
    /// BCP-47 code such as `en-US`
    pub language_code: String,
    pub enable_diarization: bool,
    pub min_speakers: u32,
    pub max_speakers: u32,
    /// remove the uploaded audio from the bucket when done
    pub cleanup_on_complete: bool,
    pub use_whisper: bool,
    pub whisper_api_key: String,
    pub whisper_model: String,
    pub whisper_prompt: String,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),
    #[error("Could not read audio stream in {path:?}: {source}")]
    Probe {
        path: PathBuf,
        source: symphonia::core::errors::Error,
    },
    #[error("No sample rate or channel count in {0:?}")]
    MissingStreamInfo(PathBuf),
    #[error("Could not read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Could not reach transcription service, details: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API request failed with status code {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("Could not get google access token: {0}")]
    Auth(#[from] gcp_auth::Error),
    #[error("Not a usable api endpoint: {0}")]
    InvalidEndpoint(url::Url),
    #[error("Recognition failed with code {code}: {message}")]
    Operation { code: i32, message: String },
    #[error("Transcription task failed: {0}")]
    Join(#[from] JoinError),
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, path: &Path, opts: &TranscribeOptions) -> Result<String, Error>;
}

/// Transcribe all files concurrently with the backend `opts` selects.
pub async fn transcribe(
    paths: &[PathBuf],
    opts: &TranscribeOptions,
) -> Result<HashMap<PathBuf, String>, Error> {
    let transcriber: Arc<dyn Transcriber> = if opts.use_whisper {
        Arc::new(Whisper::default())
    } else {
        Arc::new(Google::from_options(opts).await?)
    };
    transcribe_with(transcriber, paths, opts).await
}

/// Transcribe all files concurrently. On the first failure the
/// remaining transcriptions are aborted and the error returned.
#[instrument(skip(transcriber, opts))]
pub async fn transcribe_with(
    transcriber: Arc<dyn Transcriber>,
    paths: &[PathBuf],
    opts: &TranscribeOptions,
) -> Result<HashMap<PathBuf, String>, Error> {
    let mut tasks = JoinSet::new();
    for path in paths {
        let transcriber = Arc::clone(&transcriber);
        let opts = opts.clone();
        let path = path.clone();
        tasks.spawn(async move {
            let transcript = transcriber.transcribe(&path, &opts).await?;
            Ok::<_, Error>((path, transcript))
        });
    }

    let mut transcripts = HashMap::with_capacity(paths.len());
    while let Some(res) = tasks.join_next().await {
        let (path, transcript) = res??;
        transcripts.insert(path, transcript);
    }
    Ok(transcripts)
}
