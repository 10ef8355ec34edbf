use std::path::PathBuf;
use std::time::Duration;

use chew::Config;
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{self, bail, WrapErr};
use transcribe::TranscribeOptions;

#[derive(Parser, Debug)]
#[command(version, about = "Turn web pages, documents and audio into plain text")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch urls or local files (`file:///path`) and print their text
    Process(ProcessArgs),
    /// Transcribe audio files (wav, mp3 or flac)
    Transcribe(TranscribeArgs),
}

#[derive(Args, Debug)]
pub struct ProcessArgs {
    #[arg(required = true)]
    pub inputs: Vec<String>,

    /// Print the chunks as a json array
    #[arg(long)]
    pub json: bool,

    /// Toml file to read the base configuration from, the other
    /// options override it
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub user_agent: Option<String>,
    #[arg(long)]
    pub retry_limit: Option<u32>,
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,
    /// Minimum time between requests to the same host
    #[arg(long)]
    pub crawl_delay_ms: Option<u64>,
    /// Route requests through these proxies, round robin
    #[arg(long = "proxy")]
    pub proxies: Vec<String>,
    /// Period in which one request may start, 0 disables rate limiting
    #[arg(long)]
    pub rate_limit_ms: Option<u64>,
    #[arg(long)]
    pub rate_burst: Option<u32>,
    #[arg(long)]
    pub ignore_robots_txt: bool,
    /// Reduce markdown documents to plain text
    #[arg(long)]
    pub strip_markdown: bool,
    /// Give up on all inputs after this long
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl ProcessArgs {
    pub fn config(&self) -> eyre::Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .wrap_err_with(|| format!("Could not read config file: {}", path.display()))?;
                toml::from_str(&text).wrap_err("Config file is not valid")?
            }
            None => Config::default(),
        };

        if let Some(user_agent) = &self.user_agent {
            config.user_agent = user_agent.clone();
        }
        if let Some(retry_limit) = self.retry_limit {
            config.retry_limit = retry_limit;
        }
        if let Some(ms) = self.retry_delay_ms {
            config.retry_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.crawl_delay_ms {
            config.crawl_delay = Duration::from_millis(ms);
        }
        if !self.proxies.is_empty() {
            config.proxy_list = self.proxies.clone();
        }
        if let Some(ms) = self.rate_limit_ms {
            config.rate_limit = Duration::from_millis(ms);
        }
        if let Some(burst) = self.rate_burst {
            config.rate_burst = burst;
        }
        config.ignore_robots_txt |= self.ignore_robots_txt;
        config.strip_markdown |= self.strip_markdown;
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct TranscribeArgs {
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Use OpenAI Whisper instead of Google Speech-to-Text
    #[arg(long)]
    pub whisper: bool,
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub whisper_key: Option<String>,
    #[arg(long, default_value = "whisper-1")]
    pub whisper_model: String,
    /// Text to guide the style of the transcript
    #[arg(long, default_value = "")]
    pub whisper_prompt: String,
    #[arg(long, default_value = "en-US")]
    pub language: String,

    /// Cloud Storage bucket the audio is uploaded to
    #[arg(long, required_unless_present = "whisper")]
    pub bucket: Option<String>,
    /// Service account key, defaults to the ambient google credentials
    #[arg(long)]
    pub credentials: Option<PathBuf>,
    /// Label who is speaking
    #[arg(long)]
    pub diarization: bool,
    #[arg(long, default_value_t = 2)]
    pub min_speakers: u32,
    #[arg(long, default_value_t = 6)]
    pub max_speakers: u32,
    /// Remove the uploaded audio from the bucket when done
    #[arg(long)]
    pub cleanup: bool,
}

impl TranscribeArgs {
    pub fn options(&self) -> eyre::Result<TranscribeOptions> {
        if self.whisper && self.whisper_key.is_none() {
            bail!("Whisper needs an api key, pass --whisper-key or set OPENAI_API_KEY");
        }
        let credentials_json = match &self.credentials {
            Some(path) => Some(std::fs::read(path).wrap_err_with(|| {
                format!("Could not read credentials: {}", path.display())
            })?),
            None => None,
        };

        Ok(TranscribeOptions {
            credentials_json,
            bucket: self.bucket.clone().unwrap_or_default(),
            language_code: self.language.clone(),
            enable_diarization: self.diarization,
            min_speakers: self.min_speakers,
            max_speakers: self.max_speakers,
            cleanup_on_complete: self.cleanup,
            use_whisper: self.whisper,
            whisper_api_key: self.whisper_key.clone().unwrap_or_default(),
            whisper_model: self.whisper_model.clone(),
            whisper_prompt: self.whisper_prompt.clone(),
        })
    }
}
