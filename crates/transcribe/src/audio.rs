use std::fs::File;
use std::path::Path;

use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Flac,
}

impl AudioFormat {
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match extension.as_str() {
            "wav" => Ok(Self::Wav),
            "mp3" => Ok(Self::Mp3),
            "flac" => Ok(Self::Flac),
            _ => Err(Error::UnsupportedFormat(format!(".{extension}"))),
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Flac => "flac",
        }
    }

    /// Name of the encoding in the Speech-to-Text api
    pub(crate) fn speech_encoding(self) -> &'static str {
        match self {
            Self::Wav => "LINEAR16",
            Self::Mp3 => "MP3",
            Self::Flac => "FLAC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioInfo {
    pub sample_rate: u32,
    pub channels: u32,
    pub format: AudioFormat,
}

/// Sample rate and channel count of the first audio track. Blocks
/// while reading the file headers.
pub fn audio_info(path: &Path) -> Result<AudioInfo, Error> {
    let format = AudioFormat::from_path(path)?;
    let file = File::open(path).map_err(|source| Error::Io {
        path: path.to_owned(),
        source,
    })?;

    let stream = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    hint.with_extension(format.extension());
    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|source| Error::Probe {
            path: path.to_owned(),
            source,
        })?;

    let track = probed
        .format
        .default_track()
        .ok_or_else(|| Error::MissingStreamInfo(path.to_owned()))?;
    let params = &track.codec_params;

    let sample_rate = params
        .sample_rate
        .ok_or_else(|| Error::MissingStreamInfo(path.to_owned()))?;
    let channels = match (params.channels, format) {
        (Some(channels), _) => channels.count() as u32,
        // frame headers may only be seen once decoding starts
        (None, AudioFormat::Mp3) => 2,
        (None, _) => return Err(Error::MissingStreamInfo(path.to_owned())),
    };

    Ok(AudioInfo {
        sample_rate,
        channels,
        format,
    })
}
