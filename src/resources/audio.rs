use std::sync::Arc;

use anyhow::bail;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioEncoding {
    Mp3,
    Wav,
}

impl AudioEncoding {
    /// Guesses the container from the first bytes of the stream.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
            return Some(Self::Wav);
        }
        if bytes.starts_with(b"ID3") {
            return Some(Self::Mp3);
        }
        // MPEG frame sync
        if bytes.len() >= 2 && bytes[0] == 0xff && bytes[1] & 0xe0 == 0xe0 {
            return Some(Self::Mp3);
        }
        None
    }
}

/// Encoded audio stream, decoded by the audio backend when played.
#[derive(Clone, Debug)]
pub struct AudioClip {
    pub path: String,
    pub encoding: AudioEncoding,
    pub bytes: Arc<Vec<u8>>,
}

pub fn decode_audio(path: &str, bytes: Vec<u8>) -> anyhow::Result<AudioClip> {
    let Some(encoding) = AudioEncoding::sniff(&bytes) else {
        bail!("{} is neither an MP3 nor a WAV stream", path);
    };
    Ok(AudioClip {
        path: path.to_string(),
        encoding,
        bytes: Arc::new(bytes),
    })
}
