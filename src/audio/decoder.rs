//! Decodes an entire audio file into an in-memory PCM buffer.

use crate::audio::error::AudioError;
use crate::audio::sample_converter;
use std::fs::File;
use std::io;
use std::path::Path;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "keyshift::audio::decoder";

/// A fully decoded, planar f32 PCM buffer.
///
/// Produced once per loaded file and read-only afterwards; playback tasks
/// share it behind an `Arc`.
pub struct PcmBuffer {
    planes: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl PcmBuffer {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.planes.len()
    }

    pub fn frames(&self) -> usize {
        self.planes.first().map_or(0, |p| p.len())
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// One f32 slice per channel, all holding `frames()` samples.
    pub fn planes(&self) -> &[Vec<f32>] {
        &self.planes
    }
}

#[cfg(test)]
impl PcmBuffer {
    pub(crate) fn from_planes(planes: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        PcmBuffer {
            planes,
            sample_rate,
        }
    }
}

impl std::fmt::Debug for PcmBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcmBuffer")
            .field("channels", &self.channels())
            .field("frames", &self.frames())
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

/// Opens, probes, and fully decodes an audio file.
///
/// Runs to end of stream before returning, so it should be called from a
/// blocking task. Packets with recoverable decode errors are skipped, the
/// same way the streaming path of a player would skip them.
pub fn decode_file(path: &Path) -> Result<PcmBuffer, AudioError> {
    debug!(target: LOG_TARGET, "Decoding file: {}", path.display());

    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::UnsupportedFormat("No playable audio track found".to_string()))?
        .clone();

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(AudioError::MissingCodecParams("sample rate"))?;
    let num_channels = track
        .codec_params
        .channels
        .ok_or(AudioError::MissingCodecParams("channels map"))?
        .count();

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut planes: Vec<Vec<f32>> = vec![Vec::new(); num_channels];

    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track.id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => sample_converter::append_to_f32_planes(&decoded, &mut planes)?,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(target: LOG_TARGET, "Decode error (skipping packet): {}", e);
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let buffer = PcmBuffer {
        planes,
        sample_rate,
    };

    if buffer.frames() == 0 {
        return Err(AudioError::DecodingError(
            "File produced no decodable audio".to_string(),
        ));
    }

    info!(
        target: LOG_TARGET,
        "Decoded {}: {} channels, {} frames @ {} Hz ({:.1}s)",
        path.display(),
        buffer.channels(),
        buffer.frames(),
        buffer.sample_rate(),
        buffer.duration_secs()
    );

    Ok(buffer)
}
