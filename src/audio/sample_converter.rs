//! Conversions between Symphonia buffers, planar f32, and interleaved S16LE.

use crate::audio::error::AudioError;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::conv::IntoSample;
use symphonia::core::sample::Sample;
use tracing::warn;

const LOG_TARGET: &str = "keyshift::audio::sample_converter";

/// Appends one decoded buffer to a set of planar f32 channel vectors.
///
/// The planes must already have one entry per channel of the stream.
pub fn append_to_f32_planes(
    buffer: &AudioBufferRef<'_>,
    planes: &mut [Vec<f32>],
) -> Result<(), AudioError> {
    match buffer {
        AudioBufferRef::U8(b) => append_typed(b, planes),
        AudioBufferRef::U16(b) => append_typed(b, planes),
        AudioBufferRef::U24(b) => append_typed(b, planes),
        AudioBufferRef::U32(b) => append_typed(b, planes),
        AudioBufferRef::S8(b) => append_typed(b, planes),
        AudioBufferRef::S16(b) => append_typed(b, planes),
        AudioBufferRef::S24(b) => append_typed(b, planes),
        AudioBufferRef::S32(b) => append_typed(b, planes),
        AudioBufferRef::F32(b) => append_typed(b, planes),
        AudioBufferRef::F64(b) => append_typed(b, planes),
    }
}

fn append_typed<S>(buffer: &AudioBuffer<S>, planes: &mut [Vec<f32>]) -> Result<(), AudioError>
where
    S: Sample + IntoSample<f32>,
{
    let num_channels = buffer.spec().channels.count();
    if num_channels != planes.len() {
        warn!(
            target: LOG_TARGET,
            "Channel count changed mid-stream: expected {}, got {}",
            planes.len(),
            num_channels
        );
        return Err(AudioError::UnsupportedFormat(
            "Channel count changed mid-stream".to_string(),
        ));
    }

    for (ch, plane) in planes.iter_mut().enumerate() {
        plane.extend(buffer.chan(ch).iter().map(|s| (*s).into_sample()));
    }
    Ok(())
}

/// Converts planar f32 channel slices into an interleaved S16LE buffer.
///
/// All channels are expected to hold the same number of frames, which is what
/// both the decoder and the resampler produce.
pub fn interleave_f32_to_s16(planes: &[Vec<f32>]) -> Vec<i16> {
    if planes.is_empty() || planes[0].is_empty() {
        return Vec::new();
    }

    let num_channels = planes.len();
    let num_frames = planes.iter().map(|p| p.len()).min().unwrap_or(0);
    let mut s16_vec = vec![0i16; num_frames * num_channels];

    for frame in 0..num_frames {
        for (ch, plane) in planes.iter().enumerate() {
            let sample = plane[frame];
            s16_vec[frame * num_channels + ch] =
                (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        }
    }

    s16_vec
}
