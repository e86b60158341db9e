//! Audio playback subsystem: decoding, pitch shifting, and ALSA output.

pub mod alsa_handler;
pub mod decoder;
pub mod error;
pub mod pitch;
pub mod playback;
pub mod sample_converter;


pub use decoder::{decode_file, PcmBuffer};
pub use error::AudioError;
pub use pitch::{
    cents_to_rate, shared_detune, PitchShift, SharedDetune, MAX_SEMITONES, MIN_SEMITONES,
};
pub use playback::{AudioPlaybackControl, OnFinishCallback, PlaybackEngine};
