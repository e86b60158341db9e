//! Pitch shift representation and the shared detune parameter.
//!
//! The user selects whole semitones; the playback loop consumes cents
//! (1/100 semitone) so the value can be applied directly as a resampling
//! ratio. Live updates travel through a shared atomic that the playback
//! loop re-reads on every chunk.

use crate::audio::error::AudioError;
use std::sync::atomic::AtomicI32;
use std::sync::Arc;

/// Lowest selectable pitch shift, in semitones.
pub const MIN_SEMITONES: i32 = -12;
/// Highest selectable pitch shift, in semitones.
pub const MAX_SEMITONES: i32 = 12;

const CENTS_PER_SEMITONE: i32 = 100;

/// Detune value in cents, shared between the player and a live playback task.
pub type SharedDetune = Arc<AtomicI32>;

/// A whole-semitone pitch shift, guaranteed to lie in [-12, +12].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PitchShift(i32);

impl PitchShift {
    /// Creates a pitch shift, rejecting values outside the selectable range.
    pub fn new(semitones: i32) -> Result<Self, AudioError> {
        if (MIN_SEMITONES..=MAX_SEMITONES).contains(&semitones) {
            Ok(PitchShift(semitones))
        } else {
            Err(AudioError::PitchOutOfRange(semitones))
        }
    }

    pub fn semitones(self) -> i32 {
        self.0
    }

    /// The detune value applied to a playback handle, in cents.
    pub fn cents(self) -> i32 {
        self.0 * CENTS_PER_SEMITONE
    }

    /// The playback-rate multiplier realizing this shift.
    pub fn rate_factor(self) -> f64 {
        cents_to_rate(self.cents())
    }

    /// One semitone up, saturating at the top of the range.
    pub fn up(self) -> Self {
        PitchShift((self.0 + 1).min(MAX_SEMITONES))
    }

    /// One semitone down, saturating at the bottom of the range.
    pub fn down(self) -> Self {
        PitchShift((self.0 - 1).max(MIN_SEMITONES))
    }
}

impl std::fmt::Display for PitchShift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 > 0 {
            write!(f, "+{}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Converts a detune in cents to a playback-rate multiplier (2^(cents/1200)).
pub fn cents_to_rate(cents: i32) -> f64 {
    (cents as f64 / 1200.0).exp2()
}

/// Creates the shared detune parameter for a new playback task.
pub fn shared_detune(pitch: PitchShift) -> SharedDetune {
    Arc::new(AtomicI32::new(pitch.cents()))
}
