use crate::audio::error::AudioError;
use alsa::nix::errno::Errno;
use alsa::pcm::{Access, Format, HwParams, State as PcmState, PCM};
use alsa::{Direction, ValueOr};
use std::ffi::CString;
use tracing::{debug, error, info, instrument, warn};

const LOG_TARGET: &str = "keyshift::audio::alsa_handler";

/// Manages the ALSA PCM device for audio output.
pub struct AlsaPcmHandler {
    device_name: String,
    pcm: Option<PCM>,
    channels: Option<usize>,
    actual_rate: Option<u32>,
}

impl AlsaPcmHandler {
    /// Creates a new handler for the specified ALSA device.
    pub fn new(device_name: &str) -> Self {
        info!(target: LOG_TARGET, "Creating new AlsaPcmHandler for device: {}", device_name);
        AlsaPcmHandler {
            device_name: device_name.to_string(),
            pcm: None,
            channels: None,
            actual_rate: None,
        }
    }

    /// Initializes the ALSA PCM device for the given source rate and channel
    /// count. Closes any existing PCM device first.
    #[instrument(skip(self), fields(device = %self.device_name, rate = rate, channels = channels))]
    pub fn initialize(&mut self, rate: u32, channels: usize) -> Result<(), AudioError> {
        info!(
            target: LOG_TARGET,
            "Initializing ALSA PCM device '{}': rate={}, channels={}",
            self.device_name, rate, channels
        );

        self.close();

        let device = CString::new(self.device_name.clone())
            .map_err(|e| AudioError::InitializationError(format!("Invalid device name: {}", e)))?;

        let pcm = PCM::open(&device, Direction::Playback, false)?; // Blocking mode

        {
            let hwp = HwParams::any(&pcm)?;
            hwp.set_access(Access::RWInterleaved)?;
            hwp.set_format(Format::s16())?; // Everything is converted to S16LE
            hwp.set_channels(channels as u32)?;

            match hwp.set_rate_near(rate, ValueOr::Nearest) {
                Ok(_) => {
                    let actual_rate = hwp.get_rate()?;
                    if actual_rate != rate {
                        warn!(
                            target: LOG_TARGET,
                            "ALSA rate negotiation: requested={}, actual={}",
                            rate, actual_rate
                        );
                    }
                    self.actual_rate = Some(actual_rate);
                }
                Err(e) => {
                    error!(target: LOG_TARGET, "Failed to set ALSA rate near {}: {}", rate, e);
                    return Err(AudioError::AlsaError(format!(
                        "Failed to set sample rate {}: {}",
                        rate, e
                    )));
                }
            }
            pcm.hw_params(&hwp)?;

            let swp = pcm.sw_params_current()?;
            let buffer_size = hwp.get_buffer_size()?;
            let period_size = hwp.get_period_size()?;
            swp.set_start_threshold(buffer_size - period_size)?;
            pcm.sw_params(&swp)?;
            debug!(
                target: LOG_TARGET,
                "ALSA parameters applied (buffer={}, period={}).", buffer_size, period_size
            );
        }

        self.pcm = Some(pcm);
        self.channels = Some(channels);
        info!(target: LOG_TARGET, "ALSA initialized successfully.");
        Ok(())
    }

    /// Writes a buffer of S16LE interleaved samples, handling ALSA underruns.
    /// Returns Ok(frames_written), or Ok(0) after a recovered underrun so the
    /// caller can retry the same chunk.
    pub fn write_s16_buffer(&self, buffer: &[i16]) -> Result<usize, AudioError> {
        let pcm = self
            .pcm
            .as_ref()
            .ok_or_else(|| AudioError::InvalidState("PCM not initialized for writing".to_string()))?;
        let io = pcm.io_i16()?;

        match io.writei(buffer) {
            Ok(frames_written) => Ok(frames_written),
            Err(e) if e.errno() == Errno::EPIPE => {
                warn!(target: LOG_TARGET, "ALSA buffer underrun (EPIPE), attempting recovery...");
                match pcm.recover(libc::EPIPE, false) {
                    Ok(()) => Ok(0),
                    Err(recover_err) => {
                        error!(target: LOG_TARGET, "ALSA recovery failed: {}", recover_err);
                        Err(AudioError::AlsaError(format!(
                            "ALSA recovery failed: {}",
                            recover_err
                        )))
                    }
                }
            }
            Err(e) => {
                error!(target: LOG_TARGET, "ALSA write error: {}", e);
                Err(AudioError::AlsaError(e.to_string()))
            }
        }
    }

    /// Attempts to drain the ALSA buffer. Call this after the stream ends.
    pub fn drain(&self) -> Result<(), AudioError> {
        if let Some(pcm) = &self.pcm {
            if pcm.state() == PcmState::Running || pcm.state() == PcmState::Prepared {
                debug!(target: LOG_TARGET, "Draining ALSA buffer.");
                pcm.drain().map_err(AudioError::from)
            } else {
                debug!(target: LOG_TARGET, "ALSA not running or prepared, skipping drain.");
                Ok(())
            }
        } else {
            debug!(target: LOG_TARGET, "PCM not initialized, skipping drain.");
            Ok(())
        }
    }

    /// Drops any samples still queued in the ALSA buffer, silencing output
    /// immediately. The device stays open; the next `initialize` reuses it.
    pub fn discard(&self) -> Result<(), AudioError> {
        if let Some(pcm) = &self.pcm {
            if pcm.state() == PcmState::Running || pcm.state() == PcmState::Prepared {
                debug!(target: LOG_TARGET, "Discarding pending ALSA buffer.");
                pcm.drop().map_err(AudioError::from)
            } else {
                debug!(target: LOG_TARGET, "ALSA not running or prepared, nothing to discard.");
                Ok(())
            }
        } else {
            debug!(target: LOG_TARGET, "PCM not initialized, nothing to discard.");
            Ok(())
        }
    }

    /// Closes the ALSA PCM device if it's open, dropping pending samples.
    pub fn close(&mut self) {
        if let Some(pcm) = self.pcm.take() {
            debug!(target: LOG_TARGET, "Closing ALSA PCM device (state: {:?})...", pcm.state());
            if pcm.state() == PcmState::Running || pcm.state() == PcmState::Prepared {
                if let Err(e) = pcm.drop() {
                    warn!(target: LOG_TARGET, "Error dropping ALSA buffer during close (ignored): {}", e);
                }
            }
            debug!(target: LOG_TARGET, "ALSA PCM closed.");
        }
        self.channels = None;
        self.actual_rate = None;
    }

    /// Returns the actual sample rate negotiated with ALSA during initialization.
    pub fn actual_rate(&self) -> Option<u32> {
        self.actual_rate
    }

    /// Returns the channel count requested during initialization.
    pub fn channels(&self) -> Option<usize> {
        self.channels
    }
}

impl Drop for AlsaPcmHandler {
    fn drop(&mut self) {
        debug!(target: LOG_TARGET, "Dropping AlsaPcmHandler.");
        self.close();
    }
}
