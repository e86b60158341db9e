//! Integration tests for audio decoding and playback.

use crate::test_utils;
use keyshift::audio::{
    cents_to_rate, decode_file, shared_detune, AudioError, AudioPlaybackControl, PitchShift,
    PlaybackEngine,
};
use std::error::Error;
use std::sync::Arc;
use tokio::sync::broadcast;

#[test]
fn decode_file_handles_stereo_wav() {
    let dir = tempfile::tempdir().unwrap();
    let path = test_utils::write_wav(&dir, "stereo.wav", 48000, 2, 4800);

    let buffer = decode_file(&path).unwrap();
    assert_eq!(buffer.sample_rate(), 48000);
    assert_eq!(buffer.channels(), 2);
    assert_eq!(buffer.frames(), 4800);
    assert!((buffer.duration_secs() - 0.1).abs() < 1e-9);
}

#[test]
fn decode_file_handles_mono_wav() {
    let dir = tempfile::tempdir().unwrap();
    let path = test_utils::write_wav(&dir, "mono.wav", 22050, 1, 1000);

    let buffer = decode_file(&path).unwrap();
    assert_eq!(buffer.channels(), 1);
    assert_eq!(buffer.frames(), 1000);
}

#[test]
fn decode_file_reports_unreadable_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.wav");
    std::fs::write(&path, b"RIFFnope").unwrap();

    assert!(decode_file(&path).is_err());
}

#[test]
fn audio_error_display_is_stable() {
    let error = AudioError::AlsaError("Test error".to_string());
    assert_eq!(format!("{}", error), "ALSA error: Test error");

    let error = AudioError::PitchOutOfRange(15);
    assert_eq!(
        format!("{}", error),
        "Pitch shift 15 outside supported range [-12, 12]"
    );
}

#[test]
fn pitch_shift_maps_to_playback_rate() {
    let octave_up = PitchShift::new(12).unwrap();
    assert!((octave_up.rate_factor() - 2.0).abs() < 1e-12);

    let octave_down = PitchShift::new(-12).unwrap();
    assert!((octave_down.rate_factor() - 0.5).abs() < 1e-12);

    assert!((cents_to_rate(100) - 2f64.powf(1.0 / 12.0)).abs() < 1e-12);
}

/// Plays a short clip on the default ALSA device.
/// Ignored because it requires audio hardware.
#[tokio::test]
#[ignore]
async fn playback_engine_plays_wav_on_default_device() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = test_utils::write_wav(&dir, "clip.wav", 44100, 2, 22050);
    let buffer = Arc::new(decode_file(&path)?);

    let mut engine = PlaybackEngine::new("default");
    let detune = shared_detune(PitchShift::new(2)?);
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

    engine
        .play(buffer, detune, Box::new(|| {}), shutdown_rx)
        .await?;
    engine.shutdown().await?;
    Ok(())
}

/// Stopping mid-clip must cut output immediately rather than letting the
/// ALSA buffer play out: play returns well before the clip's duration and
/// without firing the finish callback.
/// Ignored because it requires audio hardware.
#[tokio::test]
#[ignore]
async fn stop_silences_output_immediately() -> Result<(), Box<dyn Error>> {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    // 5 seconds of audio, stopped after 200ms.
    let dir = tempfile::tempdir()?;
    let path = test_utils::write_wav(&dir, "long.wav", 44100, 2, 220500);
    let buffer = Arc::new(decode_file(&path)?);

    let mut engine = PlaybackEngine::new("default");
    let detune = shared_detune(PitchShift::new(0)?);
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let finished = Arc::new(AtomicBool::new(false));
    let finished_flag = Arc::clone(&finished);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = shutdown_tx.send(());
    });

    let started = Instant::now();
    engine
        .play(
            buffer,
            detune,
            Box::new(move || finished_flag.store(true, Ordering::Relaxed)),
            shutdown_rx,
        )
        .await?;
    let elapsed = started.elapsed();

    assert!(
        elapsed < Duration::from_secs(2),
        "play returned after {:?}, buffered audio was not discarded",
        elapsed
    );
    assert!(!finished.load(Ordering::Relaxed));
    engine.shutdown().await?;
    Ok(())
}
