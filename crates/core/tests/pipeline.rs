//! End-to-end pipeline checks: producer callback → ring buffer → spectrum.

use std::f32::consts::TAU;
use std::sync::Arc;

use audio_visualiser_core::{
    AudioConfig, AudioEngine, HeadlessBackend, RingBuffer, SampleWindow, TransportState,
    VisualiserConfig, VisualiserKind, VisualiserSuite,
};

const SAMPLE_RATE: u32 = 44_100;

fn write_stereo_sine(ring: &RingBuffer, frequency: f32, total_samples: usize, block_size: usize) {
    let mut block = SampleWindow::new(2, block_size);
    let mut position = 0usize;
    while position < total_samples {
        let n = block_size.min(total_samples - position);
        for ch in 0..2 {
            for (i, sample) in block.channel_mut(ch)[..n].iter_mut().enumerate() {
                let t = (position + i) as f32 / SAMPLE_RATE as f32;
                *sample = (TAU * frequency * t).sin();
            }
        }
        ring.write_samples(&block, 0, n);
        position += n;
    }
}

#[test]
fn dominant_bin_of_a_440_hz_tone() {
    let ring = Arc::new(RingBuffer::new(2, 10_240));
    write_stereo_sine(&ring, 440.0, 10_240, 1_024);

    let mut suite = VisualiserSuite::new(
        Arc::clone(&ring),
        &VisualiserConfig::default(),
        || Box::new(HeadlessBackend::new()),
    );
    suite.select(VisualiserKind::Spectrum);
    suite.on_frame().unwrap();

    let spectrum = suite.spectrum();
    let expected = (440.0 / (SAMPLE_RATE as f32 / 1_024.0)).round() as usize;
    assert_eq!(expected, 10);
    assert!(
        spectrum.peak_bin().abs_diff(expected) <= 1,
        "peak bin {} not within one bin of {}",
        spectrum.peak_bin(),
        expected
    );

    let peak_hz = spectrum.bin_frequency(spectrum.peak_bin(), SAMPLE_RATE);
    assert!((peak_hz - 440.0).abs() < SAMPLE_RATE as f32 / 1_024.0 * 1.5);
}

#[test]
fn silence_never_produces_nan_bins() {
    let ring = Arc::new(RingBuffer::new(2, 10_240));

    let mut suite = VisualiserSuite::new(
        Arc::clone(&ring),
        &VisualiserConfig::default(),
        || Box::new(HeadlessBackend::new()),
    );
    suite.select(VisualiserKind::Spectrum);
    for _ in 0..4 {
        suite.on_frame().unwrap();
    }

    let spectrum = suite.spectrum();
    assert!(spectrum.magnitudes().iter().all(|m| m.is_finite()));
    assert!(spectrum.grid().y_vertices().iter().all(|y| *y == 0.0));
}

#[test]
fn engine_driven_playback_reaches_the_visualiser() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for i in 0..10_240 {
        let sample = (TAU * 440.0 * i as f32 / SAMPLE_RATE as f32).sin();
        writer.write_sample(sample).unwrap();
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();

    let mut engine = AudioEngine::new(AudioConfig::default());
    engine.prepare(SAMPLE_RATE, 1_024).unwrap();
    engine.open_file(&path).unwrap();

    let mut suite = VisualiserSuite::new(
        engine.ring().unwrap(),
        &VisualiserConfig::default(),
        || Box::new(HeadlessBackend::new()),
    );
    suite.select(VisualiserKind::Spectrum);

    engine.play_pause();
    let mut block = SampleWindow::new(2, 1_024);
    while engine.transport_state() == TransportState::Playing {
        engine.render_next_block(&mut block);
        suite.on_frame().unwrap();
    }

    assert_eq!(engine.transport_state(), TransportState::Stopped);
    assert!(suite.spectrum().peak_bin().abs_diff(10) <= 1);
    assert!(suite.spectrum().frames_rendered() >= 10);
}
