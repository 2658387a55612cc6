use std::path::PathBuf;

use audio_visualiser_core::{
    AppConfig, AudioEngine, AudioVizError, HeadlessBackend, RingBuffer, SampleWindow,
    TransportState, Visualiser, VisualiserKind, VisualiserSuite,
};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

const SURFACE_WIDTH: u32 = 800;
const SURFACE_HEIGHT: u32 = 600;

fn main() -> audio_visualiser_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.preset {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Play {
            input,
            visualiser,
            max_frames,
        } => run_play(&config, &input, visualiser.into(), max_frames),
        Commands::Demo { frequency, frames } => run_demo(&config, frequency, frames),
    }
}

/// Plays a WAV file headlessly, pumping one audio block and one render frame
/// per iteration the way the platform callbacks would.
fn run_play(
    config: &AppConfig,
    input: &PathBuf,
    kind: VisualiserKind,
    max_frames: usize,
) -> audio_visualiser_core::Result<()> {
    tracing::info!(?input, ?kind, "starting playback");

    let mut engine = AudioEngine::new(config.audio.clone());
    engine.prepare(config.audio.sample_rate, config.audio.block_size)?;
    engine.open_file(input)?;

    let ring = engine.ring().ok_or_else(|| {
        AudioVizError::DeviceUnavailable("audio session has no ring buffer".to_string())
    })?;
    let mut suite = VisualiserSuite::new(ring, &config.visualiser, || {
        Box::new(HeadlessBackend::new())
    });
    suite.resized(SURFACE_WIDTH, SURFACE_HEIGHT);
    suite.select(kind);

    engine.play_pause();

    let sample_rate = engine.config().sample_rate;
    let mut block = SampleWindow::new(config.audio.channels, config.audio.block_size);
    let mut frames = 0usize;
    while engine.transport_state() == TransportState::Playing && frames < max_frames {
        engine.render_next_block(&mut block);
        suite.on_frame()?;
        frames += 1;

        if frames % 30 == 0 {
            report_frame(&suite, sample_rate);
        }
    }

    engine.stop_playback();
    engine.release();
    tracing::info!(frames, "playback finished");
    Ok(())
}

/// Feeds a synthesised tone through the pipeline without any audio file.
fn run_demo(
    config: &AppConfig,
    frequency: f32,
    frames: usize,
) -> audio_visualiser_core::Result<()> {
    tracing::info!(frequency, frames, "starting demo tone");

    let audio = &config.audio;
    let ring = std::sync::Arc::new(RingBuffer::new(audio.channels, audio.ring_capacity()));
    let mut suite = VisualiserSuite::new(std::sync::Arc::clone(&ring), &config.visualiser, || {
        Box::new(HeadlessBackend::new())
    });
    suite.resized(SURFACE_WIDTH, SURFACE_HEIGHT);
    suite.select(VisualiserKind::Spectrum);

    let mut block = SampleWindow::new(audio.channels, audio.block_size);
    let mut position = 0usize;
    for _ in 0..frames {
        for ch in 0..audio.channels {
            for (i, sample) in block.channel_mut(ch).iter_mut().enumerate() {
                let t = (position + i) as f32 / audio.sample_rate as f32;
                *sample = (std::f32::consts::TAU * frequency * t).sin();
            }
        }
        position += audio.block_size;
        ring.write_samples(&block, 0, audio.block_size);
        suite.on_frame()?;
    }

    report_frame(&suite, audio.sample_rate);
    Ok(())
}

fn report_frame(suite: &VisualiserSuite, sample_rate: u32) {
    match suite.selected() {
        Some(VisualiserKind::Spectrum) => {
            let spectrum = suite.spectrum();
            if let Some(status) = spectrum.status() {
                tracing::warn!(status, "visualiser drawing suppressed");
                return;
            }
            tracing::info!(
                frames = spectrum.frames_rendered(),
                peak_bin = spectrum.peak_bin(),
                peak_hz = spectrum.bin_frequency(spectrum.peak_bin(), sample_rate),
                "spectrum frame"
            );
        }
        Some(VisualiserKind::Oscilloscope2D) => {
            tracing::info!(
                frames = suite.oscilloscope_2d().frames_rendered(),
                "oscilloscope frame"
            );
        }
        Some(VisualiserKind::Oscilloscope3D) => {
            tracing::info!(
                frames = suite.oscilloscope_3d().frames_rendered(),
                "oscilloscope frame"
            );
        }
        None => {}
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Real-time audio visualiser", long_about = None)]
struct Cli {
    /// Optional JSON preset overriding the default configuration.
    #[arg(short, long, global = true)]
    preset: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a wave file through the visualisation pipeline.
    Play {
        /// Path to the wave file to visualise.
        input: PathBuf,
        /// Which visualiser to run.
        #[arg(short, long, value_enum, default_value_t = VisualiserChoice::Spectrum)]
        visualiser: VisualiserChoice,
        /// Safety cap on the number of render frames.
        #[arg(long, default_value_t = 100_000)]
        max_frames: usize,
    },
    /// Run the spectrum visualiser over a synthesised sine tone.
    Demo {
        /// Tone frequency in Hz.
        #[arg(short, long, default_value_t = 440.0)]
        frequency: f32,
        /// Number of render frames to process.
        #[arg(long, default_value_t = 120)]
        frames: usize,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum VisualiserChoice {
    Scope2d,
    Scope3d,
    Spectrum,
}

impl From<VisualiserChoice> for VisualiserKind {
    fn from(choice: VisualiserChoice) -> Self {
        match choice {
            VisualiserChoice::Scope2d => VisualiserKind::Oscilloscope2D,
            VisualiserChoice::Scope3d => VisualiserKind::Oscilloscope3D,
            VisualiserChoice::Spectrum => VisualiserKind::Spectrum,
        }
    }
}
