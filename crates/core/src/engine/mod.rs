//! Audio session engine.
//!
//! Owns the ring buffer for the lifetime of one prepared audio session,
//! arbitrates which producer feeds it and plumbs shell commands through the
//! transport machine. The platform audio driver is an external collaborator:
//! it calls [`AudioEngine::render_next_block`] once per output quantum and
//! [`AudioEngine::capture_input_block`] once per captured input quantum.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    buffer::{RingBuffer, SampleWindow},
    config::AudioConfig,
    source::{FilePlayer, WavFileSource},
    transport::{PlaybackSource, TransportMachine, TransportState},
    AudioVizError, Result,
};

/// Which producer currently feeds the ring buffer. A single enum rather than
/// independent flags, so both modes can never be armed at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMode {
    #[default]
    FilePlayback,
    LiveInput,
}

/// High level audio engine owning the producer side of the pipeline.
pub struct AudioEngine {
    config: AudioConfig,
    ring: Option<Arc<RingBuffer>>,
    transport: TransportMachine,
    mode: SourceMode,
    player: Option<FilePlayer>,
}

impl AudioEngine {
    pub fn new(config: AudioConfig) -> Self {
        Self {
            config,
            ring: None,
            transport: TransportMachine::new(),
            mode: SourceMode::default(),
            player: None,
        }
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn mode(&self) -> SourceMode {
        self.mode
    }

    pub fn transport_state(&self) -> TransportState {
        self.transport.state()
    }

    /// Allocates the ring buffer for a session with the given playback
    /// parameters. Called by the platform layer before rendering starts and
    /// again whenever the device is reconfigured.
    pub fn prepare(&mut self, sample_rate: u32, block_size: usize) -> Result<()> {
        if sample_rate == 0 || block_size == 0 {
            return Err(AudioVizError::DeviceUnavailable(format!(
                "cannot prepare a session at {sample_rate} Hz with {block_size}-sample blocks"
            )));
        }

        self.config.sample_rate = sample_rate;
        self.config.block_size = block_size;
        let capacity = self.config.ring_capacity();
        self.ring = Some(Arc::new(RingBuffer::new(self.config.channels, capacity)));

        info!(sample_rate, block_size, capacity, "audio session prepared");
        Ok(())
    }

    /// Drops the session's ring buffer. Visualisers holding a handle keep
    /// reading their own reference until they are rebuilt for the next
    /// session.
    pub fn release(&mut self) {
        self.ring = None;
        info!("audio session released");
    }

    pub fn is_prepared(&self) -> bool {
        self.ring.is_some()
    }

    /// Shared handle to the session's ring buffer.
    pub fn ring(&self) -> Option<Arc<RingBuffer>> {
        self.ring.clone()
    }

    /// Opens an audio file and arms file-playback mode. On failure nothing
    /// about the current session changes.
    pub fn open_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let source = WavFileSource::open(path)?;

        self.halt_playback();
        self.player = Some(FilePlayer::new(Box::new(source)));
        self.mode = SourceMode::FilePlayback;
        Ok(())
    }

    /// Arms live-input mode. Any file playback is stopped first so only one
    /// producer feeds the ring buffer.
    pub fn select_live_input(&mut self) {
        self.halt_playback();
        self.mode = SourceMode::LiveInput;
        info!("live input armed");
    }

    /// Play/pause command from the shell.
    pub fn play_pause(&mut self) {
        if self.mode != SourceMode::FilePlayback {
            warn!("play/pause ignored: live input is armed");
            return;
        }
        let Some(player) = self.player.as_mut() else {
            warn!("play/pause ignored: no file loaded");
            return;
        };

        self.transport.play_pause(player);
        self.transport.source_state_changed(player.is_playing(), player);
    }

    /// Stop command from the shell.
    pub fn stop_playback(&mut self) {
        if let Some(player) = self.player.as_mut() {
            self.transport.stop(player);
            self.transport.source_state_changed(player.is_playing(), player);
        }
    }

    /// The audio rendering callback. Fills `block` with the next output
    /// quantum and feeds the ring buffer while file playback is active.
    /// Real-time safe: no allocation, no locks, no error propagation.
    pub fn render_next_block(&mut self, block: &mut SampleWindow) {
        block.clear();

        if self.mode != SourceMode::FilePlayback || !self.transport.is_playing() {
            return;
        }
        let Some(player) = self.player.as_mut() else {
            return;
        };

        let num_samples = block.len();
        let produced = player.render_block(block, num_samples);
        if produced > 0 {
            // A partial block at end of stream still writes its cleared tail,
            // so the visualisation runs out smoothly instead of freezing.
            if let Some(ring) = &self.ring {
                ring.write_samples(block, 0, num_samples);
            }
        }

        // The player flips itself off at end of stream; settle the transport.
        if !player.is_playing() {
            self.transport.source_state_changed(false, player);
        }
    }

    /// The capture callback for live input. Samples go straight into the
    /// ring buffer; input is never monitored to the output.
    pub fn capture_input_block(&mut self, channels: &[&[f32]], num_samples: usize) {
        if self.mode != SourceMode::LiveInput {
            return;
        }
        if let Some(ring) = &self.ring {
            ring.write_sample_slices(channels, 0, num_samples);
        }
    }

    /// Drives the transport to `Stopped` before switching producers.
    fn halt_playback(&mut self) {
        if let Some(player) = self.player.as_mut() {
            self.transport.stop(player);
            self.transport.source_state_changed(player.is_playing(), player);
            debug_assert_eq!(self.transport.state(), TransportState::Stopped);
        }
    }
}
