//! Core library for the Audio Visualiser application.
//!
//! The crate implements the producer/consumer pipeline behind the GUI shell:
//! an audio-side producer writes streaming samples into a lock-free ring
//! buffer, and per-frame visualisers read fixed windows back out and turn
//! them into drawable geometry. Each module owns a distinct subsystem (ring
//! buffer, FFT analysis, transport, sources, visualisers) so the shell only
//! has to wire callbacks to the [`AudioEngine`] and a [`VisualiserSuite`].

pub mod analysis;
pub mod buffer;
pub mod config;
pub mod engine;
pub mod error;
pub mod render;
pub mod scope;
pub mod source;
pub mod spectrum;
pub mod transport;
pub mod visualiser;

pub use analysis::MagnitudeFft;
pub use buffer::{RingBuffer, SampleWindow, RING_BUFFER_READ_SIZE};
pub use config::{AppConfig, AudioConfig, VisualiserConfig};
pub use engine::{AudioEngine, SourceMode};
pub use error::{AudioVizError, Result};
pub use render::{HeadlessBackend, Primitive, RenderBackend};
pub use scope::{Oscilloscope2D, Oscilloscope3D};
pub use source::{FilePlayer, SampleSource, WavFileSource};
pub use spectrum::Spectrum;
pub use transport::{PlaybackSource, TransportMachine, TransportState};
pub use visualiser::{StopHandle, VertexGrid, Visualiser, VisualiserKind, VisualiserSuite};
