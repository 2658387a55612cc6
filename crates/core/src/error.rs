/// Result alias that carries the custom [`AudioVizError`] type.
pub type Result<T> = std::result::Result<T, AudioVizError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum AudioVizError {
    /// The file exists but could not be decoded as audio. Surfaced to the
    /// shell without touching playback state.
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),
    /// The audio device could not be configured; playback and recording stay
    /// disabled until the device recovers.
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),
    /// Shader program compilation or linking failed. The visualiser keeps
    /// producing geometry and exposes the compiler output instead of drawing.
    #[error("shader compilation failed: {0}")]
    ShaderCompile(String),
    /// A caller violated an API contract, e.g. requesting more samples than a
    /// ring buffer can ever hold.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around FFT processing errors.
    #[error("fft processing failed: {0}")]
    Fft(#[from] realfft::FftError),
}
