use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub visualiser: VisualiserConfig,
}

impl AppConfig {
    /// Loads a JSON preset from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::warn!(error = %e, "preset file rejected");
            crate::AudioVizError::InvalidArgument("preset file is not a valid configuration")
        })
    }

    /// Writes the configuration as a JSON preset.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub block_size: usize,
    pub channels: usize,
    /// Ring buffer capacity as a multiple of the block size.
    pub ring_blocks: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            block_size: 1024,
            channels: 2,
            ring_blocks: 10,
        }
    }
}

impl AudioConfig {
    /// Ring buffer capacity in samples per channel.
    pub fn ring_capacity(&self) -> usize {
        self.block_size * self.ring_blocks
    }
}

/// Configuration shared by the visualiser variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualiserConfig {
    /// Frequency buckets (spectrum) or trace points (oscilloscopes) per row.
    pub x_resolution: usize,
    /// History rows kept by the scrolling spectrum grid.
    pub z_resolution: usize,
    /// Vertical extent amplitudes are scaled into.
    pub amp_height: f32,
    /// Per-frame blend toward the previous trace, 0.0 disables the trail.
    pub persistence: f32,
    pub fft_order: usize,
}

impl Default for VisualiserConfig {
    fn default() -> Self {
        Self {
            x_resolution: 50,
            z_resolution: 60,
            amp_height: 1.0,
            persistence: 0.0,
            fft_order: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_round_trip_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preset.json");

        let mut config = AppConfig::default();
        config.audio.sample_rate = 48_000;
        config.visualiser.persistence = 0.4;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.audio.sample_rate, 48_000);
        assert_eq!(loaded.audio.ring_capacity(), 10_240);
        assert!((loaded.visualiser.persistence - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn malformed_presets_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(AppConfig::load(&path).is_err());
    }
}
