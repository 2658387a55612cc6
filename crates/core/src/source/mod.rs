//! Decodable audio sources feeding the playback transport.
//!
//! Format specifics stay behind [`SampleSource`]; the engine only ever asks
//! for planar f32 blocks. [`WavFileSource`] is the concrete reader for
//! waveform audio files, and [`FilePlayer`] wraps any source with the play
//! state the transport machine drives.

use std::path::Path;

use tracing::{debug, info};

use crate::{buffer::SampleWindow, transport::PlaybackSource, AudioVizError, Result};

/// A decoded, seekable stream of planar f32 samples.
pub trait SampleSource: Send {
    fn sample_rate(&self) -> u32;

    fn channel_count(&self) -> usize;

    /// Copies up to `num_samples` samples per channel into the front of
    /// `dest` and returns how many were produced. Zero means the stream is
    /// exhausted. Mono material is duplicated across the destination
    /// channels.
    fn read_block(&mut self, dest: &mut SampleWindow, num_samples: usize) -> usize;

    /// Rewinds the stream to its first sample.
    fn seek_to_start(&mut self);

    /// Stream length in samples per channel, when known.
    fn len_samples(&self) -> Option<u64>;
}

/// WAV reader backed by `hound`, decoded to planar f32 on open.
#[derive(Debug)]
pub struct WavFileSource {
    sample_rate: u32,
    planes: Vec<Vec<f32>>,
    position: usize,
}

impl WavFileSource {
    /// Opens and fully decodes a WAV file. Int samples of any width are
    /// rescaled to [-1, 1]; anything `hound` rejects surfaces as
    /// `UnsupportedFormat`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = hound::WavReader::open(path)
            .map_err(|e| AudioVizError::UnsupportedFormat(e.to_string()))?;
        let spec = reader.spec();
        let channels = spec.channels as usize;
        if channels == 0 {
            return Err(AudioVizError::UnsupportedFormat(
                "wave file declares zero channels".into(),
            ));
        }

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| AudioVizError::UnsupportedFormat(e.to_string()))?,
            hound::SampleFormat::Int => {
                let scale = (1u64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| AudioVizError::UnsupportedFormat(e.to_string()))?
            }
        };

        let frames = interleaved.len() / channels;
        let mut planes: Vec<Vec<f32>> = (0..channels)
            .map(|_| Vec::with_capacity(frames))
            .collect();
        for frame in interleaved.chunks_exact(channels) {
            for (plane, sample) in planes.iter_mut().zip(frame) {
                plane.push(*sample);
            }
        }

        info!(
            path = %path.display(),
            sample_rate = spec.sample_rate,
            channels,
            frames,
            "opened wave file"
        );

        Ok(Self {
            sample_rate: spec.sample_rate,
            planes,
            position: 0,
        })
    }
}

impl SampleSource for WavFileSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channel_count(&self) -> usize {
        self.planes.len()
    }

    fn read_block(&mut self, dest: &mut SampleWindow, num_samples: usize) -> usize {
        let remaining = self.planes[0].len().saturating_sub(self.position);
        let produced = num_samples.min(remaining).min(dest.len());

        for ch in 0..dest.channel_count() {
            let plane = &self.planes[ch % self.planes.len()];
            dest.channel_mut(ch)[..produced]
                .copy_from_slice(&plane[self.position..self.position + produced]);
        }

        self.position += produced;
        produced
    }

    fn seek_to_start(&mut self) {
        self.position = 0;
    }

    fn len_samples(&self) -> Option<u64> {
        Some(self.planes[0].len() as u64)
    }
}

/// A [`SampleSource`] paired with the play state the transport drives.
pub struct FilePlayer {
    source: Box<dyn SampleSource>,
    playing: bool,
}

impl FilePlayer {
    pub fn new(source: Box<dyn SampleSource>) -> Self {
        Self {
            source,
            playing: false,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.source.sample_rate()
    }

    /// Pulls the next block while playing. Reaching the end of the stream
    /// flips the player to stopped so the engine can report the change to the
    /// transport machine.
    pub fn render_block(&mut self, dest: &mut SampleWindow, num_samples: usize) -> usize {
        if !self.playing {
            return 0;
        }

        let produced = self.source.read_block(dest, num_samples);
        if produced < num_samples {
            self.playing = false;
            debug!("file source exhausted");
        }
        produced
    }
}

impl PlaybackSource for FilePlayer {
    fn start(&mut self) {
        self.playing = true;
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn seek_to_start(&mut self) {
        self.source.seek_to_start();
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::path::PathBuf;

    fn write_wav(dir: &tempfile::TempDir, spec: hound::WavSpec, frames: &[[f32; 2]]) -> PathBuf {
        let path = dir.path().join("fixture.wav");
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for frame in frames {
            for sample in &frame[..spec.channels as usize] {
                match spec.sample_format {
                    hound::SampleFormat::Float => writer.write_sample(*sample).unwrap(),
                    hound::SampleFormat::Int => {
                        writer.write_sample((sample * 32_767.0) as i16).unwrap()
                    }
                }
            }
        }
        writer.finalize().unwrap();
        path
    }

    fn float_spec(channels: u16) -> hound::WavSpec {
        hound::WavSpec {
            channels,
            sample_rate: 44_100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        }
    }

    #[test]
    fn decodes_float_wav_to_planar_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let frames: Vec<[f32; 2]> = (0..64).map(|i| [i as f32 / 64.0, -1.0]).collect();
        let path = write_wav(&dir, float_spec(2), &frames);

        let mut source = WavFileSource::open(&path).unwrap();
        assert_eq!(source.sample_rate(), 44_100);
        assert_eq!(source.channel_count(), 2);
        assert_eq!(source.len_samples(), Some(64));

        let mut block = SampleWindow::new(2, 48);
        assert_eq!(source.read_block(&mut block, 48), 48);
        assert_abs_diff_eq!(block.channel(0)[10], 10.0 / 64.0);
        assert_abs_diff_eq!(block.channel(1)[10], -1.0);

        // Remaining tail, then exhaustion.
        assert_eq!(source.read_block(&mut block, 48), 16);
        assert_eq!(source.read_block(&mut block, 48), 0);

        source.seek_to_start();
        assert_eq!(source.read_block(&mut block, 48), 48);
    }

    #[test]
    fn int_samples_are_rescaled() {
        let dir = tempfile::tempdir().unwrap();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let frames: Vec<[f32; 2]> = vec![[0.5, 0.0]; 8];
        let path = write_wav(&dir, spec, &frames);

        let mut source = WavFileSource::open(&path).unwrap();
        let mut block = SampleWindow::new(1, 8);
        source.read_block(&mut block, 8);
        assert_abs_diff_eq!(block.channel(0)[0], 0.5, epsilon = 1e-3);
    }

    #[test]
    fn mono_material_is_duplicated_across_channels() {
        let dir = tempfile::tempdir().unwrap();
        let frames: Vec<[f32; 2]> = (0..16).map(|i| [i as f32, 0.0]).collect();
        let path = write_wav(&dir, float_spec(1), &frames);

        let mut source = WavFileSource::open(&path).unwrap();
        let mut block = SampleWindow::new(2, 16);
        source.read_block(&mut block, 16);
        assert_eq!(block.channel(0), block.channel(1));
    }

    #[test]
    fn garbage_files_surface_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"definitely not RIFF data").unwrap();

        let err = WavFileSource::open(&path).unwrap_err();
        assert!(matches!(err, AudioVizError::UnsupportedFormat(_)));
    }

    #[test]
    fn player_stops_itself_at_end_of_stream() {
        let dir = tempfile::tempdir().unwrap();
        let frames: Vec<[f32; 2]> = vec![[0.25, 0.25]; 32];
        let path = write_wav(&dir, float_spec(2), &frames);

        let mut player = FilePlayer::new(Box::new(WavFileSource::open(&path).unwrap()));
        let mut block = SampleWindow::new(2, 32);

        assert_eq!(player.render_block(&mut block, 32), 0);

        player.start();
        assert_eq!(player.render_block(&mut block, 32), 32);
        assert!(player.is_playing());

        assert_eq!(player.render_block(&mut block, 32), 0);
        assert!(!player.is_playing());
    }
}
