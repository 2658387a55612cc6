//! Frequency-domain analysis used by the spectrum visualiser.

use std::{fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::Result;

/// Reusable forward-FFT workspace producing magnitude-only output.
///
/// The workspace owns the plan and every scratch vector it needs, so running
/// a transform allocates nothing. The input buffer is zeroed before each
/// accumulation pass; windows shorter than the FFT size are implicitly
/// zero-padded.
pub struct MagnitudeFft {
    order: usize,
    size: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
    magnitudes: Vec<f32>,
}

impl MagnitudeFft {
    /// Creates a workspace for a transform of size `1 << order`.
    pub fn new(order: usize) -> Self {
        let size = 1usize << order;
        let plan = RealFftPlanner::<f32>::new().plan_fft_forward(size);
        let input = plan.make_input_vec();
        let spectrum = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();

        Self {
            order,
            size,
            plan,
            input,
            spectrum,
            scratch,
            magnitudes: vec![0.0; size / 2],
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Transform size in samples.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of magnitude bins produced per transform.
    pub fn bin_count(&self) -> usize {
        self.size / 2
    }

    /// Centre frequency of `bin` at the given sample rate.
    pub fn bin_frequency(&self, bin: usize, sample_rate: u32) -> f32 {
        bin as f32 * sample_rate as f32 / self.size as f32
    }

    /// Runs a forward transform over `samples` and returns the magnitude of
    /// the first `size / 2` bins.
    pub fn process(&mut self, samples: &[f32]) -> Result<&[f32]> {
        self.input.fill(0.0);
        let copied = samples.len().min(self.size);
        self.input[..copied].copy_from_slice(&samples[..copied]);

        self.plan
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)?;

        for (magnitude, bin) in self.magnitudes.iter_mut().zip(&self.spectrum) {
            *magnitude = bin.norm();
        }

        Ok(&self.magnitudes)
    }

    /// Magnitudes from the most recent transform.
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    /// Index of the strongest bin in the most recent transform.
    pub fn peak_bin(&self) -> usize {
        self.magnitudes
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(bin, _)| bin)
            .unwrap_or(0)
    }
}

impl fmt::Debug for MagnitudeFft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MagnitudeFft")
            .field("order", &self.order)
            .field("size", &self.size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f32::consts::TAU;

    #[test]
    fn silence_produces_all_zero_magnitudes() {
        let mut fft = MagnitudeFft::new(10);
        let magnitudes = fft.process(&[0.0; 1024]).unwrap();
        assert!(magnitudes.iter().all(|m| *m == 0.0));
        assert!(magnitudes.iter().all(|m| m.is_finite()));
    }

    #[test]
    fn pure_tone_peaks_at_the_expected_bin() {
        let mut fft = MagnitudeFft::new(10);
        let sample_rate = 44_100.0;
        let samples: Vec<f32> = (0..1024)
            .map(|i| (TAU * 440.0 * i as f32 / sample_rate).sin())
            .collect();

        fft.process(&samples).unwrap();
        let expected = (440.0 / (sample_rate / 1024.0)).round() as usize;
        assert!(fft.peak_bin().abs_diff(expected) <= 1);
    }

    #[test]
    fn short_windows_are_zero_padded() {
        let mut fft = MagnitudeFft::new(4);
        let magnitudes = fft.process(&[1.0; 4]).unwrap();
        assert_abs_diff_eq!(magnitudes[0], 4.0, epsilon = 1e-4);
    }

    #[test]
    fn bin_frequencies_scale_with_sample_rate() {
        let fft = MagnitudeFft::new(10);
        assert_abs_diff_eq!(fft.bin_frequency(10, 44_100), 430.66, epsilon = 0.01);
    }
}
