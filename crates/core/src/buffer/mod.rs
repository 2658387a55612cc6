//! Multi-channel ring buffer shared between the audio and render contexts.
//!
//! Exactly one writer (the audio callback) and one reader (the render
//! callback) are permitted per instance. The writer is wait-free: it stores
//! sample slots with relaxed atomic stores and publishes the new write
//! position with a single release store. The reader copies the most recent
//! window out of the buffer without ever touching write-side state, so the
//! two contexts can run at completely independent rates.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::{AudioVizError, Result};

/// Number of samples per channel the visualisers read each frame.
pub const RING_BUFFER_READ_SIZE: usize = 1024;

/// Fixed-capacity circular sample store.
///
/// Samples are stored as `f32` bit patterns inside `AtomicU32` slots, which
/// makes every individual sample all-old or all-new under any interleaving of
/// the writer and the reader. Capacity and channel count are fixed at
/// construction; changing either means dropping the buffer and creating a new
/// one, which the audio session does whenever playback parameters change.
pub struct RingBuffer {
    channels: Vec<Box<[AtomicU32]>>,
    capacity: usize,
    /// Total samples written per channel since construction. Channels always
    /// advance in lockstep within one `write_samples` call, so one shared
    /// position represents every channel's write cursor.
    write_pos: AtomicU64,
}

impl RingBuffer {
    /// Creates a buffer holding `capacity` samples for each of
    /// `channel_count` channels. Both must be non-zero.
    pub fn new(channel_count: usize, capacity: usize) -> Self {
        assert!(channel_count > 0, "ring buffer needs at least one channel");
        assert!(capacity > 0, "ring buffer needs a non-zero capacity");

        let channels = (0..channel_count)
            .map(|_| (0..capacity).map(|_| AtomicU32::new(0)).collect())
            .collect();

        Self {
            channels,
            capacity,
            write_pos: AtomicU64::new(0),
        }
    }

    /// Maximum number of samples held per channel.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of channels the buffer was created with.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of samples currently readable per channel, saturating at the
    /// capacity once the buffer has wrapped at least once.
    pub fn available(&self) -> usize {
        let written = self.write_pos.load(Ordering::Acquire);
        written.min(self.capacity as u64) as usize
    }

    /// Appends `num_samples` samples per channel starting at `start_sample`
    /// within the source block.
    ///
    /// Must only be called from the single writer context. The call never
    /// blocks and never allocates; when `num_samples` exceeds the capacity
    /// only the most recent `capacity` samples are kept, and samples missing
    /// from the source (short slice, absent channel) are written as silence
    /// so that every channel still advances in lockstep.
    pub fn write_samples(&self, source: &SampleWindow, start_sample: usize, num_samples: usize) {
        self.write_from(
            |ch| source.planes.get(ch).map(Vec::as_slice),
            start_sample,
            num_samples,
        );
    }

    /// Slice-based variant of [`write_samples`](Self::write_samples) for
    /// producers that do not keep their audio in a [`SampleWindow`].
    pub fn write_sample_slices(&self, source: &[&[f32]], start_sample: usize, num_samples: usize) {
        self.write_from(|ch| source.get(ch).copied(), start_sample, num_samples);
    }

    fn write_from<'a, F>(&self, source_channel: F, start_sample: usize, num_samples: usize)
    where
        F: Fn(usize) -> Option<&'a [f32]>,
    {
        if num_samples == 0 {
            return;
        }

        // Only the writer mutates write_pos, so a relaxed load sees its own
        // previous store.
        let write_pos = self.write_pos.load(Ordering::Relaxed);

        // Oversized blocks wrap over themselves; keep the most recent
        // `capacity` samples and skip the rest outright.
        let skip = num_samples.saturating_sub(self.capacity);

        for (ch, slots) in self.channels.iter().enumerate() {
            let src = source_channel(ch).unwrap_or(&[]);
            for i in skip..num_samples {
                let slot = ((write_pos + i as u64) % self.capacity as u64) as usize;
                let sample = src.get(start_sample + i).copied().unwrap_or(0.0);
                slots[slot].store(sample.to_bits(), Ordering::Relaxed);
            }
        }

        // Publish: a reader that acquires this position is guaranteed to see
        // every slot stored above.
        self.write_pos
            .store(write_pos + num_samples as u64, Ordering::Release);
    }

    /// Copies the most recent `num_samples` samples per channel into `dest`.
    ///
    /// If fewer than `num_samples` samples have ever been written the
    /// unwritten prefix is zero-filled. Write-side state is never mutated and
    /// the writer is never blocked. Requesting more samples than the capacity
    /// or passing a window of the wrong shape fails with `InvalidArgument`.
    pub fn read_samples(&self, dest: &mut SampleWindow, num_samples: usize) -> Result<()> {
        if num_samples > self.capacity {
            return Err(AudioVizError::InvalidArgument(
                "requested more samples than the ring buffer capacity",
            ));
        }
        if dest.channel_count() != self.channel_count() {
            return Err(AudioVizError::InvalidArgument(
                "destination window channel count does not match the ring buffer",
            ));
        }
        if dest.len() < num_samples {
            return Err(AudioVizError::InvalidArgument(
                "destination window is shorter than the requested read",
            ));
        }

        loop {
            // Snapshot the write position *before* copying; everything before
            // it is fully published by the release store in write_from.
            let write_pos = self.write_pos.load(Ordering::Acquire);
            let filled = write_pos.min(num_samples as u64) as usize;
            let zero_fill = num_samples - filled;
            let start = write_pos - filled as u64;

            for (ch, slots) in self.channels.iter().enumerate() {
                let out = &mut dest.planes[ch][..num_samples];
                out[..zero_fill].fill(0.0);
                for (i, sample) in out[zero_fill..].iter_mut().enumerate() {
                    let slot = ((start + i as u64) % self.capacity as u64) as usize;
                    *sample = f32::from_bits(slots[slot].load(Ordering::Relaxed));
                }
            }

            // Validate the snapshot: if the writer has advanced far enough to
            // wrap into [start, write_pos) the copy may mix generations, so
            // take a fresh snapshot and copy again. The writer would have to
            // produce nearly a full buffer during one window copy for this to
            // repeat, so the loop settles immediately in practice.
            let write_pos_after = self.write_pos.load(Ordering::Acquire);
            if write_pos_after.saturating_sub(start) <= self.capacity as u64 {
                return Ok(());
            }
        }
    }
}

/// Caller-owned per-channel sample storage, reused frame-to-frame.
///
/// Doubles as the scratch block on the producer side, so the audio callback
/// never allocates once the session is prepared.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    planes: Vec<Vec<f32>>,
}

impl SampleWindow {
    /// Creates a zeroed window of `len` samples for each channel.
    pub fn new(channel_count: usize, len: usize) -> Self {
        Self {
            planes: vec![vec![0.0; len]; channel_count],
        }
    }

    pub fn channel_count(&self) -> usize {
        self.planes.len()
    }

    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.planes.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.planes[index]
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.planes[index]
    }

    /// Iterates over the per-channel sample slices.
    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.planes.iter().map(Vec::as_slice)
    }

    /// Zeroes every channel.
    pub fn clear(&mut self) {
        for plane in &mut self.planes {
            plane.fill(0.0);
        }
    }
}
