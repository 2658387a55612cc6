//! Frequency spectrum visualiser.
//!
//! Each frame reads the latest window from the ring buffer, runs a forward
//! magnitude-only FFT over the summed channels and pushes the result into the
//! front row of a scrolling history grid, producing a spectrogram-like mesh.

use std::sync::Arc;

use crate::{
    analysis::MagnitudeFft,
    buffer::{RingBuffer, SampleWindow},
    config::VisualiserConfig,
    render::{Primitive, RenderBackend},
    visualiser::{
        compile_or_status, default_view, frustum_projection, read_mixed_window, window_len_for,
        StopHandle, VertexGrid, Visualiser,
    },
    Result,
};

const GRID_WIDTH: f32 = 3.0;
const GRID_DEPTH: f32 = 3.0;

const SPECTRUM_VERTEX_SHADER: &str = "\
#version 330 core
layout (location = 0) in vec2 xzPos;
layout (location = 1) in float yPos;
uniform mat4 projectionMatrix;
uniform mat4 viewMatrix;
void main()
{
    gl_Position = projectionMatrix * viewMatrix * vec4(xzPos.x, yPos, xzPos.y, 1.0);
}
";

const SPECTRUM_FRAGMENT_SHADER: &str = "\
#version 330 core
out vec4 color;
void main()
{
    color = vec4(1.0, 0.0, 1.0, 1.0);
}
";

/// Scrolling-spectrogram visualiser.
pub struct Spectrum {
    ring: Arc<RingBuffer>,
    window: SampleWindow,
    mix: Vec<f32>,
    fft: MagnitudeFft,
    grid: VertexGrid,
    amp_height: f32,
    backend: Box<dyn RenderBackend>,
    active: StopHandle,
    status: Option<String>,
    shader_ok: bool,
    frames_rendered: usize,
}

impl Spectrum {
    pub fn new(
        ring: Arc<RingBuffer>,
        config: &VisualiserConfig,
        mut backend: Box<dyn RenderBackend>,
    ) -> Self {
        let window_len = window_len_for(&ring);
        let grid = VertexGrid::new(
            config.x_resolution.max(2),
            config.z_resolution.max(2),
            GRID_WIDTH,
            GRID_DEPTH,
        );

        let (shader_ok, status) = compile_or_status(
            backend.as_mut(),
            SPECTRUM_VERTEX_SHADER,
            SPECTRUM_FRAGMENT_SHADER,
        );
        backend.upload_static_vertices(grid.xz_vertices());

        Self {
            window: SampleWindow::new(ring.channel_count(), window_len),
            mix: vec![0.0; window_len],
            fft: MagnitudeFft::new(config.fft_order),
            grid,
            amp_height: config.amp_height,
            ring,
            backend,
            active: StopHandle::default(),
            status,
            shader_ok,
            frames_rendered: 0,
        }
    }

    /// Magnitude bins from the most recent frame.
    pub fn magnitudes(&self) -> &[f32] {
        self.fft.magnitudes()
    }

    /// Strongest bin of the most recent frame.
    pub fn peak_bin(&self) -> usize {
        self.fft.peak_bin()
    }

    /// Centre frequency of `bin` at the given sample rate.
    pub fn bin_frequency(&self, bin: usize, sample_rate: u32) -> f32 {
        self.fft.bin_frequency(bin, sample_rate)
    }

    /// The history grid the frames scroll through.
    pub fn grid(&self) -> &VertexGrid {
        &self.grid
    }

    pub fn frames_rendered(&self) -> usize {
        self.frames_rendered
    }
}

impl Visualiser for Spectrum {
    fn start(&self) {
        self.active.activate();
    }

    fn stop(&self) {
        self.active.stop();
    }

    fn is_active(&self) -> bool {
        self.active.is_active()
    }

    fn on_frame(&mut self) -> Result<()> {
        if !self.active.is_active() {
            return Ok(());
        }

        read_mixed_window(&self.ring, &mut self.window, &mut self.mix)?;

        let bin_count = self.fft.bin_count();
        let magnitudes = self.fft.process(&self.mix)?;

        // Scale by the observed per-frame maximum so amplitude stays visible
        // at any absolute loudness; silence maps to a flat zero row.
        let max = magnitudes.iter().fold(0.0f32, |a, m| a.max(*m));
        let scale = if max > 0.0 { self.amp_height / max } else { 0.0 };

        self.grid.scroll_back();
        let front = self.grid.front_row_mut();
        let buckets = front.len();
        for (x, bucket) in front.iter_mut().enumerate() {
            let bin = x * (bin_count - 1) / (buckets - 1);
            *bucket = magnitudes[bin] * scale;
        }

        self.backend.upload_stream_vertices(self.grid.y_vertices());
        if self.shader_ok {
            self.backend
                .draw(Primitive::Points, self.grid.vertex_count())?;
        }
        self.frames_rendered += 1;
        Ok(())
    }

    fn resized(&mut self, width: u32, height: u32) {
        self.backend.set_viewport(width, height);
        self.backend
            .set_matrix_uniform("projectionMatrix", &frustum_projection(width, height));
        self.backend.set_matrix_uniform("viewMatrix", &default_view());
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn stop_handle(&self) -> StopHandle {
        self.active.clone()
    }
}
