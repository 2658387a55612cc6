//! Oscilloscope visualisers.
//!
//! Both variants map windowed sample amplitudes straight onto trace geometry.
//! The 2D scope draws a line strip across the surface; the 3D scope wraps the
//! trace around a ring whose radius swells with amplitude. An optional
//! persistence factor blends each frame toward the previous trace for a
//! trailing phosphor effect.

use std::f32::consts::TAU;
use std::sync::Arc;

use crate::{
    buffer::{RingBuffer, SampleWindow},
    config::VisualiserConfig,
    render::{Primitive, RenderBackend},
    visualiser::{
        compile_or_status, default_view, frustum_projection, read_mixed_window, window_len_for,
        StopHandle, Visualiser,
    },
    Result,
};

const SCOPE_2D_VERTEX_SHADER: &str = "\
#version 330 core
layout (location = 0) in float xPos;
layout (location = 1) in float yPos;
void main()
{
    gl_Position = vec4(xPos, yPos, 0.0, 1.0);
}
";

const SCOPE_3D_VERTEX_SHADER: &str = "\
#version 330 core
layout (location = 0) in vec3 position;
uniform mat4 projectionMatrix;
uniform mat4 viewMatrix;
void main()
{
    gl_Position = projectionMatrix * viewMatrix * vec4(position, 1.0);
}
";

const SCOPE_FRAGMENT_SHADER: &str = "\
#version 330 core
out vec4 color;
void main()
{
    color = vec4(0.4, 1.0, 0.6, 1.0);
}
";

/// Line-trace oscilloscope drawn straight onto the surface plane.
pub struct Oscilloscope2D {
    ring: Arc<RingBuffer>,
    window: SampleWindow,
    mix: Vec<f32>,
    trace: Vec<f32>,
    amp_height: f32,
    persistence: f32,
    backend: Box<dyn RenderBackend>,
    active: StopHandle,
    status: Option<String>,
    shader_ok: bool,
    frames_rendered: usize,
}

impl Oscilloscope2D {
    pub fn new(
        ring: Arc<RingBuffer>,
        config: &VisualiserConfig,
        mut backend: Box<dyn RenderBackend>,
    ) -> Self {
        let window_len = window_len_for(&ring);
        let points = config.x_resolution.max(2);

        let (shader_ok, status) =
            compile_or_status(backend.as_mut(), SCOPE_2D_VERTEX_SHADER, SCOPE_FRAGMENT_SHADER);

        // Static X positions spread the trace across the full surface.
        let xs: Vec<f32> = (0..points)
            .map(|i| -1.0 + 2.0 * i as f32 / (points - 1) as f32)
            .collect();
        backend.upload_static_vertices(&xs);

        Self {
            window: SampleWindow::new(ring.channel_count(), window_len),
            mix: vec![0.0; window_len],
            trace: vec![0.0; points],
            amp_height: config.amp_height,
            persistence: config.persistence.clamp(0.0, 0.99),
            ring,
            backend,
            active: StopHandle::default(),
            status,
            shader_ok,
            frames_rendered: 0,
        }
    }

    /// The trace drawn by the most recent frame, one Y value per point.
    pub fn trace(&self) -> &[f32] {
        &self.trace
    }

    pub fn frames_rendered(&self) -> usize {
        self.frames_rendered
    }
}

impl Visualiser for Oscilloscope2D {
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
        let norm = self.amp_height / self.ring.channel_count() as f32;

        let points = self.trace.len();
        let last_sample = self.mix.len() - 1;
        for (i, value) in self.trace.iter_mut().enumerate() {
            let sample = self.mix[i * last_sample / (points - 1)] * norm;
            *value = sample + (*value - sample) * self.persistence;
        }

        self.backend.upload_stream_vertices(&self.trace);
        if self.shader_ok {
            self.backend.draw(Primitive::LineStrip, points)?;
        }
        self.frames_rendered += 1;
        Ok(())
    }

    fn resized(&mut self, width: u32, height: u32) {
        self.backend.set_viewport(width, height);
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn stop_handle(&self) -> StopHandle {
        self.active.clone()
    }
}

/// Ring-of-points oscilloscope: the trace is wrapped around a circle and
/// amplitude pushes each point outward from the base radius.
pub struct Oscilloscope3D {
    ring: Arc<RingBuffer>,
    window: SampleWindow,
    mix: Vec<f32>,
    levels: Vec<f32>,
    vertices: Vec<f32>,
    base_radius: f32,
    amp_height: f32,
    persistence: f32,
    backend: Box<dyn RenderBackend>,
    active: StopHandle,
    status: Option<String>,
    shader_ok: bool,
    frames_rendered: usize,
}

impl Oscilloscope3D {
    pub fn new(
        ring: Arc<RingBuffer>,
        config: &VisualiserConfig,
        mut backend: Box<dyn RenderBackend>,
    ) -> Self {
        let window_len = window_len_for(&ring);
        let points = config.x_resolution.max(2);

        let (shader_ok, status) =
            compile_or_status(backend.as_mut(), SCOPE_3D_VERTEX_SHADER, SCOPE_FRAGMENT_SHADER);

        Self {
            window: SampleWindow::new(ring.channel_count(), window_len),
            mix: vec![0.0; window_len],
            levels: vec![0.0; points],
            vertices: vec![0.0; points * 3],
            base_radius: 1.0,
            amp_height: config.amp_height,
            persistence: config.persistence.clamp(0.0, 0.99),
            ring,
            backend,
            active: StopHandle::default(),
            status,
            shader_ok,
            frames_rendered: 0,
        }
    }

    /// Amplitude levels from the most recent frame, one per ring point.
    pub fn levels(&self) -> &[f32] {
        &self.levels
    }

    pub fn frames_rendered(&self) -> usize {
        self.frames_rendered
    }
}

impl Visualiser for Oscilloscope3D {
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
        let norm = self.amp_height / self.ring.channel_count() as f32;

        let points = self.levels.len();
        let last_sample = self.mix.len() - 1;
        for (i, level) in self.levels.iter_mut().enumerate() {
            let sample = self.mix[i * last_sample / (points - 1)] * norm;
            *level = sample + (*level - sample) * self.persistence;
        }

        for (i, level) in self.levels.iter().enumerate() {
            let angle = TAU * i as f32 / points as f32;
            let radius = self.base_radius + *level;
            self.vertices[i * 3] = radius * angle.cos();
            self.vertices[i * 3 + 1] = *level;
            self.vertices[i * 3 + 2] = radius * angle.sin();
        }

        self.backend.upload_stream_vertices(&self.vertices);
        if self.shader_ok {
            self.backend.draw(Primitive::Points, points)?;
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
