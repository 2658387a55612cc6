//! Rendering backend abstraction.
//!
//! The visualisers only need a narrow seam: compile a shader program, keep a
//! viewport, upload static and per-frame vertex data, set matrix uniforms and
//! issue draw calls. Concrete GPU APIs live behind this trait;
//! [`HeadlessBackend`] stands in for them in tests and the CLI shell.

use crate::{AudioVizError, Result};

/// Geometry primitive for a draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Points,
    LineStrip,
}

/// Seam between a visualiser and whatever graphics API hosts it.
pub trait RenderBackend {
    /// Compiles and links a shader program. `ShaderCompile` errors carry the
    /// compiler diagnostic verbatim.
    fn compile_program(&mut self, vertex_src: &str, fragment_src: &str) -> Result<()>;

    fn set_viewport(&mut self, width: u32, height: u32);

    /// Uploads geometry that never changes after setup.
    fn upload_static_vertices(&mut self, data: &[f32]);

    /// Uploads geometry that changes every frame.
    fn upload_stream_vertices(&mut self, data: &[f32]);

    fn set_matrix_uniform(&mut self, name: &str, matrix: &[f32; 16]);

    fn draw(&mut self, primitive: Primitive, vertex_count: usize) -> Result<()>;
}

/// Backend that records activity instead of talking to a GPU.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    /// When set, the next `compile_program` call fails with this diagnostic.
    pub fail_compile_with: Option<String>,
    program_linked: bool,
    viewport: (u32, u32),
    static_vertices: Vec<f32>,
    stream_vertices: Vec<f32>,
    stream_uploads: usize,
    draw_calls: usize,
    last_primitive: Option<Primitive>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw_calls(&self) -> usize {
        self.draw_calls
    }

    pub fn stream_uploads(&self) -> usize {
        self.stream_uploads
    }

    pub fn stream_vertices(&self) -> &[f32] {
        &self.stream_vertices
    }

    pub fn static_vertices(&self) -> &[f32] {
        &self.static_vertices
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn last_primitive(&self) -> Option<Primitive> {
        self.last_primitive
    }
}

impl RenderBackend for HeadlessBackend {
    fn compile_program(&mut self, vertex_src: &str, fragment_src: &str) -> Result<()> {
        if let Some(diagnostic) = self.fail_compile_with.take() {
            return Err(AudioVizError::ShaderCompile(diagnostic));
        }
        if vertex_src.trim().is_empty() || fragment_src.trim().is_empty() {
            return Err(AudioVizError::ShaderCompile(
                "empty shader source".to_string(),
            ));
        }
        self.program_linked = true;
        Ok(())
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn upload_static_vertices(&mut self, data: &[f32]) {
        self.static_vertices = data.to_vec();
    }

    fn upload_stream_vertices(&mut self, data: &[f32]) {
        self.stream_vertices.clear();
        self.stream_vertices.extend_from_slice(data);
        self.stream_uploads += 1;
    }

    fn set_matrix_uniform(&mut self, _name: &str, _matrix: &[f32; 16]) {}

    fn draw(&mut self, primitive: Primitive, _vertex_count: usize) -> Result<()> {
        if !self.program_linked {
            return Err(AudioVizError::ShaderCompile(
                "draw issued without a linked program".to_string(),
            ));
        }
        self.last_primitive = Some(primitive);
        self.draw_calls += 1;
        Ok(())
    }
}
