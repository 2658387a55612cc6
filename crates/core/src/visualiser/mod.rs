//! Shared per-frame visualiser contract and the suite that hosts the three
//! variants.
//!
//! Every visualiser follows the same frame shape: read the latest window from
//! the ring buffer, combine the channels into one analysis signal, transform
//! it into vertex data, upload, draw. The variants differ only in the
//! transform.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::{
    buffer::{RingBuffer, SampleWindow, RING_BUFFER_READ_SIZE},
    config::VisualiserConfig,
    render::RenderBackend,
    scope::{Oscilloscope2D, Oscilloscope3D},
    spectrum::Spectrum,
    Result,
};

/// Per-frame consumer contract shared by all visualiser variants.
pub trait Visualiser {
    /// Begins continuous per-frame processing.
    fn start(&self);

    /// Halts processing. Idempotent, and safe to call while a frame is in
    /// flight: no frame begins after this returns.
    fn stop(&self);

    fn is_active(&self) -> bool;

    /// Invoked once per display refresh tick by the render driver.
    fn on_frame(&mut self) -> Result<()>;

    /// Recomputes projection parameters for a resized display surface.
    fn resized(&mut self, width: u32, height: u32);

    /// Shader diagnostic shown in place of the visualisation while drawing is
    /// suppressed.
    fn status(&self) -> Option<&str>;

    /// Cloneable handle that can stop this visualiser from another thread.
    fn stop_handle(&self) -> StopHandle;
}

/// Activation flag shared between a visualiser and its remote handles.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    active: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub(crate) fn activate(&self) {
        self.active.store(true, Ordering::SeqCst);
    }
}

/// Reads the most recent window from the ring buffer and sums the channels
/// into `mix`. The window and mix buffers are caller-owned and reused
/// frame-to-frame.
pub(crate) fn read_mixed_window(
    ring: &RingBuffer,
    window: &mut SampleWindow,
    mix: &mut [f32],
) -> Result<()> {
    let len = window.len().min(mix.len());
    ring.read_samples(window, len)?;

    mix.fill(0.0);
    for channel in window.channels() {
        for (acc, sample) in mix.iter_mut().zip(channel) {
            *acc += *sample;
        }
    }
    Ok(())
}

/// Window length a visualiser can actually read from `ring`.
pub(crate) fn window_len_for(ring: &RingBuffer) -> usize {
    RING_BUFFER_READ_SIZE.min(ring.capacity())
}

/// Compiles a visualiser's shader program, converting failure into the
/// keep-running-but-don't-draw policy: the engine stays consistent and the
/// compiler diagnostic is surfaced through [`Visualiser::status`].
pub(crate) fn compile_or_status(
    backend: &mut dyn RenderBackend,
    vertex_src: &str,
    fragment_src: &str,
) -> (bool, Option<String>) {
    match backend.compile_program(vertex_src, fragment_src) {
        Ok(()) => (true, None),
        Err(e) => {
            tracing::warn!(error = %e, "shader compilation failed; drawing suppressed");
            (false, Some(e.to_string()))
        }
    }
}

/// A grid of `x_resolution × z_resolution` vertices. The XZ lattice is
/// computed once; only the Y values change per frame, with older rows shifted
/// back to create the scrolling history effect.
#[derive(Debug)]
pub struct VertexGrid {
    x_resolution: usize,
    z_resolution: usize,
    xz: Vec<f32>,
    y: Vec<f32>,
}

impl VertexGrid {
    /// Builds a grid whose static lattice spans `width × depth` centred on
    /// the origin.
    pub fn new(x_resolution: usize, z_resolution: usize, width: f32, depth: f32) -> Self {
        assert!(x_resolution > 1 && z_resolution > 1, "grid needs a 2x2 lattice at least");

        let count = x_resolution * z_resolution;
        let x_start = -width / 2.0;
        let z_start = -depth / 2.0;
        let x_offset = width / (x_resolution - 1) as f32;
        let z_offset = depth / (z_resolution - 1) as f32;

        let mut xz = Vec::with_capacity(count * 2);
        for i in 0..count {
            let x_index = i % x_resolution;
            let z_index = i / x_resolution;
            xz.push(x_start + x_index as f32 * x_offset);
            xz.push(z_start + z_index as f32 * z_offset);
        }

        Self {
            x_resolution,
            z_resolution,
            xz,
            y: vec![0.0; count],
        }
    }

    pub fn x_resolution(&self) -> usize {
        self.x_resolution
    }

    pub fn z_resolution(&self) -> usize {
        self.z_resolution
    }

    pub fn vertex_count(&self) -> usize {
        self.x_resolution * self.z_resolution
    }

    /// Static XZ plane positions, two floats per vertex.
    pub fn xz_vertices(&self) -> &[f32] {
        &self.xz
    }

    /// Per-frame Y values, one float per vertex.
    pub fn y_vertices(&self) -> &[f32] {
        &self.y
    }

    /// Shifts every history row back one step; the oldest row falls off.
    pub fn scroll_back(&mut self) {
        for z in (1..self.z_resolution).rev() {
            let (src, dst) = (z - 1, z);
            for x in 0..self.x_resolution {
                self.y[dst * self.x_resolution + x] = self.y[src * self.x_resolution + x];
            }
        }
    }

    /// The newest row, written once per frame.
    pub fn front_row_mut(&mut self) -> &mut [f32] {
        &mut self.y[..self.x_resolution]
    }

    pub fn front_row(&self) -> &[f32] {
        &self.y[..self.x_resolution]
    }

    pub fn row(&self, z: usize) -> &[f32] {
        &self.y[z * self.x_resolution..(z + 1) * self.x_resolution]
    }
}

/// Perspective frustum matrix for the given surface size, column-major.
pub fn frustum_projection(width: u32, height: u32) -> [f32; 16] {
    let w = 1.0 / (0.5 + 0.1);
    let aspect = if width == 0 {
        1.0
    } else {
        height as f32 / width as f32
    };
    let h = w * aspect;
    frustum(-w, w, -h, h, 4.0, 30.0)
}

/// Fixed camera: uniform scale of two, pulled back along -Z.
pub fn default_view() -> [f32; 16] {
    let mut m = [0.0; 16];
    m[0] = 2.0;
    m[5] = 2.0;
    m[10] = 2.0;
    m[14] = -10.0;
    m[15] = 1.0;
    m
}

fn frustum(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> [f32; 16] {
    let mut m = [0.0; 16];
    m[0] = 2.0 * near / (right - left);
    m[5] = 2.0 * near / (top - bottom);
    m[8] = (right + left) / (right - left);
    m[9] = (top + bottom) / (top - bottom);
    m[10] = -(far + near) / (far - near);
    m[11] = -1.0;
    m[14] = -2.0 * far * near / (far - near);
    m
}

/// Identifies one of the three visualiser variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualiserKind {
    Oscilloscope2D,
    Oscilloscope3D,
    Spectrum,
}

/// Owns the three visualiser variants and keeps at most one of them active.
///
/// Selecting a variant stops whichever one was running and starts the one
/// that was asked for; per-frame dispatch checks that a selection exists and
/// is still active before touching it.
pub struct VisualiserSuite {
    oscilloscope_2d: Oscilloscope2D,
    oscilloscope_3d: Oscilloscope3D,
    spectrum: Spectrum,
    selected: Option<VisualiserKind>,
}

impl VisualiserSuite {
    pub fn new<F>(ring: Arc<RingBuffer>, config: &VisualiserConfig, mut make_backend: F) -> Self
    where
        F: FnMut() -> Box<dyn RenderBackend>,
    {
        Self {
            oscilloscope_2d: Oscilloscope2D::new(Arc::clone(&ring), config, make_backend()),
            oscilloscope_3d: Oscilloscope3D::new(Arc::clone(&ring), config, make_backend()),
            spectrum: Spectrum::new(ring, config, make_backend()),
            selected: None,
        }
    }

    pub fn selected(&self) -> Option<VisualiserKind> {
        self.selected
    }

    /// Activates the visualiser matching `kind`, stopping the others.
    pub fn select(&mut self, kind: VisualiserKind) {
        self.deselect();
        self.selected = Some(kind);
        self.visualiser_mut(kind).start();
    }

    /// Stops every visualiser, leaving nothing selected.
    pub fn deselect(&mut self) {
        self.oscilloscope_2d.stop();
        self.oscilloscope_3d.stop();
        self.spectrum.stop();
        self.selected = None;
    }

    /// Runs one frame of the active visualiser, if any.
    pub fn on_frame(&mut self) -> Result<()> {
        let Some(kind) = self.selected else {
            return Ok(());
        };
        let visualiser = self.visualiser_mut(kind);
        if !visualiser.is_active() {
            return Ok(());
        }
        visualiser.on_frame()
    }

    /// Forwards a surface resize to every variant.
    pub fn resized(&mut self, width: u32, height: u32) {
        self.oscilloscope_2d.resized(width, height);
        self.oscilloscope_3d.resized(width, height);
        self.spectrum.resized(width, height);
    }

    pub fn spectrum(&self) -> &Spectrum {
        &self.spectrum
    }

    pub fn oscilloscope_2d(&self) -> &Oscilloscope2D {
        &self.oscilloscope_2d
    }

    pub fn oscilloscope_3d(&self) -> &Oscilloscope3D {
        &self.oscilloscope_3d
    }

    /// Stop handle of the active visualiser, if any.
    pub fn active_stop_handle(&self) -> Option<StopHandle> {
        self.selected.map(|kind| match kind {
            VisualiserKind::Oscilloscope2D => self.oscilloscope_2d.stop_handle(),
            VisualiserKind::Oscilloscope3D => self.oscilloscope_3d.stop_handle(),
            VisualiserKind::Spectrum => self.spectrum.stop_handle(),
        })
    }

    fn visualiser_mut(&mut self, kind: VisualiserKind) -> &mut dyn Visualiser {
        match kind {
            VisualiserKind::Oscilloscope2D => &mut self.oscilloscope_2d,
            VisualiserKind::Oscilloscope3D => &mut self.oscilloscope_3d,
            VisualiserKind::Spectrum => &mut self.spectrum,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessBackend;

    #[test]
    fn grid_scrolls_history_back_one_row() {
        let mut grid = VertexGrid::new(4, 3, 3.0, 3.0);
        grid.front_row_mut().copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        grid.scroll_back();
        grid.front_row_mut().copy_from_slice(&[5.0, 6.0, 7.0, 8.0]);

        assert_eq!(grid.front_row(), &[5.0, 6.0, 7.0, 8.0]);
        assert_eq!(grid.row(1), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(grid.row(2), &[0.0; 4]);
    }

    #[test]
    fn grid_lattice_is_centred() {
        let grid = VertexGrid::new(5, 2, 3.0, 3.0);
        let xz = grid.xz_vertices();
        assert!((xz[0] + 1.5).abs() < 1e-6);
        // Last vertex of the first row sits at +width/2.
        assert!((xz[(4) * 2] - 1.5).abs() < 1e-6);
    }

    #[test]
    fn selecting_a_visualiser_stops_the_previous_one() {
        let ring = Arc::new(RingBuffer::new(2, 2048));
        let config = VisualiserConfig::default();
        let mut suite =
            VisualiserSuite::new(ring, &config, || Box::new(HeadlessBackend::new()));

        suite.select(VisualiserKind::Oscilloscope3D);
        assert!(suite.oscilloscope_3d().is_active());

        suite.select(VisualiserKind::Spectrum);
        assert!(suite.spectrum().is_active());
        assert!(!suite.oscilloscope_3d().is_active());
        assert_eq!(suite.selected(), Some(VisualiserKind::Spectrum));
    }

    #[test]
    fn frames_without_a_selection_are_no_ops() {
        let ring = Arc::new(RingBuffer::new(2, 2048));
        let config = VisualiserConfig::default();
        let mut suite =
            VisualiserSuite::new(ring, &config, || Box::new(HeadlessBackend::new()));

        suite.on_frame().unwrap();

        suite.select(VisualiserKind::Spectrum);
        suite.active_stop_handle().unwrap().stop();
        // Selection survives but the stopped visualiser is left untouched.
        suite.on_frame().unwrap();
        assert_eq!(suite.spectrum().frames_rendered(), 0);
    }
}
