use std::time::Duration;

use crate::error::SimResult;
use crate::kernel::KernelArgs;
use crate::particle::Particle;
use crate::setup::InteropMode;

/// Result of trying to start a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameStart {
    /// A display target is acquired; the frame may proceed.
    Ready,
    /// The display target is transiently unavailable; skip this frame.
    Skip,
}

/// Device operations the orchestrator sequences.
///
/// The orchestrator decides *what* happens in which order; a backend decides
/// *how* on a particular device. Calls arrive in frame order:
/// `begin_frame`, `clear`, `draw_particles`, `dispatch`, `wait_idle`,
/// `transfer`, `present`.
pub trait SimBackend {
    /// Kernel-visible particle storage.
    type ComputeBuffer: Clone;
    /// Vertex source for the draw call.
    type DisplayBuffer;

    /// In `InteropMode::Shared` the buffer must also be usable as vertex input.
    fn create_compute_buffer(
        &mut self,
        label: &str,
        particles: &[Particle],
        mode: InteropMode,
    ) -> SimResult<Self::ComputeBuffer>;

    /// With `shared`, the display buffer must alias that compute buffer
    /// instead of allocating new storage.
    fn create_display_buffer(
        &mut self,
        label: &str,
        particles: &[Particle],
        shared: Option<&Self::ComputeBuffer>,
    ) -> SimResult<Self::DisplayBuffer>;

    fn begin_frame(&mut self) -> SimResult<FrameStart>;

    fn clear(&mut self, color: wgpu::Color) -> SimResult<()>;

    fn draw_particles(&mut self, buffer: &Self::DisplayBuffer, count: u32) -> SimResult<()>;

    fn dispatch(
        &mut self,
        args: &KernelArgs<'_, Self::ComputeBuffer>,
        workgroups: u32,
    ) -> SimResult<()>;

    /// Blocks until all submitted work completes, or `timeout` elapses.
    fn wait_idle(&mut self, timeout: Option<Duration>) -> SimResult<()>;

    fn transfer(
        &mut self,
        src: &Self::ComputeBuffer,
        dst: &Self::DisplayBuffer,
        bytes: u64,
    ) -> SimResult<()>;

    fn present(&mut self) -> SimResult<()>;
}
