use anyhow::Result;
use winit::event::WindowEvent;
use winit::window::WindowId;

use crate::device::Gpu;

use super::ctx::{FrameCtx, WindowCtx};

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by higher layers.
///
/// Call order: `on_gpu_ready` once, then `on_window_event`/`on_frame` while the
/// window lives, then `on_shutdown` exactly once, before the window and device
/// are dropped. Returning an error from `on_gpu_ready` or `on_frame` stops the
/// loop and makes `Runtime::run` return that error.
pub trait App {
    /// Called once after the window and GPU context exist.
    ///
    /// Allocate pipelines and buffers here.
    fn on_gpu_ready(&mut self, window: &WindowCtx<'_>, gpu: &mut Gpu<'_>) -> Result<()> {
        let _ = (window, gpu);
        Ok(())
    }

    /// Called for window events.
    fn on_window_event(&mut self, window_id: WindowId, event: &WindowEvent) -> AppControl {
        let _ = (window_id, event);
        AppControl::Continue
    }

    /// Called once per redraw.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<AppControl>;

    /// Called once before GPU objects are torn down, on success and failure paths.
    fn on_shutdown(&mut self) {}
}
