use winit::window::{Window, WindowId};

use crate::device::Gpu;
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id:     WindowId,
    pub window: &'a Window,
}

impl<'a> WindowCtx<'a> {
    /// Returns the physical window size as `(width, height)`.
    pub fn physical_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    /// Signals that the frame is about to be presented.
    pub fn pre_present_notify(&self) {
        self.window.pre_present_notify();
    }
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window:  WindowCtx<'a>,
    pub gpu:     &'a mut Gpu<'w>,
    pub time:    FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}
