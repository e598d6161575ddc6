//! Time subsystem.
//!
//! One `FrameClock` per window; `tick()` once per redraw yields a `FrameTime`
//! carrying the frame index and a smoothed FPS figure for diagnostics.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
