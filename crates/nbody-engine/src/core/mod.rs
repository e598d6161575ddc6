//! Core engine-facing contracts.
//!
//! This module defines the stable interface between the runtime (platform loop)
//! and the simulation layer, and the per-frame context handed across it.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
