//! N-body engine crate.
//!
//! This crate owns the platform + GPU runtime pieces used by the simulation:
//! adapter probing, the wgpu device and surface, the winit window loop, frame
//! timing and logger setup.

pub mod core;
pub mod device;
pub mod logging;
pub mod time;
pub mod window;
