//! GPU device + surface management.
//!
//! This module is responsible for:
//! - probing adapters before any window exists
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swapchain)
//! - acquiring, submitting and presenting frames

mod context;
mod frame;
mod init;
mod probe;
mod surface;

pub use context::Gpu;
pub use frame::GpuFrame;
pub use init::{AdapterChoice, GpuInit};
pub use surface::SurfaceErrorAction;
pub use probe::{
    probe_adapters, select_adapter, AdapterCaps, AdapterRequirements, ProbedAdapter,
};
