//! wgpu implementation of the simulation backend.
//!
//! Compute and display buffers are plain `wgpu::Buffer`s on the one device.
//! In shared mode a single allocation carries `STORAGE | VERTEX` usage and is
//! handed to both pairs.

mod backend;
mod pipelines;

pub use backend::WgpuBackend;
pub use pipelines::ParticlePipelines;

use crate::orchestrator::Simulation;

/// Orchestrator over wgpu buffers.
pub type GpuSimulation = Simulation<wgpu::Buffer, wgpu::Buffer>;
