//! Double-buffered compute/render particle simulation.
//!
//! A compute kernel writes the next particle generation into one buffer
//! while the previous generation is drawn from the other; after each frame
//! the two swap roles. [`orchestrator::Simulation`] sequences a frame over
//! any [`backend::SimBackend`]; [`gpu::WgpuBackend`] is the wgpu one.

pub mod app;
pub mod backend;
pub mod buffer;
pub mod config;
pub mod error;
pub mod gpu;
pub mod kernel;
pub mod orchestrator;
pub mod particle;
pub mod setup;

pub use app::{run, NBodyApp};
pub use buffer::DoubleBuffer;
pub use config::{SimConfig, TransferMode};
pub use error::{ComputeStatus, SetupFailure, SimError, SimResult};
pub use particle::Particle;
