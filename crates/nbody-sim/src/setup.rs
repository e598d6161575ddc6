use nbody_engine::device::{AdapterCaps, AdapterRequirements, select_adapter};

use crate::config::{SimConfig, TransferMode};
use crate::error::{SetupFailure, SimError, SimResult};
use crate::particle::Particle;

/// How the display pair relates to the compute pair.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum InteropMode {
    /// Display buffers alias the compute buffers; no transfer step.
    Shared,
    /// Display buffers are separate and filled by a device-side copy.
    Copy,
}

impl InteropMode {
    /// Any adapter that passed selection can bind one buffer as both
    /// storage and vertex input, so `Auto` means shared.
    pub fn resolve(transfer: TransferMode) -> Self {
        match transfer {
            TransferMode::Auto | TransferMode::Shared => InteropMode::Shared,
            TransferMode::Copy => InteropMode::Copy,
        }
    }

    pub fn needs_transfer(self) -> bool {
        self == InteropMode::Copy
    }
}

/// Adapter capabilities the simulation needs for `config`.
pub fn requirements_for(config: &SimConfig) -> AdapterRequirements {
    AdapterRequirements {
        compute_shaders: true,
        min_storage_buffer_binding_size: Particle::buffer_size(config.particle_count)
            .max(Particle::SIZE),
        workgroup_size: config.workgroup_size,
    }
}

/// Picks the best candidate for `req`, or explains why none qualifies.
pub fn choose_adapter<P>(mut candidates: Vec<P>, req: &AdapterRequirements) -> SimResult<P>
where
    P: AsRef<AdapterCaps>,
{
    let caps: Vec<AdapterCaps> = candidates.iter().map(|c| c.as_ref().clone()).collect();

    match select_adapter(&caps, req) {
        Some(index) => {
            let chosen = candidates.swap_remove(index);
            let c = chosen.as_ref();
            log::info!(
                "selected adapter {:?} ({:?}, {:?})",
                c.name,
                c.backend,
                c.device_type
            );
            Ok(chosen)
        }
        None => {
            let reason = if caps.is_empty() {
                "no adapters found".to_string()
            } else {
                caps.iter()
                    .map(|c| {
                        format!(
                            "{} ({:?}) lacks {}",
                            c.name,
                            c.backend,
                            c.missing(req).join(", ")
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("; ")
            };
            Err(SimError::setup(
                SetupFailure::NoInteropDevice,
                format!("no adapter can run the particle kernel: {reason}"),
            ))
        }
    }
}

/// Runs adapter selection, then `open_display` with the chosen candidate.
///
/// When selection fails `open_display` is never called, so no window or
/// display resource exists on the failure path.
pub fn launch<P, T, E, F>(candidates: Vec<P>, req: &AdapterRequirements, open_display: F) -> Result<T, E>
where
    P: AsRef<AdapterCaps>,
    E: From<SimError>,
    F: FnOnce(P) -> Result<T, E>,
{
    let chosen = choose_adapter(candidates, req)?;
    open_display(chosen)
}
