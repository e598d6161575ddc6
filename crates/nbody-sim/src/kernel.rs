use crate::error::{ComputeStatus, SimError, SimResult};

/// Threads per workgroup; must match `@workgroup_size` in `compute.wgsl`.
pub const WORKGROUP_SIZE: u32 = 256;

/// Compute entry point name.
pub const KERNEL_ENTRY: &str = "process_particles";

// Argument slots. Order is part of the kernel contract.
pub const SOURCE_SLOT: u32 = 0;
pub const COUNT_SLOT: u32 = 1;
pub const STEP_SIZE_SLOT: u32 = 2;
pub const DESTINATION_SLOT: u32 = 3;

/// Recorded arguments of the particle kernel.
///
/// Setters only record; nothing is dispatched until the orchestrator hands
/// [`KernelBinding::args`] to a backend. Each setter owns one fixed slot and
/// a second call before dispatch replaces the first.
#[derive(Debug, Clone)]
pub struct KernelBinding<B> {
    source: Option<B>,
    particle_count: Option<u32>,
    step_size: Option<f32>,
    destination: Option<B>,
}

impl<B> Default for KernelBinding<B> {
    fn default() -> Self {
        Self {
            source: None,
            particle_count: None,
            step_size: None,
            destination: None,
        }
    }
}

impl<B: Clone> KernelBinding<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot 0.
    pub fn set_particle_buffer(&mut self, buffer: &B) {
        self.source = Some(buffer.clone());
    }

    /// Slot 1.
    pub fn set_particle_count(&mut self, count: u32) {
        self.particle_count = Some(count);
    }

    /// Slot 2.
    pub fn set_step_size(&mut self, dt: f32) {
        self.step_size = Some(dt);
    }

    /// Slot 3.
    pub fn set_destination_buffer(&mut self, buffer: &B) {
        self.destination = Some(buffer.clone());
    }

    pub fn particle_count(&self) -> Option<u32> {
        self.particle_count
    }

    pub fn step_size(&self) -> Option<f32> {
        self.step_size
    }

    /// Validates that every slot is bound and borrows the arguments.
    pub fn args(&self) -> SimResult<KernelArgs<'_, B>> {
        let source = self.source.as_ref().ok_or_else(|| unbound(SOURCE_SLOT, "source"))?;
        let particle_count = self
            .particle_count
            .ok_or_else(|| unbound(COUNT_SLOT, "particle_count"))?;
        let step_size = self
            .step_size
            .ok_or_else(|| unbound(STEP_SIZE_SLOT, "step_size"))?;
        let destination = self
            .destination
            .as_ref()
            .ok_or_else(|| unbound(DESTINATION_SLOT, "destination"))?;

        if !step_size.is_finite() {
            return Err(SimError::compute(
                ComputeStatus::InvalidArgument,
                format!("slot {STEP_SIZE_SLOT} (step_size) is not finite: {step_size}"),
            ));
        }

        Ok(KernelArgs {
            source,
            particle_count,
            step_size,
            destination,
        })
    }
}

fn unbound(slot: u32, name: &str) -> SimError {
    SimError::compute(
        ComputeStatus::UnboundArgument,
        format!("kernel argument slot {slot} ({name}) is not bound"),
    )
}

/// Fully bound kernel arguments, borrowed from a [`KernelBinding`].
#[derive(Debug)]
pub struct KernelArgs<'a, B> {
    pub source: &'a B,
    pub particle_count: u32,
    pub step_size: f32,
    pub destination: &'a B,
}

impl<B> KernelArgs<'_, B> {
    /// 1-D workgroup count covering every particle.
    pub fn workgroups(&self, workgroup_size: u32) -> u32 {
        self.particle_count.div_ceil(workgroup_size.max(1))
    }
}
