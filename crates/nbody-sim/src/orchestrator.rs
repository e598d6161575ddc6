use std::time::Duration;

use crate::backend::{FrameStart, SimBackend};
use crate::buffer::DoubleBuffer;
use crate::config::SimConfig;
use crate::error::{SetupFailure, SimError, SimResult};
use crate::kernel::KernelBinding;
use crate::particle::Particle;
use crate::setup::InteropMode;

/// Where the current frame stands. Every completed frame walks
/// `Idle -> Cleared -> Drawn -> Computed -> Presented -> Idle`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FramePhase {
    Idle,
    Cleared,
    Drawn,
    Computed,
    Presented,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameOutcome {
    /// Both pairs were swapped; `generation` is now displayable.
    Completed { generation: u64 },
    /// No display target this frame; nothing ran and nothing swapped.
    Skipped,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct SimStats {
    pub frames: u64,
    pub skipped: u64,
    pub dispatches: u64,
    pub transfers: u64,
}

/// Drives the compute/draw frame sequence over two phase-locked double buffers.
///
/// The compute pair holds the kernel's source (front) and destination
/// (back). The display pair holds what the draw call reads (front) and where
/// the next generation lands (back). In shared mode both pairs hold the same
/// handles. After each completed frame both pairs have swapped exactly once.
#[derive(Debug)]
pub struct Simulation<C, D> {
    compute: DoubleBuffer<C>,
    display: DoubleBuffer<D>,
    kernel: KernelBinding<C>,
    mode: InteropMode,
    particle_count: u32,
    workgroup_size: u32,
    wait_timeout: Option<Duration>,
    clear_color: wgpu::Color,
    phase: FramePhase,
    stats: SimStats,
    halted: bool,
}

impl<C: Clone, D> Simulation<C, D> {
    /// Allocates both pairs, each slot initialised with `particles`.
    pub fn new<B>(
        backend: &mut B,
        config: &SimConfig,
        mode: InteropMode,
        particles: &[Particle],
    ) -> SimResult<Self>
    where
        B: SimBackend<ComputeBuffer = C, DisplayBuffer = D>,
    {
        let particle_count = u32::try_from(particles.len()).map_err(|_| {
            SimError::setup(
                SetupFailure::InvalidConfig,
                format!("{} particles exceed the u32 kernel count", particles.len()),
            )
        })?;

        let compute_a = backend.create_compute_buffer("particles.compute.0", particles, mode)?;
        let compute_b = backend.create_compute_buffer("particles.compute.1", particles, mode)?;

        let (display_a, display_b) = match mode {
            InteropMode::Shared => (
                backend.create_display_buffer("particles.display.0", particles, Some(&compute_a))?,
                backend.create_display_buffer("particles.display.1", particles, Some(&compute_b))?,
            ),
            InteropMode::Copy => (
                backend.create_display_buffer("particles.display.0", particles, None)?,
                backend.create_display_buffer("particles.display.1", particles, None)?,
            ),
        };

        let mut kernel = KernelBinding::new();
        kernel.set_particle_count(particle_count);
        kernel.set_step_size(config.step_size);

        log::debug!(
            "simulation: {particle_count} particles, step {}, {:?} buffers",
            config.step_size,
            mode
        );

        Ok(Self {
            compute: DoubleBuffer::new(compute_a, compute_b),
            display: DoubleBuffer::new(display_a, display_b),
            kernel,
            mode,
            particle_count,
            workgroup_size: config.workgroup_size,
            wait_timeout: config.wait_timeout,
            clear_color: config.clear_color,
            phase: FramePhase::Idle,
            stats: SimStats::default(),
            halted: false,
        })
    }

    /// Runs one frame: clear, draw the front generation, compute the next
    /// into the back buffers, present, swap.
    ///
    /// Any error halts the simulation; later calls return
    /// [`SimError::Halted`] without touching the backend.
    pub fn frame<B>(&mut self, backend: &mut B) -> SimResult<FrameOutcome>
    where
        B: SimBackend<ComputeBuffer = C, DisplayBuffer = D>,
    {
        if self.halted {
            return Err(SimError::Halted {
                completed_frames: self.stats.frames,
            });
        }

        self.run_frame(backend).inspect_err(|_| {
            self.halted = true;
        })
    }

    fn run_frame<B>(&mut self, backend: &mut B) -> SimResult<FrameOutcome>
    where
        B: SimBackend<ComputeBuffer = C, DisplayBuffer = D>,
    {
        debug_assert_eq!(self.phase, FramePhase::Idle);
        debug_assert!(self.phase_locked());

        if backend.begin_frame()? == FrameStart::Skip {
            self.stats.skipped += 1;
            return Ok(FrameOutcome::Skipped);
        }

        let n = self.particle_count;

        backend.clear(self.clear_color)?;
        self.phase = FramePhase::Cleared;

        if n > 0 {
            backend.draw_particles(self.display.front(), n)?;
        }
        self.phase = FramePhase::Drawn;

        if n > 0 {
            self.kernel.set_particle_buffer(self.compute.front());
            self.kernel.set_destination_buffer(self.compute.back());
            let args = self.kernel.args()?;
            let workgroups = args.workgroups(self.workgroup_size);
            backend.dispatch(&args, workgroups)?;
            self.stats.dispatches += 1;
        }
        backend.wait_idle(self.wait_timeout)?;
        self.phase = FramePhase::Computed;

        if self.mode.needs_transfer() && n > 0 {
            backend.transfer(
                self.compute.back(),
                self.display.back(),
                Particle::buffer_size(n),
            )?;
            self.stats.transfers += 1;
        }

        backend.present()?;
        self.phase = FramePhase::Presented;

        self.compute.swap();
        self.display.swap();
        self.phase = FramePhase::Idle;
        self.stats.frames += 1;

        Ok(FrameOutcome::Completed {
            generation: self.compute.swap_count(),
        })
    }

    /// Re-sets the kernel's step size; takes effect at the next dispatch.
    pub fn set_step_size(&mut self, dt: f32) {
        self.kernel.set_step_size(dt);
    }

    /// Both pairs have swapped the same number of times.
    pub fn phase_locked(&self) -> bool {
        self.compute.swap_count() == self.display.swap_count()
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn stats(&self) -> SimStats {
        self.stats
    }

    pub fn mode(&self) -> InteropMode {
        self.mode
    }

    pub fn particle_count(&self) -> u32 {
        self.particle_count
    }

    pub fn compute_buffers(&self) -> &DoubleBuffer<C> {
        &self.compute
    }

    pub fn display_buffers(&self) -> &DoubleBuffer<D> {
        &self.display
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{Call, Handle, RecordingBackend};
    use crate::error::ComputeStatus;
    use crate::particle::seed_particles;

    type TestSim = Simulation<Handle, Handle>;

    fn sim(backend: &mut RecordingBackend, n: u32, mode: InteropMode) -> TestSim {
        let config = SimConfig::new(n, 1e-3);
        Simulation::new(backend, &config, mode, &seed_particles(n, 1)).unwrap()
    }

    fn drift(p: &Particle, dt: f32) -> Particle {
        let mut next = *p;
        next.position[0] += p.velocity[0] * dt;
        next.position[1] += p.velocity[1] * dt;
        next
    }

    #[test]
    fn empty_simulation_completes_a_frame() {
        let mut backend = RecordingBackend::new();
        let mut s = sim(&mut backend, 0, InteropMode::Shared);

        let outcome = s.frame(&mut backend).unwrap();

        assert_eq!(outcome, FrameOutcome::Completed { generation: 1 });
        assert_eq!(backend.count(|c| matches!(c, Call::Draw { .. })), 0);
        assert_eq!(backend.count(|c| matches!(c, Call::Dispatch { .. })), 0);
        assert_eq!(backend.count(|c| *c == Call::Present), 1);
        assert!(s.phase_locked());
    }

    #[test]
    fn identity_kernel_keeps_initial_particles_on_screen() {
        for mode in [InteropMode::Shared, InteropMode::Copy] {
            let mut backend = RecordingBackend::new();
            let initial = seed_particles(1000, 1);
            let mut s = sim(&mut backend, 1000, mode);

            for _ in 0..10 {
                s.frame(&mut backend).unwrap();
            }

            let shown = backend.contents(*s.display_buffers().front());
            assert_eq!(shown, initial.as_slice(), "{mode:?}");
            assert_eq!(s.stats().dispatches, 10);
            assert_eq!(backend.count(|c| matches!(c, Call::Dispatch { .. })), 10);
        }
    }

    #[test]
    fn frame_order_is_clear_draw_dispatch_wait_present() {
        let mut backend = RecordingBackend::new();
        let mut s = sim(&mut backend, 300, InteropMode::Shared);
        s.frame(&mut backend).unwrap();

        let (front, back) = (Handle(0), Handle(1));
        assert_eq!(
            backend.calls,
            vec![
                Call::Begin,
                Call::Clear,
                Call::Draw {
                    buffer: front,
                    count: 300
                },
                Call::Dispatch {
                    source: front,
                    destination: back,
                    count: 300,
                    step_size: 1e-3,
                    workgroups: 2,
                },
                Call::Wait,
                Call::Present,
            ]
        );
    }

    #[test]
    fn buffers_ping_pong_between_frames() {
        let mut backend = RecordingBackend::new();
        let mut s = sim(&mut backend, 16, InteropMode::Shared);
        s.frame(&mut backend).unwrap();
        s.frame(&mut backend).unwrap();

        let dispatches: Vec<(Handle, Handle)> = backend
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Dispatch {
                    source,
                    destination,
                    ..
                } => Some((*source, *destination)),
                _ => None,
            })
            .collect();
        assert_eq!(
            dispatches,
            vec![(Handle(0), Handle(1)), (Handle(1), Handle(0))]
        );
    }

    #[test]
    fn frame_draws_previous_generation() {
        let mut backend = RecordingBackend::new();
        backend.kernel = drift;
        let initial = seed_particles(8, 1);
        let mut s = sim(&mut backend, 8, InteropMode::Copy);

        s.frame(&mut backend).unwrap();
        let gen1 = backend.contents(*s.display_buffers().front()).to_vec();
        assert_ne!(gen1, initial);
        assert_eq!(gen1[0], drift(&initial[0], 1e-3));

        // Frame 2 draws generation 1 while computing generation 2.
        s.frame(&mut backend).unwrap();
        let draws: Vec<Handle> = backend
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Draw { buffer, .. } => Some(*buffer),
                _ => None,
            })
            .collect();
        assert_eq!(backend.contents(draws[1]), gen1.as_slice());
    }

    #[test]
    fn wait_failure_halts_the_simulation() {
        let mut backend = RecordingBackend::new();
        backend.fail_wait_on = Some(5);
        let mut s = sim(&mut backend, 1000, InteropMode::Shared);

        for _ in 0..4 {
            s.frame(&mut backend).unwrap();
        }
        let err = s.frame(&mut backend).unwrap_err();
        assert_eq!(err.status(), Some(ComputeStatus::WaitFailed));
        assert!(s.is_halted());

        let calls_before = backend.calls.len();
        for _ in 0..3 {
            let err = s.frame(&mut backend).unwrap_err();
            assert!(matches!(err, SimError::Halted { completed_frames: 4 }));
        }
        assert_eq!(backend.calls.len(), calls_before);
        assert_eq!(s.stats().dispatches, 5);
        assert_eq!(s.stats().frames, 4);
        assert!(s.phase_locked());
    }

    #[test]
    fn lost_device_on_dispatch_halts_with_its_status() {
        let mut backend = RecordingBackend::new();
        backend.fail_dispatch = Some((3, ComputeStatus::DeviceLost));
        let mut s = sim(&mut backend, 100, InteropMode::Copy);

        s.frame(&mut backend).unwrap();
        s.frame(&mut backend).unwrap();
        let err = s.frame(&mut backend).unwrap_err();
        assert_eq!(err.status(), Some(ComputeStatus::DeviceLost));
        assert_eq!(err.exit_code(), 4);
        assert!(s.is_halted());
        assert_eq!(s.phase(), FramePhase::Drawn);

        let waits = backend.count(|c| *c == Call::Wait);
        assert!(matches!(
            s.frame(&mut backend).unwrap_err(),
            SimError::Halted { completed_frames: 2 }
        ));
        assert_eq!(backend.count(|c| *c == Call::Wait), waits);
        assert_eq!(s.stats().dispatches, 2);
        assert!(s.phase_locked());
    }

    #[test]
    fn compute_buffers_are_created_for_the_interop_mode() {
        for mode in [InteropMode::Shared, InteropMode::Copy] {
            let mut backend = RecordingBackend::new();
            sim(&mut backend, 4, mode);
            assert_eq!(backend.compute_modes, vec![mode, mode]);
        }
    }

    #[test]
    fn phase_lock_holds_across_skipped_frames() {
        let mut backend = RecordingBackend::new();
        backend.skip_frames = [2, 3, 7].into_iter().collect();
        let mut s = sim(&mut backend, 64, InteropMode::Copy);

        let mut outcomes = Vec::new();
        for _ in 0..8 {
            outcomes.push(s.frame(&mut backend).unwrap());
            assert!(s.phase_locked());
            assert_eq!(s.phase(), FramePhase::Idle);
        }

        assert_eq!(
            outcomes.iter().filter(|o| **o == FrameOutcome::Skipped).count(),
            3
        );
        assert_eq!(s.stats().frames, 5);
        assert_eq!(s.stats().skipped, 3);
        assert_eq!(s.compute_buffers().swap_count(), 5);
        assert_eq!(backend.count(|c| matches!(c, Call::Dispatch { .. })), 5);
    }

    #[test]
    fn copy_mode_transfers_every_frame() {
        let mut backend = RecordingBackend::new();
        let mut s = sim(&mut backend, 10, InteropMode::Copy);
        s.frame(&mut backend).unwrap();
        s.frame(&mut backend).unwrap();

        assert_eq!(s.stats().transfers, 2);
        assert!(backend.calls.contains(&Call::Transfer {
            src: Handle(1),
            dst: Handle(3),
            bytes: 320,
        }));
    }

    #[test]
    fn shared_mode_aliases_and_never_transfers() {
        let mut backend = RecordingBackend::new();
        let mut s = sim(&mut backend, 10, InteropMode::Shared);
        assert_eq!(backend.storage.len(), 2);
        assert_eq!(s.compute_buffers().front(), s.display_buffers().front());
        assert_eq!(s.compute_buffers().back(), s.display_buffers().back());

        s.frame(&mut backend).unwrap();
        assert_eq!(s.stats().transfers, 0);
        assert_eq!(s.compute_buffers().front(), s.display_buffers().front());
    }

    #[test]
    fn second_step_size_wins() {
        let mut backend = RecordingBackend::new();
        let mut s = sim(&mut backend, 4, InteropMode::Shared);
        s.set_step_size(0.5);
        s.set_step_size(0.125);
        s.frame(&mut backend).unwrap();

        assert!(backend.calls.iter().any(|c| matches!(
            c,
            Call::Dispatch { step_size, .. } if *step_size == 0.125
        )));
    }

    #[test]
    fn invalid_step_size_is_a_compute_error() {
        let mut backend = RecordingBackend::new();
        let mut s = sim(&mut backend, 4, InteropMode::Shared);
        s.set_step_size(f32::INFINITY);

        let err = s.frame(&mut backend).unwrap_err();
        assert_eq!(err.status(), Some(ComputeStatus::InvalidArgument));
        assert!(s.is_halted());
        assert_eq!(s.phase(), FramePhase::Drawn);
    }
}
