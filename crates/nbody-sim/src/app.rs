use anyhow::{Context, Result};
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowId;

use nbody_engine::core::{App, AppControl, FrameCtx, WindowCtx};
use nbody_engine::device::{probe_adapters, Gpu, GpuInit, ProbedAdapter};
use nbody_engine::window::{Runtime, RuntimeConfig};

use crate::config::SimConfig;
use crate::gpu::{GpuSimulation, ParticlePipelines, WgpuBackend};
use crate::orchestrator::{FrameOutcome, Simulation};
use crate::particle::seed_particles;
use crate::setup::{self, InteropMode};

/// GPU objects that exist only while the window does.
struct GpuState {
    pipelines: ParticlePipelines,
    sim: GpuSimulation,
}

/// Engine app driving one [`GpuSimulation`] per redraw.
pub struct NBodyApp {
    config: SimConfig,
    mode: InteropMode,
    state: Option<GpuState>,
}

impl NBodyApp {
    pub fn new(config: SimConfig, mode: InteropMode) -> Self {
        Self {
            config,
            mode,
            state: None,
        }
    }

    fn log_stats(&self, fps: f32) {
        if let Some(state) = &self.state {
            let stats = state.sim.stats();
            log::info!(
                "frame {}: {fps:.1} fps, {} dispatches, {} transfers, {} skipped",
                stats.frames,
                stats.dispatches,
                stats.transfers,
                stats.skipped
            );
        }
    }
}

impl App for NBodyApp {
    fn on_gpu_ready(&mut self, window: &WindowCtx<'_>, gpu: &mut Gpu<'_>) -> Result<()> {
        let mut pipelines = ParticlePipelines::new(gpu.device(), gpu.surface_format())?;

        let particles = seed_particles(self.config.particle_count, self.config.seed);
        let mut backend = WgpuBackend::new(gpu, &mut pipelines);
        let sim = Simulation::new(&mut backend, &self.config, self.mode, &particles)
            .context("failed to allocate particle buffers")?;

        let (w, h) = window.physical_size();
        log::info!(
            "simulating {} particles at step {} on {} ({:?} buffers, {w}x{h})",
            sim.particle_count(),
            self.config.step_size,
            gpu.adapter_info().name,
            sim.mode()
        );

        self.state = Some(GpuState { pipelines, sim });
        Ok(())
    }

    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.logical_key == Key::Named(NamedKey::Escape) =>
            {
                AppControl::Exit
            }
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<AppControl> {
        let Some(state) = self.state.as_mut() else {
            return Ok(AppControl::Continue);
        };

        let mut backend =
            WgpuBackend::new(&mut *ctx.gpu, &mut state.pipelines).with_window(&ctx.window);
        let outcome = state.sim.frame(&mut backend)?;

        let interval = self.config.stats_interval;
        if let FrameOutcome::Completed { generation } = outcome {
            if interval > 0 && generation % interval == 0 {
                self.log_stats(ctx.time.fps);
            }
        }

        Ok(AppControl::Continue)
    }

    fn on_shutdown(&mut self) {
        if let Some(state) = self.state.take() {
            let stats = state.sim.stats();
            log::info!(
                "shutdown after {} frames ({} skipped, halted: {})",
                stats.frames,
                stats.skipped,
                state.sim.is_halted()
            );
        }
    }
}

/// Selects an adapter, then opens the window and runs until it closes.
///
/// No window is created when no adapter can run the kernel.
pub fn run(config: SimConfig) -> Result<()> {
    config.validate()?;

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });
    let candidates = pollster::block_on(probe_adapters(&instance));
    let req = setup::requirements_for(&config);

    setup::launch(candidates, &req, |chosen: ProbedAdapter| {
        let mode = InteropMode::resolve(config.transfer);
        log::info!("interop mode: {mode:?}");

        let gpu_init = GpuInit {
            required_limits: req.device_limits(),
            adapter: Some(chosen.into_choice(instance)),
            ..GpuInit::default()
        };
        let runtime = RuntimeConfig {
            title: config.title.clone(),
            initial_size: LogicalSize::new(f64::from(config.width), f64::from(config.height)),
        };

        Runtime::run(runtime, gpu_init, NBodyApp::new(config, mode))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_without_gpu_state_is_a_no_op() {
        let mut app = NBodyApp::new(SimConfig::default(), InteropMode::Shared);
        app.on_shutdown();
        app.on_shutdown();
        assert!(app.state.is_none());
    }

    #[test]
    fn close_request_is_left_to_the_runtime() {
        let mut app = NBodyApp::new(SimConfig::default(), InteropMode::Copy);
        assert_eq!(
            app.on_window_event(WindowId::dummy(), &WindowEvent::CloseRequested),
            AppControl::Continue
        );
    }
}
