use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App as CoreApp, AppControl, FrameCtx, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::time::{FrameClock, FrameTime};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "nbody".to_string(),
            initial_size: LogicalSize::new(640.0, 480.0),
        }
    }
}

/// Runtime context passed to the application.
///
/// Requests are applied after the current callback returns.
#[derive(Debug, Default)]
pub struct RuntimeCtx {
    exit: bool,
}

impl RuntimeCtx {
    pub fn exit(&mut self) {
        self.exit = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window, drives `app` until the window closes, and tears down.
    ///
    /// Returns the first error raised by the app or by GPU setup.
    pub fn run<A>(initial: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: 'static + CoreApp,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(initial, gpu_init, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        state.finish()
    }
}

#[self_referencing]
struct WindowEntry {
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState<A>
where
    A: CoreApp + 'static,
{
    initial: RuntimeConfig,
    gpu_init: Option<GpuInit>,
    app: A,

    window: Option<WindowEntry>,
    exit_requested: bool,
    shut_down: bool,
    fatal: Option<anyhow::Error>,
}

impl<A> AppState<A>
where
    A: CoreApp + 'static,
{
    fn new(initial: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            initial,
            gpu_init: Some(gpu_init),
            app,
            window: None,
            exit_requested: false,
            shut_down: false,
            fatal: None,
        }
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let gpu_init = self
            .gpu_init
            .take()
            .context("GPU initialization parameters already consumed")?;

        let attrs = Window::default_attributes()
            .with_title(self.initial.title.clone())
            .with_inner_size(self.initial.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let mut entry = WindowEntryTryBuilder {
            clock: FrameClock::default(),
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed for window")?;

        let app = &mut self.app;
        entry
            .with_mut(|fields| {
                let ctx = WindowCtx {
                    id: fields.window.id(),
                    window: fields.window,
                };
                app.on_gpu_ready(&ctx, fields.gpu)
            })
            .context("application setup failed")?;

        entry.with_window(|w| w.request_redraw());
        self.window = Some(entry);
        Ok(())
    }

    /// Releases app resources, then the GPU context, then the window.
    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if !self.shut_down {
            self.shut_down = true;
            self.app.on_shutdown();
            self.window = None;
        }
        self.exit_requested = true;
        event_loop.exit();
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        if self.fatal.is_none() {
            self.fatal = Some(err);
        }
        self.shutdown(event_loop);
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId) {
        let mut runtime_ctx = RuntimeCtx::default();

        let (app, window) = (&mut self.app, &mut self.window);
        let Some(entry) = window.as_mut() else {
            return;
        };

        let result = entry.with_mut(|fields| {
            let time: FrameTime = fields.clock.tick();
            let mut ctx = FrameCtx {
                window: WindowCtx {
                    id: window_id,
                    window: fields.window,
                },
                gpu: fields.gpu,
                time,
                runtime: &mut runtime_ctx,
            };
            app.on_frame(&mut ctx)
        });

        match result {
            Ok(AppControl::Continue) => {}
            Ok(AppControl::Exit) => runtime_ctx.exit(),
            Err(err) => {
                self.fail(event_loop, err);
                return;
            }
        }

        if runtime_ctx.exit_requested() {
            self.shutdown(event_loop);
        }
    }

    fn finish(mut self) -> Result<()> {
        if !self.shut_down {
            self.shut_down = true;
            self.app.on_shutdown();
            self.window = None;
        }
        match self.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: CoreApp + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.shut_down {
            return;
        }

        if let Err(e) = self.create_window_entry(event_loop) {
            self.fail(event_loop, e.context("failed to create initial window"));
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // The simulation advances every frame; keep redrawing.
        if let Some(entry) = self.window.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        let Some(entry) = self.window.as_mut() else {
            return;
        };
        if entry.with_window(|w| w.id()) != window_id {
            return;
        }

        if self.app.on_window_event(window_id, &event) == AppControl::Exit {
            self.shutdown(event_loop);
            return;
        }

        match &event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),

            WindowEvent::Resized(new_size) => {
                entry.with_gpu_mut(|gpu| gpu.resize(*new_size));
                entry.with_window(|w| w.request_redraw());
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let new_size = entry.with_window(|w| w.inner_size());
                entry.with_gpu_mut(|gpu| gpu.resize(new_size));
                entry.with_window(|w| w.request_redraw());
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop, window_id),

            _ => {}
        }
    }
}
