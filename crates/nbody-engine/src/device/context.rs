use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::surface;
use super::{AdapterChoice, GpuFrame, GpuInit, SurfaceErrorAction};

/// Owns wgpu core objects and the surface configuration.
///
/// This type is the low-level rendering context:
/// - creates and stores Adapter/Device/Queue
/// - creates and configures the Surface (swapchain)
/// - hands out encoders, submits them, and presents acquired frames
///
/// Compute and render work share the one device and queue, so buffers created
/// here can be bound by both pipelines without a host copy.
pub struct Gpu<'w> {
    /// Surface bound to the window.
    ///
    /// Surface lifetime is tied to the window; the runtime keeps the window alive
    /// for as long as the `Gpu` exists.
    surface: wgpu::Surface<'w>,

    /// Selected adapter.
    adapter: wgpu::Adapter,

    /// Logical device.
    device: wgpu::Device,

    /// Command queue.
    queue: wgpu::Queue,

    /// Active surface configuration.
    config: wgpu::SurfaceConfiguration,

    /// Current drawable size in physical pixels.
    size: PhysicalSize<u32>,

    /// Set once by the device-lost callback.
    lost: Arc<OnceLock<String>>,

    /// First error raised outside any error scope.
    uncaptured: Arc<OnceLock<String>>,
}

impl<'w> Gpu<'w> {
    /// Creates a GPU context bound to a window.
    ///
    /// When `init.adapter` carries a preselected adapter, it must be able to
    /// present to `window`; otherwise this fails without creating a device.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let GpuInit {
            prefer_srgb,
            present_mode,
            alpha_mode,
            required_features,
            required_limits,
            desired_maximum_frame_latency,
            adapter,
        } = init;

        let (surface, adapter) = match adapter {
            Some(AdapterChoice { instance, adapter }) => {
                let surface = instance
                    .create_surface(window)
                    .context("failed to create wgpu surface")?;
                anyhow::ensure!(
                    adapter.is_surface_supported(&surface),
                    "adapter '{}' cannot present to this window",
                    adapter.get_info().name
                );
                (surface, adapter)
            }
            None => {
                let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                    backends: wgpu::Backends::all(),
                    ..Default::default()
                });
                let surface = instance
                    .create_surface(window)
                    .context("failed to create wgpu surface")?;
                let adapter = instance
                    .request_adapter(&wgpu::RequestAdapterOptions {
                        power_preference: wgpu::PowerPreference::HighPerformance,
                        compatible_surface: Some(&surface),
                        force_fallback_adapter: false,
                    })
                    .await
                    .context("failed to find a suitable GPU adapter")?;
                (surface, adapter)
            }
        };

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("nbody device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let lost = Arc::new(OnceLock::new());
        let lost_slot = Arc::clone(&lost);
        device.set_device_lost_callback(move |reason, message| {
            log::error!("GPU device lost ({reason:?}): {message}");
            let _ = lost_slot.set(format!("{reason:?}: {message}"));
        });

        // wgpu's default handler panics; keep the error for the next device check instead.
        let uncaptured = Arc::new(OnceLock::new());
        let uncaptured_slot = Arc::clone(&uncaptured);
        device.on_uncaptured_error(Arc::new(move |error: wgpu::Error| {
            log::error!("uncaptured GPU error: {error}");
            let _ = uncaptured_slot.set(error.to_string());
        }));

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&surface_caps.formats, prefer_srgb)
            .context("no supported surface formats")?;

        let alpha_mode = surface::choose_alpha_mode(&surface_caps.alpha_modes, alpha_mode);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency,
        };

        surface.configure(&device, &config);

        let info = adapter.get_info();
        log::info!(
            "GPU ready: {} ({:?}, {:?}), surface {:?} {}x{}",
            info.name,
            info.backend,
            info.device_type,
            format,
            config.width,
            config.height
        );

        Ok(Self {
            surface,
            adapter,
            device,
            queue,
            config,
            size,
            lost,
            uncaptured,
        })
    }

    /// Returns the active surface format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Returns the current drawable size (physical pixels).
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Returns information about the adapter backing the device.
    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Returns the device-lost reason once the device has been lost.
    pub fn device_lost(&self) -> Option<&str> {
        self.lost.get().map(String::as_str)
    }

    /// Returns the first error that no error scope caught.
    pub fn uncaptured_error(&self) -> Option<&str> {
        self.uncaptured.get().map(String::as_str)
    }

    /// Runs `f` inside out-of-memory and validation error scopes.
    ///
    /// Errors raised by `f` come back to the caller instead of reaching the
    /// uncaptured-error handler. Validation errors win over out-of-memory.
    pub fn capture_errors<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> (T, Option<wgpu::Error>) {
        let oom = self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let validation = self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let value = f(&self.device);

        let validation_err = pollster::block_on(validation.pop());
        let oom_err = pollster::block_on(oom.pop());
        (value, validation_err.or(oom_err))
    }

    /// Reconfigures the surface after a resize.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        surface::apply_resize(
            &self.surface,
            &self.device,
            &mut self.config,
            &mut self.size,
            new_size,
        );
    }

    /// Acquires the next surface texture.
    ///
    /// The frame must be handed back through [`Gpu::present`] promptly; holding
    /// it prevents acquisition of subsequent frames.
    pub fn acquire(&self) -> std::result::Result<GpuFrame, SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        Ok(GpuFrame {
            surface_texture,
            view,
        })
    }

    /// Creates a command encoder on the device.
    pub fn create_encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    /// Submits one encoder and returns its submission index.
    ///
    /// Submissions execute in call order on the single queue.
    pub fn submit(&self, encoder: wgpu::CommandEncoder) -> wgpu::SubmissionIndex {
        self.queue.submit(std::iter::once(encoder.finish()))
    }

    /// Presents a frame previously returned by [`Gpu::acquire`].
    pub fn present(&self, frame: GpuFrame) {
        let GpuFrame {
            surface_texture,
            view,
        } = frame;
        drop(view);
        surface_texture.present();
    }

    /// Converts a `SurfaceError` into a higher-level action.
    pub fn handle_surface_error(&mut self, err: SurfaceError) -> SurfaceErrorAction {
        surface::map_surface_error(&self.surface, &self.device, &self.config, self.size, err)
    }
}
