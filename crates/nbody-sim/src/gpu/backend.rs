use std::time::Duration;

use bytemuck::Zeroable;
use wgpu::util::DeviceExt;

use nbody_engine::core::WindowCtx;
use nbody_engine::device::{Gpu, GpuFrame};

use crate::backend::{FrameStart, SimBackend};
use crate::error::{ComputeStatus, SimError, SimResult};
use crate::kernel::KernelArgs;
use crate::particle::Particle;
use crate::setup::InteropMode;

use super::ParticlePipelines;

/// Usage of a compute buffer; only shared buffers are also bound as vertex input.
fn compute_usage(mode: InteropMode) -> wgpu::BufferUsages {
    let usage = wgpu::BufferUsages::STORAGE
        | wgpu::BufferUsages::COPY_SRC
        | wgpu::BufferUsages::COPY_DST;
    match mode {
        InteropMode::Shared => usage | wgpu::BufferUsages::VERTEX,
        InteropMode::Copy => usage,
    }
}

/// Device state before an operation. A lost device wins over a stray error.
fn device_status(lost: Option<&str>, uncaptured: Option<&str>) -> SimResult<()> {
    if let Some(reason) = lost {
        return Err(SimError::compute(ComputeStatus::DeviceLost, reason));
    }
    match uncaptured {
        Some(error) => Err(SimError::compute(
            ComputeStatus::DispatchFailed,
            format!("uncaptured device error: {error}"),
        )),
        None => Ok(()),
    }
}

/// Maps a bounded queue wait. The lost flag is read after the poll, since the
/// callback can fire during it, and takes precedence over the poll result.
fn wait_status(
    result: Result<wgpu::PollStatus, wgpu::PollError>,
    lost: Option<&str>,
    timeout: Option<Duration>,
) -> SimResult<()> {
    if let Some(reason) = lost {
        return Err(SimError::compute(ComputeStatus::DeviceLost, reason));
    }
    match result {
        Ok(_) => Ok(()),
        Err(wgpu::PollError::Timeout) => Err(SimError::compute(
            ComputeStatus::Timeout,
            format!("queue did not finish within {timeout:?}"),
        )),
        Err(err) => Err(SimError::compute(ComputeStatus::WaitFailed, err.to_string())),
    }
}

/// Turns an error caught by an error scope into `make(message)`.
fn scoped(error: Option<wgpu::Error>, make: impl FnOnce(String) -> SimError) -> SimResult<()> {
    match error {
        Some(err) => Err(make(err.to_string())),
        None => Ok(()),
    }
}

/// `SimBackend` over one wgpu device and window surface.
///
/// Borrowed for a single callback. Draw work is submitted before the
/// dispatch so the previous generation is read before the next is written;
/// `wait_idle` then blocks on the dispatch's submission index.
pub struct WgpuBackend<'a, 'w> {
    gpu: &'a mut Gpu<'w>,
    pipelines: &'a mut ParticlePipelines,
    window: Option<&'a WindowCtx<'a>>,
    frame: Option<GpuFrame>,
    encoder: Option<wgpu::CommandEncoder>,
    last_submission: Option<wgpu::SubmissionIndex>,
}

impl<'a, 'w> WgpuBackend<'a, 'w> {
    pub fn new(gpu: &'a mut Gpu<'w>, pipelines: &'a mut ParticlePipelines) -> Self {
        Self {
            gpu,
            pipelines,
            window: None,
            frame: None,
            encoder: None,
            last_submission: None,
        }
    }

    /// Window to notify right before presenting.
    pub fn with_window(mut self, window: &'a WindowCtx<'a>) -> Self {
        self.window = Some(window);
        self
    }

    fn check_device(&self) -> SimResult<()> {
        device_status(self.gpu.device_lost(), self.gpu.uncaptured_error())
    }

    fn frame_view(&self) -> SimResult<&wgpu::TextureView> {
        self.frame
            .as_ref()
            .map(|f| &f.view)
            .ok_or_else(|| SimError::display("no acquired frame"))
    }

    fn encoder(&mut self) -> &mut wgpu::CommandEncoder {
        let gpu = &*self.gpu;
        self.encoder
            .get_or_insert_with(|| gpu.create_encoder("nbody frame encoder"))
    }

    fn flush(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.last_submission = Some(self.gpu.submit(encoder));
        }
    }

    fn create_particle_buffer(
        &self,
        label: &str,
        particles: &[Particle],
        usage: wgpu::BufferUsages,
    ) -> SimResult<wgpu::Buffer> {
        // wgpu rejects zero-sized bindings; keep one record for N = 0.
        let placeholder = [Particle::zeroed()];
        let contents: &[Particle] = if particles.is_empty() {
            &placeholder
        } else {
            particles
        };

        log::debug!(
            "create {label}: {} bytes, {usage:?}",
            Particle::buffer_size(contents.len() as u32)
        );

        let (buffer, error) = self.gpu.capture_errors(|device| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(contents),
                usage,
            })
        });
        scoped(error, |message| {
            SimError::resource("particle buffer", format!("{label}: {message}"))
        })?;
        Ok(buffer)
    }
}

impl SimBackend for WgpuBackend<'_, '_> {
    type ComputeBuffer = wgpu::Buffer;
    type DisplayBuffer = wgpu::Buffer;

    fn create_compute_buffer(
        &mut self,
        label: &str,
        particles: &[Particle],
        mode: InteropMode,
    ) -> SimResult<wgpu::Buffer> {
        self.check_device()?;
        self.create_particle_buffer(label, particles, compute_usage(mode))
    }

    fn create_display_buffer(
        &mut self,
        label: &str,
        particles: &[Particle],
        shared: Option<&wgpu::Buffer>,
    ) -> SimResult<wgpu::Buffer> {
        self.check_device()?;
        match shared {
            Some(buffer) => {
                log::debug!("{label}: shares the compute allocation ({} bytes)", buffer.size());
                Ok(buffer.clone())
            }
            None => self.create_particle_buffer(
                label,
                particles,
                wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            ),
        }
    }

    fn begin_frame(&mut self) -> SimResult<FrameStart> {
        self.check_device()?;

        let frame = match self.gpu.acquire() {
            Ok(frame) => frame,
            Err(err) => {
                let message = err.to_string();
                let action = self.gpu.handle_surface_error(err);
                if !action.can_continue() {
                    return Err(SimError::display(format!("surface unusable: {message}")));
                }
                return Ok(FrameStart::Skip);
            }
        };

        let size = self.gpu.size();
        let queue = self.gpu.queue();
        self.pipelines.write_viewport(queue, size.width, size.height);

        self.frame = Some(frame);
        Ok(FrameStart::Ready)
    }

    fn clear(&mut self, color: wgpu::Color) -> SimResult<()> {
        let view = self.frame_view()?.clone();
        let encoder = self.encoder();
        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("nbody clear pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        Ok(())
    }

    fn draw_particles(&mut self, buffer: &wgpu::Buffer, count: u32) -> SimResult<()> {
        let needed = Particle::buffer_size(count);
        if buffer.size() < needed {
            return Err(SimError::display(format!(
                "vertex buffer holds {} bytes, draw needs {needed}",
                buffer.size()
            )));
        }

        let view = self.frame_view()?.clone();
        let pipelines = &*self.pipelines;
        let gpu = &*self.gpu;
        let mut encoder = self
            .encoder
            .take()
            .unwrap_or_else(|| gpu.create_encoder("nbody frame encoder"));

        // Draw of this generation is queued before the dispatch that overwrites the other slot.
        let (submission, error) = gpu.capture_errors(|_| {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("nbody particle pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            rpass.set_pipeline(pipelines.render_pipeline());
            rpass.set_bind_group(0, pipelines.view_bind_group(), &[]);
            rpass.set_vertex_buffer(0, buffer.slice(..needed));
            rpass.draw(0..6, 0..count);
            drop(rpass);
            gpu.submit(encoder)
        });
        scoped(error, |message| {
            SimError::display(format!("particle draw rejected: {message}"))
        })?;

        self.last_submission = Some(submission);
        Ok(())
    }

    fn dispatch(&mut self, args: &KernelArgs<'_, wgpu::Buffer>, workgroups: u32) -> SimResult<()> {
        self.check_device()?;

        let needed = Particle::buffer_size(args.particle_count);
        for (slot, buffer) in [("source", args.source), ("destination", args.destination)] {
            if buffer.size() < needed {
                return Err(SimError::compute(
                    ComputeStatus::InvalidArgument,
                    format!(
                        "{slot} buffer holds {} bytes, kernel needs {needed}",
                        buffer.size()
                    ),
                ));
            }
        }
        if args.source == args.destination {
            return Err(SimError::compute(
                ComputeStatus::InvalidArgument,
                "source and destination are the same buffer",
            ));
        }

        self.flush();

        let gpu = &*self.gpu;
        let pipelines = &mut *self.pipelines;
        let (submission, error) = gpu.capture_errors(|device| {
            pipelines.write_params(gpu.queue(), args.particle_count, args.step_size);
            let bind_group = pipelines.kernel_bind_group(device, args.source, args.destination);

            let mut encoder = gpu.create_encoder("nbody compute encoder");
            {
                let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("nbody compute pass"),
                    timestamp_writes: None,
                });
                cpass.set_pipeline(pipelines.compute_pipeline());
                cpass.set_bind_group(0, &bind_group, &[]);
                cpass.dispatch_workgroups(workgroups, 1, 1);
            }
            gpu.submit(encoder)
        });
        scoped(error, |message| {
            SimError::compute(ComputeStatus::DispatchFailed, message)
        })?;

        self.last_submission = Some(submission);
        Ok(())
    }

    fn wait_idle(&mut self, timeout: Option<Duration>) -> SimResult<()> {
        self.flush();
        let result = self.gpu.device().poll(wgpu::PollType::Wait {
            submission_index: self.last_submission.take(),
            timeout,
        });

        wait_status(result, self.gpu.device_lost(), timeout)?;
        self.check_device()
    }

    fn transfer(&mut self, src: &wgpu::Buffer, dst: &wgpu::Buffer, bytes: u64) -> SimResult<()> {
        if src.size() < bytes || dst.size() < bytes {
            return Err(SimError::compute(
                ComputeStatus::InvalidArgument,
                format!(
                    "transfer of {bytes} bytes between buffers of {} and {}",
                    src.size(),
                    dst.size()
                ),
            ));
        }
        self.encoder().copy_buffer_to_buffer(src, 0, dst, 0, bytes);
        Ok(())
    }

    fn present(&mut self) -> SimResult<()> {
        self.flush();
        let frame = self
            .frame
            .take()
            .ok_or_else(|| SimError::display("present without an acquired frame"))?;

        if let Some(window) = self.window {
            window.pre_present_notify();
        }
        self.gpu.present(frame);
        Ok(())
    }
}
