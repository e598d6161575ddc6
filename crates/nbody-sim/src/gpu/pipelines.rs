use bytemuck::{Pod, Zeroable};

use crate::error::{SimError, SimResult};
use crate::kernel::{
    COUNT_SLOT, DESTINATION_SLOT, KERNEL_ENTRY, SOURCE_SLOT, STEP_SIZE_SLOT,
};
use crate::particle::Particle;

/// Point sprite radius in physical pixels for a particle of mass 1.
const POINT_RADIUS_PX: f32 = 2.5;

// ── uniforms ──────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct CountUniform {
    value: u32,
    _pad: [u32; 3], // 16-byte alignment
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct StepUniform {
    value: f32,
    _pad: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ViewportUniform {
    size: [f32; 2],
    point_radius: f32,
    _pad: f32,
}

// ── blend ─────────────────────────────────────────────────────────────────

fn premul_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

/// Compiled particle kernel and sprite pipeline, plus their small uniforms.
///
/// Built once in `on_gpu_ready`; the surface format is fixed for the life of
/// the window.
pub struct ParticlePipelines {
    compute: wgpu::ComputePipeline,
    compute_bgl: wgpu::BindGroupLayout,
    count_ubo: wgpu::Buffer,
    step_ubo: wgpu::Buffer,

    render: wgpu::RenderPipeline,
    view_bind_group: wgpu::BindGroup,
    viewport_ubo: wgpu::Buffer,

    last_params: Option<(u32, f32)>,
    last_viewport: Option<(u32, u32)>,
}

impl ParticlePipelines {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> SimResult<Self> {
        let compute_shader = compile(
            device,
            "compute shader",
            include_str!("shaders/compute.wgsl"),
        )?;
        let render_shader = compile(device, "render shader", include_str!("shaders/render.wgsl"))?;

        // ── compute ───────────────────────────────────────────────────────

        let storage = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(Particle::SIZE),
            },
            count: None,
        };
        let uniform = |binding: u32, visibility: wgpu::ShaderStages| wgpu::BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let compute_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("nbody kernel bgl"),
            entries: &[
                storage(SOURCE_SLOT, true),
                uniform(COUNT_SLOT, wgpu::ShaderStages::COMPUTE),
                uniform(STEP_SIZE_SLOT, wgpu::ShaderStages::COMPUTE),
                storage(DESTINATION_SLOT, false),
            ],
        });

        let compute_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("nbody kernel pipeline layout"),
            bind_group_layouts: &[&compute_bgl],
            immediate_size: 0,
        });

        let compute = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("nbody kernel pipeline"),
            layout: Some(&compute_layout),
            module: &compute_shader,
            entry_point: Some(KERNEL_ENTRY),
            compilation_options: Default::default(),
            cache: None,
        });

        let count_ubo = uniform_buffer(device, "nbody particle count ubo", size_of::<CountUniform>());
        let step_ubo = uniform_buffer(device, "nbody step size ubo", size_of::<StepUniform>());

        // ── render ────────────────────────────────────────────────────────

        let view_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("nbody sprite bgl"),
            entries: &[uniform(0, wgpu::ShaderStages::VERTEX)],
        });

        let viewport_ubo =
            uniform_buffer(device, "nbody viewport ubo", size_of::<ViewportUniform>());

        let view_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("nbody sprite bind group"),
            layout: &view_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: viewport_ubo.as_entire_binding(),
            }],
        });

        let render_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("nbody sprite pipeline layout"),
            bind_group_layouts: &[&view_bgl],
            immediate_size: 0,
        });

        let render = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("nbody sprite pipeline"),
            layout: Some(&render_layout),
            vertex: wgpu::VertexState {
                module: &render_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[Particle::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &render_shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(premul_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("particle pipelines ready for {surface_format:?}");

        Ok(Self {
            compute,
            compute_bgl,
            count_ubo,
            step_ubo,
            render,
            view_bind_group,
            viewport_ubo,
            last_params: None,
            last_viewport: None,
        })
    }

    pub(crate) fn compute_pipeline(&self) -> &wgpu::ComputePipeline {
        &self.compute
    }

    pub(crate) fn render_pipeline(&self) -> &wgpu::RenderPipeline {
        &self.render
    }

    pub(crate) fn view_bind_group(&self) -> &wgpu::BindGroup {
        &self.view_bind_group
    }

    /// Uploads count and step size when they differ from the last upload.
    pub(crate) fn write_params(&mut self, queue: &wgpu::Queue, count: u32, step_size: f32) {
        if self.last_params == Some((count, step_size)) {
            return;
        }
        queue.write_buffer(
            &self.count_ubo,
            0,
            bytemuck::bytes_of(&CountUniform {
                value: count,
                _pad: [0; 3],
            }),
        );
        queue.write_buffer(
            &self.step_ubo,
            0,
            bytemuck::bytes_of(&StepUniform {
                value: step_size,
                _pad: [0.0; 3],
            }),
        );
        self.last_params = Some((count, step_size));
    }

    pub(crate) fn write_viewport(&mut self, queue: &wgpu::Queue, width: u32, height: u32) {
        if self.last_viewport == Some((width, height)) {
            return;
        }
        queue.write_buffer(
            &self.viewport_ubo,
            0,
            bytemuck::bytes_of(&ViewportUniform {
                size: [width as f32, height as f32],
                point_radius: POINT_RADIUS_PX,
                _pad: 0.0,
            }),
        );
        self.last_viewport = Some((width, height));
    }

    /// Binds one source/destination pair to the kernel's four slots.
    pub(crate) fn kernel_bind_group(
        &self,
        device: &wgpu::Device,
        source: &wgpu::Buffer,
        destination: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("nbody kernel bind group"),
            layout: &self.compute_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: SOURCE_SLOT,
                    resource: source.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: COUNT_SLOT,
                    resource: self.count_ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: STEP_SIZE_SLOT,
                    resource: self.step_ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: DESTINATION_SLOT,
                    resource: destination.as_entire_binding(),
                },
            ],
        })
    }
}

fn uniform_buffer(device: &wgpu::Device, label: &str, size: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: size as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Creates a shader module and fails on any compilation error.
fn compile(
    device: &wgpu::Device,
    what: &'static str,
    source: &str,
) -> SimResult<wgpu::ShaderModule> {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(what),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let info = pollster::block_on(module.get_compilation_info());
    let errors: Vec<String> = info
        .messages
        .iter()
        .filter(|m| matches!(m.message_type, wgpu::CompilationMessageType::Error))
        .map(|m| m.message.clone())
        .collect();

    if !errors.is_empty() {
        return Err(SimError::resource(what, errors.join("\n")));
    }
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniforms_are_16_bytes() {
        assert_eq!(size_of::<CountUniform>(), 16);
        assert_eq!(size_of::<StepUniform>(), 16);
        assert_eq!(size_of::<ViewportUniform>(), 16);
    }

    #[test]
    fn kernel_shader_matches_host_contract() {
        let src = include_str!("shaders/compute.wgsl");
        assert!(src.contains(&format!("fn {KERNEL_ENTRY}(")));
        assert!(src.contains("@workgroup_size(256)"));
        for (slot, name) in [
            (SOURCE_SLOT, "source"),
            (COUNT_SLOT, "particle_count"),
            (STEP_SIZE_SLOT, "step_size"),
            (DESTINATION_SLOT, "destination"),
        ] {
            assert!(
                src.contains(&format!("@binding({slot}) var")) && src.contains(name),
                "slot {slot} ({name})"
            );
        }
    }

    #[test]
    fn render_shader_reads_particle_attributes() {
        let src = include_str!("shaders/render.wgsl");
        for loc in 0..4 {
            assert!(src.contains(&format!("@location({loc})")));
        }
    }
}
