/// An adapter chosen before any window exists.
///
/// The instance that produced the adapter travels with it: the window surface
/// must be created from the same instance.
#[derive(Debug)]
pub struct AdapterChoice {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
}

/// Initialization parameters for the GPU layer.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug)]
pub struct GpuInit {
    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior).
    ///
    /// FIFO is broadly supported and matches a vsync'd simulation loop.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Required wgpu features.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    ///
    /// Compute workloads usually only need the downlevel set plus a large enough
    /// storage binding.
    pub required_limits: wgpu::Limits,

    /// Desired maximum frame latency for the surface.
    ///
    /// This value is a hint; support depends on platform/backend.
    pub desired_maximum_frame_latency: u32,

    /// Adapter selected up front (see [`crate::device::probe_adapters`]).
    ///
    /// `None` lets `Gpu::new` request a surface-compatible adapter itself.
    pub adapter: Option<AdapterChoice>,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults(),
            desired_maximum_frame_latency: 2,
            adapter: None,
        }
    }
}
