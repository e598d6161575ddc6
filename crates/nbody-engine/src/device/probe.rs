use super::AdapterChoice;

/// Capability summary of one adapter, taken without a surface.
///
/// Plain data so selection can run (and be tested) without a GPU.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterCaps {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    /// Compute shaders are available on this adapter's backend.
    pub compute_shaders: bool,
    pub max_storage_buffer_binding_size: u64,
    pub max_compute_workgroup_size_x: u32,
    pub max_compute_invocations_per_workgroup: u32,
}

impl AdapterCaps {
    pub fn from_adapter(adapter: &wgpu::Adapter) -> Self {
        let info = adapter.get_info();
        let limits = adapter.limits();
        let downlevel = adapter.get_downlevel_capabilities();

        Self {
            name: info.name,
            backend: info.backend,
            device_type: info.device_type,
            compute_shaders: downlevel
                .flags
                .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS),
            max_storage_buffer_binding_size: u64::from(limits.max_storage_buffer_binding_size),
            max_compute_workgroup_size_x: limits.max_compute_workgroup_size_x,
            max_compute_invocations_per_workgroup: limits.max_compute_invocations_per_workgroup,
        }
    }

    /// Lists the requirements this adapter fails, empty when it qualifies.
    pub fn missing(&self, req: &AdapterRequirements) -> Vec<String> {
        let mut missing = Vec::new();

        if req.compute_shaders && !self.compute_shaders {
            missing.push("compute shaders".to_string());
        }
        if self.max_storage_buffer_binding_size < req.min_storage_buffer_binding_size {
            missing.push(format!(
                "storage binding of {} bytes (max {})",
                req.min_storage_buffer_binding_size, self.max_storage_buffer_binding_size
            ));
        }
        if self.max_compute_workgroup_size_x < req.workgroup_size
            || self.max_compute_invocations_per_workgroup < req.workgroup_size
        {
            missing.push(format!("workgroup size {}", req.workgroup_size));
        }

        missing
    }

    pub fn satisfies(&self, req: &AdapterRequirements) -> bool {
        self.missing(req).is_empty()
    }
}

/// What a caller needs from an adapter before it commits to opening a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterRequirements {
    pub compute_shaders: bool,
    pub min_storage_buffer_binding_size: u64,
    /// 1-D workgroup size the compute kernels are compiled with.
    pub workgroup_size: u32,
}

impl AdapterRequirements {
    /// Device limits to request so that the requirements hold on the device too.
    pub fn device_limits(&self) -> wgpu::Limits {
        let mut limits = wgpu::Limits::downlevel_defaults();
        if let Ok(size) = self.min_storage_buffer_binding_size.try_into() {
            limits.max_storage_buffer_binding_size =
                limits.max_storage_buffer_binding_size.max(size);
        }
        limits
    }
}

/// A probed adapter together with its capability summary.
#[derive(Debug)]
pub struct ProbedAdapter {
    pub adapter: wgpu::Adapter,
    pub caps: AdapterCaps,
}

impl AsRef<AdapterCaps> for ProbedAdapter {
    fn as_ref(&self) -> &AdapterCaps {
        &self.caps
    }
}

impl ProbedAdapter {
    pub fn into_choice(self, instance: wgpu::Instance) -> AdapterChoice {
        AdapterChoice {
            instance,
            adapter: self.adapter,
        }
    }
}

/// Queries the adapters wgpu offers for each power preference.
///
/// No surface exists yet, so presentation support is verified later by
/// `Gpu::new`. Duplicates (same name and backend) are dropped.
pub async fn probe_adapters(instance: &wgpu::Instance) -> Vec<ProbedAdapter> {
    let mut probed: Vec<ProbedAdapter> = Vec::new();

    for power_preference in [
        wgpu::PowerPreference::HighPerformance,
        wgpu::PowerPreference::LowPower,
    ] {
        let adapter = match instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
        {
            Ok(adapter) => adapter,
            Err(err) => {
                log::debug!("no adapter for {power_preference:?}: {err}");
                continue;
            }
        };

        let caps = AdapterCaps::from_adapter(&adapter);
        if probed
            .iter()
            .any(|p| p.caps.name == caps.name && p.caps.backend == caps.backend)
        {
            continue;
        }

        log::debug!("probed adapter: {caps:?}");
        probed.push(ProbedAdapter { adapter, caps });
    }

    probed
}

/// Returns the index of the best candidate satisfying `req`.
///
/// Discrete GPUs win over integrated ones, which win over everything else;
/// ties keep probe order.
pub fn select_adapter(candidates: &[AdapterCaps], req: &AdapterRequirements) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .filter(|(_, caps)| caps.satisfies(req))
        .min_by_key(|(index, caps)| (device_rank(caps.device_type), *index))
        .map(|(index, _)| index)
}

fn device_rank(device_type: wgpu::DeviceType) -> u8 {
    match device_type {
        wgpu::DeviceType::DiscreteGpu => 0,
        wgpu::DeviceType::IntegratedGpu => 1,
        wgpu::DeviceType::VirtualGpu => 2,
        wgpu::DeviceType::Other => 3,
        wgpu::DeviceType::Cpu => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(name: &str, device_type: wgpu::DeviceType, compute: bool) -> AdapterCaps {
        AdapterCaps {
            name: name.to_string(),
            backend: wgpu::Backend::Vulkan,
            device_type,
            compute_shaders: compute,
            max_storage_buffer_binding_size: 128 << 20,
            max_compute_workgroup_size_x: 256,
            max_compute_invocations_per_workgroup: 256,
        }
    }

    fn req() -> AdapterRequirements {
        AdapterRequirements {
            compute_shaders: true,
            min_storage_buffer_binding_size: 32_000,
            workgroup_size: 256,
        }
    }

    #[test]
    fn prefers_discrete_gpu() {
        let list = [
            caps("igpu", wgpu::DeviceType::IntegratedGpu, true),
            caps("dgpu", wgpu::DeviceType::DiscreteGpu, true),
        ];
        assert_eq!(select_adapter(&list, &req()), Some(1));
    }

    #[test]
    fn skips_adapters_without_compute() {
        let list = [
            caps("gl", wgpu::DeviceType::DiscreteGpu, false),
            caps("cpu", wgpu::DeviceType::Cpu, true),
        ];
        assert_eq!(select_adapter(&list, &req()), Some(1));
    }

    #[test]
    fn none_when_nothing_qualifies() {
        let list = [caps("gl", wgpu::DeviceType::DiscreteGpu, false)];
        assert_eq!(select_adapter(&list, &req()), None);
        assert_eq!(select_adapter(&[], &req()), None);
    }

    #[test]
    fn missing_reports_each_gap() {
        let mut small = caps("small", wgpu::DeviceType::IntegratedGpu, false);
        small.max_storage_buffer_binding_size = 1024;
        small.max_compute_invocations_per_workgroup = 128;

        let missing = small.missing(&req());
        assert_eq!(missing.len(), 3);
        assert!(missing[0].contains("compute"));
        assert!(missing[1].contains("storage"));
        assert!(missing[2].contains("workgroup"));
    }

    #[test]
    fn device_limits_cover_storage_requirement() {
        let mut r = req();
        r.min_storage_buffer_binding_size = 512 << 20;
        let limits = r.device_limits();
        assert_eq!(u64::from(limits.max_storage_buffer_binding_size), 512 << 20);
    }
}
