use winit::dpi::PhysicalSize;

/// What the frame loop does after a failed surface acquire.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// The surface was reconfigured; the next frame may acquire again.
    Reconfigured,
    /// Transient; drop this frame only.
    SkipFrame,
    /// Out of memory; the window cannot be drawn to any more.
    Fatal,
}

impl SurfaceErrorAction {
    /// Whether the frame loop may continue with the next frame.
    pub fn can_continue(self) -> bool {
        !matches!(self, SurfaceErrorAction::Fatal)
    }
}

/// Maps an acquire error to its action without touching the surface.
pub(crate) fn classify_surface_error(err: &wgpu::SurfaceError) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceErrorAction::Reconfigured,
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}

/// Picks a surface format, preferring the sRGB 8-bit formats when asked.
///
/// Returns `None` only when the surface reports no formats at all.
pub(crate) fn choose_surface_format(
    formats: &[wgpu::TextureFormat],
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if prefer_srgb {
        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        if let Some(f) = preferred.into_iter().find(|f| formats.contains(f)) {
            return Some(f);
        }
    }

    formats.first().copied()
}

pub(crate) fn choose_alpha_mode(
    supported: &[wgpu::CompositeAlphaMode],
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| supported.contains(m))
        .or_else(|| supported.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// wgpu rejects 0x0 surfaces; a minimized window only updates the stored size
/// and configuration is deferred until it has area again.
pub(crate) fn apply_resize(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &mut wgpu::SurfaceConfiguration,
    size: &mut PhysicalSize<u32>,
    new_size: PhysicalSize<u32>,
) {
    *size = new_size;
    if new_size.width == 0 || new_size.height == 0 {
        return;
    }

    config.width = new_size.width;
    config.height = new_size.height;

    surface.configure(device, config);
}

pub(crate) fn map_surface_error(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    err: wgpu::SurfaceError,
) -> SurfaceErrorAction {
    log::warn!("surface error: {err}");
    let action = classify_surface_error(&err);
    if action == SurfaceErrorAction::Reconfigured && size.width > 0 && size.height > 0 {
        surface.configure(device, config);
    }
    action
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::{CompositeAlphaMode as Alpha, TextureFormat as Fmt};

    #[test]
    fn format_prefers_srgb_when_available() {
        let formats = [Fmt::Bgra8Unorm, Fmt::Rgba8UnormSrgb];
        assert_eq!(choose_surface_format(&formats, true), Some(Fmt::Rgba8UnormSrgb));
    }

    #[test]
    fn format_falls_back_to_first() {
        let formats = [Fmt::Rgba16Float, Fmt::Bgra8Unorm];
        assert_eq!(choose_surface_format(&formats, true), Some(Fmt::Rgba16Float));
    }

    #[test]
    fn format_ignores_srgb_when_not_preferred() {
        let formats = [Fmt::Bgra8Unorm, Fmt::Bgra8UnormSrgb];
        assert_eq!(choose_surface_format(&formats, false), Some(Fmt::Bgra8Unorm));
    }

    #[test]
    fn format_none_for_empty_caps() {
        assert_eq!(choose_surface_format(&[], true), None);
    }

    #[test]
    fn alpha_uses_request_when_supported() {
        let modes = [Alpha::Opaque, Alpha::PreMultiplied];
        assert_eq!(choose_alpha_mode(&modes, Some(Alpha::PreMultiplied)), Alpha::PreMultiplied);
    }

    #[test]
    fn alpha_falls_back_to_first_supported() {
        let modes = [Alpha::Opaque];
        assert_eq!(choose_alpha_mode(&modes, Some(Alpha::PostMultiplied)), Alpha::Opaque);
    }

    #[test]
    fn alpha_auto_when_nothing_reported() {
        assert_eq!(choose_alpha_mode(&[], None), Alpha::Auto);
    }

    #[test]
    fn lost_and_outdated_reconfigure() {
        for err in [wgpu::SurfaceError::Lost, wgpu::SurfaceError::Outdated] {
            assert_eq!(classify_surface_error(&err), SurfaceErrorAction::Reconfigured);
        }
    }

    #[test]
    fn only_out_of_memory_is_fatal() {
        let oom = classify_surface_error(&wgpu::SurfaceError::OutOfMemory);
        assert!(!oom.can_continue());

        for err in [wgpu::SurfaceError::Timeout, wgpu::SurfaceError::Other] {
            let action = classify_surface_error(&err);
            assert_eq!(action, SurfaceErrorAction::SkipFrame);
            assert!(action.can_continue());
        }
    }
}
