/// A surface texture acquired for one frame, plus its render view.
///
/// Short-lived: hand it back to `Gpu::present` before acquiring the next one.
/// Dropping it without presenting discards the frame.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}
