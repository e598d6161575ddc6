use bytemuck::{Pod, Zeroable};

/// One particle, shared byte-for-byte between the compute kernel and the
/// vertex stage.
///
/// Layout (32 bytes, 4-byte aligned, no padding):
///
///  offset  0  position  [f32; 2]   loc 0
///  offset  8  velocity  [f32; 2]   loc 1  (not read by the vertex shader)
///  offset 16  mass      f32        loc 2  (scales the sprite)
///  offset 20  color     [f32; 3]   loc 3
///
/// The WGSL side declares `color` as `array<f32, 3>`: a `vec3<f32>` would be
/// 16-byte aligned there and shift it to offset 32.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Particle {
    pub position: [f32; 2],
    pub velocity: [f32; 2],
    pub mass: f32,
    pub color: [f32; 3],
}

const _: () = assert!(std::mem::size_of::<Particle>() == 32);
const _: () = assert!(std::mem::align_of::<Particle>() == 4);

impl Particle {
    /// Size of one record in bytes.
    pub const SIZE: u64 = std::mem::size_of::<Particle>() as u64;

    const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x2, // position
        1 => Float32x2, // velocity
        2 => Float32,   // mass
        3 => Float32x3  // color
    ];

    /// Per-instance vertex layout: one particle per point sprite.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::SIZE,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }

    /// Byte size of a buffer holding `count` particles.
    pub fn buffer_size(count: u32) -> u64 {
        u64::from(count) * Self::SIZE
    }
}

/// Generates `count` particles in a disc of radius 0.8 around the origin.
///
/// Deterministic for a given `seed`. Velocities are tangential and grow with
/// the radius; masses lie in `[0.5, 2.0)` and tint the color from blue to
/// orange.
pub fn seed_particles(count: u32, seed: u64) -> Vec<Particle> {
    let mut rng = fastrand::Rng::with_seed(seed);

    (0..count)
        .map(|_| {
            let radius = 0.8 * rng.f32().sqrt();
            let angle = std::f32::consts::TAU * rng.f32();
            let (sin, cos) = angle.sin_cos();

            let mass = 0.5 + 1.5 * rng.f32();
            let t = (mass - 0.5) / 1.5;

            Particle {
                position: [radius * cos, radius * sin],
                velocity: [-sin * 0.25 * radius, cos * 0.25 * radius],
                mass,
                color: [0.3 + 0.7 * t, 0.55, 1.0 - 0.6 * t],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_offsets_match_struct_layout() {
        let layout = Particle::layout();
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 8, 16, 20]);
        assert_eq!(layout.array_stride, 32);
        assert_eq!(layout.step_mode, wgpu::VertexStepMode::Instance);
    }

    #[test]
    fn buffer_size_scales_with_count() {
        assert_eq!(Particle::buffer_size(0), 0);
        assert_eq!(Particle::buffer_size(1000), 32_000);
    }

    #[test]
    fn seeding_is_deterministic() {
        assert_eq!(seed_particles(64, 7), seed_particles(64, 7));
        assert_ne!(seed_particles(64, 7), seed_particles(64, 8));
    }

    #[test]
    fn seeded_particles_stay_in_range() {
        for p in seed_particles(500, 42) {
            let r = (p.position[0].powi(2) + p.position[1].powi(2)).sqrt();
            assert!(r <= 0.8 + 1e-5);
            assert!((0.5..2.0).contains(&p.mass));
            assert!(p.color.iter().all(|c| (0.0..=1.0).contains(c)));
        }
    }

    #[test]
    fn zero_particles_is_empty() {
        assert!(seed_particles(0, 1).is_empty());
    }

    #[test]
    fn casts_to_bytes_without_padding() {
        let particles = seed_particles(3, 1);
        let bytes: &[u8] = bytemuck::cast_slice(&particles);
        assert_eq!(bytes.len() as u64, Particle::buffer_size(3));
    }
}
