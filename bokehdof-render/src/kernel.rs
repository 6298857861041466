//! N-gon bokeh sampling kernel.
//!
//! Taps sit on three concentric rings (7, 14 and 21 points) warped toward a
//! polygon with `blade_count` sides. `blade_curvature = 1` keeps the rings
//! circular; `0` gives straight polygon edges.

use std::f32::consts::PI;

pub use bokehdof_gpu_shared::uniforms::BOKEH_KERNEL_SIZE;

/// Ring indices run `1..KERNEL_RINGS`.
pub const KERNEL_RINGS: usize = 4;
pub const POINTS_PER_RING: usize = 7;

const RING_BIAS: f32 = 1.0 / POINTS_PER_RING as f32;

/// Aperture blade geometry taken from the effect settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BladeShape {
    pub count: f32,
    pub curvature: f32,
    pub rotation_degrees: f32,
}

/// 42 taps of `(u * radius, v * radius, length, u * radius * rcp_aspect)`,
/// ordered ring by ring.
#[derive(Debug, Clone, PartialEq)]
pub struct BokehKernel {
    taps: [[f32; 4]; BOKEH_KERNEL_SIZE],
}

/// Index of the first tap of `ring` (1-based).
pub fn ring_offset(ring: usize) -> usize {
    POINTS_PER_RING * ring * (ring - 1) / 2
}

impl BokehKernel {
    pub fn build(shape: &BladeShape, max_radius: f32, rcp_aspect: f32) -> Self {
        let mut taps = [[0.0f32; 4]; BOKEH_KERNEL_SIZE];
        let rotation = shape.rotation_degrees.to_radians();
        let nt = (PI / shape.count).cos();
        let edge_angle = 2.0 * PI / shape.count;

        let mut idx = 0;
        for ring in 1..KERNEL_RINGS {
            let radius = (ring as f32 + RING_BIAS) / (KERNEL_RINGS as f32 - 1.0 + RING_BIAS);
            let points = ring * POINTS_PER_RING;

            for point in 0..points {
                let phi = 2.0 * PI * point as f32 / points as f32;

                // Distance from the center to the polygon edge along phi, relative to the inscribed circle
                let dt = (phi - edge_angle * ((shape.count * phi + PI) / (2.0 * PI)).floor()).cos();
                let r = radius * (nt / dt).powf(1.0 - shape.curvature);

                let u = r * (phi - rotation).cos();
                let v = r * (phi - rotation).sin();

                let u_radius = u * max_radius;
                let v_radius = v * max_radius;
                let length = (u_radius * u_radius + v_radius * v_radius).sqrt();
                taps[idx] = [u_radius, v_radius, length, u_radius * rcp_aspect];
                idx += 1;
            }
        }

        Self { taps }
    }

    pub fn taps(&self) -> &[[f32; 4]; BOKEH_KERNEL_SIZE] {
        &self.taps
    }

    /// Taps of a single ring (1..=3).
    pub fn ring(&self, ring: usize) -> &[[f32; 4]] {
        let start = ring_offset(ring);
        &self.taps[start..start + ring * POINTS_PER_RING]
    }
}

/// Exact bit pattern of every kernel input. Two keys compare equal only when
/// a rebuild would produce the same taps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelKey([u32; 5]);

impl KernelKey {
    pub fn new(shape: &BladeShape, max_radius: f32, rcp_aspect: f32) -> Self {
        Self([
            shape.count.to_bits(),
            shape.curvature.to_bits(),
            shape.rotation_degrees.to_bits(),
            max_radius.to_bits(),
            rcp_aspect.to_bits(),
        ])
    }
}

/// Last built kernel and the key it was built from.
#[derive(Debug, Default)]
pub struct KernelCache {
    entry: Option<(KernelKey, BokehKernel)>,
    force_rebuild: bool,
    rebuilds: u64,
}

impl KernelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache that rebuilds on every request.
    pub fn uncached() -> Self {
        Self {
            force_rebuild: true,
            ..Self::default()
        }
    }

    /// Kernel for these inputs; rebuilt only when the key changed.
    pub fn get_or_build(&mut self, shape: &BladeShape, max_radius: f32, rcp_aspect: f32) -> &BokehKernel {
        let key = KernelKey::new(shape, max_radius, rcp_aspect);
        let fresh = !self.force_rebuild && matches!(&self.entry, Some((cached, _)) if *cached == key);
        if !fresh {
            self.entry = None;
        }

        let rebuilds = &mut self.rebuilds;
        let (_, kernel) = self.entry.get_or_insert_with(|| {
            *rebuilds += 1;
            log::debug!(
                "Rebuilding bokeh kernel: blades={} curvature={} rotation={} radius={} rcp_aspect={}",
                shape.count,
                shape.curvature,
                shape.rotation_degrees,
                max_radius,
                rcp_aspect
            );
            (key, BokehKernel::build(shape, max_radius, rcp_aspect))
        });
        kernel
    }

    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_shape() -> BladeShape {
        BladeShape { count: 5.0, curvature: 1.0, rotation_degrees: 0.0 }
    }

    fn bits(kernel: &BokehKernel) -> Vec<u32> {
        kernel.taps().iter().flatten().map(|v| v.to_bits()).collect()
    }

    #[test]
    fn kernel_has_42_taps_split_7_14_21() {
        let kernel = BokehKernel::build(&round_shape(), 0.05, 1.0);
        assert_eq!(kernel.taps().len(), 42);
        assert_eq!(kernel.ring(1).len(), 7);
        assert_eq!(kernel.ring(2).len(), 14);
        assert_eq!(kernel.ring(3).len(), 21);
        assert_eq!(ring_offset(1), 0);
        assert_eq!(ring_offset(2), 7);
        assert_eq!(ring_offset(3), 21);
    }

    #[test]
    fn first_tap_of_round_kernel() {
        let kernel = BokehKernel::build(&round_shape(), 0.05, 1.0);
        let radius = (1.0 + 1.0 / 7.0) / (3.0 + 1.0 / 7.0);
        let expected = radius * 0.05;
        let first = kernel.taps()[0];
        assert!((first[0] - expected).abs() < 1e-6);
        assert!(first[1].abs() < 1e-6);
        assert!((first[2] - expected).abs() < 1e-6);
        assert!((first[3] - expected).abs() < 1e-6);
    }

    #[test]
    fn round_kernel_taps_lie_on_ring_radii() {
        let kernel = BokehKernel::build(&round_shape(), 1.0, 1.0);
        for ring in 1..KERNEL_RINGS {
            let radius = (ring as f32 + 1.0 / 7.0) / (3.0 + 1.0 / 7.0);
            for tap in kernel.ring(ring) {
                assert!((tap[2] - radius).abs() < 1e-5, "ring {ring}: {} != {radius}", tap[2]);
            }
        }
    }

    #[test]
    fn straight_blades_pull_taps_inside_circle() {
        let polygon = BladeShape { count: 6.0, curvature: 0.0, rotation_degrees: 0.0 };
        let kernel = BokehKernel::build(&polygon, 1.0, 1.0);
        let outer = (3.0 + 1.0 / 7.0) / (3.0 + 1.0 / 7.0);
        let inscribed = outer * (PI / 6.0).cos();
        for tap in kernel.ring(3) {
            assert!(tap[2] <= outer + 1e-5);
            assert!(tap[2] >= inscribed - 1e-5);
        }
    }

    #[test]
    fn rotation_turns_taps_clockwise() {
        let rotated = BladeShape { rotation_degrees: 90.0, ..round_shape() };
        let kernel = BokehKernel::build(&rotated, 1.0, 1.0);
        let first = kernel.taps()[0];
        assert!(first[0].abs() < 1e-5);
        assert!(first[1] < 0.0);
    }

    #[test]
    fn aspect_correction_only_scales_u() {
        let kernel = BokehKernel::build(&round_shape(), 0.05, 0.5);
        for tap in kernel.taps() {
            assert_eq!(tap[3], tap[0] * 0.5);
        }
    }

    #[test]
    fn build_is_bit_deterministic() {
        let shape = BladeShape { count: 7.0, curvature: 0.35, rotation_degrees: -30.0 };
        let a = BokehKernel::build(&shape, 0.0129, 0.5625);
        let b = BokehKernel::build(&shape, 0.0129, 0.5625);
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn cache_rebuilds_only_on_key_change() {
        let mut cache = KernelCache::new();
        let shape = round_shape();
        cache.get_or_build(&shape, 0.05, 1.0);
        cache.get_or_build(&shape, 0.05, 1.0);
        assert_eq!(cache.rebuild_count(), 1);

        let curved = BladeShape { curvature: 0.5, ..shape };
        cache.get_or_build(&curved, 0.05, 1.0);
        assert_eq!(cache.rebuild_count(), 2);

        cache.get_or_build(&curved, 0.05, 0.75);
        assert_eq!(cache.rebuild_count(), 3);

        cache.invalidate();
        cache.get_or_build(&curved, 0.05, 0.75);
        assert_eq!(cache.rebuild_count(), 4);
    }

    #[test]
    fn cached_and_forced_kernels_are_identical() {
        let mut cached = KernelCache::new();
        let mut forced = KernelCache::uncached();
        let frames = [
            (BladeShape { count: 5.0, curvature: 1.0, rotation_degrees: 0.0 }, 0.05, 1.0),
            (BladeShape { count: 5.0, curvature: 1.0, rotation_degrees: 0.0 }, 0.05, 1.0),
            (BladeShape { count: 8.0, curvature: 0.2, rotation_degrees: 45.0 }, 0.0129, 0.5625),
            (BladeShape { count: 8.0, curvature: 0.2, rotation_degrees: 45.0 }, 0.0129, 0.5625),
        ];
        for (shape, radius, aspect) in &frames {
            let a = bits(cached.get_or_build(shape, *radius, *aspect));
            let b = bits(forced.get_or_build(shape, *radius, *aspect));
            assert_eq!(a, b);
        }
        assert_eq!(cached.rebuild_count(), 2);
        assert_eq!(forced.rebuild_count(), 4);
    }

    #[test]
    fn negative_zero_rotation_is_a_distinct_key() {
        let a = KernelKey::new(&round_shape(), 0.05, 1.0);
        let b = KernelKey::new(&BladeShape { rotation_degrees: -0.0, ..round_shape() }, 0.05, 1.0);
        assert_ne!(a, b);
    }
}
