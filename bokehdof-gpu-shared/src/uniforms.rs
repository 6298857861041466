use bytemuck::{Pod, Zeroable};

/// Number of bokeh kernel taps: rings 1..=3 holding 7, 14 and 21 points.
pub const BOKEH_KERNEL_SIZE: usize = 42;

/// Depth-of-field globals, matching `DofGlobals` in dof_common.wgsl, bind group 0, binding 0.
/// Shared by all five passes; uploaded once per frame.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct DofGlobals {
    /// x = focus plane distance, y = max CoC, z = max bokeh radius, w = reciprocal aspect.
    pub coc_params: [f32; 4],
    /// x = width, y = height, z = 1/width, w = 1/height (after dynamic resolution scaling).
    pub source_size: [f32; 4],
    /// x, y = 1/downsample, z, w = downsample.
    pub downsample_scale_factor: [f32; 4],
    /// x = blur margin (downsample / height), y = 2 * margin.
    pub bokeh_constants: [f32; 4],
    /// x = near plane, y = far plane.
    pub z_buffer_params: [f32; 4],
    /// Per tap: (u * radius, v * radius, length, u * radius * reciprocal aspect).
    pub bokeh_kernel: [[f32; 4]; BOKEH_KERNEL_SIZE],
}

impl Default for DofGlobals {
    fn default() -> Self {
        Self::zeroed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dof_globals_layout_matches_wgsl() {
        // 5 vec4 headers + 42 vec4 kernel taps, no padding
        assert_eq!(std::mem::size_of::<DofGlobals>(), 752);
        assert_eq!(std::mem::size_of::<DofGlobals>() % 16, 0);
    }

    #[test]
    fn default_is_zeroed() {
        let globals = DofGlobals::default();
        assert!(bytemuck::bytes_of(&globals).iter().all(|&b| b == 0));
    }
}
