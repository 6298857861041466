//! Per-frame CPU work: skip decisions, lens parameters, kernel and the globals block.

use bokehdof_gpu_shared::uniforms::DofGlobals;

use crate::camera::CameraState;
use crate::kernel::{BladeShape, KernelCache};
use crate::lens::{compute_coc_params, CoCParams, FocusResolver};
use crate::settings::EffectSettings;

/// Why a frame recorded no passes. The source is left untouched in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No settings bound to the camera.
    NoSettings,
    Inactive,
    /// Sample count <= 1; the effect requires MSAA.
    MultisampleDisabled,
    /// Pipelines failed to build.
    ShaderUnavailable,
    Disposed,
}

/// Everything the GPU side needs for one frame.
#[derive(Debug, Clone)]
pub struct FramePlan {
    pub coc: CoCParams,
    pub down_sample: u32,
    pub full_size: (u32, u32),
    pub half_size: (u32, u32),
    pub globals: DofGlobals,
}

#[derive(Debug, Clone)]
pub enum FrameDecision {
    Run(FramePlan),
    Skip(SkipReason),
}

/// Decide whether the effect runs this frame and, if so, assemble its parameters.
pub fn plan_frame(
    settings: Option<&EffectSettings>,
    camera: &CameraState,
    resolver: &dyn FocusResolver,
    kernels: &mut KernelCache,
) -> FrameDecision {
    let Some(settings) = settings else {
        return FrameDecision::Skip(SkipReason::NoSettings);
    };
    if !settings.active {
        return FrameDecision::Skip(SkipReason::Inactive);
    }
    if camera.msaa_samples <= 1 {
        return FrameDecision::Skip(SkipReason::MultisampleDisabled);
    }

    let coc = compute_coc_params(settings, camera, resolver);
    let shape = BladeShape {
        count: settings.blade_count,
        curvature: settings.blade_curvature,
        rotation_degrees: settings.blade_rotation,
    };
    let kernel = kernels.get_or_build(&shape, coc.max_radius, coc.rcp_aspect);

    let ds = settings.down_sample as f32;
    let margin = (1.0 / camera.viewport_height as f32) * ds;

    let globals = DofGlobals {
        coc_params: coc.to_vec4(),
        source_size: camera.source_size(),
        downsample_scale_factor: [1.0 / ds, 1.0 / ds, ds, ds],
        bokeh_constants: [margin, margin * 2.0, 0.0, 0.0],
        z_buffer_params: [camera.near_plane, camera.far_plane, 0.0, 0.0],
        bokeh_kernel: *kernel.taps(),
    };

    FrameDecision::Run(FramePlan {
        coc,
        down_sample: settings.down_sample,
        full_size: camera.full_size(),
        half_size: camera.downsampled_size(settings.down_sample),
        globals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens::NoFocusTargets;

    fn run(decision: FrameDecision) -> FramePlan {
        match decision {
            FrameDecision::Run(plan) => plan,
            FrameDecision::Skip(reason) => panic!("unexpected skip: {reason:?}"),
        }
    }

    #[test]
    fn missing_or_inactive_settings_skip() {
        let cam = CameraState::new(1920, 1080, 0.05);
        let mut kernels = KernelCache::new();
        assert!(matches!(
            plan_frame(None, &cam, &NoFocusTargets, &mut kernels),
            FrameDecision::Skip(SkipReason::NoSettings)
        ));

        let inactive = EffectSettings { active: false, ..Default::default() };
        assert!(matches!(
            plan_frame(Some(&inactive), &cam, &NoFocusTargets, &mut kernels),
            FrameDecision::Skip(SkipReason::Inactive)
        ));
        assert_eq!(kernels.rebuild_count(), 0);
    }

    #[test]
    fn single_sample_camera_skips() {
        let mut cam = CameraState::new(1920, 1080, 0.05);
        let settings = EffectSettings::default();
        let mut kernels = KernelCache::new();
        for samples in [0, 1] {
            cam.msaa_samples = samples;
            assert!(matches!(
                plan_frame(Some(&settings), &cam, &NoFocusTargets, &mut kernels),
                FrameDecision::Skip(SkipReason::MultisampleDisabled)
            ));
        }
    }

    #[test]
    fn globals_follow_shader_layout() {
        let mut cam = CameraState::new(1920, 1080, 0.05);
        cam.near_plane = 0.3;
        cam.far_plane = 500.0;
        let settings = EffectSettings { down_sample: 4, ..Default::default() };
        let mut kernels = KernelCache::new();
        let plan = run(plan_frame(Some(&settings), &cam, &NoFocusTargets, &mut kernels));

        assert_eq!(plan.full_size, (1920, 1080));
        assert_eq!(plan.half_size, (480, 270));
        assert_eq!(plan.globals.coc_params, plan.coc.to_vec4());
        assert_eq!(plan.globals.source_size[0], 1920.0);
        assert_eq!(plan.globals.downsample_scale_factor, [0.25, 0.25, 4.0, 4.0]);
        assert!((plan.globals.bokeh_constants[0] - 4.0 / 1080.0).abs() < 1e-7);
        assert_eq!(plan.globals.bokeh_constants[1], plan.globals.bokeh_constants[0] * 2.0);
        assert_eq!(plan.globals.z_buffer_params, [0.3, 500.0, 0.0, 0.0]);
        assert_ne!(plan.globals.bokeh_kernel[0], [0.0; 4]);
    }

    #[test]
    fn unchanged_frames_reuse_kernel() {
        let cam = CameraState::new(1920, 1080, 0.05);
        let mut settings = EffectSettings::default();
        let mut kernels = KernelCache::new();
        run(plan_frame(Some(&settings), &cam, &NoFocusTargets, &mut kernels));
        run(plan_frame(Some(&settings), &cam, &NoFocusTargets, &mut kernels));
        assert_eq!(kernels.rebuild_count(), 1);

        // Focus changes do not touch the kernel; blade changes do
        settings.set_focus_distance(3.0);
        run(plan_frame(Some(&settings), &cam, &NoFocusTargets, &mut kernels));
        assert_eq!(kernels.rebuild_count(), 1);
        settings.set_blade_rotation(15.0);
        run(plan_frame(Some(&settings), &cam, &NoFocusTargets, &mut kernels));
        assert_eq!(kernels.rebuild_count(), 2);
    }

    #[test]
    fn focus_at_focal_length_still_plans() {
        let cam = CameraState::new(1280, 720, 0.1);
        let settings = EffectSettings { focus_distance: 0.1, ..Default::default() };
        let mut kernels = KernelCache::new();
        let plan = run(plan_frame(Some(&settings), &cam, &NoFocusTargets, &mut kernels));
        assert!(plan.coc.max_coc.is_infinite());
    }
}
