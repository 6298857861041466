//! Thin-lens (Potmesil) circle-of-confusion model.
//!
//! All lengths are meters: the focal length comes from the camera in meters
//! and the focus distance is stored in meters.

use glam::Vec3;

use crate::camera::CameraState;
use crate::settings::{EffectSettings, FocusTarget};

/// Bokeh radius cap in pixels, converted to a fraction of viewport height.
pub const MAX_BOKEH_RADIUS_PIXELS: f32 = 14.0;
/// Upper bound on the bokeh radius as a fraction of viewport height.
pub const MAX_BOKEH_RADIUS_FRACTION: f32 = 0.05;

/// Resolves auto-focus targets to world-space positions once per frame.
///
/// Returning `None` means the node is gone; the lens then falls back to the
/// manual focus distance.
pub trait FocusResolver {
    fn resolve(&self, target: FocusTarget) -> Option<Vec3>;
}

impl<F> FocusResolver for F
where
    F: Fn(FocusTarget) -> Option<Vec3>,
{
    fn resolve(&self, target: FocusTarget) -> Option<Vec3> {
        self(target)
    }
}

/// Resolver for hosts without a scene graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFocusTargets;

impl FocusResolver for NoFocusTargets {
    fn resolve(&self, _target: FocusTarget) -> Option<Vec3> {
        None
    }
}

/// Per-frame lens parameters, bound as `DofGlobals::coc_params`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoCParams {
    pub focus_distance: f32,
    pub max_coc: f32,
    pub max_radius: f32,
    pub rcp_aspect: f32,
}

impl CoCParams {
    pub fn to_vec4(&self) -> [f32; 4] {
        [self.focus_distance, self.max_coc, self.max_radius, self.rcp_aspect]
    }
}

/// Distance to the focus plane.
///
/// With auto-focus on and a live target, this is the absolute view-space z of
/// the target; otherwise the manual focus distance.
pub fn focus_plane_distance(
    settings: &EffectSettings,
    camera: &CameraState,
    resolver: &dyn FocusResolver,
) -> f32 {
    if !settings.auto_focus {
        return settings.focus_distance;
    }
    settings
        .focus_target
        .and_then(|target| resolver.resolve(target))
        .map(|world| camera.world_to_view().transform_point3(world).z.abs())
        .unwrap_or(settings.focus_distance)
}

/// `(F / aperture * F) / (P - F)`. Infinite when `P == F`; left unclamped.
///
/// `focal_length` and `focus_distance` are both meters. The result is a
/// fraction of [`max_bokeh_radius`], so a 50 mm f/5.6 lens focused at 10 m
/// gives about 4.5e-5: far below one texel at any viewport size. Blur only
/// becomes visible as `focus_distance` approaches `focal_length`.
pub fn max_coc(focal_length: f32, aperture: f32, focus_distance: f32) -> f32 {
    let a = focal_length / aperture;
    (a * focal_length) / (focus_distance - focal_length)
}

/// Bokeh radius as a fraction of viewport height: `min(0.05, 14 / h)`.
pub fn max_bokeh_radius(viewport_height: f32) -> f32 {
    MAX_BOKEH_RADIUS_FRACTION.min(MAX_BOKEH_RADIUS_PIXELS / viewport_height)
}

/// Width-over-height of the downsampled surfaces, inverted.
pub fn reciprocal_aspect(half_width: u32, half_height: u32) -> f32 {
    1.0 / (half_width as f32 / half_height as f32)
}

pub fn compute_coc_params(
    settings: &EffectSettings,
    camera: &CameraState,
    resolver: &dyn FocusResolver,
) -> CoCParams {
    let focus_distance = focus_plane_distance(settings, camera, resolver);
    let (half_w, half_h) = camera.downsampled_size(settings.down_sample);
    CoCParams {
        focus_distance,
        max_coc: max_coc(camera.focal_length_meters, settings.aperture, focus_distance),
        max_radius: max_bokeh_radius(camera.viewport_height as f32),
        rcp_aspect: reciprocal_aspect(half_w, half_h),
    }
}
