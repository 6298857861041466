//! Per-frame camera state supplied by the host.

use glam::Mat4;

/// Camera viewport rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Everything the effect reads from the camera for one frame. Read-only to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraState {
    /// Physical focal length in meters (a 50 mm lens is `0.05`).
    ///
    /// The CoC scale is `F^2 / (N * (P - F))` with everything in meters, so a
    /// typical lens focused a few meters away blurs by well under a texel.
    /// Visible blur needs the focus distance close to the focal length, a wide
    /// aperture, or both.
    pub focal_length_meters: f32,
    pub view_to_world: Mat4,
    /// Dimensions of the camera target descriptor; all surface sizing derives from these.
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Carried for hosts rendering into a sub-rect. Passes always cover the whole target.
    pub pixel_rect: PixelRect,
    pub msaa_samples: u32,
    pub near_plane: f32,
    pub far_plane: f32,
    /// Dynamic-resolution scale `(sx, sy)` applied to the shader-facing source size.
    pub dynamic_scale: Option<(f32, f32)>,
}

impl CameraState {
    /// Camera with a full-target pixel rect, identity transform and 4x MSAA.
    pub fn new(viewport_width: u32, viewport_height: u32, focal_length_meters: f32) -> Self {
        Self {
            focal_length_meters,
            view_to_world: Mat4::IDENTITY,
            viewport_width,
            viewport_height,
            pixel_rect: PixelRect {
                x: 0.0,
                y: 0.0,
                width: viewport_width as f32,
                height: viewport_height as f32,
            },
            msaa_samples: 4,
            near_plane: 0.1,
            far_plane: 1000.0,
            dynamic_scale: None,
        }
    }

    pub fn world_to_view(&self) -> Mat4 {
        self.view_to_world.inverse()
    }

    pub fn full_size(&self) -> (u32, u32) {
        (self.viewport_width, self.viewport_height)
    }

    /// Half-res surface size: full size divided by `down_sample`, floored, at least 1.
    pub fn downsampled_size(&self, down_sample: u32) -> (u32, u32) {
        let ds = down_sample.max(1);
        ((self.viewport_width / ds).max(1), (self.viewport_height / ds).max(1))
    }

    /// `(w, h, 1/w, 1/h)` after dynamic-resolution scaling.
    pub fn source_size(&self) -> [f32; 4] {
        let (sx, sy) = self.dynamic_scale.unwrap_or((1.0, 1.0));
        let w = self.viewport_width as f32 * sx;
        let h = self.viewport_height as f32 * sy;
        [w, h, 1.0 / w, 1.0 / h]
    }
}
