/// Embedded WGSL shader source strings for the depth-of-field passes.
/// Every fragment source is compiled with `DOF_COMMON` prepended.

pub const FULLSCREEN_QUAD_VERT: &str = include_str!("../shaders/fullscreen_quad.wgsl");
pub const DOF_COMMON: &str = include_str!("../shaders/dof_common.wgsl");
pub const DOF_COC_FRAG: &str = include_str!("../shaders/dof_coc.wgsl");
pub const DOF_PREFILTER_FRAG: &str = include_str!("../shaders/dof_prefilter.wgsl");
pub const DOF_BOKEH_BLUR_FRAG: &str = include_str!("../shaders/dof_bokeh_blur.wgsl");
pub const DOF_POSTFILTER_FRAG: &str = include_str!("../shaders/dof_postfilter.wgsl");
pub const DOF_COMPOSITE_FRAG: &str = include_str!("../shaders/dof_composite.wgsl");

/// Join the shared globals block with a pass's fragment source.
pub fn with_common(frag_source: &str) -> String {
    format!("{DOF_COMMON}\n{frag_source}")
}
