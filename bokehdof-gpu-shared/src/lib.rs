//! GPU-side data shared by the bokeh depth-of-field passes: the uniform block
//! layout and the embedded WGSL sources.

pub mod shaders;
pub mod uniforms;
