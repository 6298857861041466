//! Render pass implementations for the depth-of-field pipeline.

pub mod dof;
