//! Bokeh depth of field for wgpu renderers.
//!
//! The effect runs five fullscreen passes (CoC, prefilter, bokeh blur,
//! post-filter, composite) against a host-owned color target and its depth.
//! CPU-side parameter work lives in [`lens`], [`kernel`] and [`frame`]; GPU
//! resources live in [`pipeline`] and [`render_targets`]; [`effect`] ties
//! them together per camera.

pub mod camera;
pub mod effect;
pub mod error;
pub mod frame;
pub mod kernel;
pub mod lens;
pub mod passes;
pub mod pipeline;
pub mod render_targets;
pub mod settings;

pub use camera::{CameraState, PixelRect};
pub use effect::{DepthOfFieldPipeline, Destination, DofInputs, DofOutcome};
pub use error::{DofError, Result};
pub use frame::{FrameDecision, SkipReason};
pub use lens::{CoCParams, FocusResolver, NoFocusTargets};
pub use passes::dof::{DofPass, SurfaceRef};
pub use render_targets::{RenderTarget, SurfacePool};
pub use settings::{EffectSettings, FocusTarget};
