//! Error types for the depth-of-field pipeline.

use thiserror::Error;

/// Failures surfaced to the host's frame setup.
///
/// Skipped frames (inactive settings, MSAA off, shader unavailable) are not
/// errors; see [`crate::DofOutcome::Skipped`].
#[derive(Error, Debug)]
pub enum DofError {
    #[error("failed to allocate surface '{label}' ({width}x{height}): {reason}")]
    SurfaceAllocation {
        label: &'static str,
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("surface '{label}' has invalid extent {width}x{height} (device limit {max})")]
    InvalidExtent {
        label: &'static str,
        width: u32,
        height: u32,
        max: u32,
    },

    #[error("destination format {actual:?} does not match composite format {expected:?}")]
    FormatMismatch {
        expected: wgpu::TextureFormat,
        actual: wgpu::TextureFormat,
    },

    #[error("source target '{0}' has no depth attachment")]
    MissingDepth(&'static str),

    #[error("texture '{label}' is missing usage {missing:?}")]
    MissingUsage {
        label: &'static str,
        missing: wgpu::TextureUsages,
    },

    #[error("depth for '{label}' has {samples} samples; resolve it to a single-sample texture first")]
    MultisampledDepth { label: &'static str, samples: u32 },

    /// `expected` is `None` when no frame has been prepared.
    #[error("{pass:?} recorded out of order (expected {expected:?})")]
    PassOrder {
        pass: crate::DofPass,
        expected: Option<crate::DofPass>,
    },
}

pub type Result<T> = std::result::Result<T, DofError>;
