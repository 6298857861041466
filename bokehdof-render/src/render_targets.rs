//! Render target creation and the intermediate surface pool.
//! Full-res CoC, half-res ping/pong, and an optional full-res composite scratch.

use crate::error::{DofError, Result};

/// Full-res CoC format; CoC is remapped to [0, 1] with 0.5 in focus.
pub const COC_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;
/// Half-res ping/pong format (color + signed CoC in alpha).
pub const HALF_RES_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Depth format for host targets created with `with_depth`.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub const COC_LABEL: &str = "DOF CoC";
pub const PING_LABEL: &str = "DOF Ping";
pub const PONG_LABEL: &str = "DOF Pong";
pub const COMPOSITE_LABEL: &str = "DOF Composite";

/// A color texture plus optional depth, with views.
pub struct RenderTarget {
    pub color_texture: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    pub depth_texture: Option<wgpu::Texture>,
    pub depth_view: Option<wgpu::TextureView>,
    pub width: u32,
    pub height: u32,
}

impl RenderTarget {
    pub fn format(&self) -> wgpu::TextureFormat {
        self.color_texture.format()
    }

    pub fn desc(&self) -> SurfaceDesc {
        SurfaceDesc {
            width: self.width,
            height: self.height,
            format: self.format(),
        }
    }

    fn destroy(&self) {
        self.color_texture.destroy();
        if let Some(depth) = &self.depth_texture {
            depth.destroy();
        }
    }
}

/// Create a render target with a specific format.
pub fn create_render_target(
    device: &wgpu::Device,
    width: u32,
    height: u32,
    label: &str,
    format: wgpu::TextureFormat,
    with_depth: bool,
) -> RenderTarget {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };

    let color_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let color_view = color_texture.create_view(&wgpu::TextureViewDescriptor::default());

    let (depth_texture, depth_view) = if with_depth {
        let dt = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("{label} Depth")),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let dv = dt.create_view(&wgpu::TextureViewDescriptor::default());
        (Some(dt), Some(dv))
    } else {
        (None, None)
    };

    RenderTarget {
        color_texture,
        color_view,
        depth_texture,
        depth_view,
        width,
        height,
    }
}

/// Size and format of a pooled surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceDesc {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

/// Surface descriptors required for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceRequest {
    pub coc: SurfaceDesc,
    pub ping: SurfaceDesc,
    pub pong: SurfaceDesc,
    /// Only requested when compositing in place.
    pub composite: Option<SurfaceDesc>,
}

impl SurfaceRequest {
    pub fn new(
        full_size: (u32, u32),
        half_size: (u32, u32),
        composite_format: Option<wgpu::TextureFormat>,
    ) -> Self {
        let (width, height) = full_size;
        let half = SurfaceDesc {
            width: half_size.0,
            height: half_size.1,
            format: HALF_RES_FORMAT,
        };
        Self {
            coc: SurfaceDesc { width, height, format: COC_FORMAT },
            ping: half,
            pong: half,
            composite: composite_format.map(|format| SurfaceDesc { width, height, format }),
        }
    }
}

/// True when the existing allocation cannot be reused for `required`.
pub fn needs_realloc(current: Option<SurfaceDesc>, required: SurfaceDesc) -> bool {
    current != Some(required)
}

/// Reject zero or over-limit extents before they reach the device.
pub fn validate_extent(label: &'static str, width: u32, height: u32, max: u32) -> Result<()> {
    if width == 0 || height == 0 || width > max || height > max {
        return Err(DofError::InvalidExtent { label, width, height, max });
    }
    Ok(())
}

/// Allocate a pooled surface, capturing out-of-memory and validation errors.
fn allocate_surface(device: &wgpu::Device, label: &'static str, desc: SurfaceDesc) -> Result<RenderTarget> {
    validate_extent(label, desc.width, desc.height, device.limits().max_texture_dimension_2d)?;

    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let target = create_render_target(device, desc.width, desc.height, label, desc.format, false);
    let validation = pollster::block_on(device.pop_error_scope());
    let out_of_memory = pollster::block_on(device.pop_error_scope());

    if let Some(err) = validation.or(out_of_memory) {
        return Err(DofError::SurfaceAllocation {
            label,
            width: desc.width,
            height: desc.height,
            reason: err.to_string(),
        });
    }

    log::debug!(
        "Allocated {label} surface {}x{} ({:?})",
        desc.width,
        desc.height,
        desc.format
    );
    Ok(target)
}

fn ensure_slot(
    device: &wgpu::Device,
    slot: &mut Option<RenderTarget>,
    label: &'static str,
    required: SurfaceDesc,
) -> Result<bool> {
    if !needs_realloc(slot.as_ref().map(RenderTarget::desc), required) {
        return Ok(false);
    }
    if let Some(old) = slot.take() {
        old.destroy();
    }
    *slot = Some(allocate_surface(device, label, required)?);
    Ok(true)
}

/// Intermediate surfaces owned by one pipeline, reused across frames.
#[derive(Default)]
pub struct SurfacePool {
    coc: Option<RenderTarget>,
    ping: Option<RenderTarget>,
    pong: Option<RenderTarget>,
    composite: Option<RenderTarget>,
    allocations: u64,
}

impl SurfacePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every requested surface match its descriptor.
    /// Returns true if anything was (re)allocated.
    pub fn ensure(&mut self, device: &wgpu::Device, request: &SurfaceRequest) -> Result<bool> {
        let mut changed = false;
        for (slot, label, desc) in [
            (&mut self.coc, COC_LABEL, request.coc),
            (&mut self.ping, PING_LABEL, request.ping),
            (&mut self.pong, PONG_LABEL, request.pong),
        ] {
            if ensure_slot(device, slot, label, desc)? {
                self.allocations += 1;
                changed = true;
            }
        }
        match request.composite {
            Some(desc) => {
                if ensure_slot(device, &mut self.composite, COMPOSITE_LABEL, desc)? {
                    self.allocations += 1;
                    changed = true;
                }
            }
            // Separate destinations write directly, so the in-place scratch is dropped
            None => changed |= self.release_composite(),
        }
        Ok(changed)
    }

    pub fn coc(&self) -> Option<&RenderTarget> {
        self.coc.as_ref()
    }

    pub fn ping(&self) -> Option<&RenderTarget> {
        self.ping.as_ref()
    }

    pub fn pong(&self) -> Option<&RenderTarget> {
        self.pong.as_ref()
    }

    pub fn composite(&self) -> Option<&RenderTarget> {
        self.composite.as_ref()
    }

    /// Number of surfaces currently allocated.
    pub fn live_surfaces(&self) -> usize {
        [&self.coc, &self.ping, &self.pong, &self.composite]
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }

    /// Total allocations since creation; unchanged frames do not bump it.
    pub fn allocation_count(&self) -> u64 {
        self.allocations
    }

    /// Destroy the in-place composite scratch. Returns true if one was live.
    pub fn release_composite(&mut self) -> bool {
        match self.composite.take() {
            Some(target) => {
                target.destroy();
                log::debug!("Released {COMPOSITE_LABEL}");
                true
            }
            None => false,
        }
    }

    /// Destroy every surface. Safe to call repeatedly.
    pub fn release(&mut self) {
        for slot in [&mut self.coc, &mut self.ping, &mut self.pong, &mut self.composite] {
            if let Some(target) = slot.take() {
                target.destroy();
            }
        }
    }
}
