//! Depth of Field passes: CoC, prefilter, bokeh blur, post-filter, composite.

/// The five passes in the order they must be recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DofPass {
    CoC,
    Prefilter,
    Blur,
    PostFilter,
    Composite,
}

/// Surfaces a pass reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceRef {
    SourceColor,
    SceneDepth,
    FullResCoC,
    Ping,
    Pong,
    Destination,
}

impl DofPass {
    pub const ALL: [DofPass; 5] = [
        DofPass::CoC,
        DofPass::Prefilter,
        DofPass::Blur,
        DofPass::PostFilter,
        DofPass::Composite,
    ];

    pub fn index(self) -> usize {
        match self {
            DofPass::CoC => 0,
            DofPass::Prefilter => 1,
            DofPass::Blur => 2,
            DofPass::PostFilter => 3,
            DofPass::Composite => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DofPass::CoC => "DOF CoC Pass",
            DofPass::Prefilter => "DOF Prefilter Pass",
            DofPass::Blur => "DOF Bokeh Blur Pass",
            DofPass::PostFilter => "DOF Post-Filter Pass",
            DofPass::Composite => "DOF Composite Pass",
        }
    }

    pub fn inputs(self) -> &'static [SurfaceRef] {
        match self {
            DofPass::CoC => &[SurfaceRef::SceneDepth],
            DofPass::Prefilter => &[SurfaceRef::SourceColor, SurfaceRef::FullResCoC],
            DofPass::Blur => &[SurfaceRef::Ping],
            DofPass::PostFilter => &[SurfaceRef::Pong],
            DofPass::Composite => &[SurfaceRef::SourceColor, SurfaceRef::FullResCoC, SurfaceRef::Ping],
        }
    }

    pub fn output(self) -> SurfaceRef {
        match self {
            DofPass::CoC => SurfaceRef::FullResCoC,
            DofPass::Prefilter => SurfaceRef::Ping,
            DofPass::Blur => SurfaceRef::Pong,
            DofPass::PostFilter => SurfaceRef::Ping,
            DofPass::Composite => SurfaceRef::Destination,
        }
    }

    /// Pass expected after this one, if any.
    pub fn next(self) -> Option<DofPass> {
        DofPass::ALL.get(self.index() + 1).copied()
    }
}

/// Record one fullscreen triangle into `target`.
pub fn render_dof_pass(
    encoder: &mut wgpu::CommandEncoder,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
    label: &str,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        ..Default::default()
    });

    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.draw(0..3, 0..1);
}

/// Copy the composite scratch back into the camera color texture.
pub fn copy_composite_to_source(
    encoder: &mut wgpu::CommandEncoder,
    composite: &wgpu::Texture,
    source: &wgpu::Texture,
    width: u32,
    height: u32,
) {
    encoder.copy_texture_to_texture(
        wgpu::ImageCopyTexture {
            texture: composite,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyTexture {
            texture: source,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}
