//! Per-camera depth-of-field pipeline: setup, per-frame execution, teardown.

use crate::camera::CameraState;
use crate::error::{DofError, Result};
use crate::frame::{plan_frame, FrameDecision, FramePlan, SkipReason};
use crate::kernel::KernelCache;
use crate::lens::FocusResolver;
use crate::passes::dof::{copy_composite_to_source, render_dof_pass, DofPass, SurfaceRef};
use crate::pipeline::{DofPipelines, DofShaderSources};
use crate::render_targets::{RenderTarget, SurfacePool, SurfaceRequest};
use crate::settings::EffectSettings;

/// Where the composite pass writes.
#[derive(Clone, Copy)]
pub enum Destination<'a> {
    /// A separate target with the pipeline's color format.
    Separate(&'a RenderTarget),
    /// Back into the source color texture, through a pooled scratch surface.
    InPlace,
}

/// Host-owned surfaces for one frame.
#[derive(Clone, Copy)]
pub struct DofInputs<'a> {
    /// Camera color with its depth attachment.
    ///
    /// The color texture needs `TEXTURE_BINDING` (plus `COPY_DST` for
    /// [`Destination::InPlace`]). Depth must be single-sampled with
    /// `TEXTURE_BINDING`; resolve a multisampled depth buffer before the effect.
    pub source: &'a RenderTarget,
    pub destination: Destination<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DofOutcome {
    Skipped(SkipReason),
    Composited { passes: usize, output: SurfaceRef },
}

impl DofOutcome {
    pub fn recorded_passes(&self) -> usize {
        match self {
            DofOutcome::Skipped(_) => 0,
            DofOutcome::Composited { passes, .. } => *passes,
        }
    }
}

const SOURCE_LABEL: &str = "camera color";

/// Error unless `actual` contains every flag in `required`.
pub fn check_usage(label: &'static str, actual: wgpu::TextureUsages, required: wgpu::TextureUsages) -> Result<()> {
    let missing = required - actual;
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DofError::MissingUsage { label, missing })
    }
}

/// Usage each host texture needs for the given destination:
/// (source color, depth, separate destination).
pub fn required_usages(destination: &Destination<'_>) -> (wgpu::TextureUsages, wgpu::TextureUsages, wgpu::TextureUsages) {
    let mut color = wgpu::TextureUsages::TEXTURE_BINDING;
    if matches!(destination, Destination::InPlace) {
        color |= wgpu::TextureUsages::COPY_DST;
    }
    (color, wgpu::TextureUsages::TEXTURE_BINDING, wgpu::TextureUsages::RENDER_ATTACHMENT)
}

fn validate_inputs(inputs: &DofInputs<'_>) -> Result<()> {
    let source = inputs.source;
    let Some(depth) = &source.depth_texture else {
        return Err(DofError::MissingDepth(SOURCE_LABEL));
    };
    let (color_usage, depth_usage, dest_usage) = required_usages(&inputs.destination);

    if depth.sample_count() != 1 {
        return Err(DofError::MultisampledDepth { label: SOURCE_LABEL, samples: depth.sample_count() });
    }
    check_usage(SOURCE_LABEL, source.color_texture.usage(), color_usage)?;
    check_usage("camera depth", depth.usage(), depth_usage)?;
    if let Destination::Separate(target) = inputs.destination {
        check_usage("DOF destination", target.color_texture.usage(), dest_usage)?;
    }
    Ok(())
}

/// Bokeh depth of field for one camera.
///
/// Call [`setup`](Self::setup) with the camera's settings, then either
/// [`execute`](Self::execute) for the whole chain or
/// [`prepare`](Self::prepare) followed by [`execute_pass`](Self::execute_pass)
/// for each [`DofPass`] in order.
pub struct DepthOfFieldPipeline {
    pipelines: Option<DofPipelines>,
    surfaces: SurfacePool,
    kernels: KernelCache,
    settings: Option<EffectSettings>,
    color_format: wgpu::TextureFormat,
    prepared: Option<FramePlan>,
    next_pass: Option<DofPass>,
    disposed: bool,
}

impl DepthOfFieldPipeline {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> Self {
        Self::with_shader_sources(device, color_format, &DofShaderSources::default())
    }

    /// A shader that fails to build leaves the pipeline in a permanent skip state.
    pub fn with_shader_sources(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        sources: &DofShaderSources<'_>,
    ) -> Self {
        let pipelines = match DofPipelines::new(device, color_format, sources) {
            Ok(pipelines) => {
                log::info!("DOF pipeline created (composite format {color_format:?})");
                Some(pipelines)
            }
            Err(e) => {
                log::error!("{e}");
                None
            }
        };

        Self {
            pipelines,
            surfaces: SurfacePool::new(),
            kernels: KernelCache::new(),
            settings: None,
            color_format,
            prepared: None,
            next_pass: None,
            disposed: false,
        }
    }

    /// Bind this frame's settings. Returns whether the effect should be enqueued.
    pub fn setup(&mut self, settings: Option<&EffectSettings>) -> bool {
        self.settings = settings.cloned();
        !self.disposed && self.pipelines.is_some() && settings.is_some_and(|s| s.active)
    }

    /// CPU work for a frame: parameters, kernel, surface sizing and the globals upload.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        camera: &CameraState,
        resolver: &dyn FocusResolver,
        inputs: &DofInputs<'_>,
    ) -> Result<FrameDecision> {
        self.prepared = None;
        self.next_pass = None;

        if self.disposed {
            return Ok(FrameDecision::Skip(SkipReason::Disposed));
        }
        let Some(pipelines) = &self.pipelines else {
            log::warn!("DOF shader unavailable, skipping frame");
            return Ok(FrameDecision::Skip(SkipReason::ShaderUnavailable));
        };

        let plan = match plan_frame(self.settings.as_ref(), camera, resolver, &mut self.kernels) {
            FrameDecision::Run(plan) => plan,
            skip => return Ok(skip),
        };

        validate_inputs(inputs)?;
        let actual = match inputs.destination {
            Destination::Separate(target) => target.format(),
            Destination::InPlace => inputs.source.format(),
        };
        if actual != self.color_format {
            return Err(DofError::FormatMismatch {
                expected: self.color_format,
                actual,
            });
        }

        let composite_format = matches!(inputs.destination, Destination::InPlace).then_some(self.color_format);
        let request = SurfaceRequest::new(plan.full_size, plan.half_size, composite_format);
        if self.surfaces.ensure(device, &request)? {
            log::debug!(
                "DOF surfaces sized to {}x{} (half-res {}x{}, downsample {})",
                plan.full_size.0,
                plan.full_size.1,
                plan.half_size.0,
                plan.half_size.1,
                plan.down_sample
            );
        }

        queue.write_buffer(&pipelines.globals_buffer, 0, bytemuck::bytes_of(&plan.globals));
        self.prepared = Some(plan.clone());
        self.next_pass = Some(DofPass::CoC);
        Ok(FrameDecision::Run(plan))
    }

    /// Record one pass. Passes must follow [`DofPass::ALL`] after a successful `prepare`.
    /// Returns the surface the pass wrote.
    pub fn execute_pass(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        pass: DofPass,
        inputs: &DofInputs<'_>,
    ) -> Result<SurfaceRef> {
        let order_error = DofError::PassOrder { pass, expected: self.next_pass };
        if self.next_pass != Some(pass) {
            return Err(order_error);
        }
        let (Some(pipelines), Some(plan)) = (&self.pipelines, &self.prepared) else {
            return Err(order_error);
        };
        let (Some(coc), Some(ping), Some(pong)) =
            (self.surfaces.coc(), self.surfaces.ping(), self.surfaces.pong())
        else {
            return Err(order_error);
        };
        let globals = wgpu::BindGroupEntry {
            binding: 0,
            resource: pipelines.globals_buffer.as_entire_binding(),
        };

        let written = match pass {
            DofPass::CoC => {
                let depth_view = inputs
                    .source
                    .depth_view
                    .as_ref()
                    .ok_or(DofError::MissingDepth(SOURCE_LABEL))?;
                let bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("DOF CoC BG"),
                    layout: &pipelines.coc_bgl,
                    entries: &[globals, wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(depth_view) }],
                });
                render_dof_pass(encoder, &coc.color_view, &pipelines.coc_pipeline, &bg, pass.label());
                SurfaceRef::FullResCoC
            }
            DofPass::Prefilter => {
                let bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("DOF Prefilter BG"),
                    layout: &pipelines.prefilter_bgl,
                    entries: &[
                        globals,
                        wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(&inputs.source.color_view) },
                        wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::TextureView(&coc.color_view) },
                        wgpu::BindGroupEntry { binding: 3, resource: wgpu::BindingResource::Sampler(&pipelines.linear_sampler) },
                    ],
                });
                render_dof_pass(encoder, &ping.color_view, &pipelines.prefilter_pipeline, &bg, pass.label());
                SurfaceRef::Ping
            }
            DofPass::Blur => {
                let bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("DOF Bokeh Blur BG"),
                    layout: &pipelines.half_res_bgl,
                    entries: &[
                        globals,
                        wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(&ping.color_view) },
                        wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::Sampler(&pipelines.linear_sampler) },
                    ],
                });
                render_dof_pass(encoder, &pong.color_view, &pipelines.bokeh_blur_pipeline, &bg, pass.label());
                SurfaceRef::Pong
            }
            DofPass::PostFilter => {
                let bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("DOF Post-Filter BG"),
                    layout: &pipelines.half_res_bgl,
                    entries: &[
                        globals,
                        wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(&pong.color_view) },
                        wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::Sampler(&pipelines.linear_sampler) },
                    ],
                });
                render_dof_pass(encoder, &ping.color_view, &pipelines.postfilter_pipeline, &bg, pass.label());
                SurfaceRef::Ping
            }
            DofPass::Composite => {
                let bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("DOF Composite BG"),
                    layout: &pipelines.composite_bgl,
                    entries: &[
                        globals,
                        wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(&inputs.source.color_view) },
                        wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::TextureView(&coc.color_view) },
                        wgpu::BindGroupEntry { binding: 3, resource: wgpu::BindingResource::TextureView(&ping.color_view) },
                        wgpu::BindGroupEntry { binding: 4, resource: wgpu::BindingResource::Sampler(&pipelines.linear_sampler) },
                        wgpu::BindGroupEntry { binding: 5, resource: wgpu::BindingResource::Sampler(&pipelines.point_sampler) },
                    ],
                });
                match inputs.destination {
                    Destination::Separate(target) => {
                        render_dof_pass(encoder, &target.color_view, &pipelines.composite_pipeline, &bg, pass.label());
                        SurfaceRef::Destination
                    }
                    Destination::InPlace => {
                        let scratch = self.surfaces.composite().ok_or(order_error)?;
                        render_dof_pass(encoder, &scratch.color_view, &pipelines.composite_pipeline, &bg, pass.label());

                        // Copy the composite back so the rest of the frame reads the DOF result
                        let w = scratch.width.min(inputs.source.width).min(plan.full_size.0);
                        let h = scratch.height.min(inputs.source.height).min(plan.full_size.1);
                        copy_composite_to_source(encoder, &scratch.color_texture, &inputs.source.color_texture, w, h);
                        SurfaceRef::SourceColor
                    }
                }
            }
        };

        self.next_pass = pass.next();
        if self.next_pass.is_none() {
            self.prepared = None;
        }
        Ok(written)
    }

    /// Run the whole chain for one frame into `encoder`.
    pub fn execute(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        camera: &CameraState,
        resolver: &dyn FocusResolver,
        inputs: &DofInputs<'_>,
    ) -> Result<DofOutcome> {
        if let FrameDecision::Skip(reason) = self.prepare(device, queue, camera, resolver, inputs)? {
            return Ok(DofOutcome::Skipped(reason));
        }

        let mut output = SurfaceRef::Destination;
        for pass in DofPass::ALL {
            output = self.execute_pass(device, encoder, pass, inputs)?;
        }
        Ok(DofOutcome::Composited { passes: DofPass::ALL.len(), output })
    }

    /// Release surfaces, pipelines and the globals buffer. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.surfaces.release();
        if let Some(pipelines) = self.pipelines.take() {
            pipelines.globals_buffer.destroy();
        }
        self.kernels.invalidate();
        self.prepared = None;
        self.next_pass = None;
        self.disposed = true;
        log::debug!("DOF pipeline disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// False when the shaders failed to build or the pipeline was disposed.
    pub fn shader_available(&self) -> bool {
        self.pipelines.is_some()
    }

    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    pub fn settings(&self) -> Option<&EffectSettings> {
        self.settings.as_ref()
    }

    pub fn surfaces(&self) -> &SurfacePool {
        &self.surfaces
    }

    pub fn kernel_cache(&self) -> &KernelCache {
        &self.kernels
    }
}
