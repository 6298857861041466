//! Bind group layouts and render pipelines for the depth-of-field passes.

use bokehdof_gpu_shared::shaders;
use bokehdof_gpu_shared::uniforms::DofGlobals;

use crate::render_targets::{COC_FORMAT, HALF_RES_FORMAT};

/// Fullscreen vertex state (no vertex buffers).
fn fullscreen_vertex_state(module: &wgpu::ShaderModule) -> wgpu::VertexState<'_> {
    wgpu::VertexState {
        module,
        entry_point: Some("vs_main"),
        compilation_options: wgpu::PipelineCompilationOptions::default(),
        buffers: &[],
    }
}

fn globals_entry() -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<DofGlobals>() as u64),
        },
        count: None,
    }
}

fn float_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

// ============================================================
// DOF Bind Group Layouts
// ============================================================

/// Sample type the scene depth is bound with. Depth formats also bind as
/// unfilterable float, which every backend (GL included) can `textureLoad`.
pub const DEPTH_SAMPLE_TYPE: wgpu::TextureSampleType = wgpu::TextureSampleType::Float { filterable: false };

/// DOF CoC BGL: globals + depth_texture (unfilterable float, loaded without a sampler)
pub fn create_dof_coc_bgl(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("DOF CoC BGL"),
        entries: &[
            globals_entry(),
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: DEPTH_SAMPLE_TYPE,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
        ],
    })
}

/// DOF prefilter BGL: globals + source_texture + coc_texture + linear sampler
pub fn create_dof_prefilter_bgl(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("DOF Prefilter BGL"),
        entries: &[globals_entry(), float_texture_entry(1), float_texture_entry(2), sampler_entry(3)],
    })
}

/// DOF half-res BGL (bokeh blur and post-filter): globals + source_texture + linear sampler
pub fn create_dof_half_res_bgl(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("DOF Half-Res BGL"),
        entries: &[globals_entry(), float_texture_entry(1), sampler_entry(2)],
    })
}

/// DOF composite BGL: globals + source_texture + coc_texture + dof_texture + linear + point samplers
pub fn create_dof_composite_bgl(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("DOF Composite BGL"),
        entries: &[
            globals_entry(),
            float_texture_entry(1),
            float_texture_entry(2),
            float_texture_entry(3),
            sampler_entry(4),
            sampler_entry(5),
        ],
    })
}

/// Create a fullscreen post-processing pipeline with the given fragment shader.
/// `frag_source` is compiled with the shared DOF globals block prepended.
pub fn create_fullscreen_effect_pipeline(
    device: &wgpu::Device,
    label: &str,
    frag_source: &str,
    frag_entry: &str,
    bgl: &wgpu::BindGroupLayout,
    output_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let vert_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Fullscreen Vert"),
        source: wgpu::ShaderSource::Wgsl(shaders::FULLSCREEN_QUAD_VERT.into()),
    });

    let frag_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(shaders::with_common(frag_source).into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{label} Layout")),
        bind_group_layouts: &[bgl],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: fullscreen_vertex_state(&vert_module),
        fragment: Some(wgpu::FragmentState {
            module: &frag_module,
            entry_point: Some(frag_entry),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: output_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Fragment sources for the five passes. Hosts may override them (e.g. hot reload).
#[derive(Debug, Clone, Copy)]
pub struct DofShaderSources<'a> {
    pub coc: &'a str,
    pub prefilter: &'a str,
    pub bokeh_blur: &'a str,
    pub postfilter: &'a str,
    pub composite: &'a str,
}

impl Default for DofShaderSources<'static> {
    fn default() -> Self {
        Self {
            coc: shaders::DOF_COC_FRAG,
            prefilter: shaders::DOF_PREFILTER_FRAG,
            bokeh_blur: shaders::DOF_BOKEH_BLUR_FRAG,
            postfilter: shaders::DOF_POSTFILTER_FRAG,
            composite: shaders::DOF_COMPOSITE_FRAG,
        }
    }
}

/// GPU objects shared by every frame: layouts, pipelines, samplers, the globals buffer.
pub struct DofPipelines {
    pub coc_bgl: wgpu::BindGroupLayout,
    pub prefilter_bgl: wgpu::BindGroupLayout,
    pub half_res_bgl: wgpu::BindGroupLayout,
    pub composite_bgl: wgpu::BindGroupLayout,

    pub coc_pipeline: wgpu::RenderPipeline,
    pub prefilter_pipeline: wgpu::RenderPipeline,
    pub bokeh_blur_pipeline: wgpu::RenderPipeline,
    pub postfilter_pipeline: wgpu::RenderPipeline,
    pub composite_pipeline: wgpu::RenderPipeline,

    pub linear_sampler: wgpu::Sampler,
    pub point_sampler: wgpu::Sampler,
    pub globals_buffer: wgpu::Buffer,

    pub color_format: wgpu::TextureFormat,
}

impl DofPipelines {
    /// Build every pipeline under a validation error scope. Shader compile or
    /// layout errors come back as `Err` instead of reaching the uncaptured handler.
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        sources: &DofShaderSources<'_>,
    ) -> Result<Self, String> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let coc_bgl = create_dof_coc_bgl(device);
        let prefilter_bgl = create_dof_prefilter_bgl(device);
        let half_res_bgl = create_dof_half_res_bgl(device);
        let composite_bgl = create_dof_composite_bgl(device);

        log::info!("Creating DOF pipelines (composite format {color_format:?})...");
        let coc_pipeline =
            create_fullscreen_effect_pipeline(device, "DOF CoC Pipeline", sources.coc, "fs_coc", &coc_bgl, COC_FORMAT);
        let prefilter_pipeline = create_fullscreen_effect_pipeline(
            device,
            "DOF Prefilter Pipeline",
            sources.prefilter,
            "fs_prefilter",
            &prefilter_bgl,
            HALF_RES_FORMAT,
        );
        let bokeh_blur_pipeline = create_fullscreen_effect_pipeline(
            device,
            "DOF Bokeh Blur Pipeline",
            sources.bokeh_blur,
            "fs_bokeh_blur",
            &half_res_bgl,
            HALF_RES_FORMAT,
        );
        let postfilter_pipeline = create_fullscreen_effect_pipeline(
            device,
            "DOF Post-Filter Pipeline",
            sources.postfilter,
            "fs_postfilter",
            &half_res_bgl,
            HALF_RES_FORMAT,
        );
        let composite_pipeline = create_fullscreen_effect_pipeline(
            device,
            "DOF Composite Pipeline",
            sources.composite,
            "fs_composite",
            &composite_bgl,
            color_format,
        );

        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("DOF Linear Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let point_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("DOF Point Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("DOF Globals"),
            size: std::mem::size_of::<DofGlobals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(format!("DOF pipeline creation failed: {err}"));
        }

        Ok(Self {
            coc_bgl,
            prefilter_bgl,
            half_res_bgl,
            composite_bgl,
            coc_pipeline,
            prefilter_pipeline,
            bokeh_blur_pipeline,
            postfilter_pipeline,
            composite_pipeline,
            linear_sampler,
            point_sampler,
            globals_buffer,
            color_format,
        })
    }
}
