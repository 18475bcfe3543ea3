//! wgpu implementation of the device seams.
//!
//! Raster state has no standalone object in wgpu, so a raster state here is a
//! pair of render pipelines (plain and instanced) baked from a
//! [`PipelineTemplate`] plus the requested rasterizer fields.

use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::error::DeviceError;
use crate::mesh::{instance_layout, PackedVertex};

use super::provider::{BufferDesc, CommandContext, DeviceProvider, RasterDesc, VertexBinding};

/// Shader-side inputs needed to bake raster states into pipelines.
///
/// Shader authoring and bind-group layout belong to the material system; the
/// engine only plugs its vertex layouts and rasterizer fields in.
pub struct PipelineTemplate {
    pub shader: wgpu::ShaderModule,
    pub layout: wgpu::PipelineLayout,
    /// Entry point reading slot 0 only.
    pub vertex_entry: &'static str,
    /// Entry point reading slot 0 and the instance transforms in slot 1.
    pub instanced_vertex_entry: &'static str,
    pub fragment_entry: &'static str,
    pub color_format: wgpu::TextureFormat,
    pub depth_stencil: Option<wgpu::DepthStencilState>,
    /// Sample count of the render target.
    pub sample_count: u32,
}

impl PipelineTemplate {
    /// Template for the built-in vertex-color shader.
    pub fn unlit(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("tessera unlit shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/unlit.wgsl").into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tessera unlit pipeline layout"),
            bind_group_layouts: &[],
            immediate_size: 0,
        });

        Self {
            shader,
            layout,
            vertex_entry: "vs_main",
            instanced_vertex_entry: "vs_instanced",
            fragment_entry: "fs_main",
            color_format,
            depth_stencil: None,
            sample_count: 1,
        }
    }
}

/// [`DeviceProvider`] over a borrowed `wgpu::Device`.
pub struct WgpuDevice<'a> {
    device: &'a wgpu::Device,
    template: &'a PipelineTemplate,
}

impl<'a> WgpuDevice<'a> {
    #[inline]
    pub fn new(device: &'a wgpu::Device, template: &'a PipelineTemplate) -> Self {
        Self { device, template }
    }

    fn check_features(&self, desc: &RasterDesc) -> Result<(), DeviceError> {
        let mut needed = wgpu::Features::empty();
        match desc.fill_mode {
            wgpu::PolygonMode::Fill => {}
            wgpu::PolygonMode::Line => needed |= wgpu::Features::POLYGON_MODE_LINE,
            wgpu::PolygonMode::Point => needed |= wgpu::Features::POLYGON_MODE_POINT,
        }
        if !desc.depth_clip_enabled {
            needed |= wgpu::Features::DEPTH_CLIP_CONTROL;
        }

        let missing = needed - self.device.features();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DeviceError::MissingFeature(missing))
        }
    }

    fn build_pipeline(
        &self,
        desc: &RasterDesc,
        label: &str,
        entry_point: &str,
        buffers: &[wgpu::VertexBufferLayout<'_>],
    ) -> wgpu::RenderPipeline {
        let t = self.template;

        let depth_stencil = t.depth_stencil.clone().map(|ds| wgpu::DepthStencilState {
            bias: wgpu::DepthBiasState {
                constant: desc.depth_bias,
                slope_scale: desc.slope_scaled_depth_bias,
                clamp: desc.depth_bias_clamp,
            },
            ..ds
        });

        self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&t.layout),

            vertex: wgpu::VertexState {
                module: &t.shader,
                entry_point: Some(entry_point),
                compilation_options: Default::default(),
                buffers,
            },

            fragment: Some(wgpu::FragmentState {
                module: &t.shader,
                entry_point: Some(t.fragment_entry),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: t.color_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: desc.front_face,
                cull_mode: desc.cull_mode,
                polygon_mode: desc.fill_mode,
                unclipped_depth: !desc.depth_clip_enabled,
                conservative: false,
            },

            depth_stencil,
            multisample: wgpu::MultisampleState {
                count: t.sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },

            multiview_mask: None,
            cache: None,
        })
    }
}

/// Baked raster state: one pipeline per draw path.
#[derive(Clone)]
pub struct WgpuRasterState {
    pipelines: Arc<RasterPipelines>,
}

struct RasterPipelines {
    plain: wgpu::RenderPipeline,
    instanced: wgpu::RenderPipeline,
    scissor_enabled: bool,
}

impl WgpuRasterState {
    #[inline]
    pub fn scissor_enabled(&self) -> bool {
        self.pipelines.scissor_enabled
    }
}

impl DeviceProvider for WgpuDevice<'_> {
    type Buffer = wgpu::Buffer;
    type RasterState = WgpuRasterState;

    fn create_buffer(&self, desc: &BufferDesc<'_>) -> wgpu::Buffer {
        debug_assert_eq!(desc.contents.len() as u64, desc.size());
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(desc.label),
                contents: desc.contents,
                usage: desc.kind.usages(),
            })
    }

    #[inline]
    fn buffer_size(&self, buffer: &wgpu::Buffer) -> u64 {
        buffer.size()
    }

    fn create_raster_state(&self, desc: &RasterDesc) -> Result<WgpuRasterState, DeviceError> {
        self.check_features(desc)?;

        // The target's sample count is fixed by the host; the pipeline cannot opt out of it.
        if !desc.multisample_enabled && self.template.sample_count > 1 {
            return Err(DeviceError::Unsupported(format!(
                "multisampling cannot be disabled on a {}x target",
                self.template.sample_count
            )));
        }

        // Pipeline validation errors would otherwise reach the device's
        // uncaptured-error handler, which panics by default.
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let plain = self.build_pipeline(
            desc,
            "tessera mesh pipeline",
            self.template.vertex_entry,
            &[PackedVertex::layout()],
        );
        let instanced = self.build_pipeline(
            desc,
            "tessera instanced mesh pipeline",
            self.template.instanced_vertex_entry,
            &[PackedVertex::layout(), instance_layout()],
        );
        if let Some(err) = pollster::block_on(scope.pop()) {
            return Err(DeviceError::Rejected(err.to_string()));
        }

        Ok(WgpuRasterState {
            pipelines: Arc::new(RasterPipelines {
                plain,
                instanced,
                scissor_enabled: desc.scissor_enabled,
            }),
        })
    }
}

/// Scissor rectangle as `(x, y, width, height)`.
pub type ScissorRect = (u32, u32, u32, u32);

/// Rect to set for a raster state: the host's clip when scissoring is on,
/// the whole target otherwise (or when the host set none).
fn scissor_rect_for(
    scissor_enabled: bool,
    host: Option<ScissorRect>,
    (w, h): (u32, u32),
) -> ScissorRect {
    let full = (0, 0, w.max(1), h.max(1));
    if scissor_enabled {
        host.unwrap_or(full)
    } else {
        full
    }
}

/// [`CommandContext`] recording into an open render pass.
///
/// In-place buffer writes go through the queue; wgpu orders them before the
/// command buffer holding this pass once it is submitted.
///
/// The pass owns the scissor rect from here on: hosts clip through
/// [`with_scissor_rect`](Self::with_scissor_rect) instead of setting it on the
/// render pass directly.
pub struct WgpuPass<'p, 'e> {
    pass: &'p mut wgpu::RenderPass<'e>,
    queue: &'p wgpu::Queue,
    target_size: (u32, u32),
    host_scissor: Option<ScissorRect>,
    raster: Option<Arc<RasterPipelines>>,
    instanced: bool,
}

impl<'p, 'e> WgpuPass<'p, 'e> {
    #[inline]
    pub fn new(
        pass: &'p mut wgpu::RenderPass<'e>,
        queue: &'p wgpu::Queue,
        target_size: (u32, u32),
    ) -> Self {
        Self {
            pass,
            queue,
            target_size,
            host_scissor: None,
            raster: None,
            instanced: false,
        }
    }

    /// Clip applied to every draw whose raster state has scissoring enabled.
    pub fn with_scissor_rect(mut self, rect: ScissorRect) -> Self {
        self.host_scissor = Some(rect);
        self
    }

    /// Underlying pass, for materials that set bind groups in `apply`.
    #[inline]
    pub fn pass_mut(&mut self) -> &mut wgpu::RenderPass<'e> {
        self.pass
    }

    fn bind_pipeline(&mut self) -> bool {
        let Some(pipelines) = self.raster.as_ref() else {
            log::trace!("WgpuPass: draw without raster state ignored");
            return false;
        };
        let pipeline = if self.instanced {
            &pipelines.instanced
        } else {
            &pipelines.plain
        };
        self.pass.set_pipeline(pipeline);
        true
    }
}

impl<'a> CommandContext<WgpuDevice<'a>> for WgpuPass<'_, '_> {
    fn set_primitive_topology(&mut self, topology: wgpu::PrimitiveTopology) {
        // Topology is baked into the pipeline; only triangle lists are built.
        if topology != wgpu::PrimitiveTopology::TriangleList {
            log::warn!("WgpuPass: topology {topology:?} is not supported; using TriangleList");
        }
    }

    fn set_index_buffer(&mut self, buffer: &wgpu::Buffer, format: wgpu::IndexFormat) {
        self.pass.set_index_buffer(buffer.slice(..), format);
    }

    fn set_raster_state(&mut self, state: &WgpuRasterState) {
        let (x, y, w, h) =
            scissor_rect_for(state.scissor_enabled(), self.host_scissor, self.target_size);
        self.pass.set_scissor_rect(x, y, w, h);
        self.raster = Some(Arc::clone(&state.pipelines));
    }

    fn set_vertex_buffers(&mut self, first_slot: u32, bindings: &[VertexBinding<'_, wgpu::Buffer>]) {
        for (i, binding) in bindings.iter().enumerate() {
            self.pass
                .set_vertex_buffer(first_slot + i as u32, binding.buffer.slice(..));
        }
        self.instanced = first_slot as usize + bindings.len() > 1;
    }

    fn write_discard(&mut self, buffer: &wgpu::Buffer, data: &[u8]) {
        self.queue.write_buffer(buffer, 0, data);
    }

    fn draw_indexed(&mut self, index_count: u32) {
        if self.bind_pipeline() {
            self.pass.draw_indexed(0..index_count, 0, 0..1);
        }
    }

    fn draw_indexed_instanced(&mut self, index_count: u32, instance_count: u32) {
        if self.bind_pipeline() {
            self.pass.draw_indexed(0..index_count, 0, 0..instance_count);
        }
    }
}
