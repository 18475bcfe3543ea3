//! Seams between the synchronization core and a concrete GPU API.

use crate::error::DeviceError;

/// Role of a buffer; each provider maps it to its own usage flags.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
    /// Per-instance vertex data that is rewritten in place (write-discard).
    Instance,
}

impl BufferKind {
    /// wgpu usage flags for this role.
    pub fn usages(self) -> wgpu::BufferUsages {
        match self {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
            BufferKind::Instance => wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        }
    }
}

/// Buffer creation request.
///
/// The buffer is `stride * count` bytes and is initialized from `contents`,
/// which must be exactly that long.
#[derive(Debug, Clone, Copy)]
pub struct BufferDesc<'a> {
    pub label: &'a str,
    pub kind: BufferKind,
    pub stride: u64,
    pub count: u64,
    pub contents: &'a [u8],
}

impl BufferDesc<'_> {
    #[inline]
    pub fn size(&self) -> u64 {
        self.stride * self.count
    }
}

/// Rasterizer configuration handed to the device.
///
/// Built by [`RasterConfig::descriptor`](crate::render::RasterConfig::descriptor).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterDesc {
    pub fill_mode: wgpu::PolygonMode,
    pub cull_mode: Option<wgpu::Face>,
    pub front_face: wgpu::FrontFace,
    pub depth_bias: i32,
    pub depth_bias_clamp: f32,
    pub slope_scaled_depth_bias: f32,
    pub depth_clip_enabled: bool,
    pub multisample_enabled: bool,
    pub scissor_enabled: bool,
}

/// Resource factory for one GPU device.
///
/// Buffers and raster states are owned by whoever created them; dropping a
/// handle releases the resource.
pub trait DeviceProvider {
    type Buffer;
    type RasterState;

    fn create_buffer(&self, desc: &BufferDesc<'_>) -> Self::Buffer;

    /// Byte capacity of a buffer created by this provider.
    fn buffer_size(&self, buffer: &Self::Buffer) -> u64;

    fn create_raster_state(&self, desc: &RasterDesc) -> Result<Self::RasterState, DeviceError>;
}

/// One vertex-buffer slot binding.
pub struct VertexBinding<'a, B> {
    pub buffer: &'a B,
    pub stride: u64,
}

/// Per-frame command recording for one device.
///
/// Calls arrive in submission order on the render thread.
pub trait CommandContext<D: DeviceProvider + ?Sized> {
    fn set_primitive_topology(&mut self, topology: wgpu::PrimitiveTopology);

    fn set_index_buffer(&mut self, buffer: &D::Buffer, format: wgpu::IndexFormat);

    fn set_raster_state(&mut self, state: &D::RasterState);

    /// Binds `bindings[i]` to slot `first_slot + i`.
    fn set_vertex_buffers(&mut self, first_slot: u32, bindings: &[VertexBinding<'_, D::Buffer>]);

    /// Overwrites `buffer` from offset zero, discarding its previous contents.
    ///
    /// Completes before any draw recorded afterwards reads the buffer.
    fn write_discard(&mut self, buffer: &D::Buffer, data: &[u8]);

    fn draw_indexed(&mut self, index_count: u32);

    fn draw_indexed_instanced(&mut self, index_count: u32, instance_count: u32);
}

/// Material attachment state, queried by the draw gate.
pub trait Material {
    /// Whether the material currently has its shader resources bound.
    fn is_attached(&self) -> bool;
}

/// Material / shader-parameter binding consumed by the draw path.
///
/// The engine pushes per-frame parameters, then calls [`apply`](Self::apply)
/// right before issuing the draw.
pub trait MaterialBinding<C: ?Sized>: Material {
    fn set_world(&mut self, world: glam::Mat4);

    fn set_has_shadow_map(&mut self, enabled: bool);

    /// Transient flag, true only for the duration of an instanced draw.
    fn set_has_instances(&mut self, enabled: bool);

    fn apply(&mut self, ctx: &mut C);
}
