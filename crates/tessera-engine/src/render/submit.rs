use crate::device::{CommandContext, DeviceProvider, MaterialBinding, VertexBinding};
use crate::mesh::{INSTANCE_STRIDE, VERTEX_STRIDE};

/// Why a draw was not issued.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotAttached,
    Hidden,
    /// No material, or the material is not attached.
    NoMaterial,
    /// Vertex or index buffer is absent.
    MissingBuffers,
    /// Raster state is unset (never built, or its last build failed).
    NoRasterState,
}

/// Result of one submission.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DrawOutcome {
    Skipped(SkipReason),
    Indexed { index_count: u32 },
    Instanced { index_count: u32, instance_count: u32 },
}

/// Committed resources for one draw.
pub struct DrawInput<'a, D: DeviceProvider> {
    pub vertex_buffer: Option<&'a D::Buffer>,
    pub index_buffer: Option<&'a D::Buffer>,
    pub index_count: u32,
    pub raster_state: Option<&'a D::RasterState>,
    /// Instance buffer and instance count, when instancing is active.
    pub instances: Option<(&'a D::Buffer, u32)>,
}

/// Records the indexed (optionally instanced) draw of one mesh.
///
/// Nothing is recorded when a required resource is missing.
pub fn submit_draw<D, C, M>(ctx: &mut C, material: &mut M, input: DrawInput<'_, D>) -> DrawOutcome
where
    D: DeviceProvider,
    C: CommandContext<D>,
    M: MaterialBinding<C>,
{
    let Some(raster_state) = input.raster_state else {
        return DrawOutcome::Skipped(SkipReason::NoRasterState);
    };
    let (Some(vertex_buffer), Some(index_buffer)) = (input.vertex_buffer, input.index_buffer)
    else {
        return DrawOutcome::Skipped(SkipReason::MissingBuffers);
    };
    let index_count = input.index_count;

    ctx.set_primitive_topology(wgpu::PrimitiveTopology::TriangleList);
    ctx.set_index_buffer(index_buffer, wgpu::IndexFormat::Uint32);
    ctx.set_raster_state(raster_state);

    match input.instances {
        Some((instance_buffer, instance_count)) if instance_count > 0 => {
            ctx.set_vertex_buffers(
                0,
                &[
                    VertexBinding {
                        buffer: vertex_buffer,
                        stride: VERTEX_STRIDE,
                    },
                    VertexBinding {
                        buffer: instance_buffer,
                        stride: INSTANCE_STRIDE,
                    },
                ],
            );
            material.set_has_instances(true);
            material.apply(ctx);
            ctx.draw_indexed_instanced(index_count, instance_count);
            // Only this draw is instanced.
            material.set_has_instances(false);

            log::trace!("instanced draw: {index_count} indices x {instance_count}");
            DrawOutcome::Instanced {
                index_count,
                instance_count,
            }
        }
        _ => {
            ctx.set_vertex_buffers(
                0,
                &[VertexBinding {
                    buffer: vertex_buffer,
                    stride: VERTEX_STRIDE,
                }],
            );
            material.set_has_instances(false);
            material.apply(ctx);
            ctx.draw_indexed(index_count);

            log::trace!("indexed draw: {index_count} indices");
            DrawOutcome::Indexed { index_count }
        }
    }
}
