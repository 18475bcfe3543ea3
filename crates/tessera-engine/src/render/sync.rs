use crate::device::{BufferDesc, BufferKind, DeviceProvider};
use crate::mesh::{MeshDescription, UpdateStrategy, VertexUpdate, VERTEX_STRIDE};

use super::projector::{SyncConfig, VertexArrayBuffer, VertexProjector};

/// What a synchronization step did to the GPU buffers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The vertex buffer was replaced with freshly projected data.
    VertexBufferRebuilt { vertex_count: usize },
    /// The index buffer was replaced.
    IndexBufferRebuilt { index_count: u32 },
    /// An in-place patch could not run; buffers were left as they were.
    Stale,
    /// No usable geometry: buffers were released and nothing was created.
    Released,
    /// The owner is not attached; the change is picked up by the next attach.
    Detached,
}

/// Owns the vertex and index buffers of one model and keeps them in sync
/// with its mesh.
///
/// Vertex data is patched on the CPU side only; every upload replaces the
/// whole GPU vertex buffer.
pub struct BufferSynchronizer<D: DeviceProvider> {
    projector: VertexProjector,
    vertex_buffer: Option<D::Buffer>,
    index_buffer: Option<D::Buffer>,
    vertex_count: u32,
    index_count: u32,
    /// Buffers were dropped for lack of geometry; the next vertex sync
    /// rebuilds the array and both buffers from scratch.
    geometry_released: bool,
}

impl<D: DeviceProvider> Default for BufferSynchronizer<D> {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}

impl<D: DeviceProvider> BufferSynchronizer<D> {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            projector: VertexProjector::new(config),
            vertex_buffer: None,
            index_buffer: None,
            vertex_count: 0,
            index_count: 0,
            geometry_released: false,
        }
    }

    #[inline]
    pub fn config(&self) -> SyncConfig {
        self.projector.config()
    }

    #[inline]
    pub fn set_config(&mut self, config: SyncConfig) {
        self.projector.set_config(config);
    }

    #[inline]
    pub fn vertex_buffer(&self) -> Option<&D::Buffer> {
        self.vertex_buffer.as_ref()
    }

    #[inline]
    pub fn index_buffer(&self) -> Option<&D::Buffer> {
        self.index_buffer.as_ref()
    }

    /// Vertex count of the current vertex buffer (0 when absent).
    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Index count of the current index buffer (0 when absent).
    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// CPU-side packed array backing the vertex buffer.
    #[inline]
    pub fn packed(&self) -> Option<&VertexArrayBuffer> {
        self.projector.packed()
    }

    /// Applies a classified change.
    pub fn apply(
        &mut self,
        device: &D,
        mesh: Option<&MeshDescription>,
        strategy: UpdateStrategy,
    ) -> SyncOutcome {
        match strategy {
            UpdateStrategy::Vertices(update) => self.sync_vertices(device, mesh, update),
            UpdateStrategy::IndexBuffer => self.sync_indices(device, mesh),
        }
    }

    /// Full vertex rebuild followed by an index rebuild.
    ///
    /// Returns the vertex outcome; `Released` when there is no usable geometry.
    pub fn rebuild_all(&mut self, device: &D, mesh: Option<&MeshDescription>) -> SyncOutcome {
        self.geometry_released = true;
        self.sync_vertices(device, mesh, VertexUpdate::Full)
    }

    pub fn sync_vertices(
        &mut self,
        device: &D,
        mesh: Option<&MeshDescription>,
        update: VertexUpdate,
    ) -> SyncOutcome {
        let Some(mesh) = mesh.filter(|m| m.has_positions()) else {
            log::debug!("no positions bound; releasing mesh buffers");
            self.release_buffers();
            self.geometry_released = true;
            return SyncOutcome::Released;
        };

        let update = if self.geometry_released {
            VertexUpdate::Full
        } else {
            update
        };
        let projection = self.projector.project(update, mesh);
        if projection.is_stale() {
            return SyncOutcome::Stale;
        }

        let Some(packed) = self.projector.packed() else {
            return SyncOutcome::Stale;
        };

        // Release before reassignment so at most one vertex buffer is alive.
        self.vertex_buffer = None;
        let count = packed.len() as u64;
        self.vertex_buffer = Some(device.create_buffer(&BufferDesc {
            label: "tessera vertex buffer",
            kind: BufferKind::Vertex,
            stride: VERTEX_STRIDE,
            count,
            contents: packed.as_bytes(),
        }));
        self.vertex_count = packed.len() as u32;

        let vertex_count = packed.len();
        log::debug!("vertex buffer rebuilt ({update:?}): {count} vertices, {projection:?}");

        if std::mem::take(&mut self.geometry_released) {
            self.sync_indices(device, Some(mesh));
        }

        SyncOutcome::VertexBufferRebuilt { vertex_count }
    }

    pub fn sync_indices(&mut self, device: &D, mesh: Option<&MeshDescription>) -> SyncOutcome {
        let Some(mesh) = mesh.filter(|m| m.has_positions()) else {
            log::debug!("no positions bound; releasing mesh buffers");
            self.release_buffers();
            self.geometry_released = true;
            return SyncOutcome::Released;
        };

        if self.geometry_released {
            // Vertex data went with the geometry; bring both buffers back.
            self.sync_vertices(device, Some(mesh), VertexUpdate::Full);
            return match self.index_buffer {
                Some(_) => SyncOutcome::IndexBufferRebuilt {
                    index_count: self.index_count,
                },
                None => SyncOutcome::Released,
            };
        }

        self.index_buffer = None;
        self.index_count = 0;

        if mesh.indices.is_empty() {
            log::debug!("mesh has no indices; index buffer released");
            return SyncOutcome::Released;
        }

        let count = mesh.indices.len() as u64;
        self.index_buffer = Some(device.create_buffer(&BufferDesc {
            label: "tessera index buffer",
            kind: BufferKind::Index,
            stride: std::mem::size_of::<u32>() as u64,
            count,
            contents: bytemuck::cast_slice(&mesh.indices),
        }));
        self.index_count = mesh.indices.len() as u32;

        log::debug!("index buffer rebuilt: {count} indices");
        SyncOutcome::IndexBufferRebuilt {
            index_count: self.index_count,
        }
    }

    /// Releases both GPU buffers. The packed CPU array is kept.
    pub fn release_buffers(&mut self) {
        self.vertex_buffer = None;
        self.index_buffer = None;
        self.vertex_count = 0;
        self.index_count = 0;
    }

    /// Releases GPU buffers and the packed array.
    pub fn release(&mut self) {
        self.release_buffers();
        self.projector.release();
    }
}
