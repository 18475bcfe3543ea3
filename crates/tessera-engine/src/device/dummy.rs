//! Recording backend for tests and GPU-less hosts.
//!
//! No GPU work happens here. Every buffer creation and release, raster-state
//! build, binding, write and draw is recorded so callers can assert on the
//! exact resource traffic a model produces.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::DeviceError;

use super::provider::{
    BufferDesc, BufferKind, CommandContext, DeviceProvider, Material, MaterialBinding, RasterDesc,
    VertexBinding,
};

/// Resource counters shared by a [`DummyDevice`] and the buffers it created.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeviceStats {
    pub buffers_created: usize,
    pub buffers_released: usize,
    pub raster_states_created: usize,
    pub raster_state_failures: usize,
    /// Creation log: (buffer id, role, size in bytes).
    pub created: Vec<(u64, BufferKind, u64)>,
}

impl DeviceStats {
    #[inline]
    pub fn live_buffers(&self) -> usize {
        self.buffers_created - self.buffers_released
    }

    /// Number of buffers created with the given role.
    pub fn created_of(&self, kind: BufferKind) -> usize {
        self.created.iter().filter(|(_, k, _)| *k == kind).count()
    }
}

/// Recording [`DeviceProvider`].
#[derive(Debug, Default)]
pub struct DummyDevice {
    stats: Rc<RefCell<DeviceStats>>,
    next_id: Cell<u64>,
    fail_raster_states: Cell<bool>,
}

impl DummyDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the resource counters.
    pub fn stats(&self) -> DeviceStats {
        self.stats.borrow().clone()
    }

    /// Makes subsequent raster-state builds fail (or succeed again).
    pub fn set_fail_raster_states(&self, fail: bool) {
        self.fail_raster_states.set(fail);
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }
}

/// Buffer created by a [`DummyDevice`]. Dropping it counts as a release.
#[derive(Debug)]
pub struct DummyBuffer {
    id: u64,
    kind: BufferKind,
    contents: RefCell<Vec<u8>>,
    stats: Rc<RefCell<DeviceStats>>,
}

impl DummyBuffer {
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.contents.borrow().len() as u64
    }

    /// Copy of the current buffer contents.
    pub fn contents(&self) -> Vec<u8> {
        self.contents.borrow().clone()
    }
}

impl Drop for DummyBuffer {
    fn drop(&mut self) {
        self.stats.borrow_mut().buffers_released += 1;
    }
}

/// Raster state created by a [`DummyDevice`].
#[derive(Debug, Clone, PartialEq)]
pub struct DummyRasterState {
    pub id: u64,
    pub desc: RasterDesc,
}

impl DeviceProvider for DummyDevice {
    type Buffer = DummyBuffer;
    type RasterState = DummyRasterState;

    fn create_buffer(&self, desc: &BufferDesc<'_>) -> DummyBuffer {
        let id = self.next_id();
        let size = desc.size();
        debug_assert_eq!(desc.contents.len() as u64, size);
        log::trace!(
            "DummyDevice: creating {:?} buffer {} {:?} ({} bytes)",
            desc.kind,
            id,
            desc.label,
            size
        );

        {
            let mut stats = self.stats.borrow_mut();
            stats.buffers_created += 1;
            stats.created.push((id, desc.kind, size));
        }

        DummyBuffer {
            id,
            kind: desc.kind,
            contents: RefCell::new(desc.contents.to_vec()),
            stats: Rc::clone(&self.stats),
        }
    }

    #[inline]
    fn buffer_size(&self, buffer: &DummyBuffer) -> u64 {
        buffer.size()
    }

    fn create_raster_state(&self, desc: &RasterDesc) -> Result<DummyRasterState, DeviceError> {
        if self.fail_raster_states.get() {
            self.stats.borrow_mut().raster_state_failures += 1;
            return Err(DeviceError::Rejected("injected failure".to_owned()));
        }
        self.stats.borrow_mut().raster_states_created += 1;
        Ok(DummyRasterState {
            id: self.next_id(),
            desc: *desc,
        })
    }
}

/// One recorded command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetTopology(wgpu::PrimitiveTopology),
    SetIndexBuffer {
        buffer: u64,
        format: wgpu::IndexFormat,
    },
    SetRasterState(u64),
    /// (buffer id, stride) per slot, starting at `first_slot`.
    SetVertexBuffers {
        first_slot: u32,
        slots: Vec<(u64, u64)>,
    },
    WriteDiscard {
        buffer: u64,
        bytes: usize,
    },
    DrawIndexed {
        index_count: u32,
    },
    DrawIndexedInstanced {
        index_count: u32,
        instance_count: u32,
    },
    /// Free-form marker pushed by materials or hosts.
    Marker(&'static str),
}

/// Recording [`CommandContext`].
#[derive(Debug, Default)]
pub struct DummyContext {
    pub commands: Vec<Command>,
}

impl DummyContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn mark(&mut self, label: &'static str) {
        self.commands.push(Command::Marker(label));
    }

    /// Draw commands only, in order.
    pub fn draws(&self) -> Vec<&Command> {
        self.commands
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    Command::DrawIndexed { .. } | Command::DrawIndexedInstanced { .. }
                )
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl CommandContext<DummyDevice> for DummyContext {
    fn set_primitive_topology(&mut self, topology: wgpu::PrimitiveTopology) {
        self.commands.push(Command::SetTopology(topology));
    }

    fn set_index_buffer(&mut self, buffer: &DummyBuffer, format: wgpu::IndexFormat) {
        self.commands.push(Command::SetIndexBuffer {
            buffer: buffer.id,
            format,
        });
    }

    fn set_raster_state(&mut self, state: &DummyRasterState) {
        self.commands.push(Command::SetRasterState(state.id));
    }

    fn set_vertex_buffers(&mut self, first_slot: u32, bindings: &[VertexBinding<'_, DummyBuffer>]) {
        self.commands.push(Command::SetVertexBuffers {
            first_slot,
            slots: bindings.iter().map(|b| (b.buffer.id, b.stride)).collect(),
        });
    }

    fn write_discard(&mut self, buffer: &DummyBuffer, data: &[u8]) {
        {
            let mut contents = buffer.contents.borrow_mut();
            if data.len() > contents.len() {
                log::warn!(
                    "DummyContext: write of {} bytes exceeds buffer {} ({} bytes); ignored",
                    data.len(),
                    buffer.id,
                    contents.len()
                );
                return;
            }
            contents[..data.len()].copy_from_slice(data);
        }
        self.commands.push(Command::WriteDiscard {
            buffer: buffer.id,
            bytes: data.len(),
        });
    }

    fn draw_indexed(&mut self, index_count: u32) {
        self.commands.push(Command::DrawIndexed { index_count });
    }

    fn draw_indexed_instanced(&mut self, index_count: u32, instance_count: u32) {
        self.commands.push(Command::DrawIndexedInstanced {
            index_count,
            instance_count,
        });
    }
}

/// Material that records what the draw path pushed into it.
#[derive(Debug, Clone)]
pub struct RecordingMaterial {
    pub attached: bool,
    pub world: glam::Mat4,
    pub has_shadow_map: bool,
    pub has_instances: bool,
    /// Value of the has-instances flag at each `apply`.
    pub applied_with_instances: Vec<bool>,
}

impl Default for RecordingMaterial {
    fn default() -> Self {
        Self {
            attached: true,
            world: glam::Mat4::IDENTITY,
            has_shadow_map: false,
            has_instances: false,
            applied_with_instances: Vec::new(),
        }
    }
}

impl Material for RecordingMaterial {
    #[inline]
    fn is_attached(&self) -> bool {
        self.attached
    }
}

impl MaterialBinding<DummyContext> for RecordingMaterial {
    fn set_world(&mut self, world: glam::Mat4) {
        self.world = world;
    }

    fn set_has_shadow_map(&mut self, enabled: bool) {
        self.has_shadow_map = enabled;
    }

    fn set_has_instances(&mut self, enabled: bool) {
        self.has_instances = enabled;
    }

    fn apply(&mut self, ctx: &mut DummyContext) {
        self.applied_with_instances.push(self.has_instances);
        ctx.mark("apply");
    }
}
