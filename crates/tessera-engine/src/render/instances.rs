use glam::Mat4;

use crate::device::{BufferDesc, BufferKind, CommandContext, DeviceProvider};
use crate::mesh::INSTANCE_STRIDE;

/// What [`InstanceSet::sync`] did this frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InstanceSync {
    /// Not dirty (or nothing to upload); the buffer was not touched.
    Clean,
    /// The buffer was (re)created with room for exactly `capacity` instances.
    Created { capacity: u32 },
    /// The existing buffer was overwritten in place.
    Written { instance_count: u32 },
}

/// Per-instance transform buffer.
///
/// Growth is exact-fit: a buffer that is too small is replaced by one sized to
/// the current instance count, never rounded up. A buffer that is large enough
/// is rewritten in place (write-discard).
pub struct InstanceSet<D: DeviceProvider> {
    buffer: Option<D::Buffer>,
    dirty: bool,
    creations: usize,
}

impl<D: DeviceProvider> Default for InstanceSet<D> {
    fn default() -> Self {
        Self {
            buffer: None,
            dirty: true,
            creations: 0,
        }
    }
}

impl<D: DeviceProvider> InstanceSet<D> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn buffer(&self) -> Option<&D::Buffer> {
        self.buffer.as_ref()
    }

    /// Number of buffers created so far (diagnostics).
    #[inline]
    pub fn creations(&self) -> usize {
        self.creations
    }

    /// Uploads `transforms` if the set is dirty.
    ///
    /// The write is recorded on `ctx` before the caller records the draw that
    /// reads it.
    pub fn sync<C>(&mut self, device: &D, ctx: &mut C, transforms: &[Mat4]) -> InstanceSync
    where
        C: CommandContext<D>,
    {
        if !self.dirty || transforms.is_empty() {
            return InstanceSync::Clean;
        }

        let count = transforms.len() as u64;
        let required = INSTANCE_STRIDE * count;
        let bytes: &[u8] = bytemuck::cast_slice(transforms);

        let fits = self
            .buffer
            .as_ref()
            .is_some_and(|b| device.buffer_size(b) >= required);

        let outcome = match self.buffer.as_ref() {
            Some(buffer) if fits => {
                ctx.write_discard(buffer, bytes);
                InstanceSync::Written {
                    instance_count: count as u32,
                }
            }
            _ => {
                self.buffer = None;
                self.buffer = Some(device.create_buffer(&BufferDesc {
                    label: "tessera instance buffer",
                    kind: BufferKind::Instance,
                    stride: INSTANCE_STRIDE,
                    count,
                    contents: bytes,
                }));
                self.creations += 1;
                log::debug!("instance buffer created for {count} instances");
                InstanceSync::Created {
                    capacity: count as u32,
                }
            }
        };

        self.dirty = false;
        outcome
    }

    /// Releases the buffer; the next sync recreates it.
    pub fn release(&mut self) {
        self.buffer = None;
        self.dirty = true;
    }
}
