use glam::{Vec2, Vec3};

use crate::mesh::{MeshDescription, PackedVertex, VertexUpdate};

/// Vertex-sync settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncConfig {
    /// Keep the packed array's allocation across full rebuilds when it is large enough.
    pub reuse_vertex_array: bool,
    /// Per-axis factor applied to texture coordinates while packing.
    pub texcoord_scale: Vec2,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reuse_vertex_array: false,
            texcoord_scale: Vec2::ONE,
        }
    }
}

/// Reusable CPU-side array of packed vertices.
///
/// `capacity()` is the number of allocated records, `len()` the number of
/// records that belong to the current mesh. Invariant: `len() <= capacity()`.
#[derive(Debug, Clone, Default)]
pub struct VertexArrayBuffer {
    records: Vec<PackedVertex>,
    len: usize,
}

impl VertexArrayBuffer {
    fn with_len(len: usize) -> Self {
        Self {
            records: vec![PackedVertex::DEFAULT; len],
            len,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    /// Records of the current mesh.
    #[inline]
    pub fn as_slice(&self) -> &[PackedVertex] {
        &self.records[..self.len]
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.as_slice())
    }

    /// Mutable view of the first `len` records; caller guarantees `len <= capacity()`.
    fn records_mut(&mut self, len: usize) -> &mut [PackedVertex] {
        self.len = len;
        &mut self.records[..len]
    }
}

/// Result of a projection.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Every channel was rewritten.
    Rebuilt {
        vertex_count: usize,
        reallocated: bool,
    },
    /// Some channels were rewritten in place.
    Patched { vertex_count: usize },
    /// The packed array is missing or too small for an in-place patch.
    /// Nothing was written; the next full rebuild brings it back in sync.
    Stale,
}

impl Projection {
    #[inline]
    pub fn is_stale(self) -> bool {
        matches!(self, Projection::Stale)
    }
}

/// Builds and patches the packed vertex array from a [`MeshDescription`].
#[derive(Debug, Clone, Default)]
pub struct VertexProjector {
    array: Option<VertexArrayBuffer>,
    config: SyncConfig,
}

impl VertexProjector {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            array: None,
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> SyncConfig {
        self.config
    }

    /// Takes effect at the next projection.
    #[inline]
    pub fn set_config(&mut self, config: SyncConfig) {
        self.config = config;
    }

    #[inline]
    pub fn packed(&self) -> Option<&VertexArrayBuffer> {
        self.array.as_ref()
    }

    /// Drops the packed array.
    pub fn release(&mut self) {
        self.array = None;
    }

    pub fn project(&mut self, update: VertexUpdate, mesh: &MeshDescription) -> Projection {
        match update {
            VertexUpdate::Full => self.rebuild(mesh),
            VertexUpdate::TextureCoordinates => self.patch_texcoords(mesh),
            VertexUpdate::Positions => self.patch_positions(mesh),
            VertexUpdate::Colors => self.patch_colors(mesh),
        }
    }

    /// Rewrites every channel, (re)allocating per the reuse policy.
    pub fn rebuild(&mut self, mesh: &MeshDescription) -> Projection {
        let n = mesh.vertex_count();

        let reusable = self.config.reuse_vertex_array
            && self.array.as_ref().is_some_and(|a| a.capacity() >= n);
        if !reusable {
            self.array = Some(VertexArrayBuffer::with_len(n));
        }
        let Some(array) = self.array.as_mut() else {
            return Projection::Stale;
        };

        let colors = mesh.colors();
        let texcoords = mesh.texture_coordinates();
        let normals = mesh.normals();
        let tangents = mesh.tangents();
        let bitangents = mesh.bitangents();
        let scale = self.config.texcoord_scale;

        for (i, v) in array.records_mut(n).iter_mut().enumerate() {
            v.position = mesh.positions[i].extend(1.0).to_array();
            v.color = colors.map_or(PackedVertex::WHITE, |c| c[i].to_array());
            v.texcoord = texcoords.map_or([0.0; 2], |t| (t[i] * scale).to_array());
            v.normal = vec3_or_zero(normals, i);
            v.tangent = vec3_or_zero(tangents, i);
            v.bitangent = vec3_or_zero(bitangents, i);
        }

        Projection::Rebuilt {
            vertex_count: n,
            reallocated: !reusable,
        }
    }

    fn patch_texcoords(&mut self, mesh: &MeshDescription) -> Projection {
        let scale = self.config.texcoord_scale;
        let texcoords = mesh.texture_coordinates();
        self.patch(mesh, |i, v| {
            v.texcoord = texcoords.map_or([0.0; 2], |t| (t[i] * scale).to_array());
        })
    }

    fn patch_positions(&mut self, mesh: &MeshDescription) -> Projection {
        let normals = mesh.normals();
        let tangents = mesh.tangents();
        let bitangents = mesh.bitangents();
        self.patch(mesh, |i, v| {
            v.position = mesh.positions[i].extend(1.0).to_array();
            v.normal = vec3_or_zero(normals, i);
            v.tangent = vec3_or_zero(tangents, i);
            v.bitangent = vec3_or_zero(bitangents, i);
        })
    }

    fn patch_colors(&mut self, mesh: &MeshDescription) -> Projection {
        let colors = mesh.colors();
        self.patch(mesh, |i, v| {
            v.color = colors.map_or(PackedVertex::WHITE, |c| c[i].to_array());
        })
    }

    fn patch(
        &mut self,
        mesh: &MeshDescription,
        mut write: impl FnMut(usize, &mut PackedVertex),
    ) -> Projection {
        let n = mesh.vertex_count();
        let Some(array) = self.array.as_mut().filter(|a| a.capacity() >= n) else {
            log::debug!("vertex array missing or smaller than {n} records; patch deferred");
            return Projection::Stale;
        };

        for (i, v) in array.records_mut(n).iter_mut().enumerate() {
            write(i, v);
        }

        Projection::Patched { vertex_count: n }
    }
}

#[inline]
fn vec3_or_zero(channel: Option<&[Vec3]>, i: usize) -> [f32; 3] {
    channel.map_or([0.0; 3], |c| c[i].to_array())
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;

    fn tri() -> MeshDescription {
        MeshDescription::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![0, 1, 2],
        )
    }

    fn full_tri() -> MeshDescription {
        tri()
            .with_colors(vec![Vec4::new(1.0, 0.0, 0.0, 1.0); 3])
            .with_texture_coordinates(vec![Vec2::new(0.5, 0.25); 3])
            .with_normals(vec![Vec3::Z; 3])
            .with_tangents(vec![Vec3::X; 3])
            .with_bitangents(vec![Vec3::Y; 3])
    }

    #[test]
    fn rebuild_uses_defaults_for_absent_channels() {
        let mut p = VertexProjector::default();
        let out = p.rebuild(&tri());
        assert_eq!(
            out,
            Projection::Rebuilt {
                vertex_count: 3,
                reallocated: true
            }
        );

        let packed = p.packed().expect("array after rebuild");
        assert_eq!(packed.len(), 3);
        assert_eq!(packed.as_slice()[1].position, [1.0, 0.0, 0.0, 1.0]);
        for v in packed.as_slice() {
            assert_eq!(v.color, PackedVertex::WHITE);
            assert_eq!(v.texcoord, [0.0, 0.0]);
            assert_eq!(v.normal, [0.0; 3]);
            assert_eq!(v.tangent, [0.0; 3]);
            assert_eq!(v.bitangent, [0.0; 3]);
        }
    }

    #[test]
    fn rebuild_copies_present_channels_and_scales_texcoords() {
        let mut p = VertexProjector::new(SyncConfig {
            texcoord_scale: Vec2::new(2.0, 4.0),
            ..SyncConfig::default()
        });
        p.rebuild(&full_tri());

        let v = p.packed().expect("array").as_slice()[2];
        assert_eq!(v.position, [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(v.color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(v.texcoord, [1.0, 1.0]);
        assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        assert_eq!(v.tangent, [1.0, 0.0, 0.0]);
        assert_eq!(v.bitangent, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn rebuild_treats_mismatched_channel_as_absent() {
        let mut p = VertexProjector::default();
        let mesh = tri().with_normals(vec![Vec3::Z; 2]);
        p.rebuild(&mesh);
        for v in p.packed().expect("array").as_slice() {
            assert_eq!(v.normal, [0.0; 3]);
        }
    }

    #[test]
    fn reuse_keeps_capacity_when_it_covers_the_mesh() {
        let mut p = VertexProjector::new(SyncConfig {
            reuse_vertex_array: true,
            ..SyncConfig::default()
        });
        let mut big = tri();
        big.positions.push(Vec3::ONE);
        p.rebuild(&big);
        let before = p.packed().expect("array").as_slice().as_ptr();

        let out = p.rebuild(&tri());
        assert_eq!(
            out,
            Projection::Rebuilt {
                vertex_count: 3,
                reallocated: false
            }
        );
        let packed = p.packed().expect("array");
        assert_eq!(packed.capacity(), 4);
        assert_eq!(packed.len(), 3);
        assert_eq!(packed.as_slice().as_ptr(), before);
    }

    #[test]
    fn without_reuse_rebuild_allocates_exactly() {
        let mut p = VertexProjector::default();
        let mut big = tri();
        big.positions.push(Vec3::ONE);
        p.rebuild(&big);

        let out = p.rebuild(&tri());
        assert_eq!(
            out,
            Projection::Rebuilt {
                vertex_count: 3,
                reallocated: true
            }
        );
        assert_eq!(p.packed().expect("array").capacity(), 3);
    }

    #[test]
    fn partial_patch_matches_full_rebuild_on_affected_fields() {
        let mut mesh = full_tri();
        let mut patched = VertexProjector::default();
        patched.rebuild(&mesh);
        let before = patched.packed().expect("array").as_slice().to_vec();

        mesh.positions[0] = Vec3::new(5.0, 6.0, 7.0);
        mesh.normals = Some(vec![Vec3::X; 3]);
        mesh.colors = Some(vec![Vec4::new(0.0, 0.0, 1.0, 0.5); 3]);
        assert_eq!(
            patched.project(VertexUpdate::Positions, &mesh),
            Projection::Patched { vertex_count: 3 }
        );

        let mut reference = VertexProjector::default();
        reference.rebuild(&mesh);
        let after = patched.packed().expect("array").as_slice();
        let full = reference.packed().expect("array").as_slice();

        for i in 0..3 {
            assert_eq!(after[i].position, full[i].position);
            assert_eq!(after[i].normal, full[i].normal);
            assert_eq!(after[i].tangent, full[i].tangent);
            assert_eq!(after[i].bitangent, full[i].bitangent);
            // Untouched by a positions patch.
            assert_eq!(after[i].color, before[i].color);
            assert_eq!(after[i].texcoord, before[i].texcoord);
        }
    }

    #[test]
    fn color_patch_leaves_other_fields_bitwise_unchanged() {
        let mut mesh = full_tri();
        let mut p = VertexProjector::default();
        p.rebuild(&mesh);
        let before = p.packed().expect("array").as_slice().to_vec();

        mesh.colors = Some(vec![Vec4::new(0.0, 1.0, 0.0, 1.0); 3]);
        p.project(VertexUpdate::Colors, &mesh);

        for (a, b) in p.packed().expect("array").as_slice().iter().zip(&before) {
            assert_eq!(a.color, [0.0, 1.0, 0.0, 1.0]);
            assert_eq!(
                bytemuck::bytes_of(&a.position),
                bytemuck::bytes_of(&b.position)
            );
            assert_eq!(
                bytemuck::bytes_of(&a.texcoord),
                bytemuck::bytes_of(&b.texcoord)
            );
            assert_eq!(bytemuck::bytes_of(&a.normal), bytemuck::bytes_of(&b.normal));
        }
    }

    #[test]
    fn texcoord_patch_matches_scaled_rebuild() {
        let config = SyncConfig {
            texcoord_scale: Vec2::new(2.0, 0.5),
            ..SyncConfig::default()
        };
        let mut mesh = full_tri();
        let mut patched = VertexProjector::new(config);
        patched.rebuild(&mesh);
        let before = patched.packed().expect("array").as_slice().to_vec();

        mesh.texture_coordinates = Some(vec![
            Vec2::new(0.25, 1.0),
            Vec2::new(1.0, 0.5),
            Vec2::new(0.0, 4.0),
        ]);
        // Channels a texcoord patch must not pick up.
        mesh.positions[1] = Vec3::splat(9.0);
        mesh.colors = Some(vec![Vec4::ZERO; 3]);
        assert_eq!(
            patched.project(VertexUpdate::TextureCoordinates, &mesh),
            Projection::Patched { vertex_count: 3 }
        );

        let mut reference = VertexProjector::new(config);
        reference.rebuild(&mesh);
        let after = patched.packed().expect("array").as_slice();
        let full = reference.packed().expect("array").as_slice();

        assert_eq!(after[0].texcoord, [0.5, 0.5]);
        assert_eq!(after[2].texcoord, [0.0, 2.0]);
        for i in 0..3 {
            assert_eq!(after[i].texcoord, full[i].texcoord);
            assert_eq!(
                bytemuck::bytes_of(&after[i].position),
                bytemuck::bytes_of(&before[i].position)
            );
            assert_eq!(
                bytemuck::bytes_of(&after[i].color),
                bytemuck::bytes_of(&before[i].color)
            );
            assert_eq!(
                bytemuck::bytes_of(&after[i].normal),
                bytemuck::bytes_of(&before[i].normal)
            );
        }
    }

    #[test]
    fn mismatched_channel_resets_to_default_on_patch() {
        let mut mesh = full_tri();
        let mut p = VertexProjector::default();
        p.rebuild(&mesh);

        mesh.colors = Some(vec![Vec4::ZERO; 2]);
        mesh.texture_coordinates = Some(vec![Vec2::ONE; 7]);
        p.project(VertexUpdate::Colors, &mesh);
        p.project(VertexUpdate::TextureCoordinates, &mesh);

        for v in p.packed().expect("array").as_slice() {
            assert_eq!(v.color, PackedVertex::WHITE);
            assert_eq!(v.texcoord, [0.0, 0.0]);
        }
    }

    #[test]
    fn absent_channel_resets_to_default_on_patch() {
        let mut mesh = full_tri();
        let mut p = VertexProjector::default();
        p.rebuild(&mesh);

        mesh.texture_coordinates = None;
        p.project(VertexUpdate::TextureCoordinates, &mesh);
        for v in p.packed().expect("array").as_slice() {
            assert_eq!(v.texcoord, [0.0, 0.0]);
        }
    }

    #[test]
    fn patch_without_array_is_stale() {
        let mut p = VertexProjector::default();
        assert_eq!(p.project(VertexUpdate::Colors, &tri()), Projection::Stale);
        assert!(p.packed().is_none());
    }

    #[test]
    fn patch_on_undersized_array_is_stale_and_writes_nothing() {
        let mut p = VertexProjector::default();
        p.rebuild(&tri());
        let before = p.packed().expect("array").as_slice().to_vec();

        let mut grown = tri();
        grown.positions.push(Vec3::ONE);
        assert!(p.project(VertexUpdate::Positions, &grown).is_stale());
        assert_eq!(p.packed().expect("array").as_slice(), &before[..]);
    }
}
