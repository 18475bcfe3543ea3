use std::fmt;

use glam::{Vec2, Vec3, Vec4};

use crate::error::MeshError;

/// Optional per-vertex channel of a [`MeshDescription`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    Colors,
    TextureCoordinates,
    Normals,
    Tangents,
    Bitangents,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::Colors => "colors",
            Channel::TextureCoordinates => "texture coordinates",
            Channel::Normals => "normals",
            Channel::Tangents => "tangents",
            Channel::Bitangents => "bitangents",
        };
        f.write_str(name)
    }
}

/// Mutable mesh description: positions plus optional parallel channels and a triangle list.
///
/// Invariant expected by the projector:
/// - each optional channel is either `None` or has exactly `positions.len()` entries.
///
/// A channel that breaks the invariant is not an error during synchronization: the
/// accessors below report it as absent and the vertex data falls back to defaults.
/// Use [`validate`](Self::validate) to surface such problems eagerly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshDescription {
    pub positions: Vec<Vec3>,
    /// Linear RGBA.
    pub colors: Option<Vec<Vec4>>,
    pub texture_coordinates: Option<Vec<Vec2>>,
    pub normals: Option<Vec<Vec3>>,
    pub tangents: Option<Vec<Vec3>>,
    pub bitangents: Option<Vec<Vec3>>,
    /// Triangle list; length is a multiple of 3.
    pub indices: Vec<u32>,
}

impl MeshDescription {
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            indices,
            ..Self::default()
        }
    }

    pub fn with_colors(mut self, colors: Vec<Vec4>) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn with_texture_coordinates(mut self, texcoords: Vec<Vec2>) -> Self {
        self.texture_coordinates = Some(texcoords);
        self
    }

    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn with_tangents(mut self, tangents: Vec<Vec3>) -> Self {
        self.tangents = Some(tangents);
        self
    }

    pub fn with_bitangents(mut self, bitangents: Vec<Vec3>) -> Self {
        self.bitangents = Some(bitangents);
        self
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Empty positions count as "no positions": there is nothing to upload.
    #[inline]
    pub fn has_positions(&self) -> bool {
        !self.positions.is_empty()
    }

    // ── channel accessors (length-checked) ────────────────────────────────

    #[inline]
    pub fn colors(&self) -> Option<&[Vec4]> {
        matching(&self.colors, self.vertex_count())
    }

    #[inline]
    pub fn texture_coordinates(&self) -> Option<&[Vec2]> {
        matching(&self.texture_coordinates, self.vertex_count())
    }

    #[inline]
    pub fn normals(&self) -> Option<&[Vec3]> {
        matching(&self.normals, self.vertex_count())
    }

    #[inline]
    pub fn tangents(&self) -> Option<&[Vec3]> {
        matching(&self.tangents, self.vertex_count())
    }

    #[inline]
    pub fn bitangents(&self) -> Option<&[Vec3]> {
        matching(&self.bitangents, self.vertex_count())
    }

    /// Checks channel lengths and the triangle list.
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), MeshError> {
        let expected = self.vertex_count();
        let lengths = [
            (Channel::Colors, self.colors.as_ref().map(Vec::len)),
            (
                Channel::TextureCoordinates,
                self.texture_coordinates.as_ref().map(Vec::len),
            ),
            (Channel::Normals, self.normals.as_ref().map(Vec::len)),
            (Channel::Tangents, self.tangents.as_ref().map(Vec::len)),
            (Channel::Bitangents, self.bitangents.as_ref().map(Vec::len)),
        ];
        for (channel, len) in lengths {
            if let Some(len) = len {
                if len != expected {
                    return Err(MeshError::ChannelLength {
                        channel,
                        len,
                        expected,
                    });
                }
            }
        }

        if self.indices.len() % 3 != 0 {
            return Err(MeshError::IndexCount(self.indices.len()));
        }

        if let Some((slot, &value)) = self
            .indices
            .iter()
            .enumerate()
            .find(|&(_, &i)| i as usize >= expected)
        {
            return Err(MeshError::IndexOutOfRange {
                slot,
                value,
                vertex_count: expected,
            });
        }

        Ok(())
    }
}

fn matching<T>(channel: &Option<Vec<T>>, vertex_count: usize) -> Option<&[T]> {
    channel
        .as_deref()
        .filter(|values| values.len() == vertex_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> MeshDescription {
        MeshDescription::new(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    #[test]
    fn mismatched_channel_reads_as_absent() {
        let mesh = quad().with_colors(vec![Vec4::ONE; 3]);
        assert!(mesh.colors().is_none());

        let mesh = quad().with_colors(vec![Vec4::ONE; 4]);
        assert_eq!(mesh.colors().map(<[Vec4]>::len), Some(4));
    }

    #[test]
    fn validate_accepts_well_formed_mesh() {
        let mesh = quad().with_normals(vec![Vec3::Z; 4]);
        assert_eq!(mesh.validate(), Ok(()));
    }

    #[test]
    fn validate_reports_channel_length() {
        let mesh = quad().with_tangents(vec![Vec3::X; 5]);
        assert_eq!(
            mesh.validate(),
            Err(MeshError::ChannelLength {
                channel: Channel::Tangents,
                len: 5,
                expected: 4,
            })
        );
    }

    #[test]
    fn validate_reports_partial_triangle() {
        let mut mesh = quad();
        mesh.indices.push(1);
        assert_eq!(mesh.validate(), Err(MeshError::IndexCount(7)));
    }

    #[test]
    fn validate_reports_out_of_range_index() {
        let mut mesh = quad();
        mesh.indices[4] = 9;
        assert_eq!(
            mesh.validate(),
            Err(MeshError::IndexOutOfRange {
                slot: 4,
                value: 9,
                vertex_count: 4,
            })
        );
    }

    #[test]
    fn empty_positions_count_as_absent() {
        assert!(!MeshDescription::default().has_positions());
        assert!(quad().has_positions());
    }
}
