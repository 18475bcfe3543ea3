//! GPU vertex records.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Packed per-vertex record uploaded to the vertex buffer.
///
/// Layout (76 bytes, no padding):
/// position `vec4` (w = 1), color `vec4`, texcoord `vec2`,
/// normal / tangent / bitangent `vec3`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct PackedVertex {
    pub position: [f32; 4],
    pub color: [f32; 4],
    pub texcoord: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

/// Vertex buffer stride in bytes.
pub const VERTEX_STRIDE: u64 = std::mem::size_of::<PackedVertex>() as u64;

/// Instance buffer stride in bytes (one column-major 4x4 `f32` matrix).
pub const INSTANCE_STRIDE: u64 = std::mem::size_of::<Mat4>() as u64;

const _: () = assert!(VERTEX_STRIDE == 76);
const _: () = assert!(INSTANCE_STRIDE == 64);

impl PackedVertex {
    pub const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

    /// Record with every channel at its default value.
    pub const DEFAULT: Self = Self {
        position: [0.0, 0.0, 0.0, 1.0],
        color: Self::WHITE,
        texcoord: [0.0, 0.0],
        normal: [0.0; 3],
        tangent: [0.0; 3],
        bitangent: [0.0; 3],
    };

    const ATTRS: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
        0 => Float32x4, // position
        1 => Float32x4, // color
        2 => Float32x2, // texcoord
        3 => Float32x3, // normal
        4 => Float32x3, // tangent
        5 => Float32x3  // bitangent
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: VERTEX_STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

impl Default for PackedVertex {
    fn default() -> Self {
        Self::DEFAULT
    }
}

const INSTANCE_ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
    6 => Float32x4,
    7 => Float32x4,
    8 => Float32x4,
    9 => Float32x4
];

/// Per-instance layout for slot 1: the transform as four column vectors.
pub fn instance_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: INSTANCE_STRIDE,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &INSTANCE_ATTRS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_record_is_white_and_homogeneous() {
        let v = PackedVertex::default();
        assert_eq!(v.position, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(v.color, PackedVertex::WHITE);
        assert_eq!(v.texcoord, [0.0, 0.0]);
        assert_eq!(v.normal, [0.0; 3]);
    }

    #[test]
    fn layouts_match_strides() {
        assert_eq!(PackedVertex::layout().array_stride, VERTEX_STRIDE);
        assert_eq!(instance_layout().array_stride, INSTANCE_STRIDE);
        assert_eq!(
            bytemuck::bytes_of(&PackedVertex::DEFAULT).len() as u64,
            VERTEX_STRIDE
        );
    }
}
