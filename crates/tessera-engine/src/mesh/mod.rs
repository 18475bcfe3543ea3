//! CPU-side mesh data and the GPU vertex layouts it is packed into.
//!
//! - `MeshDescription` is the mutable source of truth (positions + optional channels + indices).
//! - `PackedVertex` is the fixed GPU record the projector writes.
//! - `GeometryChange` is the closed set of mutation signals and their update strategies.

mod change;
mod description;
mod vertex;

pub use change::{classify, GeometryChange, UpdateStrategy, VertexUpdate};
pub use description::{Channel, MeshDescription};
pub use vertex::{instance_layout, PackedVertex, INSTANCE_STRIDE, VERTEX_STRIDE};
