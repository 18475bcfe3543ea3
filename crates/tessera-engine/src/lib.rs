//! Tessera engine crate.
//!
//! Keeps GPU-resident vertex, index and instance buffers consistent with a
//! mutable CPU-side mesh and records its indexed / instanced draws.
//!
//! The core is written against the seams in [`device`]; a wgpu provider and a
//! recording provider (for tests and GPU-less hosts) ship with the crate.

pub mod device;
pub mod error;
pub mod logging;
pub mod mesh;
pub mod render;

pub use error::{DeviceError, MeshError, ModelError};
pub use mesh::{GeometryChange, MeshDescription, PackedVertex};
pub use render::{DrawOutcome, FrameContext, MeshModel, RasterConfig, SyncConfig};
