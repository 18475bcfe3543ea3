//! GPU device seams and their implementations.
//!
//! This module is responsible for:
//! - the provider traits the synchronization core is written against
//! - a wgpu provider (headless device bootstrap, pipelines, render-pass recording)
//! - a recording provider used by tests and GPU-less hosts

pub mod dummy;
mod gpu;
mod provider;
mod wgpu_backend;

pub use gpu::{Gpu, GpuInit};
pub use provider::{
    BufferDesc, BufferKind, CommandContext, DeviceProvider, Material, MaterialBinding, RasterDesc,
    VertexBinding,
};
pub use wgpu_backend::{PipelineTemplate, ScissorRect, WgpuDevice, WgpuPass, WgpuRasterState};
