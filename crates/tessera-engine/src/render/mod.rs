//! Vertex-data synchronization and draw submission.
//!
//! Data flow per change: `mesh::classify` picks an update strategy, the
//! `VertexProjector` (re)builds the packed array, the `BufferSynchronizer`
//! uploads it. Per frame, `MeshModel::render` syncs instances and hands the
//! committed buffers to `submit_draw`.
//!
//! Each model is responsible for its own GPU resources (buffers, raster state).

mod instances;
mod model;
mod projector;
mod raster;
mod submit;
mod sync;

pub use instances::{InstanceSet, InstanceSync};
pub use model::{FrameContext, MeshModel};
pub use projector::{Projection, SyncConfig, VertexArrayBuffer, VertexProjector};
pub use raster::RasterConfig;
pub use submit::{submit_draw, DrawInput, DrawOutcome, SkipReason};
pub use sync::{BufferSynchronizer, SyncOutcome};
