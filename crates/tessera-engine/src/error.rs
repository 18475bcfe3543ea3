//! Error types shared across the engine.
//!
//! Bootstrap code (`device::Gpu`) reports failures through `anyhow`; the
//! synchronization core uses the typed enums below so callers can match on them.

use thiserror::Error;

use crate::mesh::Channel;

/// Failure reported by a device provider while building pipeline state.
///
/// These are recoverable: the owner logs them and skips drawing until the
/// state is rebuilt successfully.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeviceError {
    /// The raster descriptor needs a device feature that was not enabled.
    #[error("raster state requires device feature {0:?}")]
    MissingFeature(wgpu::Features),

    /// The raster descriptor cannot be expressed on the current target.
    #[error("unsupported raster state: {0}")]
    Unsupported(String),

    /// The device refused to create the state.
    #[error("device rejected raster state: {0}")]
    Rejected(String),
}

/// Failure of a model lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// `attach` was called without a bound mesh.
    #[error("geometry must be bound before attach")]
    MissingGeometry,
}

/// Shape problem found by [`MeshDescription::validate`](crate::mesh::MeshDescription::validate).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshError {
    #[error("{channel} has {len} entries but there are {expected} positions")]
    ChannelLength {
        channel: Channel,
        len: usize,
        expected: usize,
    },

    #[error("index count {0} is not a multiple of 3")]
    IndexCount(usize),

    #[error("index {value} at slot {slot} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        slot: usize,
        value: u32,
        vertex_count: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            ModelError::MissingGeometry.to_string(),
            "geometry must be bound before attach"
        );
        assert_eq!(
            MeshError::IndexCount(4).to_string(),
            "index count 4 is not a multiple of 3"
        );
        let err = MeshError::ChannelLength {
            channel: Channel::Colors,
            len: 2,
            expected: 3,
        };
        assert_eq!(err.to_string(), "colors has 2 entries but there are 3 positions");
    }
}
