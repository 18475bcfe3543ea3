/// Mutation signal: which part of the mesh changed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GeometryChange {
    TextureCoordinates,
    Positions,
    Colors,
    Indices,
    /// The whole mesh (or an unrecognized channel) changed.
    FullSwap,
}

/// Which part of the packed vertex array a rebuild rewrites.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum VertexUpdate {
    /// Every channel, with (re)allocation of the array.
    Full,
    /// Texcoords only, in place.
    TextureCoordinates,
    /// Position, normal, tangent and bitangent, in place.
    Positions,
    /// Colors only, in place.
    Colors,
}

/// Rebuild strategy selected for a [`GeometryChange`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UpdateStrategy {
    /// Re-project (part of) the vertex array, then replace the vertex buffer.
    Vertices(VertexUpdate),
    /// Replace the index buffer; vertex data is left alone.
    IndexBuffer,
}

/// Maps a mutation signal to exactly one update strategy.
pub fn classify(change: GeometryChange) -> UpdateStrategy {
    match change {
        GeometryChange::TextureCoordinates => {
            UpdateStrategy::Vertices(VertexUpdate::TextureCoordinates)
        }
        // Normals and tangent frames are derived from positions; refresh them together.
        GeometryChange::Positions => UpdateStrategy::Vertices(VertexUpdate::Positions),
        GeometryChange::Colors => UpdateStrategy::Vertices(VertexUpdate::Colors),
        GeometryChange::Indices => UpdateStrategy::IndexBuffer,
        GeometryChange::FullSwap => UpdateStrategy::Vertices(VertexUpdate::Full),
    }
}

impl GeometryChange {
    /// Parses a channel name coming from a property-notification source.
    ///
    /// Matching ignores case and underscores, so `"TextureCoordinates"` and
    /// `"texture_coordinates"` are the same channel. `triangle_buffer` is an alias
    /// of `indices`. Anything unrecognized maps to [`GeometryChange::FullSwap`].
    pub fn from_channel_name(name: &str) -> Self {
        let key: String = name
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match key.as_str() {
            "texturecoordinates" => GeometryChange::TextureCoordinates,
            "positions" => GeometryChange::Positions,
            "colors" => GeometryChange::Colors,
            "indices" | "trianglebuffer" => GeometryChange::Indices,
            "vertexbuffer" => GeometryChange::FullSwap,
            _ => {
                log::debug!("unrecognized geometry channel {name:?}; rebuilding all vertex data");
                GeometryChange::FullSwap
            }
        }
    }

    #[inline]
    pub fn strategy(self) -> UpdateStrategy {
        classify(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::texcoords(
        GeometryChange::TextureCoordinates,
        UpdateStrategy::Vertices(VertexUpdate::TextureCoordinates)
    )]
    #[case::positions(
        GeometryChange::Positions,
        UpdateStrategy::Vertices(VertexUpdate::Positions)
    )]
    #[case::colors(GeometryChange::Colors, UpdateStrategy::Vertices(VertexUpdate::Colors))]
    #[case::indices(GeometryChange::Indices, UpdateStrategy::IndexBuffer)]
    #[case::full(GeometryChange::FullSwap, UpdateStrategy::Vertices(VertexUpdate::Full))]
    fn classify_selects_one_strategy(
        #[case] change: GeometryChange,
        #[case] expected: UpdateStrategy,
    ) {
        assert_eq!(classify(change), expected);
        assert_eq!(change.strategy(), expected);
    }

    #[rstest]
    #[case("TextureCoordinates", GeometryChange::TextureCoordinates)]
    #[case("texture_coordinates", GeometryChange::TextureCoordinates)]
    #[case("Positions", GeometryChange::Positions)]
    #[case("colors", GeometryChange::Colors)]
    #[case("Indices", GeometryChange::Indices)]
    #[case("TriangleBuffer", GeometryChange::Indices)]
    #[case("VertexBuffer", GeometryChange::FullSwap)]
    #[case("Normals", GeometryChange::FullSwap)]
    #[case("", GeometryChange::FullSwap)]
    fn channel_names_resolve_once(#[case] name: &str, #[case] expected: GeometryChange) {
        assert_eq!(GeometryChange::from_channel_name(name), expected);
    }
}
