//! Asset descriptors supplied by authoring tools.

use breccia_core::INVALID_INDEX;

use crate::asset::Bond;

/// Describes one chunk of a fracture hierarchy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChunkDesc {
    /// Central position of the chunk's volume.
    pub centroid: [f32; 3],
    /// Volume of the chunk.
    pub volume: f32,
    /// Index of the parent chunk, or [`INVALID_INDEX`] for a root.
    pub parent_chunk_index: u32,
    /// Whether this chunk carries a support-graph node. Coverage
    /// enforcement may promote or demote this flag; an ancestor marked
    /// support always wins over a descendant.
    pub support: bool,
    /// Opaque value passed through to runtime queries and fracture events.
    pub user_data: u32,
}

impl ChunkDesc {
    /// A root chunk with the given flags and zeroed geometry.
    ///
    /// Convenient for tests and procedurally assembled hierarchies; real
    /// authoring fills centroid and volume from geometry.
    #[must_use]
    pub fn root(support: bool) -> Self {
        Self {
            centroid: [0.0; 3],
            volume: 0.0,
            parent_chunk_index: INVALID_INDEX,
            support,
            user_data: 0,
        }
    }

    /// A child of `parent` with the given flags and zeroed geometry.
    #[must_use]
    pub fn child(parent: u32, support: bool) -> Self {
        Self {
            parent_chunk_index: parent,
            ..Self::root(support)
        }
    }
}

/// Describes one bond between two support chunks.
///
/// Both endpoints must be distinct support chunks; bonds that are not are
/// dropped with a warning during asset construction. By convention the
/// normal points from the lower-indexed endpoint toward the higher.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BondDesc {
    /// Bond geometry and user data.
    pub bond: Bond,
    /// Indices of the two chunks the bond connects.
    pub chunk_indices: [u32; 2],
}

/// Input to [`Asset::build`](crate::Asset::build).
#[derive(Clone, Copy, Debug)]
pub struct AssetDesc<'a> {
    /// Chunk descriptors; must be non-empty.
    pub chunk_descs: &'a [ChunkDesc],
    /// Bond descriptors; may be empty for single-chunk or unbonded assets.
    pub bond_descs: &'a [BondDesc],
}
