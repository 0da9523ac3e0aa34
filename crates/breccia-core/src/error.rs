//! Error types for the Breccia destruction framework.
//!
//! One enum per subsystem: asset construction, family/actor runtime, and
//! the binary block codec. Validation failures are recoverable — fix the
//! descriptor (the message names the repair utility where one exists) and
//! retry. Capacity and contract violations are *not* represented here; they
//! are covered by `contract_assert!` (see the crate docs).

use std::error::Error;
use std::fmt;

/// Errors from asset construction (`breccia-asset`).
///
/// Bond problems (self-bonds, non-support endpoints, duplicates) are
/// correctable input, not errors: construction drops or coalesces them and
/// logs at warn level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetBuildError {
    /// The descriptor contains no chunks.
    NoChunks,
    /// A chunk names a parent index outside the chunk array.
    ParentOutOfRange {
        /// The offending chunk.
        chunk: u32,
        /// Its out-of-range parent index.
        parent: u32,
    },
    /// A parent chain revisits a chunk; the hierarchy must be a forest.
    HierarchyLoop {
        /// A chunk on the cycle.
        chunk: u32,
    },
    /// Chunks are not grouped by parent with all upper-support chunks
    /// first. Build a reorder map, apply it, and retry.
    InvalidChunkOrder,
}

impl fmt::Display for AssetBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoChunks => write!(f, "asset descriptor has no chunks"),
            Self::ParentOutOfRange { chunk, parent } => {
                write!(f, "chunk {chunk} has out-of-range parent index {parent}")
            }
            Self::HierarchyLoop { chunk } => {
                write!(f, "parent chain loop detected at chunk {chunk}")
            }
            Self::InvalidChunkOrder => write!(
                f,
                "invalid chunk order; apply build_chunk_reorder_map to the descriptor first"
            ),
        }
    }
}

impl Error for AssetBuildError {}

/// Errors from family creation and actor operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FamilyError {
    /// The asset has no support chunks, so no actor can own graph nodes.
    NoSupportChunks,
    /// The first actor can only be created in an empty family.
    FamilyNotEmpty,
    /// An explicit bond health array does not match the asset's bond count.
    BondHealthLength {
        /// Required length (asset bond count).
        expected: usize,
        /// Provided length.
        actual: usize,
    },
    /// An explicit support-chunk health array does not match the asset's
    /// graph node count.
    SupportChunkHealthLength {
        /// Required length (graph node count).
        expected: usize,
        /// Provided length.
        actual: usize,
    },
    /// The operation addressed an actor slot that is not active.
    ActorInactive {
        /// The inactive slot.
        actor: u32,
    },
}

impl fmt::Display for FamilyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSupportChunks => write!(f, "asset has no support chunks"),
            Self::FamilyNotEmpty => write!(f, "family already has actors"),
            Self::BondHealthLength { expected, actual } => {
                write!(f, "bond health array length {actual}, expected {expected}")
            }
            Self::SupportChunkHealthLength { expected, actual } => {
                write!(
                    f,
                    "support chunk health array length {actual}, expected {expected}"
                )
            }
            Self::ActorInactive { actor } => write!(f, "actor {actor} is not active"),
        }
    }
}

impl Error for FamilyError {}

/// Errors from the binary block codec.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockError {
    /// The buffer does not begin with the block magic.
    InvalidMagic,
    /// The block's format version does not equal the current constant.
    /// Blocks are never best-effort decoded across versions.
    UnsupportedVersion {
        /// The version found in the header.
        found: u32,
    },
    /// The header's block type tag does not match the expected block kind.
    UnexpectedBlockType {
        /// The tag found in the header.
        found: u32,
    },
    /// The destination buffer is smaller than the required block size.
    BufferTooSmall {
        /// Bytes required.
        needed: usize,
        /// Bytes available.
        available: usize,
    },
    /// The source buffer ended, or contained inconsistent sizes or indices.
    Malformed {
        /// Human-readable description of the inconsistency.
        detail: String,
    },
    /// The actor has unresolved dirty graph nodes; run island resolution
    /// before serializing.
    DirtyNodes {
        /// The actor that was being serialized.
        actor: u32,
    },
    /// The serialized actor index is outside the family's actor buffer.
    ActorIndexOutOfRange {
        /// The index from the block header.
        actor: u32,
    },
    /// The serialized actor's slot is already active in the family.
    ActorSlotOccupied {
        /// The occupied slot.
        actor: u32,
    },
    /// A chunk named by the block is already owned by another actor in the
    /// family.
    ChunkAlreadyOwned {
        /// The contested chunk.
        chunk: u32,
    },
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMagic => write!(f, "invalid block magic"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported block format version {found}")
            }
            Self::UnexpectedBlockType { found } => {
                write!(f, "unexpected block type tag {found}")
            }
            Self::BufferTooSmall { needed, available } => {
                write!(f, "buffer too small: need {needed} bytes, have {available}")
            }
            Self::Malformed { detail } => write!(f, "malformed block: {detail}"),
            Self::DirtyNodes { actor } => {
                write!(
                    f,
                    "actor {actor} has dirty graph nodes; call find_islands before serializing"
                )
            }
            Self::ActorIndexOutOfRange { actor } => {
                write!(f, "serialized actor index {actor} out of range for family")
            }
            Self::ActorSlotOccupied { actor } => {
                write!(f, "actor slot {actor} is already active in family")
            }
            Self::ChunkAlreadyOwned { chunk } => {
                write!(f, "chunk {chunk} is already owned by another actor")
            }
        }
    }
}

impl Error for BlockError {}
