//! Breccia: a real-time destructible-object simulation core.
//!
//! Given a pre-authored fracture hierarchy (a tree of chunks) and a graph
//! of structural bonds between its support chunks, Breccia tracks which
//! chunks remain rigidly connected as bonds are damaged and severed, and
//! re-partitions a damaged object into the independent rigid pieces
//! ("actors") that result. It is driven by a physics or game engine that
//! supplies geometry and damage magnitudes; Breccia owns no rendering, no
//! rigid-body dynamics, and no platform I/O.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use breccia::prelude::*;
//!
//! // Two bonded support chunks.
//! let chunks = [ChunkDesc::root(true), ChunkDesc::root(true)];
//! let bonds = [BondDesc {
//!     bond: Bond {
//!         normal: [1.0, 0.0, 0.0],
//!         area: 1.0,
//!         centroid: [0.5, 0.0, 0.0],
//!         user_data: 0,
//!     },
//!     chunk_indices: [0, 1],
//! }];
//! let asset = Arc::new(
//!     Asset::build(&AssetDesc {
//!         chunk_descs: &chunks,
//!         bond_descs: &bonds,
//!     })
//!     .unwrap(),
//! );
//!
//! // Spawn an instance and break its only bond.
//! let mut family = Family::new(asset).unwrap();
//! family.create_first_actor(&ActorDesc::uniform(1.0, 1.0)).unwrap();
//! family.damage_bond(0, 0, 1, 2.0);
//! family.find_islands(0).unwrap();
//!
//! let mut pieces = Vec::new();
//! assert_eq!(family.split(0, &mut pieces).unwrap(), 2);
//! ```
//!
//! # Crates
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`fixed`] | `breccia-fixed` | Fixed-capacity arena containers |
//! | [`asset`] | `breccia-asset` | Descriptors, validation, immutable assets |
//! | [`family`] | `breccia-family` | Actor runtime and island tracking |
//! | [`block`] | `breccia-block` | Versioned binary state blocks |
//! | [`types`] | `breccia-core` | Index conventions, errors, contract checks |
//!
//! # Threading
//!
//! A [`family::Family`] is single-threaded by contract; independent
//! families share nothing mutable and may be processed in parallel. A
//! built [`asset::Asset`] is immutable and freely shared (via `Arc`)
//! across families and threads.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Index conventions, error types, and contract checks (`breccia-core`).
pub use breccia_core as types;

/// Fixed-capacity arena containers (`breccia-fixed`).
pub use breccia_fixed as fixed;

/// Fracture-hierarchy assets and validation (`breccia-asset`).
pub use breccia_asset as asset;

/// Per-instance actor runtime and island tracking (`breccia-family`).
pub use breccia_family as family;

/// Versioned binary blocks for assets and actor state (`breccia-block`).
pub use breccia_block as block;

/// Common imports for typical Breccia usage.
///
/// ```rust
/// use breccia::prelude::*;
/// ```
pub mod prelude {
    // Asset authoring and construction
    pub use breccia_asset::{
        apply_chunk_reorder_map, build_chunk_reorder_map, ensure_exact_support_coverage,
        test_for_valid_chunk_order, Asset, AssetDesc, Bond, BondDesc, Chunk, ChunkDesc,
        SupportGraph,
    };

    // Family runtime
    pub use breccia_family::{
        family_memory_size, ActorDesc, ActorIndex, BondFractureCommand, ChunkFractureCommand,
        Family, FractureCommands, FractureEvents, HealthInit,
    };

    // Serialization
    pub use breccia_block::{
        actor_serialization_size, actor_serialization_size_upper_bound, asset_block_size,
        deserialize_actor, read_asset, serialize_actor, write_asset,
    };

    // Errors
    pub use breccia_core::{AssetBuildError, BlockError, FamilyError};
}
