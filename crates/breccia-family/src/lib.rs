//! Per-instance runtime state for the Breccia destruction core.
//!
//! A [`Family`] is the mutable arena backing one spawned instance of an
//! asset: a fixed pool of actor slots, index-linked visible-chunk and
//! graph-node membership lists, per-chunk and per-bond health values, and
//! the [`FamilyGraph`] that incrementally tracks which support-graph nodes
//! remain connected as bonds are severed.
//!
//! All storage is allocated when the family is spawned and reused for its
//! whole lifetime — damage application, island resolution, and actor
//! splitting never allocate. A family is single-threaded by contract; the
//! shared [`Asset`](breccia_asset::Asset) is read-only and may back any
//! number of families concurrently.
//!
//! The embedding engine drives the cycle explicitly: apply damage
//! ([`Family::apply_fracture`]), resolve connectivity
//! ([`Family::find_islands`]), and realize splits ([`Family::split`]).
//! Island resolution is never implicit.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod actor;
pub mod dlink;
pub mod family;
pub mod fracture;
pub mod graph;

pub use actor::ActorIndex;
pub use breccia_core::FamilyError;
pub use family::{family_memory_size, ActorDesc, Family, HealthInit};
pub use fracture::{
    BondFractureCommand, BondFractureEvent, ChunkFractureCommand, ChunkFractureEvent,
    FractureCommands, FractureEvents,
};
pub use graph::{FamilyGraph, IslandScratch};
