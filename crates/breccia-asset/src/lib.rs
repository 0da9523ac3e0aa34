//! Fracture-hierarchy assets for the Breccia destruction core.
//!
//! An [`Asset`] is the immutable description of a destructible object: a
//! chunk tree, a compressed-adjacency support graph over the chunks flagged
//! as structural ("support"), the bonds connecting them, and derived
//! indices (subtree leaf counts, chunk-to-graph-node map). It is built once
//! from a validated [`AssetDesc`] and then shared read-only (typically via
//! `Arc`) by every family spawned from it.
//!
//! Authoring tools that assemble descriptors from geometry use the
//! standalone validators directly: [`ensure_exact_support_coverage`]
//! pre-validates or auto-fixes support coverage, and
//! [`build_chunk_reorder_map`] / [`apply_chunk_reorder_map`] repair chunk
//! ordering without rebuilding the descriptor from scratch.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod asset;
pub mod coverage;
pub mod desc;
pub mod graph;
pub mod hierarchy;
pub mod order;

pub use asset::{Asset, Bond, Chunk};
pub use breccia_core::AssetBuildError;
pub use coverage::{ensure_exact_support_coverage, ChunkAnnotations, Coverage};
pub use desc::{AssetDesc, BondDesc, ChunkDesc};
pub use graph::SupportGraph;
pub use hierarchy::{enumerate_breadth_first, DepthFirstIter};
pub use order::{apply_chunk_reorder_map, build_chunk_reorder_map, test_for_valid_chunk_order};
