//! Versioned binary blocks for Breccia assets and actor state.
//!
//! All integers and floats are little-endian; every section begins on a
//! 16-byte boundary with zeroed padding, so identical state always encodes
//! to identical bytes. Each block leads with a 16-byte header:
//!
//! ```text
//! [MAGIC "BRCC"] [block type u32] [format version u32] [total size u32]
//! ```
//!
//! Format versions must match the current constants exactly on read;
//! mismatches fail with [`BlockError::UnsupportedVersion`] rather than
//! attempting a best-effort decode. Sizing functions
//! ([`asset_block_size`], [`actor_serialization_size`],
//! [`actor_serialization_size_upper_bound`]) compute exact byte counts
//! from static shape so callers can allocate without a dry run.
//!
//! Consumers needing cross-process framing (higher-level serialization
//! wrappers) carry these blocks opaquely rather than reinterpreting their
//! layout.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod actor_block;
pub mod asset_block;
pub mod codec;

pub use actor_block::{
    actor_serialization_size, actor_serialization_size_upper_bound, deserialize_actor,
    serialize_actor, ACTOR_FORMAT_VERSION,
};
pub use asset_block::{asset_block_size, read_asset, write_asset, ASSET_FORMAT_VERSION};
pub use breccia_core::BlockError;

/// Magic bytes at the start of every block.
pub const MAGIC: [u8; 4] = *b"BRCC";

/// Block type tag for asset blocks.
pub const ASSET_BLOCK_TYPE: u32 = 0;

/// Block type tag for actor state blocks.
pub const ACTOR_BLOCK_TYPE: u32 = 1;
