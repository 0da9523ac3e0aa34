//! Core types and conventions for the Breccia destruction framework.
//!
//! Everything in this crate is shared by the asset, family, and block
//! crates: the invalid-index sentinel and the index utilities built on it,
//! the subsystem error enums, 16-byte layout arithmetic, and the
//! [`contract_assert!`] macro implementing the debug-checked /
//! release-unchecked contract described in the crate-level docs of
//! `breccia`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod index;
pub mod mem;

mod contract;

pub use error::{AssetBuildError, BlockError, FamilyError};
pub use index::{create_index_start_lookup, invert_map, is_invalid, INVALID_INDEX};
pub use mem::align16;

/// Whether contract checks are compiled into this build.
///
/// True under `debug_assertions` or when the `checked` feature is enabled.
/// [`contract_assert!`] uses this; the branch folds away entirely when it
/// returns false.
#[inline(always)]
#[must_use]
pub const fn contract_checks_enabled() -> bool {
    cfg!(any(debug_assertions, feature = "checked"))
}
