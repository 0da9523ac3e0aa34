//! Fixed-capacity containers for the Breccia destruction core.
//!
//! Every container here pre-allocates exactly its capacity at construction
//! and never reallocates afterwards, so a family's memory footprint is
//! fixed at spawn time. Mutating operations validate capacity with
//! `contract_assert!` rather than a recoverable error path — use the
//! sizing APIs to provision correctly, and enable the `checked` feature to
//! keep the checks in optimized builds.
//!
//! Each type also exposes `required_memory_size(capacity)`, the
//! 16-byte-aligned byte count of a header plus `capacity` elements. The
//! binary block codec uses these to lay out serialized state identically to
//! the in-memory accounting.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod array;
pub mod bitmap;
pub mod bool_array;
pub mod priority_queue;
pub mod queue;

pub use array::FixedArray;
pub use bitmap::FixedBitmap;
pub use bool_array::FixedBoolArray;
pub use priority_queue::{Comparator, FixedPriorityQueue, Less};
pub use queue::FixedQueue;
