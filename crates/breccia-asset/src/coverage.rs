//! Exact support coverage enforcement.
//!
//! Every leaf-to-root path in a valid asset must contain exactly one
//! support chunk ("exact coverage"). [`ensure_exact_support_coverage`] is
//! the standalone enforcement pass: it can test a descriptor, or repair it
//! by demoting redundant support flags (the highest chunk on a path wins)
//! and promoting chunks where a path has none (the highest chunk without a
//! support descendant, falling back to the root).

use breccia_core::{is_invalid, INVALID_INDEX};

use crate::desc::ChunkDesc;

/// Per-chunk annotation bits produced by coverage enforcement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChunkAnnotations(u8);

impl ChunkAnnotations {
    const PARENT: u8 = 1 << 0;
    const SUPPORT: u8 = 1 << 1;
    const SUPER_SUPPORT: u8 = 1 << 2;

    /// Whether the chunk has children.
    #[must_use]
    pub fn is_parent(self) -> bool {
        self.0 & Self::PARENT != 0
    }

    /// Whether the chunk is (after enforcement) a support chunk.
    #[must_use]
    pub fn is_support(self) -> bool {
        self.0 & Self::SUPPORT != 0
    }

    /// Whether the chunk has a support descendant.
    #[must_use]
    pub fn is_super_support(self) -> bool {
        self.0 & Self::SUPER_SUPPORT != 0
    }

    /// Whether the chunk is at or above the support level. Chunks that are
    /// not upper-support are "subsupport": strict descendants of a support
    /// chunk, with no graph node of their own.
    #[must_use]
    pub fn is_upper_support(self) -> bool {
        self.0 & (Self::SUPPORT | Self::SUPER_SUPPORT) != 0
    }

    fn insert(&mut self, bits: u8) {
        self.0 |= bits;
    }

    fn remove(&mut self, bits: u8) {
        self.0 &= !bits;
    }
}

/// Result of [`ensure_exact_support_coverage`].
#[derive(Clone, Debug)]
pub struct Coverage {
    /// Number of support chunks after enforcement.
    pub support_chunk_count: u32,
    /// Number of leaf chunks in the hierarchy.
    pub leaf_chunk_count: u32,
    /// Per-chunk annotations after enforcement.
    pub annotations: Vec<ChunkAnnotations>,
    /// Whether the input already had exact coverage. When `test_only` was
    /// set and this is false, the other fields are partial and must not be
    /// used.
    pub was_exact: bool,
}

impl Coverage {
    fn not_exact() -> Self {
        Self {
            support_chunk_count: 0,
            leaf_chunk_count: 0,
            annotations: Vec::new(),
            was_exact: false,
        }
    }
}

/// Enforce exact support coverage on a chunk descriptor array.
///
/// With `test_only` set, returns at the first violation with
/// `was_exact == false` and leaves the descriptors untouched. Otherwise
/// repairs the support flags in place and returns the full result.
///
/// Parent chains are assumed acyclic; walks are bounded by the chunk count
/// so cyclic input terminates (with meaningless flags). Asset construction
/// rejects cycles before calling this.
pub fn ensure_exact_support_coverage(chunk_descs: &mut [ChunkDesc], test_only: bool) -> Coverage {
    let chunk_count = chunk_descs.len();
    let mut annotations = vec![ChunkAnnotations::default(); chunk_count];

    // Walk up from every chunk and mark all ancestors as parents.  Chunks
    // left unmarked are the leaves.
    for i in 0..chunk_count {
        if annotations[i].is_parent() {
            continue;
        }
        let mut chunk = chunk_descs[i].parent_chunk_index;
        for _ in 0..chunk_count {
            if is_invalid(chunk) {
                break;
            }
            annotations[chunk as usize].insert(ChunkAnnotations::PARENT);
            chunk = chunk_descs[chunk as usize].parent_chunk_index;
        }
    }

    // Walk up from every leaf (counting them) and track the support chunks
    // found on each chain.  Exactly one should be found per walk; when more
    // than one is marked, the higher wins and the lower is demoted.
    let mut leaf_chunk_count = 0u32;
    let mut redundant_coverage = false;
    let mut insufficient_coverage = false;
    for i in 0..chunk_count {
        if annotations[i].is_parent() {
            continue;
        }
        leaf_chunk_count += 1;
        let mut support_chunk = INVALID_INDEX;
        let mut chunk = i as u32;
        let mut done_with_chain = false;
        for _ in 0..chunk_count {
            if chunk_descs[chunk as usize].support {
                if annotations[chunk as usize].is_support() {
                    // Already walked through here from another leaf, so the
                    // chain above is uniquely covered.
                    done_with_chain = true;
                }
                annotations[chunk as usize].insert(ChunkAnnotations::SUPPORT);
                if !is_invalid(support_chunk) {
                    if test_only {
                        return Coverage::not_exact();
                    }
                    redundant_coverage = true;
                    annotations[support_chunk as usize].remove(ChunkAnnotations::SUPPORT);
                    // Clear the super-support markings between the demoted
                    // chunk and the winner.
                    let mut s = support_chunk;
                    loop {
                        s = chunk_descs[s as usize].parent_chunk_index;
                        annotations[s as usize].remove(ChunkAnnotations::SUPER_SUPPORT);
                        if s == chunk {
                            break;
                        }
                    }
                }
                support_chunk = chunk;
            } else if !is_invalid(support_chunk) {
                annotations[chunk as usize].insert(ChunkAnnotations::SUPER_SUPPORT);
            }
            if done_with_chain {
                break;
            }
            chunk = chunk_descs[chunk as usize].parent_chunk_index;
            if is_invalid(chunk) {
                break;
            }
        }
        if is_invalid(support_chunk) {
            if test_only {
                return Coverage::not_exact();
            }
            insufficient_coverage = true;
        }
    }

    if redundant_coverage {
        log::info!("some leaf-to-root chains had more than one support chunk; extra support flags removed");
    }

    if insufficient_coverage {
        // Mark every chunk with a support descendant, so support can be
        // placed as high as possible on the uncovered chains.
        for i in 0..chunk_count {
            if annotations[i].is_parent() {
                continue;
            }
            let mut support_found = false;
            let mut chunk = i as u32;
            for _ in 0..chunk_count {
                if is_invalid(chunk) {
                    break;
                }
                if annotations[chunk as usize].is_support() {
                    support_found = true;
                } else if support_found {
                    annotations[chunk as usize].insert(ChunkAnnotations::SUPER_SUPPORT);
                }
                chunk = chunk_descs[chunk as usize].parent_chunk_index;
            }
        }

        // Walk up from each leaf once more and add support where a chain
        // has none.
        for i in 0..chunk_count {
            if annotations[i].is_parent() {
                continue;
            }
            let mut previous = INVALID_INDEX;
            let mut chunk = i as u32;
            loop {
                if annotations[chunk as usize].is_support() {
                    break; // chain is covered
                }
                if annotations[chunk as usize].is_super_support() {
                    // Highest place on this chain without a support
                    // descendant is the child we came from.
                    annotations[previous as usize].insert(ChunkAnnotations::SUPPORT);
                    break;
                }
                previous = chunk;
                chunk = chunk_descs[chunk as usize].parent_chunk_index;
                if is_invalid(chunk) {
                    // Nothing found anywhere in the hierarchy: support goes
                    // on the root.
                    annotations[previous as usize].insert(ChunkAnnotations::SUPPORT);
                    break;
                }
            }
        }

        log::info!("some leaf-to-root chains had no support chunks; support flags added");
    }

    // Apply the changes and count support chunks.
    let mut support_chunk_count = 0u32;
    for (desc, ann) in chunk_descs.iter_mut().zip(&annotations) {
        desc.support = ann.is_support();
        if desc.support {
            support_chunk_count += 1;
        }
    }

    Coverage {
        support_chunk_count,
        leaf_chunk_count,
        annotations,
        was_exact: !redundant_coverage && !insufficient_coverage,
    }
}
