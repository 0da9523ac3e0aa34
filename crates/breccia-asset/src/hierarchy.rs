//! Chunk-subtree traversal.

use breccia_core::{is_invalid, INVALID_INDEX};

use crate::asset::Chunk;

/// Depth-first iterator over a chunk subtree.
///
/// Traverses the subtree rooted at `start`, yielding the root first.
/// Chunks with index at or beyond `limit` are not entered, which is how
/// callers restrict a walk to the upper-support range (subsupport chunks
/// are laid out after `first_subsupport_chunk_index`).
pub struct DepthFirstIter<'a> {
    chunks: &'a [Chunk],
    curr: u32,
    stop: u32,
    limit: u32,
}

impl<'a> DepthFirstIter<'a> {
    /// Iterate the subtree rooted at `start`, not entering chunks indexed
    /// at or beyond `limit`.
    pub fn with_limit(chunks: &'a [Chunk], start: u32, limit: u32) -> Self {
        let curr = if start >= limit { INVALID_INDEX } else { start };
        Self {
            chunks,
            curr,
            stop: start,
            limit,
        }
    }

    /// Iterate the whole subtree rooted at `start`.
    pub fn new(chunks: &'a [Chunk], start: u32) -> Self {
        Self::with_limit(chunks, start, chunks.len() as u32)
    }
}

impl Iterator for DepthFirstIter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if is_invalid(self.curr) {
            return None;
        }
        let item = self.curr;

        // Advance: descend into the first child if allowed, else climb to
        // the next sibling of the nearest ancestor below the start.
        let mut chunk = &self.chunks[self.curr as usize];
        if chunk.child_index_stop > chunk.first_child_index && chunk.first_child_index < self.limit {
            self.curr = chunk.first_child_index;
        } else {
            loop {
                if self.curr == self.stop {
                    self.curr = INVALID_INDEX;
                    break;
                }
                let parent = &self.chunks[chunk.parent_chunk_index as usize];
                self.curr += 1;
                if self.curr < parent.child_index_stop {
                    break; // next sibling
                }
                self.curr = chunk.parent_chunk_index;
                chunk = parent;
            }
        }

        Some(item)
    }
}

/// Append the subtree of `start` to `out` in breadth-first order.
///
/// The root itself is included only when `include_root` is set. Returns
/// the number of indices appended.
pub fn enumerate_breadth_first(
    chunks: &[Chunk],
    start: u32,
    include_root: bool,
    out: &mut Vec<u32>,
) -> usize {
    let first = out.len();
    if include_root {
        out.push(start);
    } else {
        let chunk = &chunks[start as usize];
        for child in chunk.first_child_index..chunk.child_index_stop {
            out.push(child);
        }
    }
    let mut curr = first;
    while curr < out.len() {
        let chunk = &chunks[out[curr] as usize];
        for child in chunk.first_child_index..chunk.child_index_stop {
            out.push(child);
        }
        curr += 1;
    }
    out.len() - first
}
